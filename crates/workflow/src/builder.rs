use tracing::debug;

use eventrent_bookings::{Booking, BookingId, Invoice, InvoiceKind};
use eventrent_events::{EventBus, InMemoryEventBus};
use eventrent_infra::{ChangeEnvelope, CrmService, StoreError, StoreResult};
use eventrent_pricing::{ProductId, QuoteItem, QuoteTotals, compute_totals};

/// Partial edit of one quote line; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemUpdate {
    pub description: Option<String>,
    pub quantity: Option<u32>,
    pub unit_price: Option<u64>,
}

/// Editable quote for one booking.
pub struct QuoteBuilder<B = InMemoryEventBus<ChangeEnvelope>> {
    service: CrmService<B>,
    booking: Booking,
    items: Vec<QuoteItem>,
    totals: QuoteTotals,
}

impl<B> QuoteBuilder<B>
where
    B: EventBus<ChangeEnvelope>,
{
    /// Load the booking and seed the line list from its current quote.
    pub async fn load(service: CrmService<B>, booking_id: BookingId) -> StoreResult<Self> {
        let booking = service.booking_by_id(booking_id).await?.booking;
        let items = booking
            .quote()
            .map(|q| q.items().to_vec())
            .unwrap_or_default();

        let mut builder = Self {
            service,
            booking,
            items,
            totals: QuoteTotals::default(),
        };
        builder.recompute();
        Ok(builder)
    }

    pub fn booking(&self) -> &Booking {
        &self.booking
    }

    pub fn items(&self) -> &[QuoteItem] {
        &self.items
    }

    /// Totals of the lines as currently edited (not necessarily saved).
    pub fn totals(&self) -> QuoteTotals {
        self.totals
    }

    /// Whether the edited lines differ from the saved quote.
    pub fn has_unsaved_changes(&self) -> bool {
        let saved = self.booking.quote().map(|q| q.items()).unwrap_or(&[]);
        saved != self.items.as_slice()
    }

    pub fn final_invoice(&self) -> Option<&Invoice> {
        self.booking.final_invoice()
    }

    fn recompute(&mut self) {
        self.totals = compute_totals(&self.items, self.service.store().pricing());
    }

    fn item_mut(&mut self, index: usize) -> StoreResult<&mut QuoteItem> {
        let len = self.items.len();
        self.items
            .get_mut(index)
            .ok_or_else(|| StoreError::Validation(format!("no quote line at index {index} (have {len})")))
    }

    /// Append a free-form line.
    pub fn add_custom_item(
        &mut self,
        description: impl Into<String>,
        quantity: u32,
        unit_price: u64,
    ) -> usize {
        self.items
            .push(QuoteItem::custom(description, quantity, unit_price));
        self.recompute();
        self.items.len() - 1
    }

    /// Append one unit of a catalog product.
    pub fn add_product_item(&mut self, product_id: ProductId) -> StoreResult<usize> {
        let item = self
            .service
            .catalog()
            .get(product_id)
            .map(|p| p.to_quote_item())
            .ok_or(StoreError::NotFound)?;
        self.items.push(item);
        self.recompute();
        Ok(self.items.len() - 1)
    }

    pub fn update_item(&mut self, index: usize, update: ItemUpdate) -> StoreResult<()> {
        let item = self.item_mut(index)?;
        if let Some(description) = update.description {
            item.description = description;
        }
        if let Some(quantity) = update.quantity {
            item.quantity = quantity;
        }
        if let Some(unit_price) = update.unit_price {
            item.unit_price = unit_price;
        }
        self.recompute();
        Ok(())
    }

    pub fn remove_item(&mut self, index: usize) -> StoreResult<QuoteItem> {
        if index >= self.items.len() {
            return Err(StoreError::Validation(format!(
                "no quote line at index {index} (have {})",
                self.items.len()
            )));
        }
        let removed = self.items.remove(index);
        self.recompute();
        Ok(removed)
    }

    /// Every line needs a description and a quantity of at least one.
    fn validate_lines(&self) -> StoreResult<()> {
        for (index, item) in self.items.iter().enumerate() {
            if item.description.trim().is_empty() {
                return Err(StoreError::Validation(format!(
                    "quote line {index} has no description"
                )));
            }
            if item.quantity == 0 {
                return Err(StoreError::Validation(format!(
                    "quote line {index} has a zero quantity"
                )));
            }
        }
        Ok(())
    }

    /// Persist the edited lines as the booking's quote.
    pub async fn save(&mut self) -> StoreResult<&Booking> {
        self.validate_lines()?;
        let booking = self
            .service
            .update_quote(self.booking.id_typed(), self.items.clone())
            .await?;
        debug!(booking_id = %booking.id_typed(), lines = self.items.len(), "quote saved");
        self.booking = booking;
        Ok(&self.booking)
    }

    /// Save, then send the quote to the client for signature.
    pub async fn send_for_signature(&mut self) -> StoreResult<&Booking> {
        if self.items.is_empty() {
            return Err(StoreError::InvalidState(
                "a quote needs at least one line before it is sent".to_string(),
            ));
        }
        self.save().await?;
        self.booking = self
            .service
            .send_quote_for_signature(self.booking.id_typed())
            .await?;
        Ok(&self.booking)
    }

    pub async fn generate_final_invoice(&mut self) -> StoreResult<Invoice> {
        let booking_id = self.booking.id_typed();
        let invoice = self.service.create_final_invoice(booking_id).await?;
        self.booking = self.service.booking_by_id(booking_id).await?.booking;
        Ok(invoice)
    }

    /// Send the booking's final invoice.
    pub async fn send_final_invoice(&mut self) -> StoreResult<&Booking> {
        let invoice_id = self
            .booking
            .invoices()
            .iter()
            .find(|inv| inv.kind() == InvoiceKind::Final)
            .map(Invoice::id_typed)
            .ok_or(StoreError::NotFound)?;
        self.booking = self
            .service
            .send_final_invoice(invoice_id, self.booking.id_typed())
            .await?;
        Ok(&self.booking)
    }

    pub async fn complete_booking(&mut self) -> StoreResult<&Booking> {
        self.booking = self
            .service
            .complete_booking(self.booking.id_typed())
            .await?;
        Ok(&self.booking)
    }

    /// Reload the booking; unsaved line edits are kept.
    pub async fn refresh(&mut self) -> StoreResult<&Booking> {
        self.booking = self
            .service
            .booking_by_id(self.booking.id_typed())
            .await?
            .booking;
        Ok(&self.booking)
    }
}
