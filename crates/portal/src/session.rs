use tracing::info;

use eventrent_bookings::{Booking, BookingId, BookingStatus, Invoice, QuoteStatus};
use eventrent_clients::Client;
use eventrent_events::{EventBus, InMemoryEventBus};
use eventrent_infra::{BookingWithClient, ChangeEnvelope, CrmService, StoreError, StoreResult};

/// Shortest signer name the portal accepts, after trimming.
pub const MIN_SIGNER_NAME_CHARS: usize = 3;

/// What the client is expected to do next on the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalStep {
    SignQuote,
    /// Deposit amount in cents.
    PayDeposit(u64),
    /// Confirmed; the final invoice has not been sent yet.
    AwaitFinalInvoice,
    /// Outstanding balance in cents.
    PayFinalBalance(u64),
    Done,
    Canceled,
}

/// Entry point for token-authenticated access.
pub struct ClientPortal<B = InMemoryEventBus<ChangeEnvelope>> {
    service: CrmService<B>,
}

impl<B> ClientPortal<B>
where
    B: EventBus<ChangeEnvelope>,
{
    pub fn new(service: CrmService<B>) -> Self {
        Self { service }
    }

    /// Start a session when `token` matches the booking's portal token.
    ///
    /// An unknown booking, a booking without a token and a wrong token all
    /// fail with the same `NotFound`.
    pub async fn open(
        &self,
        booking_id: BookingId,
        token: impl Into<String>,
    ) -> StoreResult<PortalSession<B>> {
        let token = token.into();
        let view = self.service.booking_for_client(booking_id, &token).await?;
        Ok(PortalSession {
            service: self.service.clone(),
            token,
            view,
        })
    }
}

/// One client's view of one booking.
pub struct PortalSession<B = InMemoryEventBus<ChangeEnvelope>> {
    service: CrmService<B>,
    token: String,
    view: BookingWithClient,
}

impl<B> PortalSession<B>
where
    B: EventBus<ChangeEnvelope>,
{
    pub fn booking(&self) -> &Booking {
        &self.view.booking
    }

    pub fn client(&self) -> &Client {
        &self.view.client
    }

    fn booking_id(&self) -> BookingId {
        self.view.booking.id_typed()
    }

    /// Prefill for the signature form.
    pub fn suggested_signer_name(&self) -> String {
        self.view.client.full_name()
    }

    pub fn final_invoice(&self) -> Option<&Invoice> {
        self.view.booking.final_invoice()
    }

    pub fn next_step(&self) -> PortalStep {
        let booking = &self.view.booking;
        match booking.status() {
            BookingStatus::Quoted => match booking.quote().map(|q| (q.status(), q.deposit_amount())) {
                Some((QuoteStatus::Signed, deposit)) => PortalStep::PayDeposit(deposit),
                _ => PortalStep::SignQuote,
            },
            BookingStatus::Confirmed => PortalStep::AwaitFinalInvoice,
            BookingStatus::AwaitingFinalPayment => PortalStep::PayFinalBalance(
                booking.final_invoice().map(Invoice::amount).unwrap_or_default(),
            ),
            BookingStatus::FullyPaid | BookingStatus::Completed => PortalStep::Done,
            BookingStatus::Canceled => PortalStep::Canceled,
        }
    }

    pub async fn sign(&mut self, signer_name: &str) -> StoreResult<&Booking> {
        let signer_name = signer_name.trim();
        if signer_name.chars().count() < MIN_SIGNER_NAME_CHARS {
            return Err(StoreError::Validation(format!(
                "signer name must have at least {MIN_SIGNER_NAME_CHARS} characters"
            )));
        }
        let booking = self
            .service
            .sign_quote_for_client(self.booking_id(), &self.token, signer_name)
            .await?;
        info!(booking_id = %booking.id_typed(), "quote signed from portal");
        self.view.booking = booking;
        Ok(&self.view.booking)
    }

    pub async fn pay_deposit(&mut self) -> StoreResult<&Booking> {
        let booking = self
            .service
            .process_deposit_payment_for_client(self.booking_id(), &self.token)
            .await?;
        self.view.booking = booking;
        Ok(&self.view.booking)
    }

    pub async fn pay_final_balance(&mut self) -> StoreResult<&Booking> {
        let booking = self
            .service
            .process_final_payment_for_client(self.booking_id(), &self.token)
            .await?;
        self.view.booking = booking;
        Ok(&self.view.booking)
    }

    /// Re-read the booking, e.g. after staff sent the final invoice.
    pub async fn refresh(&mut self) -> StoreResult<&Booking> {
        self.view = self
            .service
            .booking_for_client(self.booking_id(), &self.token)
            .await?;
        Ok(&self.view.booking)
    }
}
