//! Async call surface over the lifecycle store.
//!
//! Every call waits for its simulated latency, then runs the synchronous
//! store operation and hands back an owned copy of the result.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use eventrent_bookings::{Booking, BookingId, Invoice, InvoiceId, Opportunity};
use eventrent_clients::{Client, ClientId, ClientPatch, NewClient};
use eventrent_events::{EventBus, InMemoryEventBus, Subscription};
use eventrent_pricing::QuoteItem;

use crate::catalog::{Product, ProductCatalog};
use crate::config::{LatencyProfile, ServiceConfig};
use crate::error::StoreResult;
use crate::store::{
    BookingWithClient, ChangeEnvelope, ClientDetails, DashboardSummary, LifecycleStore,
};

pub struct CrmService<B = InMemoryEventBus<ChangeEnvelope>> {
    store: Arc<LifecycleStore<B>>,
    catalog: Arc<ProductCatalog>,
    latency: LatencyProfile,
}

impl<B> Clone for CrmService<B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            catalog: Arc::clone(&self.catalog),
            latency: self.latency,
        }
    }
}

impl<B> core::fmt::Debug for CrmService<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CrmService")
            .field("products", &self.catalog.products().len())
            .field("latency", &self.latency)
            .finish_non_exhaustive()
    }
}

impl CrmService {
    /// Empty store, standard catalog.
    pub fn new(config: &ServiceConfig) -> Self {
        Self::from_parts(
            Arc::new(LifecycleStore::new(config)),
            ProductCatalog::standard(),
            config.latency,
        )
    }
}

impl<B> CrmService<B>
where
    B: EventBus<ChangeEnvelope>,
{
    pub fn from_parts(
        store: Arc<LifecycleStore<B>>,
        catalog: ProductCatalog,
        latency: LatencyProfile,
    ) -> Self {
        Self {
            store,
            catalog: Arc::new(catalog),
            latency,
        }
    }

    pub fn store(&self) -> &Arc<LifecycleStore<B>> {
        &self.store
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    pub fn products(&self) -> &[Product] {
        self.catalog.products()
    }

    pub fn subscribe(&self) -> Subscription<ChangeEnvelope> {
        self.store.subscribe()
    }

    async fn call<T>(
        &self,
        operation: &'static str,
        delay: Duration,
        f: impl FnOnce(&LifecycleStore<B>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        if !delay.is_zero() {
            debug!(operation, delay_ms = delay.as_millis() as u64, "simulating latency");
            tokio::time::sleep(delay).await;
        }

        let result = f(&self.store);
        if let Err(err) = &result {
            warn!(operation, kind = err.kind(), error = %err, "operation rejected");
        }
        result
    }

    // ---- dashboard & clients ----

    pub async fn dashboard_summary(&self, as_of: DateTime<Utc>) -> StoreResult<DashboardSummary> {
        self.call("dashboard_summary", self.latency.dashboard, |s| {
            s.dashboard(as_of)
        })
        .await
    }

    pub async fn clients(&self) -> StoreResult<Vec<Client>> {
        self.call("clients", self.latency.list_clients, |s| s.clients())
            .await
    }

    /// Duplicate check used before registering a client.
    pub async fn find_client_by_email(&self, email: &str) -> StoreResult<Option<Client>> {
        self.call("find_client_by_email", self.latency.find_client, |s| {
            s.find_client_by_email(email)
        })
        .await
    }

    pub async fn add_client(&self, details: NewClient) -> StoreResult<Client> {
        self.call("add_client", self.latency.add_client, |s| s.add_client(details))
            .await
    }

    pub async fn update_client(&self, client_id: ClientId, patch: ClientPatch) -> StoreResult<Client> {
        self.call("update_client", self.latency.update_client, |s| {
            s.update_client(client_id, patch)
        })
        .await
    }

    pub async fn client_details(&self, client_id: ClientId) -> StoreResult<ClientDetails> {
        self.call("client_details", self.latency.client_details, |s| {
            s.client_details(client_id)
        })
        .await
    }

    // ---- bookings ----

    pub async fn bookings(&self) -> StoreResult<Vec<Booking>> {
        self.call("bookings", self.latency.list_bookings, |s| s.bookings())
            .await
    }

    pub async fn booking_by_id(&self, booking_id: BookingId) -> StoreResult<BookingWithClient> {
        self.call("booking_by_id", self.latency.get_booking, |s| {
            s.booking_with_client(booking_id)
        })
        .await
    }

    pub async fn create_booking_from_opportunity(
        &self,
        opportunity: Opportunity,
    ) -> StoreResult<BookingId> {
        self.call("create_booking_from_opportunity", self.latency.create_booking, |s| {
            s.create_booking(opportunity)
        })
        .await
    }

    pub async fn update_quote(
        &self,
        booking_id: BookingId,
        items: Vec<QuoteItem>,
    ) -> StoreResult<Booking> {
        self.call("update_quote", self.latency.update_quote, |s| {
            s.update_quote(booking_id, items)
        })
        .await
    }

    pub async fn send_quote_for_signature(&self, booking_id: BookingId) -> StoreResult<Booking> {
        self.call("send_quote_for_signature", self.latency.send_quote, |s| {
            s.send_quote_for_signature(booking_id)
        })
        .await
    }

    pub async fn create_final_invoice(&self, booking_id: BookingId) -> StoreResult<Invoice> {
        self.call("create_final_invoice", self.latency.create_final_invoice, |s| {
            s.create_final_invoice(booking_id)
        })
        .await
    }

    pub async fn send_final_invoice(
        &self,
        invoice_id: InvoiceId,
        booking_id: BookingId,
    ) -> StoreResult<Booking> {
        self.call("send_final_invoice", self.latency.send_final_invoice, |s| {
            s.send_final_invoice(invoice_id, booking_id)
        })
        .await
    }

    pub async fn complete_booking(&self, booking_id: BookingId) -> StoreResult<Booking> {
        self.call("complete_booking", self.latency.complete_booking, |s| {
            s.complete_booking(booking_id)
        })
        .await
    }

    pub async fn cancel_booking(
        &self,
        booking_id: BookingId,
        reason: Option<String>,
    ) -> StoreResult<Booking> {
        self.call("cancel_booking", self.latency.cancel_booking, |s| {
            s.cancel_booking(booking_id, reason)
        })
        .await
    }

    pub async fn flag_overdue_invoices(&self, as_of: DateTime<Utc>) -> StoreResult<Vec<InvoiceId>> {
        self.call("flag_overdue_invoices", self.latency.flag_overdue, |s| {
            s.flag_overdue_invoices(as_of)
        })
        .await
    }

    // ---- client portal ----

    pub async fn booking_for_client(
        &self,
        booking_id: BookingId,
        token: &str,
    ) -> StoreResult<BookingWithClient> {
        self.call("booking_for_client", self.latency.portal_read, |s| {
            s.booking_for_client(booking_id, token)
        })
        .await
    }

    pub async fn sign_quote_for_client(
        &self,
        booking_id: BookingId,
        token: &str,
        signer_name: &str,
    ) -> StoreResult<Booking> {
        self.call("sign_quote_for_client", self.latency.sign_quote, |s| {
            s.sign_quote(booking_id, token, signer_name)
        })
        .await
    }

    pub async fn process_deposit_payment_for_client(
        &self,
        booking_id: BookingId,
        token: &str,
    ) -> StoreResult<Booking> {
        self.call(
            "process_deposit_payment_for_client",
            self.latency.deposit_payment,
            |s| s.pay_deposit(booking_id, token),
        )
        .await
    }

    pub async fn process_final_payment_for_client(
        &self,
        booking_id: BookingId,
        token: &str,
    ) -> StoreResult<Booking> {
        self.call(
            "process_final_payment_for_client",
            self.latency.final_payment,
            |s| s.pay_final_balance(booking_id, token),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    use eventrent_bookings::{BookingStatus, ClientRef, EventDetails, EventKind};

    use crate::error::StoreError;

    fn service() -> CrmService {
        CrmService::new(&ServiceConfig::for_tests())
    }

    fn opportunity() -> Opportunity {
        Opportunity {
            client: ClientRef::New(NewClient {
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                company: Some("Doe & Co".to_string()),
                email: "jane@example.com".to_string(),
                phone: "0600000000".to_string(),
            }),
            event: EventDetails {
                name: "Mariage Doe".to_string(),
                date: Utc::now() + ChronoDuration::days(45),
                kind: EventKind::Wedding,
                location: "Lyon".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn deposit_flow_through_the_facade() {
        let service = service();
        let booking_id = service
            .create_booking_from_opportunity(opportunity())
            .await
            .unwrap();

        service
            .update_quote(booking_id, vec![QuoteItem::custom("Photobooth", 2, 100_00)])
            .await
            .unwrap();
        let sent = service.send_quote_for_signature(booking_id).await.unwrap();
        let token = sent.portal_token().unwrap().as_str().to_string();

        service
            .sign_quote_for_client(booking_id, &token, "Jane Doe")
            .await
            .unwrap();
        let booking = service
            .process_deposit_payment_for_client(booking_id, &token)
            .await
            .unwrap();

        assert_eq!(booking.status(), BookingStatus::Confirmed);
        assert_eq!(booking.invoices().len(), 1);
    }

    #[tokio::test]
    async fn results_are_owned_snapshots() {
        let service = service();
        let booking_id = service
            .create_booking_from_opportunity(opportunity())
            .await
            .unwrap();

        let before = service.booking_by_id(booking_id).await.unwrap();
        service
            .update_quote(booking_id, vec![QuoteItem::custom("Livre d'or", 1, 75_00)])
            .await
            .unwrap();

        assert_eq!(before.booking.amount(), 0);
        let after = service.booking_by_id(booking_id).await.unwrap();
        assert_eq!(after.booking.amount(), 90_00);
    }

    #[tokio::test]
    async fn portal_read_with_wrong_token_is_not_found() {
        let service = service();
        let booking_id = service
            .create_booking_from_opportunity(opportunity())
            .await
            .unwrap();

        let err = service
            .booking_for_client(booking_id, "tok_nope")
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound);
    }

    #[tokio::test]
    async fn clones_share_one_store() {
        let service = service();
        let other = service.clone();

        let client = service
            .add_client(NewClient {
                first_name: "Bob".to_string(),
                last_name: "Dupont".to_string(),
                company: None,
                email: "bob@example.com".to_string(),
                phone: "0687654321".to_string(),
            })
            .await
            .unwrap();

        let found = other.find_client_by_email("BOB@example.com").await.unwrap();
        assert_eq!(found.map(|c| c.id_typed()), Some(client.id_typed()));
    }

    #[tokio::test]
    async fn simulated_latency_is_applied() {
        let mut latency = LatencyProfile::none();
        latency.list_bookings = Duration::from_millis(20);
        let service = CrmService::from_parts(
            Arc::new(LifecycleStore::new(&ServiceConfig::for_tests())),
            ProductCatalog::standard(),
            latency,
        );

        let started = std::time::Instant::now();
        service.bookings().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
