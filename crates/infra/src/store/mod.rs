//! Booking lifecycle store.
//!
//! Owns every client and booking aggregate behind a single lock. Each write
//! operation follows the same pipeline:
//!
//! ```text
//! write lock -> clone aggregate -> handle + apply -> swap clone in
//!            -> unlock -> publish one envelope per event
//! ```
//!
//! A rejected command returns before the swap, so state (versions included)
//! is exactly what it was. Operations touching several aggregates run on a
//! staged copy of the whole state that replaces the live one only once every
//! command has succeeded.

pub mod queries;

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use eventrent_bookings::{
    Booking, BookingCommand, BookingEvent, BookingId, CancelBooking, ClientRef, CompleteBooking,
    FlagOverdueInvoices, Invoice, InvoiceId, IssueFinalInvoice, OpenBooking, Opportunity,
    PayDeposit, PayFinalBalance, Quote, QuoteId, RenameClient, SaveQuote, SendFinalInvoice,
    SendQuote, SignQuote,
};
use eventrent_clients::{
    Client, ClientCommand, ClientEvent, ClientId, ClientPatch, NewClient, RegisterClient,
    UpdateClientDetails,
};
use eventrent_core::{AggregateId, AggregateRoot};
use eventrent_events::{Event, EventBus, EventEnvelope, InMemoryEventBus, Subscription, execute};
use eventrent_pricing::{PricingPolicy, QuoteItem};

use crate::config::ServiceConfig;
use crate::error::{StoreError, StoreResult};
use crate::token::generate_portal_token;

pub use queries::{BookingSummary, BookingWithClient, ClientDetails, DashboardSummary};

pub const CLIENT_AGGREGATE_TYPE: &str = "clients.client";
pub const BOOKING_AGGREGATE_TYPE: &str = "bookings.booking";

/// Envelope type carried on the change-notification bus.
pub type ChangeEnvelope = EventEnvelope<JsonValue>;

#[derive(Debug, Clone, Default)]
pub(crate) struct StoreState {
    pub(crate) clients: HashMap<ClientId, Client>,
    pub(crate) bookings: HashMap<BookingId, Booking>,
}

impl StoreState {
    fn client_run(
        &mut self,
        client_id: ClientId,
        command: ClientCommand,
    ) -> StoreResult<(Client, Vec<ClientEvent>)> {
        let mut next = match &command {
            ClientCommand::RegisterClient(_) => self
                .clients
                .get(&client_id)
                .cloned()
                .unwrap_or_else(|| Client::empty(client_id)),
            ClientCommand::UpdateClientDetails(_) => self
                .clients
                .get(&client_id)
                .cloned()
                .ok_or(StoreError::NotFound)?,
        };
        let events = execute(&mut next, &command)?;
        if !events.is_empty() {
            self.clients.insert(client_id, next.clone());
        }
        Ok((next, events))
    }

    fn booking_run(
        &mut self,
        booking_id: BookingId,
        command: BookingCommand,
    ) -> StoreResult<(Booking, Vec<BookingEvent>)> {
        let mut next = match &command {
            BookingCommand::OpenBooking(_) => self
                .bookings
                .get(&booking_id)
                .cloned()
                .unwrap_or_else(|| Booking::empty(booking_id)),
            _ => self
                .bookings
                .get(&booking_id)
                .cloned()
                .ok_or(StoreError::NotFound)?,
        };
        let events = execute(&mut next, &command)?;
        if !events.is_empty() {
            self.bookings.insert(booking_id, next.clone());
        }
        Ok((next, events))
    }
}

/// Envelopes collected under the lock, published after it is released.
#[derive(Debug, Default)]
struct Outbox {
    envelopes: Vec<ChangeEnvelope>,
}

impl Outbox {
    fn record<A, E>(
        &mut self,
        aggregate: &A,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        events: &[E],
    ) where
        A: AggregateRoot,
        E: Event + Serialize,
    {
        let first = aggregate.version().saturating_sub(events.len() as u64) + 1;

        for (offset, ev) in events.iter().enumerate() {
            let sequence_number = first + offset as u64;
            info!(
                aggregate_type,
                aggregate_id = %aggregate_id,
                event_type = ev.event_type(),
                sequence_number,
                "transition committed"
            );

            match serde_json::to_value(ev) {
                Ok(payload) => self.envelopes.push(EventEnvelope::new(
                    aggregate_id,
                    aggregate_type,
                    sequence_number,
                    ev.event_type(),
                    ev.occurred_at(),
                    payload,
                )),
                Err(err) => warn!(
                    event_type = ev.event_type(),
                    error = %err,
                    "could not encode change notification"
                ),
            }
        }
    }

    fn client(&mut self, client: &Client, events: &[ClientEvent]) {
        self.record(client, client.id_typed().0, CLIENT_AGGREGATE_TYPE, events);
    }

    fn booking(&mut self, booking: &Booking, events: &[BookingEvent]) {
        self.record(booking, booking.id_typed().0, BOOKING_AGGREGATE_TYPE, events);
    }
}

/// In-memory source of truth for clients and bookings.
#[derive(Debug)]
pub struct LifecycleStore<B = InMemoryEventBus<ChangeEnvelope>> {
    state: RwLock<StoreState>,
    bus: B,
    pricing: PricingPolicy,
    final_invoice_lead_days: u32,
}

impl LifecycleStore {
    pub fn new(config: &ServiceConfig) -> Self {
        Self::with_bus(InMemoryEventBus::new(), config)
    }
}

impl<B> LifecycleStore<B>
where
    B: EventBus<ChangeEnvelope>,
{
    pub fn with_bus(bus: B, config: &ServiceConfig) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            bus,
            pricing: config.pricing,
            final_invoice_lead_days: config.final_invoice_lead_days,
        }
    }

    pub fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    pub fn final_invoice_lead_days(&self) -> u32 {
        self.final_invoice_lead_days
    }

    /// Every change committed after this call, in commit order.
    pub fn subscribe(&self) -> Subscription<ChangeEnvelope> {
        self.bus.subscribe()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }

    fn publish(&self, outbox: Outbox) {
        for envelope in outbox.envelopes {
            if let Err(err) = self.bus.publish(envelope) {
                warn!(?err, "change notification dropped");
            }
        }
    }

    /// Run `f` on a staged copy of the state. The copy is committed and the
    /// outbox published only when `f` returns `Ok`.
    fn transact<T>(
        &self,
        f: impl FnOnce(&mut StoreState, &mut Outbox) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut outbox = Outbox::default();
        let value = {
            let mut state = self.write()?;
            let mut staged = state.clone();
            let value = f(&mut staged, &mut outbox)?;
            *state = staged;
            value
        };
        self.publish(outbox);
        Ok(value)
    }

    /// Run one booking command under the lock and publish its events.
    fn run_booking(&self, booking_id: BookingId, command: BookingCommand) -> StoreResult<Booking> {
        let mut outbox = Outbox::default();
        let booking = {
            let mut state = self.write()?;
            let (booking, events) = state.booking_run(booking_id, command)?;
            outbox.booking(&booking, &events);
            booking
        };
        self.publish(outbox);
        Ok(booking)
    }

    // ---- clients ----

    pub fn add_client(&self, details: NewClient) -> StoreResult<Client> {
        let now = Utc::now();
        self.transact(|state, outbox| register_client(state, outbox, details, now))
    }

    /// Apply `patch` and re-denormalise the name on every booking of the client.
    pub fn update_client(&self, client_id: ClientId, patch: ClientPatch) -> StoreResult<Client> {
        let now = Utc::now();
        self.transact(|state, outbox| {
            let (client, events) = state.client_run(
                client_id,
                ClientCommand::UpdateClientDetails(UpdateClientDetails {
                    client_id,
                    patch,
                    occurred_at: now,
                }),
            )?;
            outbox.client(&client, &events);

            let client_name = client.full_name();
            let owned: Vec<BookingId> = state
                .bookings
                .values()
                .filter(|b| b.client_id() == Some(client_id))
                .map(Booking::id_typed)
                .collect();
            for booking_id in owned {
                let (booking, events) = state.booking_run(
                    booking_id,
                    BookingCommand::RenameClient(RenameClient {
                        booking_id,
                        client_name: client_name.clone(),
                        occurred_at: now,
                    }),
                )?;
                outbox.booking(&booking, &events);
            }
            Ok(client)
        })
    }

    pub fn client(&self, client_id: ClientId) -> StoreResult<Client> {
        self.read()?
            .clients
            .get(&client_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    /// Clients in registration order.
    pub fn clients(&self) -> StoreResult<Vec<Client>> {
        Ok(queries::clients_in_registration_order(&*self.read()?))
    }

    /// Case-insensitive lookup.
    pub fn find_client_by_email(&self, email: &str) -> StoreResult<Option<Client>> {
        Ok(self
            .read()?
            .clients
            .values()
            .find(|c| c.has_email(email))
            .cloned())
    }

    pub fn client_details(&self, client_id: ClientId) -> StoreResult<ClientDetails> {
        queries::client_details(&*self.read()?, client_id).ok_or(StoreError::NotFound)
    }

    // ---- bookings: reads ----

    pub fn booking(&self, booking_id: BookingId) -> StoreResult<Booking> {
        self.read()?
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub fn booking_with_client(&self, booking_id: BookingId) -> StoreResult<BookingWithClient> {
        let state = self.read()?;
        let booking = state.bookings.get(&booking_id).ok_or(StoreError::NotFound)?;
        join_client(&state, booking)
    }

    /// Portal read: only a matching token reveals the booking.
    pub fn booking_for_client(
        &self,
        booking_id: BookingId,
        token: &str,
    ) -> StoreResult<BookingWithClient> {
        let state = self.read()?;
        let booking = state
            .bookings
            .get(&booking_id)
            .filter(|b| b.grants_portal_access(token))
            .ok_or(StoreError::NotFound)?;
        join_client(&state, booking)
    }

    /// All bookings, newest event first.
    pub fn bookings(&self) -> StoreResult<Vec<Booking>> {
        Ok(queries::bookings_by_event_date_desc(&*self.read()?))
    }

    pub fn dashboard(&self, as_of: DateTime<Utc>) -> StoreResult<DashboardSummary> {
        Ok(queries::dashboard(&*self.read()?, as_of))
    }

    // ---- bookings: lifecycle ----

    /// Resolve or register the client, then open a Quoted booking.
    pub fn create_booking(&self, opportunity: Opportunity) -> StoreResult<BookingId> {
        let now = Utc::now();
        let booking_id = BookingId::new(AggregateId::new());
        self.transact(|state, outbox| {
            let client = match opportunity.client {
                ClientRef::Existing(client_id) => state
                    .clients
                    .get(&client_id)
                    .cloned()
                    .ok_or(StoreError::NotFound)?,
                ClientRef::New(details) => register_client(state, outbox, details, now)?,
            };

            let (booking, events) = state.booking_run(
                booking_id,
                BookingCommand::OpenBooking(OpenBooking {
                    booking_id,
                    client_id: client.id_typed(),
                    client_name: client.full_name(),
                    event: opportunity.event,
                    occurred_at: now,
                }),
            )?;
            outbox.booking(&booking, &events);
            Ok(booking_id)
        })
    }

    /// Replace the quote items; totals are recomputed with the store's pricing.
    pub fn update_quote(&self, booking_id: BookingId, items: Vec<QuoteItem>) -> StoreResult<Booking> {
        let quote_id = self
            .booking(booking_id)?
            .quote()
            .map(Quote::id)
            .unwrap_or_else(|| QuoteId::new(AggregateId::new()));

        self.run_booking(
            booking_id,
            BookingCommand::SaveQuote(SaveQuote {
                booking_id,
                quote: Quote::draft(quote_id, items, &self.pricing),
                occurred_at: Utc::now(),
            }),
        )
    }

    /// Send (or re-send) the quote with a freshly generated portal token.
    pub fn send_quote_for_signature(&self, booking_id: BookingId) -> StoreResult<Booking> {
        let booking = self.run_booking(
            booking_id,
            BookingCommand::SendQuote(SendQuote {
                booking_id,
                portal_token: generate_portal_token(),
                occurred_at: Utc::now(),
            }),
        )?;
        debug!(booking_id = %booking_id, "portal link issued");
        Ok(booking)
    }

    /// The signature records `signer_name` with the client's email on file.
    pub fn sign_quote(
        &self,
        booking_id: BookingId,
        token: &str,
        signer_name: &str,
    ) -> StoreResult<Booking> {
        let mut outbox = Outbox::default();
        let booking = {
            let mut state = self.write()?;
            let signer_email = state
                .bookings
                .get(&booking_id)
                .and_then(Booking::client_id)
                .and_then(|id| state.clients.get(&id))
                .map(|c| c.email().to_string())
                .unwrap_or_default();

            let (booking, events) = state.booking_run(
                booking_id,
                BookingCommand::SignQuote(SignQuote {
                    booking_id,
                    presented_token: token.to_string(),
                    signer_name: signer_name.to_string(),
                    signer_email,
                    occurred_at: Utc::now(),
                }),
            )?;
            outbox.booking(&booking, &events);
            booking
        };
        self.publish(outbox);
        Ok(booking)
    }

    pub fn pay_deposit(&self, booking_id: BookingId, token: &str) -> StoreResult<Booking> {
        self.run_booking(
            booking_id,
            BookingCommand::PayDeposit(PayDeposit {
                booking_id,
                presented_token: token.to_string(),
                invoice_id: InvoiceId::new(AggregateId::new()),
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn create_final_invoice(&self, booking_id: BookingId) -> StoreResult<Invoice> {
        let invoice_id = InvoiceId::new(AggregateId::new());
        let booking = self.run_booking(
            booking_id,
            BookingCommand::IssueFinalInvoice(IssueFinalInvoice {
                booking_id,
                invoice_id,
                lead_days: self.final_invoice_lead_days,
                occurred_at: Utc::now(),
            }),
        )?;
        booking.invoice(invoice_id).cloned().ok_or(StoreError::NotFound)
    }

    pub fn send_final_invoice(
        &self,
        invoice_id: InvoiceId,
        booking_id: BookingId,
    ) -> StoreResult<Booking> {
        self.run_booking(
            booking_id,
            BookingCommand::SendFinalInvoice(SendFinalInvoice {
                booking_id,
                invoice_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn pay_final_balance(&self, booking_id: BookingId, token: &str) -> StoreResult<Booking> {
        self.run_booking(
            booking_id,
            BookingCommand::PayFinalBalance(PayFinalBalance {
                booking_id,
                presented_token: token.to_string(),
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn complete_booking(&self, booking_id: BookingId) -> StoreResult<Booking> {
        self.run_booking(
            booking_id,
            BookingCommand::CompleteBooking(CompleteBooking {
                booking_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    /// Cancel a booking that is not yet fully paid; revokes the portal link.
    pub fn cancel_booking(
        &self,
        booking_id: BookingId,
        reason: Option<String>,
    ) -> StoreResult<Booking> {
        self.run_booking(
            booking_id,
            BookingCommand::CancelBooking(CancelBooking {
                booking_id,
                reason,
                occurred_at: Utc::now(),
            }),
        )
    }

    /// Mark every sent invoice past its due date as overdue.
    pub fn flag_overdue_invoices(&self, as_of: DateTime<Utc>) -> StoreResult<Vec<InvoiceId>> {
        self.transact(|state, outbox| {
            let mut flagged = Vec::new();
            let ids: Vec<BookingId> = state.bookings.keys().copied().collect();
            for booking_id in ids {
                let (booking, events) = state.booking_run(
                    booking_id,
                    BookingCommand::FlagOverdueInvoices(FlagOverdueInvoices { booking_id, as_of }),
                )?;
                for ev in &events {
                    if let BookingEvent::InvoicesOverdue(e) = ev {
                        flagged.extend(e.invoice_ids.iter().copied());
                    }
                }
                outbox.booking(&booking, &events);
            }
            Ok(flagged)
        })
    }
}

fn register_client(
    state: &mut StoreState,
    outbox: &mut Outbox,
    details: NewClient,
    at: DateTime<Utc>,
) -> StoreResult<Client> {
    let client_id = ClientId::new(AggregateId::new());
    let (client, events) = state.client_run(
        client_id,
        ClientCommand::RegisterClient(RegisterClient {
            client_id,
            details,
            occurred_at: at,
        }),
    )?;
    outbox.client(&client, &events);
    Ok(client)
}

fn join_client(state: &StoreState, booking: &Booking) -> StoreResult<BookingWithClient> {
    let client = booking
        .client_id()
        .and_then(|id| state.clients.get(&id))
        .cloned()
        .ok_or(StoreError::NotFound)?;
    Ok(BookingWithClient {
        booking: booking.clone(),
        client,
    })
}
