//! Read-side shapes assembled from the store state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use eventrent_bookings::{Booking, BookingId, BookingStatus, Invoice};
use eventrent_clients::{Client, ClientId};

use super::StoreState;

/// How many upcoming events the dashboard lists.
pub const UPCOMING_EVENTS_LIMIT: usize = 5;

/// A booking joined with its client record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingWithClient {
    pub booking: Booking,
    pub client: Client,
}

/// One line of a client's booking history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingSummary {
    pub id: BookingId,
    pub event_name: String,
    pub event_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub total_amount: u64,
}

impl From<&Booking> for BookingSummary {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id_typed(),
            event_name: booking.event_name().to_string(),
            event_date: booking.event_date(),
            status: booking.status(),
            total_amount: booking.amount(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientDetails {
    pub client: Client,
    /// Newest event first.
    pub bookings: Vec<BookingSummary>,
    pub invoices: Vec<Invoice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    /// Next events after the reference time, earliest first.
    pub upcoming_events: Vec<Booking>,
    /// One entry per status, in lifecycle order.
    pub status_counts: Vec<(BookingStatus, usize)>,
    /// Sum of every paid invoice, in cents.
    pub collected_revenue: u64,
    pub total_bookings: usize,
}

impl DashboardSummary {
    pub fn count(&self, status: BookingStatus) -> usize {
        self.status_counts
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

pub(super) fn bookings_by_event_date_desc(state: &StoreState) -> Vec<Booking> {
    let mut bookings: Vec<Booking> = state.bookings.values().cloned().collect();
    bookings.sort_by(|a, b| {
        b.event_date()
            .cmp(&a.event_date())
            .then_with(|| a.id_typed().0.cmp(&b.id_typed().0))
    });
    bookings
}

pub(super) fn clients_in_registration_order(state: &StoreState) -> Vec<Client> {
    let mut clients: Vec<Client> = state.clients.values().cloned().collect();
    clients.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id_typed().0.cmp(&b.id_typed().0))
    });
    clients
}

pub(super) fn client_details(state: &StoreState, client_id: ClientId) -> Option<ClientDetails> {
    let client = state.clients.get(&client_id)?.clone();

    let history: Vec<Booking> = bookings_by_event_date_desc(state)
        .into_iter()
        .filter(|b| b.client_id() == Some(client_id))
        .collect();

    let invoices = history
        .iter()
        .flat_map(|b| b.invoices().iter().cloned())
        .collect();

    Some(ClientDetails {
        client,
        bookings: history.iter().map(BookingSummary::from).collect(),
        invoices,
    })
}

pub(super) fn dashboard(state: &StoreState, as_of: DateTime<Utc>) -> DashboardSummary {
    let mut upcoming: Vec<Booking> = state
        .bookings
        .values()
        .filter(|b| b.is_upcoming(as_of))
        .cloned()
        .collect();
    upcoming.sort_by(|a, b| {
        a.event_date()
            .cmp(&b.event_date())
            .then_with(|| a.id_typed().0.cmp(&b.id_typed().0))
    });
    upcoming.truncate(UPCOMING_EVENTS_LIMIT);

    let status_counts = BookingStatus::ALL
        .iter()
        .map(|status| {
            let n = state
                .bookings
                .values()
                .filter(|b| b.status() == *status)
                .count();
            (*status, n)
        })
        .collect();

    let collected_revenue = state
        .bookings
        .values()
        .flat_map(|b| b.invoices())
        .filter(|inv| inv.is_paid())
        .fold(0u64, |acc, inv| acc.saturating_add(inv.amount()));

    DashboardSummary {
        upcoming_events: upcoming,
        status_counts,
        collected_revenue,
        total_bookings: state.bookings.len(),
    }
}
