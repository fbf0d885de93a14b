//! Demo data.
//!
//! Every seeded booking is driven to its status through the regular store
//! operations, so seeded state obeys the same invariants as live state.

use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::debug;

use eventrent_bookings::{BookingId, BookingStatus, ClientRef, EventDetails, EventKind, Opportunity};
use eventrent_clients::{ClientId, NewClient};
use eventrent_events::EventBus;
use eventrent_pricing::QuoteItem;

use crate::catalog::{Product, ProductCatalog};
use crate::error::{StoreError, StoreResult};
use crate::store::{ChangeEnvelope, LifecycleStore};

/// Ids of what `seed_demo_data` created, in seeding order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedData {
    pub clients: Vec<ClientId>,
    pub bookings: Vec<BookingId>,
}

struct SeedBooking {
    client: usize,
    name: &'static str,
    kind: EventKind,
    location: &'static str,
    date: DateTime<Utc>,
    /// `(sku, quantity)` lines; `None` means no quote at all.
    lines: Option<&'static [(&'static str, u32)]>,
    target: BookingStatus,
}

fn seed_clients() -> Vec<NewClient> {
    let client = |first: &str, last: &str, company: Option<&str>, phone: &str| NewClient {
        first_name: first.to_string(),
        last_name: last.to_string(),
        company: company.map(str::to_string),
        email: format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
        phone: phone.to_string(),
    };
    vec![
        client("Alice", "Martin", Some("Innovate Corp"), "0612345678"),
        client("Bob", "Dupont", Some("Solutions Pro"), "0687654321"),
        client("Carla", "Dubois", None, "0611223344"),
    ]
}

fn seed_bookings(now: DateTime<Utc>) -> Vec<SeedBooking> {
    let christmas_2023 = Utc
        .with_ymd_and_hms(2023, 12, 22, 19, 0, 0)
        .single()
        .unwrap_or(now - Duration::days(365));

    vec![
        SeedBooking {
            client: 0,
            name: "Mariage Martin & Durand",
            kind: EventKind::Wedding,
            location: "Château de Lacroix",
            date: now + Duration::days(3),
            lines: Some(&[("prod_01", 1), ("prod_02", 1), ("prod_03", 60), ("prod_04", 2)]),
            target: BookingStatus::Confirmed,
        },
        SeedBooking {
            client: 1,
            name: "Séminaire Solutions Pro",
            kind: EventKind::Corporate,
            location: "Centre des congrès",
            date: now + Duration::days(10),
            lines: Some(&[("prod_01", 2), ("prod_04", 1)]),
            target: BookingStatus::Confirmed,
        },
        SeedBooking {
            client: 2,
            name: "Anniversaire 30 ans",
            kind: EventKind::Birthday,
            location: "Salle des fêtes",
            date: now + Duration::days(15),
            lines: Some(&[]),
            target: BookingStatus::Quoted,
        },
        SeedBooking {
            client: 2,
            name: "Lancement Produit",
            kind: EventKind::Corporate,
            location: "Showroom",
            date: now - Duration::days(5),
            lines: Some(&[("prod_01", 1), ("prod_02", 1), ("prod_04", 3)]),
            target: BookingStatus::FullyPaid,
        },
        SeedBooking {
            client: 0,
            name: "Gala de charité",
            kind: EventKind::Other,
            location: "Opéra",
            date: now + Duration::days(40),
            lines: None,
            target: BookingStatus::Quoted,
        },
        SeedBooking {
            client: 0,
            name: "Fête de Noël Innovate Corp",
            kind: EventKind::Corporate,
            location: "Innovate Corp",
            date: christmas_2023,
            lines: Some(&[("prod_01", 1), ("prod_02", 2), ("prod_04", 2)]),
            target: BookingStatus::Completed,
        },
    ]
}

fn quote_lines(catalog: &ProductCatalog, lines: &[(&str, u32)]) -> StoreResult<Vec<QuoteItem>> {
    lines
        .iter()
        .map(|(sku, quantity)| {
            let product = catalog.find_by_sku(sku).ok_or(StoreError::NotFound)?;
            Ok(QuoteItem {
                quantity: *quantity,
                ..Product::to_quote_item(product)
            })
        })
        .collect()
}

/// Populate `store` with three clients and six bookings spread over the lifecycle.
pub fn seed_demo_data<B>(
    store: &LifecycleStore<B>,
    catalog: &ProductCatalog,
    now: DateTime<Utc>,
) -> StoreResult<SeedData>
where
    B: EventBus<ChangeEnvelope>,
{
    let mut seeded = SeedData::default();

    for details in seed_clients() {
        let client = store.add_client(details)?;
        debug!(client_id = %client.id_typed(), name = %client.full_name(), "seeded client");
        seeded.clients.push(client.id_typed());
    }

    for entry in seed_bookings(now) {
        let client_id = seeded
            .clients
            .get(entry.client)
            .copied()
            .ok_or(StoreError::NotFound)?;

        let booking_id = store.create_booking(Opportunity {
            client: ClientRef::Existing(client_id),
            event: EventDetails {
                name: entry.name.to_string(),
                date: entry.date,
                kind: entry.kind,
                location: entry.location.to_string(),
            },
        })?;

        if let Some(lines) = entry.lines {
            store.update_quote(booking_id, quote_lines(catalog, lines)?)?;
        }
        advance_to(store, booking_id, entry.target)?;

        debug!(booking_id = %booking_id, status = %entry.target, "seeded booking");
        seeded.bookings.push(booking_id);
    }

    Ok(seeded)
}

/// Drive a Quoted booking with a quote forward until it reaches `target`.
pub fn advance_to<B>(
    store: &LifecycleStore<B>,
    booking_id: BookingId,
    target: BookingStatus,
) -> StoreResult<()>
where
    B: EventBus<ChangeEnvelope>,
{
    if target == BookingStatus::Quoted {
        return Ok(());
    }
    if target == BookingStatus::Canceled {
        store.cancel_booking(booking_id, None)?;
        return Ok(());
    }

    let sent = store.send_quote_for_signature(booking_id)?;
    let token = sent
        .portal_token()
        .map(|t| t.as_str().to_string())
        .ok_or_else(|| StoreError::InvalidState("quote sent without portal token".to_string()))?;
    let signer = sent.client_name().to_string();

    store.sign_quote(booking_id, &token, &signer)?;
    store.pay_deposit(booking_id, &token)?;
    if target == BookingStatus::Confirmed {
        return Ok(());
    }

    let invoice = store.create_final_invoice(booking_id)?;
    store.send_final_invoice(invoice.id_typed(), booking_id)?;
    if target == BookingStatus::AwaitingFinalPayment {
        return Ok(());
    }

    store.pay_final_balance(booking_id, &token)?;
    if target == BookingStatus::FullyPaid {
        return Ok(());
    }

    store.complete_booking(booking_id)?;
    Ok(())
}
