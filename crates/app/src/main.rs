use anyhow::{Context, anyhow};
use chrono::{Duration, Utc};
use tracing::info;

use eventrent_bookings::{BookingStatus, ClientRef, EventDetails, EventKind, Opportunity};
use eventrent_clients::NewClient;
use eventrent_infra::{CrmService, ServiceConfig, seed_demo_data};
use eventrent_portal::ClientPortal;
use eventrent_workflow::QuoteBuilder;

fn euros(cents: u64) -> String {
    format!("{}.{:02} €", cents / 100, cents % 100)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env();
    eventrent_observability::init(&config.log);

    let service = CrmService::new(&config);
    let seeded = seed_demo_data(service.store(), service.catalog(), Utc::now())
        .context("seeding demo data")?;
    info!(
        clients = seeded.clients.len(),
        bookings = seeded.bookings.len(),
        "demo data loaded"
    );

    let booking_id = service
        .create_booking_from_opportunity(Opportunity {
            client: ClientRef::New(NewClient {
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                company: None,
                email: "jane.doe@example.com".to_string(),
                phone: "0600000000".to_string(),
            }),
            event: EventDetails {
                name: "Mariage Doe".to_string(),
                date: Utc::now() + Duration::days(45),
                kind: EventKind::Wedding,
                location: "Annecy".to_string(),
            },
        })
        .await?;

    let mut builder = QuoteBuilder::load(service.clone(), booking_id).await?;
    for sku in ["prod_01", "prod_02"] {
        let product = service
            .catalog()
            .find_by_sku(sku)
            .ok_or_else(|| anyhow!("catalog has no product {sku}"))?;
        builder.add_product_item(product.id)?;
    }
    builder.add_custom_item("Livraison et installation", 1, 120_00);
    let totals = builder.totals();
    info!(
        subtotal = %euros(totals.subtotal),
        tax = %euros(totals.tax_amount),
        total = %euros(totals.total),
        deposit = %euros(totals.deposit_amount),
        "quote priced"
    );

    let token = builder
        .send_for_signature()
        .await?
        .portal_token()
        .map(|t| t.as_str().to_string())
        .context("sent quote carries no portal token")?;

    let mut session = ClientPortal::new(service.clone())
        .open(booking_id, token)
        .await?;
    let signer = session.suggested_signer_name();
    session.sign(&signer).await?;
    let booking = session.pay_deposit().await?;
    info!(status = %booking.status(), "deposit received");

    let invoice = builder.generate_final_invoice().await?;
    info!(amount = %euros(invoice.amount()), due = %invoice.due_date(), "final invoice issued");
    builder.send_final_invoice().await?;

    session.refresh().await?;
    session.pay_final_balance().await?;
    let booking = builder.refresh().await?;
    if booking.status() == BookingStatus::FullyPaid {
        builder.complete_booking().await?;
    }
    info!(status = %builder.booking().status(), "booking walked through its lifecycle");

    let summary = service.dashboard_summary(Utc::now()).await?;
    for (status, count) in &summary.status_counts {
        info!(status = %status, count, "bookings by status");
    }
    info!(
        collected = %euros(summary.collected_revenue),
        total_bookings = summary.total_bookings,
        "dashboard"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
