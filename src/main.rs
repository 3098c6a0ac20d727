use std::sync::Arc;

use chrono::NaiveDate;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_entry::domain::order::{
    ActiveDates, CareSetting, DrugDetails, EncounterType, OrderNumber, Orderer, PatientRef,
    TestDetails,
};
use order_entry::{
    CommandResult, Concept, DeferredConfirmer, InMemoryOrderStore, Metrics, Order, OrderContext,
    OrderKind, OrderStatus, OrderTableConfig, OrderUuid, OrdersTable,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, overridable with RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_entry=debug")),
        )
        .init();

    tracing::info!("🚀 Starting order table demo");

    let config = OrderTableConfig::from_env()?;
    let metrics = Arc::new(Metrics::new()?);

    // === 1. Seed the store with an encounter ===
    let store = InMemoryOrderStore::with_context(sample_context()?);

    // === 2. Confirmation dialog that says yes to everything ===
    let (confirmer, mut requests) = DeferredConfirmer::channel(8);
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            tracing::info!(question = %request.question(), "🗨️  Dialog answered yes");
            request.answer(true);
        }
    });

    let mut table = OrdersTable::new(Arc::new(store.clone()), Arc::new(confirmer), config)
        .with_concepts(vec![
            Concept::new("502a2b2e-4659-4987-abbd-c50545dead47", "Paracetamol"),
            Concept::new("c1b2e4f0-0b0a-4a47-8c62-2a4f0e1f7d10", "Complete Blood Count"),
        ])
        .with_metrics(metrics.clone());
    table.sync_orders(store.context().await).await?;

    let grouped = table.active_orders().await;
    tracing::info!(
        drug_orders = grouped.drug_orders.len(),
        test_orders = grouped.test_orders.len(),
        "📋 Active orders loaded"
    );
    for row in grouped.drug_orders.iter().chain(grouped.test_orders.iter()) {
        tracing::info!(
            order = %row.order.display,
            active = %row.active_dates,
            orderer = %row.orderer,
            "row"
        );
    }

    // === 3. Discontinue the drug order, twice in a row ===
    let Some(drug_row) = grouped.drug_orders.first() else {
        anyhow::bail!("demo context has no drug order");
    };
    let drug = drug_row.order.clone();
    let number = drug.order_number.clone().unwrap_or_else(|| OrderNumber::from(0));

    let first = table.discontinue(&drug, number.clone()).await?;
    let second = table.discontinue(&drug, number).await?;
    tracing::info!(second_attempt_suppressed = matches!(second, CommandResult::Suppressed), "Duplicate click");

    if let Some(handle) = first.into_handle() {
        handle.outcome().await?;
    }
    table.sync_orders(store.context().await).await?;

    // === 4. Open the edit flow for the lab order ===
    if let Some(lab_row) = table.active_orders().await.test_orders.first() {
        let intent = table.begin_edit(&lab_row.order).await?;
        tracing::info!(previous_order_uuid = %intent.previous_order_uuid(), "✏️  Editing lab order");
    }

    tracing::info!(
        commands = store.dispatch_count().await,
        metric_families = metrics.registry().gather().len(),
        "🎉 Demo complete!"
    );

    Ok(())
}

fn sample_context() -> anyhow::Result<OrderContext> {
    let start = NaiveDate::from_ymd_opt(2018, 8, 25)
        .ok_or_else(|| anyhow::anyhow!("invalid start date"))?;
    let end = NaiveDate::from_ymd_opt(2019, 8, 25);

    let header = |uuid: &str, number: u64, display: &str, kind: OrderKind| Order {
        uuid: OrderUuid::from(uuid),
        order_number: Some(OrderNumber::from(number)),
        display: display.to_string(),
        status: OrderStatus::Active,
        active_dates: Some(ActiveDates::new(start, end)),
        orderer: Some(Orderer::new("Mark Goodrich")),
        previous_order_uuid: None,
        urgency: Some("STAT".to_string()),
        kind,
    };

    Ok(OrderContext {
        patient: PatientRef {
            uuid: "some-random-id".to_string(),
            display: Some("joey bart".to_string()),
        },
        encounter_type: Some(EncounterType::new("39da3525-afe4-45ff-8977-c53b7b359158")),
        care_setting: Some(CareSetting::new("6f0c9a92-6f24-11e3-af88-005056821db0")),
        session_location: Some("drugs".to_string()),
        orders: vec![
            header(
                "0b9e3c1a-1111-4d7c-9a55-2f3f9a6c0001",
                22,
                "Paracetamol",
                OrderKind::Drug(DrugDetails {
                    dosing_instructions: Some("15mg of Amoxycillin syrup for the next 5 days".to_string()),
                    dispense: Some("25".to_string()),
                    drug: None,
                }),
            ),
            header(
                "0b9e3c1a-2222-4d7c-9a55-2f3f9a6c0002",
                23,
                "Complete Blood Count",
                OrderKind::Test(TestDetails::default()),
            ),
        ],
    })
}
