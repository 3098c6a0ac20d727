use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;

use order_entry::domain::order::{
    CareSetting, DrugDetails, EncounterType, GuardState, OrderNumber, Orderer, TestDetails,
};
use order_entry::{
    resolve_uuid, CommandResult, Concept, DeferredConfirmer, InMemoryOrderStore, Metrics, Order,
    OrderCommand, OrderContext, OrderEntryError, OrderKind, OrderStatus, OrderTableConfig,
    OrderUuid, OrdersTable,
};

// ============================================================================
// Fixtures
// ============================================================================

fn mock_drug_order() -> Order {
    serde_json::from_value(json!({
        "date": "24/12/2018",
        "display": "Paracetamol",
        "type": "drugorder",
        "dosingInstructions": "15mg of Amoxycillin syrup for the next 5 days",
        "dispense": "25",
        "orderer": { "display": "Mark Goodrich" },
        "status": "Active",
        "uuid": 2,
        "orderNumber": 22
    }))
    .unwrap()
}

fn mock_lab_order() -> Order {
    serde_json::from_value(json!({
        "date": "24/12/2018",
        "display": "Complete Blood Count",
        "type": "testorder",
        "orderer": { "display": "Mark Goodrich" },
        "status": "Active",
        "uuid": 2,
        "orderNumber": 22
    }))
    .unwrap()
}

fn encounter(orders: Vec<Order>) -> OrderContext {
    OrderContext {
        care_setting: Some(CareSetting::new("6f0c9a92-6f24-11e3-af88-005056821db0")),
        encounter_type: Some(EncounterType::new("39da3525-afe4-45ff-8977-c53b7b359158")),
        session_location: Some("drugs".to_string()),
        orders,
        ..OrderContext::default()
    }
}

/// Confirmer that answers `answer` and counts how often it was asked
fn counting_confirmer(answer: bool) -> (Arc<AtomicUsize>, impl Fn(&str) -> bool + Send + Sync) {
    let asked = Arc::new(AtomicUsize::new(0));
    let counter = asked.clone();
    (asked, move |_: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
        answer
    })
}

async fn table_with(store: &InMemoryOrderStore, answer: bool) -> (OrdersTable, Arc<AtomicUsize>) {
    let (asked, confirmer) = counting_confirmer(answer);
    let mut table = OrdersTable::new(
        Arc::new(store.clone()),
        Arc::new(confirmer),
        OrderTableConfig::default(),
    );
    table
        .sync_orders(encounter(vec![mock_drug_order()]))
        .await
        .unwrap();
    (table, asked)
}

// ============================================================================
// Rendering inputs
// ============================================================================

#[tokio::test]
async fn renders_both_groups_from_store_orders() {
    let store = InMemoryOrderStore::new();
    let (mut table, _) = table_with(&store, true).await;

    let mut lab = mock_lab_order();
    lab.uuid = OrderUuid::from(3);
    table
        .sync_orders(encounter(vec![mock_drug_order(), lab]))
        .await
        .unwrap();

    let grouped = table.active_orders().await;
    assert_eq!(grouped.drug_orders.len(), 1);
    assert_eq!(grouped.test_orders.len(), 1);
    assert_eq!(grouped.drug_orders[0].orderer, "Mark Goodrich");
}

#[tokio::test]
async fn empty_order_list_yields_no_rows() {
    let store = InMemoryOrderStore::new();
    let (mut table, _) = table_with(&store, true).await;

    table.sync_orders(encounter(vec![])).await.unwrap();

    let grouped = table.active_orders().await;
    assert!(grouped.is_empty());
    assert!(grouped.drug_orders.is_empty());
    assert!(grouped.test_orders.is_empty());
}

// ============================================================================
// Discontinue
// ============================================================================

#[tokio::test]
async fn confirmed_drug_discontinue_dispatches_exact_command() {
    let store = InMemoryOrderStore::new();
    let (table, asked) = table_with(&store, true).await;

    let result = table.discontinue(&mock_drug_order(), 22).await.unwrap();
    result.into_handle().unwrap().outcome().await.unwrap();

    let dispatched = store.dispatched().await;
    assert_eq!(asked.load(Ordering::SeqCst), 1);
    assert_eq!(dispatched.len(), 1);
    assert_eq!(
        serde_json::to_value(&dispatched[0]).unwrap(),
        json!({
            "type": "DISCONTINUE_ORDER",
            "payload": {
                "previousOrderUuid": 2,
                "action": "DISCONTINUE",
                "orderer": { "display": "Mark Goodrich" }
            }
        })
    );
}

#[tokio::test]
async fn confirmed_lab_discontinue_carries_encounter_fields() {
    let store = InMemoryOrderStore::new();
    let (table, _) = table_with(&store, true).await;

    let handle = table
        .discontinue(&mock_lab_order(), 22)
        .await
        .unwrap()
        .into_handle()
        .unwrap();
    handle.outcome().await.unwrap();

    let dispatched = store.dispatched().await;
    assert_eq!(dispatched.len(), 1);
    match &dispatched[0] {
        OrderCommand::DiscontinueOrder(payload) => {
            assert_eq!(payload.previous_order_uuid, OrderUuid::from(2));
            assert_eq!(
                payload.care_setting,
                Some(CareSetting::new("6f0c9a92-6f24-11e3-af88-005056821db0"))
            );
            assert_eq!(
                payload.encounter_type,
                Some(EncounterType::new("39da3525-afe4-45ff-8977-c53b7b359158"))
            );
            assert_eq!(payload.orderer, Some(Orderer::new("Mark Goodrich")));
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[tokio::test]
async fn declined_confirmation_never_dispatches() {
    let store = InMemoryOrderStore::new();
    let (table, asked) = table_with(&store, false).await;

    for order in [mock_drug_order(), mock_lab_order()] {
        let result = table.discontinue(&order, 22).await.unwrap();
        assert!(matches!(result, CommandResult::Declined));
    }

    assert_eq!(asked.load(Ordering::SeqCst), 2);
    assert_eq!(store.dispatch_count().await, 0);
    assert_eq!(table.guard_state(&mock_drug_order()).await, None);
    assert_eq!(table.guard_state(&mock_lab_order()).await, None);
}

#[tokio::test]
async fn unanswered_confirmation_leaves_order_undecided() {
    let store = InMemoryOrderStore::new();
    let (confirmer, mut requests) = DeferredConfirmer::channel(1);
    let table = OrdersTable::new(
        Arc::new(store.clone()),
        Arc::new(confirmer),
        OrderTableConfig::default(),
    );

    tokio::spawn(async move {
        // Dialog closed without an answer
        let request = requests.recv().await.unwrap();
        drop(request);
    });

    let result = table.discontinue(&mock_drug_order(), 22).await.unwrap();

    assert!(matches!(result, CommandResult::Undecided));
    assert_eq!(store.dispatch_count().await, 0);
    assert_eq!(table.guard_state(&mock_drug_order()).await, None);
}

#[tokio::test]
async fn async_confirmation_is_awaited_before_dispatch() {
    let store = InMemoryOrderStore::new();
    let (confirmer, mut requests) = DeferredConfirmer::channel(1);
    let table = OrdersTable::new(
        Arc::new(store.clone()),
        Arc::new(confirmer),
        OrderTableConfig::default(),
    );

    let dialog = tokio::spawn(async move {
        let request = requests.recv().await.unwrap();
        request.answer(true);
    });

    let handle = table
        .discontinue(&mock_drug_order(), 22)
        .await
        .unwrap()
        .into_handle()
        .unwrap();
    handle.outcome().await.unwrap();
    dialog.await.unwrap();

    assert_eq!(store.dispatch_count().await, 1);
}

#[tokio::test]
async fn rapid_second_click_is_suppressed() {
    let store = InMemoryOrderStore::new();
    store.pause();
    let (table, _) = table_with(&store, true).await;
    let order = mock_drug_order();

    let first = table.discontinue(&order, 22).await.unwrap();
    let second = table.discontinue(&order, 22).await.unwrap();

    assert!(first.is_dispatched());
    assert!(matches!(second, CommandResult::Suppressed));
    assert_eq!(table.guard_state(&order).await, Some(GuardState::Pending));

    store.resume();
    first.into_handle().unwrap().outcome().await.unwrap();
    assert_eq!(store.dispatch_count().await, 1);
}

#[tokio::test]
async fn concurrent_clicks_dispatch_at_most_once() {
    let store = InMemoryOrderStore::new();
    let (table, _) = table_with(&store, true).await;
    let order = mock_drug_order();

    let (a, b) = tokio::join!(table.discontinue(&order, 22), table.discontinue(&order, 22));
    let results = [a.unwrap(), b.unwrap()];

    let dispatched: Vec<_> = results.iter().filter(|r| r.is_dispatched()).collect();
    assert_eq!(dispatched.len(), 1);

    for result in results {
        if let Some(handle) = result.into_handle() {
            handle.outcome().await.unwrap();
        }
    }
    assert_eq!(store.dispatch_count().await, 1);
}

#[tokio::test]
async fn acknowledged_guard_holds_until_store_refresh() {
    let store = InMemoryOrderStore::with_context(encounter(vec![mock_drug_order()]));
    let (mut table, _) = table_with(&store, true).await;
    let order = mock_drug_order();

    let handle = table.discontinue(&order, 22).await.unwrap().into_handle().unwrap();
    handle.outcome().await.unwrap();

    assert_eq!(table.guard_state(&order).await, Some(GuardState::Acknowledged));
    assert!(matches!(
        table.discontinue(&order, 22).await.unwrap(),
        CommandResult::Suppressed
    ));

    table.sync_orders(store.context().await).await.unwrap();

    assert!(table.active_orders().await.is_empty());
    assert_eq!(table.context().orders[0].status, OrderStatus::Discontinued);
    assert_eq!(table.guard_state(&order).await, Some(GuardState::Acknowledged));
}

#[tokio::test]
async fn stale_row_after_refresh_cannot_discontinue_or_edit() {
    let store = InMemoryOrderStore::with_context(encounter(vec![mock_drug_order()]));
    let (mut table, asked) = table_with(&store, true).await;
    let stale = mock_drug_order();

    let handle = table.discontinue(&stale, 22).await.unwrap().into_handle().unwrap();
    handle.outcome().await.unwrap();
    table.sync_orders(store.context().await).await.unwrap();

    assert_eq!(stale.status, OrderStatus::Active);
    let err = table.discontinue(&stale, 22).await.unwrap_err();
    assert!(matches!(
        err,
        OrderEntryError::NotActive { status: OrderStatus::Discontinued, .. }
    ));

    let err = table.begin_edit(&stale).await.unwrap_err();
    assert!(matches!(
        err,
        OrderEntryError::NotEditable { status: OrderStatus::Discontinued, .. }
    ));

    assert_eq!(asked.load(Ordering::SeqCst), 1);
    assert_eq!(store.dispatch_count().await, 1);
}

#[tokio::test]
async fn refresh_showing_order_active_again_releases_guard() {
    let store = InMemoryOrderStore::new();
    let (mut table, _) = table_with(&store, true).await;
    let order = mock_drug_order();

    let handle = table.discontinue(&order, 22).await.unwrap().into_handle().unwrap();
    handle.outcome().await.unwrap();
    assert_eq!(table.guard_state(&order).await, Some(GuardState::Acknowledged));

    // Store snapshot still lists the order as active
    table
        .sync_orders(encounter(vec![mock_drug_order()]))
        .await
        .unwrap();

    assert_eq!(table.guard_state(&order).await, None);
    assert!(table.discontinue(&order, 22).await.unwrap().is_dispatched());
}

#[tokio::test]
async fn drug_and_lab_rows_sharing_a_uuid_are_guarded_separately() {
    let store = InMemoryOrderStore::new();
    store.pause();
    let (mut table, _) = table_with(&store, true).await;
    table
        .sync_orders(encounter(vec![mock_drug_order(), mock_lab_order()]))
        .await
        .unwrap();

    let drug = table.discontinue(&mock_drug_order(), 22).await.unwrap();
    let lab = table.discontinue(&mock_lab_order(), 22).await.unwrap();

    assert!(drug.is_dispatched());
    assert!(lab.is_dispatched());
    let grouped = table.active_orders().await;
    assert!(grouped.drug_orders[0].discontinue_pending);
    assert!(grouped.test_orders[0].discontinue_pending);

    store.resume();
    drug.into_handle().unwrap().outcome().await.unwrap();
    lab.into_handle().unwrap().outcome().await.unwrap();
    assert_eq!(store.dispatch_count().await, 2);
}

#[tokio::test]
async fn persistence_failure_is_reported_once_and_releases_guard() {
    let store = InMemoryOrderStore::new();
    store.fail_next("503 Service Unavailable").await;
    let metrics = Arc::new(Metrics::new().unwrap());
    let (table, _) = table_with(&store, true).await;
    let table = table.with_metrics(metrics.clone());
    let order = mock_drug_order();

    let handle = table.discontinue(&order, 22).await.unwrap().into_handle().unwrap();
    let err = handle.outcome().await.unwrap_err();

    assert!(matches!(err, OrderEntryError::Persistence(ref e) if e.message == "503 Service Unavailable"));
    assert_eq!(store.dispatch_count().await, 1);
    assert_eq!(table.guard_state(&order).await, None);
    assert_eq!(metrics.discontinues_failed.with_label_values(&["drugorder"]).get(), 1);

    // Manual retry goes through
    let retry = table.discontinue(&order, 22).await.unwrap().into_handle().unwrap();
    retry.outcome().await.unwrap();
    assert_eq!(store.dispatch_count().await, 2);
    assert_eq!(metrics.discontinues_accepted.with_label_values(&["drugorder"]).get(), 1);
}

#[tokio::test]
async fn lab_order_without_encounter_context_fails_validation() {
    let store = InMemoryOrderStore::new();
    let (asked, confirmer) = counting_confirmer(true);
    let table = OrdersTable::new(
        Arc::new(store.clone()),
        Arc::new(confirmer),
        OrderTableConfig::default(),
    );

    let err = table.discontinue(&mock_lab_order(), 22).await.unwrap_err();

    assert!(err.is_validation());
    assert_eq!(asked.load(Ordering::SeqCst), 0);
    assert_eq!(store.dispatch_count().await, 0);
}

#[tokio::test]
async fn discontinued_order_cannot_be_discontinued_again() {
    let store = InMemoryOrderStore::new();
    let (table, asked) = table_with(&store, true).await;

    let mut order = mock_drug_order();
    order.status = OrderStatus::Discontinued;

    let err = table.discontinue(&order, 22).await.unwrap_err();

    assert!(matches!(err, OrderEntryError::NotActive { .. }));
    assert_eq!(asked.load(Ordering::SeqCst), 0);
    assert_eq!(store.dispatch_count().await, 0);
}

#[tokio::test]
async fn strict_policy_blocks_ambiguous_concepts() {
    let store = InMemoryOrderStore::new();
    let (_, confirmer) = counting_confirmer(true);
    let table = OrdersTable::new(
        Arc::new(store.clone()),
        Arc::new(confirmer),
        OrderTableConfig::strict(),
    )
    .with_concepts(vec![
        Concept::new("a", "Paracetamol"),
        Concept::new("b", "paracetamol"),
    ]);

    let err = table.discontinue(&mock_drug_order(), 22).await.unwrap_err();

    assert!(matches!(err, OrderEntryError::Ambiguous(_)));
    assert_eq!(store.dispatch_count().await, 0);
}

// ============================================================================
// Edit
// ============================================================================

#[tokio::test]
async fn editing_active_order_dispatches_edit_command() {
    let store = InMemoryOrderStore::new();
    let (table, _) = table_with(&store, true).await;
    let order = mock_drug_order();

    let intent = table.begin_edit(&order).await.unwrap();

    assert_eq!(intent.previous_order_uuid(), &OrderUuid::from(2));
    assert_eq!(intent.original, order);
    assert_eq!(store.dispatched().await, vec![OrderCommand::EditOrder(order)]);
}

#[tokio::test]
async fn editing_discontinued_order_is_refused() {
    let store = InMemoryOrderStore::new();
    let (table, _) = table_with(&store, true).await;

    for status in [OrderStatus::Discontinued, OrderStatus::Expired] {
        let mut order = mock_drug_order();
        order.status = status;

        let err = table.begin_edit(&order).await.unwrap_err();
        assert!(matches!(err, OrderEntryError::NotEditable { status: s, .. } if s == status));
    }

    assert_eq!(store.dispatch_count().await, 0);
}

#[tokio::test]
async fn editing_while_discontinue_in_flight_is_refused() {
    let store = InMemoryOrderStore::new();
    store.pause();
    let (table, _) = table_with(&store, true).await;
    let order = mock_drug_order();

    let pending = table.discontinue(&order, 22).await.unwrap();
    let err = table.begin_edit(&order).await.unwrap_err();

    assert!(matches!(err, OrderEntryError::DiscontinuePending(_)));
    let grouped = table.active_orders().await;
    assert!(grouped.drug_orders[0].discontinue_pending);

    store.resume();
    pending.into_handle().unwrap().outcome().await.unwrap();
}

#[tokio::test]
async fn edit_intent_does_not_touch_original() {
    let store = InMemoryOrderStore::with_context(encounter(vec![mock_drug_order()]));
    let (table, _) = table_with(&store, true).await;
    let order = Order {
        kind: OrderKind::Drug(DrugDetails {
            dosing_instructions: Some("25mg of Amoxycillin syrup for the next 5 days".to_string()),
            dispense: Some("45".to_string()),
            drug: None,
        }),
        order_number: Some(OrderNumber::from(22)),
        ..mock_drug_order()
    };

    table.begin_edit(&order).await.unwrap();

    assert_eq!(store.context().await.orders[0].status, OrderStatus::Active);
    assert_eq!(table.context().orders[0], mock_drug_order());
}

// ============================================================================
// Concept resolution
// ============================================================================

#[test]
fn resolve_uuid_returns_sole_match() {
    let items = vec![
        Concept::new("502a2b2e-4659-4987-abbd-c50545dead47", "Paracetamol"),
        Concept::new("c1b2e4f0-0b0a-4a47-8c62-2a4f0e1f7d10", "Complete Blood Count"),
    ];

    let resolution = resolve_uuid(&items, "complete blood count").unwrap();
    assert_eq!(resolution.uuid.as_str(), "c1b2e4f0-0b0a-4a47-8c62-2a4f0e1f7d10");

    assert!(matches!(
        resolve_uuid(&items, "Ibuprofen"),
        Err(OrderEntryError::NotFound(_))
    ));
}

#[test]
fn test_order_variant_keeps_details() {
    let lab = Order {
        kind: OrderKind::Test(TestDetails {
            care_setting: Some(CareSetting::new("outpatient")),
            ..TestDetails::default()
        }),
        ..mock_lab_order()
    };

    let value = serde_json::to_value(&lab).unwrap();
    assert_eq!(value["type"], json!("testorder"));
    assert_eq!(value["careSetting"], json!("outpatient"));
}
