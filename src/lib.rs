// ============================================================================
// Order Entry - active-order table orchestration
// ============================================================================
//
// Structure:
// - domain/        order model, concept resolver, grouper, orchestrators
// - collaborators/ injected capabilities (order store, confirmation)
// - config         table configuration
// - metrics        Prometheus counters
//
// ============================================================================

pub mod collaborators;
pub mod config;
pub mod domain;
pub mod metrics;

pub use collaborators::{
    ConfirmationRequest, Confirmer, Decision, DeferredConfirmer, InMemoryOrderStore, OrderStore,
};
pub use config::{AmbiguityPolicy, OrderTableConfig};
pub use domain::order::{
    group_active_orders, resolve_uuid, resolve_uuid_with, validate_lineage, AmbiguityWarning,
    CommandResult, Concept, DispatchHandle, EditIntent, GroupedOrders, Order, OrderCommand,
    OrderContext, OrderEntryError, OrderEntryResult, OrderKey, OrderKind, OrderRow, OrderStatus,
    OrderUuid, OrdersTable, PersistenceError, Resolution,
};
pub use metrics::Metrics;
