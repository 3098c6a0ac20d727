// ============================================================================
// Order Domain - order-table lifecycle logic
// ============================================================================
//
// This module contains ALL order-table specific code:
// - Value objects (identifiers, status, orderer, active dates)
// - Model (Order with its drug/test variant, encounter context)
// - Commands (DISCONTINUE_ORDER, EDIT_ORDER)
// - Errors (OrderEntryError enum)
// - Concept resolver, active-order grouper, duplicate-submission guard
// - Command Handler (OrdersTable: discontinue / edit orchestration)
//
// ============================================================================

pub mod value_objects;
pub mod model;
pub mod commands;
pub mod errors;
pub mod concept;
pub mod grouping;
pub mod guard;
pub mod command_handler;

// Re-export for convenience
pub use value_objects::*;
pub use model::*;
pub use commands::*;
pub use errors::*;
pub use concept::*;
pub use grouping::*;
pub use guard::*;
pub use command_handler::*;
