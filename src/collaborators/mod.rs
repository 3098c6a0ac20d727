// ============================================================================
// Collaborators - injected capabilities
// ============================================================================
//
// - store/   OrderStore (dispatch) and an in-memory implementation
// - confirm/ Confirmer (sync closures or deferred dialog answers)
//
// ============================================================================

pub mod confirm;
pub mod store;

pub use confirm::{ConfirmationRequest, Confirmer, Decision, DeferredConfirmer};
pub use store::{InMemoryOrderStore, OrderStore};
