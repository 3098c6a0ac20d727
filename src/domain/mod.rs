// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Order-table orchestration. Collaborators it talks to (the order store and
// the confirmation dialog) are injected from src/collaborators/.
//
// ============================================================================

pub mod order;
