use std::fmt;

use super::model::OrderVariant;
use super::value_objects::{ConceptUuid, OrderStatus, OrderUuid};

// ============================================================================
// Order Entry Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderEntryError {
    #[error("{variant} {order_uuid} is missing required field `{field}`")]
    MissingField {
        order_uuid: OrderUuid,
        variant: OrderVariant,
        field: &'static str,
    },

    #[error("Order {order_uuid} cannot supersede {previous_order_uuid}: previous order must be a distinct order of the same type")]
    InvalidLineage {
        order_uuid: OrderUuid,
        previous_order_uuid: OrderUuid,
    },

    #[error("Order {order_uuid} is {status} and cannot be discontinued")]
    NotActive {
        order_uuid: OrderUuid,
        status: OrderStatus,
    },

    #[error("No concept matches display name: {0}")]
    NotFound(String),

    #[error("{0}")]
    Ambiguous(AmbiguityWarning),

    #[error("Order {order_uuid} is {status} and cannot be edited")]
    NotEditable {
        order_uuid: OrderUuid,
        status: OrderStatus,
    },

    #[error("Order {0} has a discontinuation in flight")]
    DiscontinuePending(OrderUuid),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl OrderEntryError {
    /// Errors raised before anything reaches the store
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            OrderEntryError::MissingField { .. }
                | OrderEntryError::InvalidLineage { .. }
                | OrderEntryError::NotActive { .. }
        )
    }
}

pub type OrderEntryResult<T> = Result<T, OrderEntryError>;

/// Store or network failure after a command left the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Order store rejected {command_type}: {message}")]
pub struct PersistenceError {
    pub command_type: &'static str,
    pub message: String,
}

impl PersistenceError {
    pub fn new(command_type: &'static str, message: impl Into<String>) -> Self {
        Self {
            command_type,
            message: message.into(),
        }
    }
}

/// Several candidates share a display name.
///
/// Carried alongside a successful resolution; only fatal under the reject
/// policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguityWarning {
    pub display_name: String,
    pub matches: Vec<ConceptUuid>,
}

impl fmt::Display for AmbiguityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.matches.iter().map(|m| m.as_str()).collect();
        write!(
            f,
            "Display name '{}' matches {} concepts: {}",
            self.display_name,
            self.matches.len(),
            ids.join(", ")
        )
    }
}
