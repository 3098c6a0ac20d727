use std::sync::Arc;

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::collaborators::{Confirmer, Decision, OrderStore};
use crate::config::OrderTableConfig;
use crate::metrics::Metrics;

use super::commands::OrderCommand;
use super::concept::{resolve_uuid_with, Concept, Resolution};
use super::errors::{AmbiguityWarning, OrderEntryError, OrderEntryResult, PersistenceError};
use super::grouping::{group_active_orders, GroupedOrders};
use super::guard::{GuardState, SubmissionGuard};
use super::model::{validate_lineage, Order, OrderContext, OrderKey};
use super::value_objects::{ConceptUuid, OrderNumber, OrderStatus, OrderUuid};

// ============================================================================
// Orders Table - Command Handler
// ============================================================================
//
// Orchestrates: user action → validation → confirmation → command → store
//
// Discontinue dispatch runs on its own task; the caller gets a handle back
// immediately and the duplicate-submission guard follows the store outcome.
//
// ============================================================================

/// What a discontinue request turned into
#[derive(Debug)]
pub enum CommandResult {
    /// Command handed to the store; await the handle for the outcome
    Dispatched(DispatchHandle),
    /// Provider said no
    Declined,
    /// Confirmation never came back
    Undecided,
    /// Another attempt for the same order is already in flight
    Suppressed,
}

impl CommandResult {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, CommandResult::Dispatched(_))
    }

    pub fn into_handle(self) -> Option<DispatchHandle> {
        match self {
            CommandResult::Dispatched(handle) => Some(handle),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct DispatchHandle {
    pub command_id: Uuid,
    pub order: OrderKey,
    pub command: OrderCommand,
    pub warning: Option<AmbiguityWarning>,
    task: JoinHandle<Result<(), PersistenceError>>,
    guard: SubmissionGuard,
}

impl DispatchHandle {
    /// Wait for the store's terminal outcome
    pub async fn outcome(self) -> OrderEntryResult<()> {
        match self.task.await {
            Ok(result) => result.map_err(OrderEntryError::from),
            Err(join_error) => {
                self.guard.release(&self.order).await;
                Err(PersistenceError::new(self.command.command_type(), join_error.to_string()).into())
            }
        }
    }
}

/// Edit flow opened for an order; the eventual submission supersedes `original`
#[derive(Debug, Clone, PartialEq)]
pub struct EditIntent {
    pub command_id: Uuid,
    pub original: Order,
}

impl EditIntent {
    /// Value the revised order must carry as `previousOrderUuid`
    pub fn previous_order_uuid(&self) -> &OrderUuid {
        &self.original.uuid
    }
}

pub struct OrdersTable {
    store: Arc<dyn OrderStore>,
    confirmer: Arc<dyn Confirmer>,
    config: OrderTableConfig,
    concepts: Vec<Concept>,
    context: OrderContext,
    guard: SubmissionGuard,
    metrics: Option<Arc<Metrics>>,
}

impl OrdersTable {
    pub fn new(
        store: Arc<dyn OrderStore>,
        confirmer: Arc<dyn Confirmer>,
        config: OrderTableConfig,
    ) -> Self {
        Self {
            store,
            confirmer,
            config,
            concepts: Vec::new(),
            context: OrderContext::default(),
            guard: SubmissionGuard::new(),
            metrics: None,
        }
    }

    /// Candidates used when an order does not carry its own concept/drug id
    pub fn with_concepts(mut self, concepts: Vec<Concept>) -> Self {
        self.concepts = concepts;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &OrderTableConfig {
        &self.config
    }

    pub fn context(&self) -> &OrderContext {
        &self.context
    }

    pub async fn guard_state(&self, order: &Order) -> Option<GuardState> {
        self.guard.state(&order.key()).await
    }

    /// Status the table should act on: a terminal status in the current
    /// snapshot wins over whatever the caller's copy of the row says.
    fn current_status(&self, order: &Order) -> OrderStatus {
        match self.context.find(&order.key()) {
            Some(current) if current.status.is_terminal() => current.status,
            _ => order.status,
        }
    }

    /// Take a fresh snapshot from the store.
    ///
    /// Rejects snapshots whose supersession links cross variants. A guard for
    /// an acknowledged discontinuation is cleared only when the snapshot shows
    /// that order active again; pending ones stay.
    pub async fn sync_orders(&mut self, context: OrderContext) -> OrderEntryResult<()> {
        validate_lineage(&context.orders)?;
        self.context = context;

        let snapshot = &self.context;
        let cleared = self
            .guard
            .clear_acknowledged(|key| snapshot.find(key).is_some_and(Order::is_active))
            .await;
        tracing::debug!(
            patient = %self.context.patient.uuid,
            orders = self.context.orders.len(),
            guards_cleared = cleared,
            "Synced order snapshot"
        );
        Ok(())
    }

    /// Active rows of the current snapshot, flagged where a discontinuation is in flight
    pub async fn active_orders(&self) -> GroupedOrders {
        let mut grouped = group_active_orders(&self.context, &self.config.date_format);
        for row in grouped.rows_mut() {
            row.discontinue_pending = self.guard.state(&row.order.key()).await.is_some();
        }
        grouped
    }

    /// Look `display_name` up in the table's concept catalog
    pub fn resolve_uuid(&self, display_name: &str) -> OrderEntryResult<Resolution> {
        let resolution =
            resolve_uuid_with(&self.concepts, display_name, self.config.ambiguity_policy);

        let ambiguous = match &resolution {
            Ok(r) => r.warning.is_some(),
            Err(e) => matches!(e, OrderEntryError::Ambiguous(_)),
        };
        if ambiguous {
            if let Some(metrics) = &self.metrics {
                metrics.record_ambiguity();
            }
        }

        resolution
    }

    fn resolve_concept(
        &self,
        order: &Order,
    ) -> OrderEntryResult<(Option<ConceptUuid>, Option<AmbiguityWarning>)> {
        if let Some(uuid) = order.concept_uuid() {
            return Ok((Some(uuid.clone()), None));
        }
        if self.concepts.is_empty() {
            return Ok((None, None));
        }

        let resolution = self.resolve_uuid(&order.display)?;
        Ok((Some(resolution.uuid), resolution.warning))
    }

    /// Ask the provider to confirm, then hand a discontinue command to the store.
    ///
    /// Validation and concept resolution fail before the question is asked.
    /// Nothing is dispatched unless the answer is yes and no other attempt for
    /// the same order is in flight.
    pub async fn discontinue(
        &self,
        order: &Order,
        order_number: impl Into<OrderNumber>,
    ) -> OrderEntryResult<CommandResult> {
        let order_number = order_number.into();
        let key = order.key();

        let status = self.current_status(order);
        if status.is_terminal() {
            tracing::warn!(order_uuid = %order.uuid, status = %status, "Discontinue refused for non-active order");
            return Err(OrderEntryError::NotActive {
                order_uuid: order.uuid.clone(),
                status,
            });
        }

        if let Some(state) = self.guard.state(&key).await {
            return Ok(self.suppressed(&key, state));
        }

        let (concept, warning) = self.resolve_concept(order)?;
        let command = OrderCommand::discontinue(order, &self.context, concept).map_err(|e| {
            tracing::warn!(order_uuid = %order.uuid, error = %e, "Discontinue rejected");
            e
        })?;

        let question = self
            .config
            .render_prompt(&order.display, &order_number.to_string());
        let decision = self.confirmer.confirm(&question).await;

        match decision {
            Decision::Confirmed => self.record_confirmation("confirmed"),
            Decision::Declined => {
                self.record_confirmation("declined");
                tracing::debug!(order_uuid = %order.uuid, "Discontinue declined");
                return Ok(CommandResult::Declined);
            }
            Decision::Unanswered => {
                self.record_confirmation("unanswered");
                tracing::debug!(order_uuid = %order.uuid, "Discontinue left undecided");
                return Ok(CommandResult::Undecided);
            }
        }

        // Another call may have claimed the order while we waited for an answer.
        if !self.guard.try_engage(&key).await {
            return Ok(self.suppressed(&key, GuardState::Pending));
        }

        let command_id = Uuid::now_v7();
        let task = self.spawn_dispatch(command_id, order, command.clone());

        tracing::info!(
            command_id = %command_id,
            order_uuid = %order.uuid,
            order_number = %order_number,
            variant = %order.variant(),
            "Discontinue command dispatched"
        );

        Ok(CommandResult::Dispatched(DispatchHandle {
            command_id,
            order: key,
            command,
            warning,
            task,
            guard: self.guard.clone(),
        }))
    }

    fn spawn_dispatch(
        &self,
        command_id: Uuid,
        order: &Order,
        command: OrderCommand,
    ) -> JoinHandle<Result<(), PersistenceError>> {
        let store = Arc::clone(&self.store);
        let guard = self.guard.clone();
        let metrics = self.metrics.clone();
        let key = order.key();

        tokio::spawn(async move {
            let result = store.dispatch(command).await;

            match &result {
                Ok(()) => {
                    guard.acknowledge(&key).await;
                    tracing::info!(
                        command_id = %command_id,
                        order_uuid = %key.uuid,
                        "✅ Store accepted discontinue"
                    );
                }
                Err(e) => {
                    guard.release(&key).await;
                    tracing::error!(
                        command_id = %command_id,
                        order_uuid = %key.uuid,
                        error = %e,
                        "Store rejected discontinue"
                    );
                }
            }

            if let Some(metrics) = metrics {
                metrics.record_discontinue(key.variant.as_str(), result.is_ok());
            }

            result
        })
    }

    /// Open the edit flow for an active order.
    ///
    /// The order itself is left untouched; the store receives an
    /// `EDIT_ORDER` command seeded with its current fields.
    pub async fn begin_edit(&self, order: &Order) -> OrderEntryResult<EditIntent> {
        let status = self.current_status(order);
        if status.is_terminal() {
            tracing::warn!(
                order_uuid = %order.uuid,
                status = %status,
                "Edit refused for non-active order"
            );
            return Err(OrderEntryError::NotEditable {
                order_uuid: order.uuid.clone(),
                status,
            });
        }

        if self.guard.state(&order.key()).await.is_some() {
            return Err(OrderEntryError::DiscontinuePending(order.uuid.clone()));
        }

        let command_id = Uuid::now_v7();
        self.store
            .dispatch(OrderCommand::EditOrder(order.clone()))
            .await
            .map_err(|e| {
                tracing::error!(command_id = %command_id, order_uuid = %order.uuid, error = %e, "Edit dispatch failed");
                OrderEntryError::from(e)
            })?;

        if let Some(metrics) = &self.metrics {
            metrics.record_edit(order.variant().as_str());
        }

        tracing::info!(
            command_id = %command_id,
            order_uuid = %order.uuid,
            variant = %order.variant(),
            "Edit flow started"
        );

        Ok(EditIntent {
            command_id,
            original: order.clone(),
        })
    }

    fn suppressed(&self, key: &OrderKey, state: GuardState) -> CommandResult {
        if let Some(metrics) = &self.metrics {
            metrics.record_duplicate();
        }
        tracing::warn!(
            order_uuid = %key.uuid,
            variant = %key.variant,
            guard = ?state,
            "Duplicate discontinue suppressed"
        );
        CommandResult::Suppressed
    }

    fn record_confirmation(&self, decision: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_confirmation(decision);
        }
    }
}
