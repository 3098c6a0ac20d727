use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::domain::order::{OrderCommand, OrderContext, OrderStatus, PersistenceError};

// ============================================================================
// Order Store - dispatch capability
// ============================================================================
//
// The order table never persists anything itself. It hands commands to an
// injected store; whatever sits behind it (reducer, HTTP client, queue) owns
// serialization and transport.
//
// ============================================================================

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Deliver `command`. Resolves once the store has a terminal outcome.
    async fn dispatch(&self, command: OrderCommand) -> Result<(), PersistenceError>;
}

// ============================================================================
// In-memory store
// ============================================================================
//
// Records every command it receives and applies discontinuations to its own
// order snapshot. Failures can be queued and dispatch can be paused, which is
// what the demo binary and the tests drive it with.
//
// ============================================================================

#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    received: Mutex<Vec<OrderCommand>>,
    failures: Mutex<VecDeque<String>>,
    context: Mutex<OrderContext>,
    paused: AtomicBool,
    resume: Notify,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(context: OrderContext) -> Self {
        Self {
            inner: Arc::new(Inner {
                context: Mutex::new(context),
                ..Inner::default()
            }),
        }
    }

    /// Make the next dispatch fail with `message`
    pub async fn fail_next(&self, message: impl Into<String>) {
        self.inner.failures.lock().await.push_back(message.into());
    }

    /// Hold every dispatch until `resume` is called
    pub fn pause(&self) {
        self.inner.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.inner.paused.store(false, Ordering::SeqCst);
        self.inner.resume.notify_waiters();
    }

    /// Every command received so far, in arrival order
    pub async fn dispatched(&self) -> Vec<OrderCommand> {
        self.inner.received.lock().await.clone()
    }

    pub async fn dispatch_count(&self) -> usize {
        self.inner.received.lock().await.len()
    }

    /// Current order snapshot, as a store read would return it
    pub async fn context(&self) -> OrderContext {
        self.inner.context.lock().await.clone()
    }

    async fn wait_while_paused(&self) {
        loop {
            let resumed = self.inner.resume.notified();
            if !self.inner.paused.load(Ordering::SeqCst) {
                return;
            }
            resumed.await;
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn dispatch(&self, command: OrderCommand) -> Result<(), PersistenceError> {
        self.inner.received.lock().await.push(command.clone());
        self.wait_while_paused().await;

        if let Some(message) = self.inner.failures.lock().await.pop_front() {
            tracing::warn!(
                command_type = command.command_type(),
                order_uuid = %command.target(),
                error = %message,
                "In-memory store rejecting command"
            );
            return Err(PersistenceError::new(command.command_type(), message));
        }

        if let OrderCommand::DiscontinueOrder(payload) = &command {
            let mut context = self.inner.context.lock().await;
            if let Some(order) = context
                .orders
                .iter_mut()
                .find(|o| o.uuid == payload.previous_order_uuid)
            {
                order.status = OrderStatus::Discontinued;
            }
        }

        match command.to_json() {
            Ok(payload) => tracing::debug!(
                command_type = command.command_type(),
                order_uuid = %command.target(),
                payload = %payload,
                "In-memory store accepted command"
            ),
            Err(e) => tracing::warn!(
                command_type = command.command_type(),
                error = %e,
                "Accepted command could not be rendered as JSON"
            ),
        }

        Ok(())
    }
}
