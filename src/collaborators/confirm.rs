use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

// ============================================================================
// Confirmation - "are you sure?" capability
// ============================================================================
//
// Orchestrators only see `Confirmer::confirm(question).await`. A synchronous
// collaborator is any `Fn(&str) -> bool`; an asynchronous one answers later
// through `DeferredConfirmer`.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirmed,
    Declined,
    /// The dialog went away without an answer
    Unanswered,
}

impl From<bool> for Decision {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Decision::Confirmed
        } else {
            Decision::Declined
        }
    }
}

#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, question: &str) -> Decision;
}

#[async_trait]
impl<F> Confirmer for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    async fn confirm(&self, question: &str) -> Decision {
        Decision::from(self(question))
    }
}

/// A question waiting for the UI to answer it
#[derive(Debug)]
pub struct ConfirmationRequest {
    question: String,
    responder: oneshot::Sender<bool>,
}

impl ConfirmationRequest {
    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(self, confirmed: bool) {
        // Receiver gone means the orchestrator stopped waiting; nothing to do.
        let _ = self.responder.send(confirmed);
    }
}

/// Forwards questions to a UI task over a channel and waits for its answer.
///
/// Dropping a `ConfirmationRequest` without answering, or dropping the
/// receiving end altogether, yields `Decision::Unanswered`.
#[derive(Clone)]
pub struct DeferredConfirmer {
    requests: mpsc::Sender<ConfirmationRequest>,
}

impl DeferredConfirmer {
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<ConfirmationRequest>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { requests: tx }, rx)
    }
}

#[async_trait]
impl Confirmer for DeferredConfirmer {
    async fn confirm(&self, question: &str) -> Decision {
        let (responder, answer) = oneshot::channel();
        let request = ConfirmationRequest {
            question: question.to_string(),
            responder,
        };

        if self.requests.send(request).await.is_err() {
            tracing::warn!(question = %question, "No confirmation dialog is listening");
            return Decision::Unanswered;
        }

        match answer.await {
            Ok(confirmed) => Decision::from(confirmed),
            Err(_) => {
                tracing::debug!(question = %question, "Confirmation abandoned");
                Decision::Unanswered
            }
        }
    }
}
