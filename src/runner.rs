//! Request execution with cancellation and fault isolation.

use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::sync::watch;

use crate::error::Result;

/// Cooperative cancellation signal.
///
/// Wraps the receiving side of a `watch` channel; the token is cancelled once
/// the sender publishes `true`. A token whose sender is gone never fires.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    receiver: Option<watch::Receiver<bool>>,
}

impl CancellationToken {
    pub fn new(receiver: watch::Receiver<bool>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }

    /// A token that is never cancelled.
    pub fn none() -> Self {
        Self { receiver: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.receiver.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolve once the token is cancelled.
    pub async fn cancelled(&self) {
        let Some(receiver) = &self.receiver else {
            return std::future::pending().await;
        };
        let mut receiver = receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Run one dispatched operation.
///
/// Cancellation yields `neutral` silently. An error or a panic inside `fut`
/// is logged with the operation name and URI and also yields `neutral`.
pub async fn run_safe<T, F>(
    operation: &str,
    uri: impl Display,
    token: &CancellationToken,
    neutral: T,
    fut: F,
) -> T
where
    F: Future<Output = Result<T>>,
{
    if token.is_cancelled() {
        return neutral;
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => {
            tracing::debug!(operation, %uri, "request cancelled");
            neutral
        }
        outcome = AssertUnwindSafe(fut).catch_unwind() => match outcome {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                tracing::error!(operation, %uri, error = %e, "request failed");
                neutral
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(operation, %uri, panic = %message, "request panicked");
                neutral
            }
        },
    }
}
