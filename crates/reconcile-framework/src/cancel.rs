//! # Call Context
//!
//! Every remote call the controller issues is bound to a caller-supplied
//! [`CallContext`]: a [`CancellationToken`] plus an optional per-call timeout.
//!
//! Cancellation is propagated by dropping the in-flight client future as soon as the
//! token fires, so the API client's request is aborted rather than polled to completion.

use crate::error::ApiError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    timeout: Option<Duration>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds calls to an existing token (e.g. the orchestrator's shutdown token).
    pub fn with_token(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Runs one remote call under this context.
    ///
    /// A timeout is reported as [`ApiError::Transient`]; cancellation as
    /// [`ApiError::Cancelled`].
    pub async fn run<T, F>(&self, call: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .map_err(|_| ApiError::Transient(format!("timed out after {limit:?}")))?,
                None => call.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ApiError::Cancelled),
            result = bounded => result,
        }
    }

    /// Cancellable sleep used between retry attempts.
    pub async fn sleep(&self, duration: Duration) -> Result<(), ApiError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ApiError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
