use super::provider::Provider;
use reconcile_framework::fake::{FakeApi, FakeApiClient};
use reconcile_framework::{CallContext, CancellationToken};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// A [`Provider`] wired to an in-memory [`FakeApi`] running in its own task.
///
/// Used by the demo binary and the integration tests. `api` is kept next to the
/// provider so callers can seed objects the provider does not manage (teams, agent
/// pools) and inspect what a reconciliation left behind.
pub struct Sandbox {
    pub provider: Provider<FakeApiClient>,
    pub api: FakeApiClient,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl Sandbox {
    /// Spawns the fake API on the current runtime.
    pub fn start() -> Self {
        let (server, api) = FakeApi::new(64);
        let handle = tokio::spawn(server.run());
        let provider = Provider::new(Arc::new(api.clone()));
        Self {
            provider,
            api,
            shutdown: CancellationToken::new(),
            handle,
        }
    }

    /// A call context that is cancelled when the sandbox shuts down.
    pub fn context(&self) -> CallContext {
        CallContext::with_token(self.shutdown.child_token())
    }

    /// Cancels outstanding calls, drops the sandbox's clients and waits for the fake
    /// API to stop.
    ///
    /// The server exits once every client is gone, so controllers handed out by the
    /// provider must be dropped first.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down sandbox");
        self.shutdown.cancel();
        drop(self.provider);
        drop(self.api);

        if let Err(e) = self.handle.await {
            error!(error = %e, "Fake API task failed");
            return Err(format!("fake api task failed: {e}"));
        }
        info!("Sandbox shutdown complete");
        Ok(())
    }
}
