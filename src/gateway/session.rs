//! Scoped gateway acquisition
//!
//! One gateway per pipeline run: connect, hand the gateway to the run, and
//! shut it down on every exit path.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::Result;
use crate::gateway::ToolGateway;

/// Runs work against a connected gateway and always releases it.
pub struct GatewaySession;

impl GatewaySession {
    /// Connect `gateway`, run `work`, then shut the gateway down.
    ///
    /// Shutdown happens whether `work` succeeds or fails, and after a failed
    /// connect. A shutdown error is logged and never masks the result of
    /// `work`. If the future is dropped mid-run, `StdioGateway` children are
    /// still reaped through `kill_on_drop`.
    pub async fn scoped<T, F, Fut>(gateway: Arc<dyn ToolGateway>, work: F) -> Result<T>
    where
        F: FnOnce(Arc<dyn ToolGateway>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let name = gateway.name().to_string();

        if let Err(e) = gateway.connect().await {
            release(gateway.as_ref(), &name).await;
            return Err(e);
        }
        info!(gateway = %name, "Gateway session opened");

        let outcome = work(Arc::clone(&gateway)).await;

        release(gateway.as_ref(), &name).await;
        outcome
    }
}

async fn release(gateway: &dyn ToolGateway, name: &str) {
    match gateway.shutdown().await {
        Ok(()) => info!(gateway = %name, "Gateway session closed"),
        Err(e) => warn!(gateway = %name, error = %e, "Gateway shutdown failed"),
    }
}
