//! CLI commands.

pub(crate) mod audit;
pub(crate) mod check;
pub(crate) mod config;
pub(crate) mod interactive;
pub(crate) mod run;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A cancellation token that fires on Ctrl-C until the guard is dropped.
pub(crate) struct CtrlCGuard {
    token: CancellationToken,
    listener: JoinHandle<()>,
}

impl CtrlCGuard {
    pub(crate) fn install() -> Self {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let listener = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted; cancelling the running command");
                trigger.cancel();
            }
        });
        Self { token, listener }
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for CtrlCGuard {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
