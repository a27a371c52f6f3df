//! Post-sync hooks.
//!
//! Hooks run in order once a sync run succeeds, after observers saw the success snapshot.
//! They are best effort: a failure is logged and skips the hooks after it, and nothing is
//! reported to observers or callers.

use crate::wallet::WalletResult;
use crate::wallet::backend::{Backend, WalletBackend};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

#[async_trait]
pub trait PostSyncHook: Send + Sync {
    async fn run(&self, backend: &Backend) -> WalletResult<()>;

    fn name(&self) -> &'static str;
}

/// Subscribes the session to new chain tips
pub struct ChainTipSubscriptionHook;

#[async_trait]
impl PostSyncHook for ChainTipSubscriptionHook {
    async fn run(&self, backend: &Backend) -> WalletResult<()> {
        backend.subscribe_block_notifications().await
    }

    fn name(&self) -> &'static str {
        "chain-tip-subscription"
    }
}

/// Rebroadcasts transactions that were sent but never mined
pub struct UnminedTransactionFlushHook;

#[async_trait]
impl PostSyncHook for UnminedTransactionFlushHook {
    async fn run(&self, backend: &Backend) -> WalletResult<()> {
        backend.publish_unmined_transactions().await
    }

    fn name(&self) -> &'static str {
        "unmined-transaction-flush"
    }
}

/// Chain-tip subscription, then unmined flush
pub fn default_hooks() -> Vec<Arc<dyn PostSyncHook>> {
    vec![
        Arc::new(ChainTipSubscriptionHook),
        Arc::new(UnminedTransactionFlushHook),
    ]
}

/// Run `hooks` in order, stopping at the first failure. Returns how many succeeded.
pub async fn run_hooks(hooks: &[Arc<dyn PostSyncHook>], backend: &Backend) -> usize {
    let mut completed = 0;
    for hook in hooks {
        match hook.run(backend).await {
            Ok(()) => {
                debug!("Post-sync hook {} done", hook.name());
                completed += 1;
            }
            Err(e) => {
                warn!(
                    "Post-sync hook {} failed, skipping {} remaining: {}",
                    hook.name(),
                    hooks.len() - completed - 1,
                    e
                );
                break;
            }
        }
    }
    completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockDaemon, remote_backend};

    #[tokio::test]
    async fn test_default_hooks_run_in_order() {
        let daemon = MockDaemon::new();
        let backend = remote_backend(daemon.clone());

        assert_eq!(run_hooks(&default_hooks(), &backend).await, 2);
        assert_eq!(daemon.subscribe_calls(), 1);
        assert_eq!(daemon.publish_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_subscription_skips_flush() {
        let daemon = MockDaemon::new();
        daemon.set_subscribe_unavailable(true);
        let backend = remote_backend(daemon.clone());

        assert_eq!(run_hooks(&default_hooks(), &backend).await, 0);
        assert_eq!(daemon.subscribe_calls(), 1);
        assert_eq!(daemon.publish_calls(), 0);
    }
}
