use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use moka::notification::RemovalCause;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::Connector;
use crate::config::Config;
use crate::session::SessionContext;
use crate::utils::clock::Clock;

/// Live session contexts keyed by session id. Idle contexts expire after the
/// configured TTL and are shut down on the way out.
#[derive(Clone)]
pub struct SessionRegistry {
    contexts: Cache<String, Arc<SessionContext>>,
    connector: Arc<dyn Connector>,
    clock: Arc<dyn Clock>,
    config: Config,
}

impl SessionRegistry {
    pub fn new(connector: Arc<dyn Connector>, clock: Arc<dyn Clock>, config: Config) -> Self {
        let contexts = Cache::builder()
            .max_capacity(10_000)
            .time_to_idle(Duration::from_secs(config.session_ttl))
            .eviction_listener(
                |sid: Arc<String>, ctx: Arc<SessionContext>, cause: RemovalCause| {
                    debug!(session_id = %sid, ?cause, "Session context evicted");
                    ctx.shutdown();
                },
            )
            .build();

        Self {
            contexts,
            connector,
            clock,
            config,
        }
    }

    /// Opens a fresh context with its own backend client and waits for the
    /// first auth notification, so the first page never renders as pending.
    pub async fn open(&self) -> Arc<SessionContext> {
        let id = Uuid::new_v4().to_string();
        let ctx = Arc::new(SessionContext::open(
            id.clone(),
            self.connector.connect(),
            &self.config,
            self.clock.clone(),
        ));
        ctx.session.settle(|s| !s.loading).await;

        self.contexts.insert(id.clone(), ctx.clone()).await;
        info!(session_id = %id, "Session context opened");
        ctx
    }

    pub async fn get(&self, id: &str) -> Option<Arc<SessionContext>> {
        self.contexts.get(id).await
    }

    pub async fn remove(&self, id: &str) {
        self.contexts.invalidate(id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::utils::clock::SystemClock;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(
            Arc::new(MemoryBackend::new()),
            Arc::new(SystemClock),
            Config::for_tests(),
        )
    }

    #[tokio::test]
    async fn contexts_are_isolated() {
        let registry = registry();
        let first = registry.open().await;
        let second = registry.open().await;
        assert_ne!(first.id, second.id);
        assert!(!first.session.snapshot().loading);

        first.notifications.success("Hi", "only for the first session");
        assert!(second.notifications.pending().is_empty());

        let again = registry.get(&first.id).await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }

    #[tokio::test]
    async fn removed_context_is_gone() {
        let registry = registry();
        let ctx = registry.open().await;

        registry.remove(&ctx.id).await;
        assert!(registry.get(&ctx.id).await.is_none());
    }
}
