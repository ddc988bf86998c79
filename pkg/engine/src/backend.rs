use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

use pkg_constants::kube::{K8S_SERVICE_HOST_ENV, K8S_SERVICE_PORT_ENV};
use pkg_kube::{KubeApi, KubeClient};
use pkg_state::Storage;

/// Marks a client handle supplied by the embedder rather than built from
/// stored configuration; it never goes stale on config writes.
const PINNED_GENERATION: u64 = u64::MAX;

struct CachedClient {
    generation: u64,
    api: Arc<dyn KubeApi>,
}

/// The credentials engine. One instance per mount; the host may drive it
/// concurrently from many requests.
pub struct Backend {
    pub(crate) storage: Arc<dyn Storage>,
    /// Host-level fallback when neither the request nor the role sets a TTL.
    pub(crate) default_lease_ttl: Duration,
    client: RwLock<Option<CachedClient>>,
    /// Bumped on every config write; a cached client built against an older
    /// generation is rebuilt on next use.
    config_generation: AtomicU64,
}

impl Backend {
    pub fn new(storage: Arc<dyn Storage>, default_lease_ttl: Duration) -> Self {
        Self {
            storage,
            default_lease_ttl,
            client: RwLock::new(None),
            config_generation: AtomicU64::new(0),
        }
    }

    /// Build a backend around an externally managed API client, bypassing the
    /// stored configuration entirely.
    pub fn with_client(
        storage: Arc<dyn Storage>,
        api: Arc<dyn KubeApi>,
        default_lease_ttl: Duration,
    ) -> Self {
        let mut backend = Self::new(storage, default_lease_ttl);
        *backend.client.get_mut() = Some(CachedClient {
            generation: PINNED_GENERATION,
            api,
        });
        backend
    }

    /// Lazily-built, cached API client. Double-checked: the read lock covers
    /// the common path, the write lock re-validates the generation before
    /// rebuilding so concurrent callers do not construct redundant clients.
    pub(crate) async fn client(&self) -> Result<Arc<dyn KubeApi>> {
        let generation = self.config_generation.load(Ordering::Acquire);
        {
            let slot = self.client.read().await;
            if let Some(cached) = slot.as_ref()
                && (cached.generation == PINNED_GENERATION || cached.generation == generation)
            {
                return Ok(cached.api.clone());
            }
        }

        let mut slot = self.client.write().await;
        let generation = self.config_generation.load(Ordering::Acquire);
        if let Some(cached) = slot.as_ref()
            && (cached.generation == PINNED_GENERATION || cached.generation == generation)
        {
            return Ok(cached.api.clone());
        }

        let config = self.config_with_dynamic_values().await?;
        info!("Building Kubernetes client for {}", config.kubernetes_host);
        let api: Arc<dyn KubeApi> = Arc::new(KubeClient::new(&config)?);
        *slot = Some(CachedClient {
            generation,
            api: api.clone(),
        });
        Ok(api)
    }

    /// Invalidate the cached client after a configuration change.
    pub(crate) fn bump_config_generation(&self) {
        self.config_generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Report which in-cluster env vars are missing. Backs the host's
    /// configuration pre-flight check.
    pub fn check(&self) -> Vec<&'static str> {
        [K8S_SERVICE_HOST_ENV, K8S_SERVICE_PORT_ENV]
            .into_iter()
            .filter(|key| std::env::var(key).unwrap_or_default().is_empty())
            .collect()
    }
}
