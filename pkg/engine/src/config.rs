use anyhow::{Context, Result};
use tracing::info;

use pkg_constants::storage::CONFIG_KEY;
use pkg_kube::KubeConfig;

use crate::Backend;

impl Backend {
    /// Stored configuration as written, or `None` when unconfigured.
    /// The service-account JWT is never echoed back.
    pub async fn read_config(&self) -> Result<Option<KubeConfig>> {
        let Some(config) = self.stored_config().await? else {
            return Ok(None);
        };
        Ok(Some(KubeConfig {
            service_account_jwt: String::new(),
            ..config
        }))
    }

    /// Persist the Kubernetes connection configuration and invalidate the
    /// cached client so the next request rebuilds against the new values.
    pub async fn write_config(&self, config: KubeConfig) -> Result<()> {
        let bytes = serde_json::to_vec(&config)?;
        self.storage.put(CONFIG_KEY, &bytes).await?;
        self.bump_config_generation();
        info!("Kubernetes configuration updated");
        Ok(())
    }

    /// Stored configuration with unset fields resolved from the pod
    /// environment (API host env vars, in-cluster CA/JWT mount).
    pub(crate) async fn config_with_dynamic_values(&self) -> Result<KubeConfig> {
        let config = self.stored_config().await?.unwrap_or_default();
        config.with_dynamic_values()
    }

    async fn stored_config(&self) -> Result<Option<KubeConfig>> {
        match self.storage.get(CONFIG_KEY).await? {
            Some(bytes) => {
                let config = serde_json::from_slice(&bytes)
                    .context("failed to decode stored kubernetes configuration")?;
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }
}
