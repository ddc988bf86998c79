//! Kubernetes connection configuration.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;

use pkg_constants::kube::{
    K8S_SERVICE_HOST_ENV, K8S_SERVICE_PORT_ENV, LOCAL_CA_CERT_PATH, LOCAL_JWT_PATH,
};

/// How the engine reaches the Kubernetes API.
///
/// Unset fields fall back to in-cluster values: the host from the
/// `KUBERNETES_SERVICE_*` env vars, the CA and JWT from the service-account
/// mount, unless `disable_local_ca_jwt` turns the file fallback off.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KubeConfig {
    #[serde(default)]
    pub kubernetes_host: String,
    #[serde(default)]
    pub kubernetes_ca_cert: String,
    #[serde(default)]
    pub service_account_jwt: String,
    #[serde(default)]
    pub disable_local_ca_jwt: bool,
}

impl KubeConfig {
    /// Resolve unset fields from the pod environment.
    pub fn with_dynamic_values(self) -> Result<Self> {
        self.with_local_files(Path::new(LOCAL_CA_CERT_PATH), Path::new(LOCAL_JWT_PATH))
    }

    /// Same as [`with_dynamic_values`], with the in-cluster mount paths made
    /// explicit so tests can point at their own files.
    ///
    /// [`with_dynamic_values`]: KubeConfig::with_dynamic_values
    pub fn with_local_files(mut self, ca_path: &Path, jwt_path: &Path) -> Result<Self> {
        if self.kubernetes_host.is_empty() {
            self.kubernetes_host = host_from_env()?;
        }
        if !self.disable_local_ca_jwt {
            if self.kubernetes_ca_cert.is_empty() {
                self.kubernetes_ca_cert = read_local(ca_path)?;
            }
            if self.service_account_jwt.is_empty() {
                self.service_account_jwt = read_local(jwt_path)?;
            }
        }
        Ok(self)
    }
}

/// Build the API server URL from the env vars the kubelet injects into every
/// pod. Errors when either is missing.
pub fn host_from_env() -> Result<String> {
    let host = std::env::var(K8S_SERVICE_HOST_ENV).unwrap_or_default();
    let port = std::env::var(K8S_SERVICE_PORT_ENV).unwrap_or_default();
    if host.is_empty() || port.is_empty() {
        bail!(
            "failed to find k8s API host variables {:?} and {:?} in env",
            K8S_SERVICE_HOST_ENV,
            K8S_SERVICE_PORT_ENV
        );
    }
    Ok(format!("https://{}:{}", host, port))
}

fn read_local(path: &Path) -> Result<String> {
    if !path.exists() {
        // Not running in a cluster; leave the field for the caller to reject
        // when it actually tries to connect.
        return Ok(String::new());
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read in-cluster credential file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("kubevend-{}-{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn fills_ca_and_jwt_from_local_files() {
        let ca = temp_file("ca.crt", "local ca cert");
        let jwt = temp_file("token", "local jwt");

        let conf = KubeConfig {
            kubernetes_host: "https://host:443".to_string(),
            ..Default::default()
        }
        .with_local_files(&ca, &jwt)
        .unwrap();

        assert_eq!(conf.kubernetes_ca_cert, "local ca cert");
        assert_eq!(conf.service_account_jwt, "local jwt");

        fs::remove_file(ca).ok();
        fs::remove_file(jwt).ok();
    }

    #[test]
    fn explicit_values_win_over_local_files() {
        let ca = temp_file("ca2.crt", "local ca cert");
        let jwt = temp_file("token2", "local jwt");

        let conf = KubeConfig {
            kubernetes_host: "https://host:443".to_string(),
            kubernetes_ca_cert: "explicit ca".to_string(),
            ..Default::default()
        }
        .with_local_files(&ca, &jwt)
        .unwrap();

        assert_eq!(conf.kubernetes_ca_cert, "explicit ca");
        assert_eq!(conf.service_account_jwt, "local jwt");

        fs::remove_file(ca).ok();
        fs::remove_file(jwt).ok();
    }

    #[test]
    fn disable_local_skips_files() {
        let ca = temp_file("ca3.crt", "local ca cert");
        let jwt = temp_file("token3", "local jwt");

        let conf = KubeConfig {
            kubernetes_host: "https://host:443".to_string(),
            disable_local_ca_jwt: true,
            ..Default::default()
        }
        .with_local_files(&ca, &jwt)
        .unwrap();

        assert!(conf.kubernetes_ca_cert.is_empty());
        assert!(conf.service_account_jwt.is_empty());

        fs::remove_file(ca).ok();
        fs::remove_file(jwt).ok();
    }
}
