use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::debug;

use pkg_constants::kube::RBAC_API_VERSION;
use pkg_types::rbac::{PolicyRule, Subject};
use pkg_types::role::{Metadata, RoleType};

use crate::KubeApi;
use crate::config::KubeConfig;
use crate::objects::{
    CreatedObject, ObjectMeta, OwnerReference, RoleBindingObject, RoleObject, ServiceAccountObject,
    TokenRequest, TokenStatus, binding_kind,
};

/// Kubernetes REST API client.
///
/// Authenticates with the configured bearer JWT; trusts the configured CA
/// bundle in addition to the system roots.
pub struct KubeClient {
    http: reqwest::Client,
    base_url: String,
}

impl KubeClient {
    pub fn new(config: &KubeConfig) -> Result<Self> {
        if config.kubernetes_host.is_empty() {
            bail!("kubernetes_host is not configured");
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.service_account_jwt))
            .context("service account JWT is not a valid header value")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if !config.kubernetes_ca_cert.is_empty() {
            let cert = reqwest::Certificate::from_pem(config.kubernetes_ca_cert.as_bytes())
                .context("failed to parse kubernetes_ca_cert as PEM")?;
            builder = builder.add_root_certificate(cert);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: config.kubernetes_host.trim_end_matches('/').to_string(),
        })
    }

    /// POST a create body and pull the new object's uid out of the response.
    async fn create(&self, url: &str, body: &impl serde::Serialize) -> Result<String> {
        let resp = self.http.post(url).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("create {} returned {}: {}", url, status, text);
        }
        let created: CreatedObject = resp.json().await?;
        Ok(created.metadata.uid)
    }

    /// DELETE an object; a 404 means it is already gone and counts as success.
    async fn delete(&self, url: &str) -> Result<()> {
        let resp = self.http.delete(url).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            debug!("delete {}: already gone", url);
            return Ok(());
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("delete {} returned {}: {}", url, status, text);
        }
        Ok(())
    }

    fn core_url(&self, namespace: &str, resource: &str) -> String {
        format!(
            "{}/api/v1/namespaces/{}/{}",
            self.base_url, namespace, resource
        )
    }

    fn rbac_url(&self, namespace: Option<&str>, resource: &str) -> String {
        match namespace {
            Some(ns) => format!(
                "{}/apis/{}/namespaces/{}/{}",
                self.base_url,
                RBAC_API_VERSION,
                ns,
                resource
            ),
            None => format!("{}/apis/{}/{}", self.base_url, RBAC_API_VERSION, resource),
        }
    }
}

#[async_trait]
impl KubeApi for KubeClient {
    async fn create_token(
        &self,
        namespace: &str,
        name: &str,
        ttl: Duration,
    ) -> Result<TokenStatus> {
        let url = format!("{}/{}/token", self.core_url(namespace, "serviceaccounts"), name);
        let body = TokenRequest::new(ttl.as_secs() as i64);
        let resp = self.http.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("token request for {}/{} returned {}: {}", namespace, name, status, text);
        }

        #[derive(serde::Deserialize)]
        struct TokenResponse {
            status: TokenStatus,
        }
        let token: TokenResponse = resp.json().await?;
        Ok(token.status)
    }

    async fn create_service_account(
        &self,
        namespace: &str,
        name: &str,
        metadata: &Metadata,
        owner: Option<&OwnerReference>,
    ) -> Result<OwnerReference> {
        let body = ServiceAccountObject::new(ObjectMeta::new(name, Some(namespace), metadata, owner));
        let uid = self
            .create(&self.core_url(namespace, "serviceaccounts"), &body)
            .await?;
        Ok(OwnerReference {
            api_version: "v1".to_string(),
            kind: "ServiceAccount".to_string(),
            name: name.to_string(),
            uid,
        })
    }

    async fn delete_service_account(&self, namespace: &str, name: &str) -> Result<()> {
        let url = format!("{}/{}", self.core_url(namespace, "serviceaccounts"), name);
        self.delete(&url).await
    }

    async fn create_role(
        &self,
        namespace: &str,
        name: &str,
        role_type: RoleType,
        rules: &[PolicyRule],
        metadata: &Metadata,
    ) -> Result<OwnerReference> {
        let (url, meta) = match role_type {
            RoleType::Role => (
                self.rbac_url(Some(namespace), "roles"),
                ObjectMeta::new(name, Some(namespace), metadata, None),
            ),
            RoleType::ClusterRole => (
                self.rbac_url(None, "clusterroles"),
                ObjectMeta::new(name, None, metadata, None),
            ),
        };
        let body = RoleObject::new(role_type, meta, rules);
        let uid = self.create(&url, &body).await?;
        Ok(OwnerReference {
            api_version: RBAC_API_VERSION.to_string(),
            kind: role_type.to_string(),
            name: name.to_string(),
            uid,
        })
    }

    async fn delete_role(&self, namespace: &str, name: &str, role_type: RoleType) -> Result<()> {
        let url = match role_type {
            RoleType::Role => format!("{}/{}", self.rbac_url(Some(namespace), "roles"), name),
            RoleType::ClusterRole => format!("{}/{}", self.rbac_url(None, "clusterroles"), name),
        };
        self.delete(&url).await
    }

    async fn create_role_binding(
        &self,
        namespace: &str,
        name: &str,
        role_ref_name: &str,
        role_type: RoleType,
        is_cluster: bool,
        metadata: &Metadata,
        owner: Option<&OwnerReference>,
    ) -> Result<OwnerReference> {
        let (url, meta) = if is_cluster {
            (
                self.rbac_url(None, "clusterrolebindings"),
                ObjectMeta::new(name, None, metadata, owner),
            )
        } else {
            (
                self.rbac_url(Some(namespace), "rolebindings"),
                ObjectMeta::new(name, Some(namespace), metadata, owner),
            )
        };
        let body = RoleBindingObject::new(
            is_cluster,
            meta,
            Subject::service_account(name, namespace),
            role_type,
            role_ref_name,
        );
        let uid = self.create(&url, &body).await?;
        Ok(OwnerReference {
            api_version: RBAC_API_VERSION.to_string(),
            kind: binding_kind(is_cluster).to_string(),
            name: name.to_string(),
            uid,
        })
    }

    async fn delete_role_binding(
        &self,
        namespace: &str,
        name: &str,
        is_cluster: bool,
    ) -> Result<()> {
        let url = if is_cluster {
            format!("{}/{}", self.rbac_url(None, "clusterrolebindings"), name)
        } else {
            format!("{}/{}", self.rbac_url(Some(namespace), "rolebindings"), name)
        };
        self.delete(&url).await
    }
}
