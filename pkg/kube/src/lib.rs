//! Kubernetes object client for the kubevend engine.
//!
//! `KubeApi` is the capability surface the engine programs against:
//! create/delete for the object kinds in the issuance chain plus the
//! TokenRequest subresource. `KubeClient` implements it over the Kubernetes
//! REST API; tests substitute their own fakes.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use pkg_types::rbac::PolicyRule;
use pkg_types::role::{Metadata, RoleType};

pub mod client;
pub mod config;
pub mod objects;

pub use client::KubeClient;
pub use config::KubeConfig;
pub use objects::{OwnerReference, TokenStatus};

/// Capability interface over the remote object API.
///
/// Every delete is idempotent: deleting an object that no longer exists
/// succeeds. Creates return an [`OwnerReference`] for the new object so it
/// can be wired as the parent of later objects in the chain.
#[async_trait]
pub trait KubeApi: Send + Sync {
    /// Request a short-lived bearer token for a service account.
    async fn create_token(&self, namespace: &str, name: &str, ttl: Duration)
    -> Result<TokenStatus>;

    async fn create_service_account(
        &self,
        namespace: &str,
        name: &str,
        metadata: &Metadata,
        owner: Option<&OwnerReference>,
    ) -> Result<OwnerReference>;

    async fn delete_service_account(&self, namespace: &str, name: &str) -> Result<()>;

    /// Create a Role (namespace-scoped) or ClusterRole from inline rules.
    async fn create_role(
        &self,
        namespace: &str,
        name: &str,
        role_type: RoleType,
        rules: &[PolicyRule],
        metadata: &Metadata,
    ) -> Result<OwnerReference>;

    async fn delete_role(&self, namespace: &str, name: &str, role_type: RoleType) -> Result<()>;

    /// Create a RoleBinding or ClusterRoleBinding granting `role_ref_name`
    /// (of kind `role_type`) to the service account named `name`.
    async fn create_role_binding(
        &self,
        namespace: &str,
        name: &str,
        role_ref_name: &str,
        role_type: RoleType,
        is_cluster: bool,
        metadata: &Metadata,
        owner: Option<&OwnerReference>,
    ) -> Result<OwnerReference>;

    async fn delete_role_binding(&self, namespace: &str, name: &str, is_cluster: bool)
    -> Result<()>;
}
