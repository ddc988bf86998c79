//! Test doubles shared by the engine integration tests.
#![allow(dead_code)] // each test binary uses a different subset of the helpers

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pkg_engine::Backend;
use pkg_kube::{KubeApi, OwnerReference, TokenStatus};
use pkg_state::MemoryStorage;
use pkg_types::rbac::PolicyRule;
use pkg_types::role::{Metadata, RoleType};

/// In-memory stand-in for the Kubernetes API. Records every call, keeps the
/// set of live objects, and can be told to fail specific operations.
#[derive(Default)]
pub struct FakeKube {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    /// (namespace, name) — namespace is "" for cluster-scoped objects.
    service_accounts: BTreeSet<(String, String)>,
    roles: BTreeSet<(String, String, String)>,
    bindings: BTreeSet<(String, String, bool)>,
    calls: Vec<String>,
    fail_ops: HashSet<&'static str>,
}

impl FakeKube {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every future call to `op` fail (e.g. "create_service_account").
    pub fn fail_on(&self, op: &'static str) {
        self.state.lock().unwrap().fail_ops.insert(op);
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().fail_ops.clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn live_objects(&self) -> usize {
        let s = self.state.lock().unwrap();
        s.service_accounts.len() + s.roles.len() + s.bindings.len()
    }

    pub fn has_service_account(&self, namespace: &str, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .service_accounts
            .contains(&(namespace.to_string(), name.to_string()))
    }

    pub fn has_role(&self, namespace: &str, name: &str, kind: &str) -> bool {
        self.state.lock().unwrap().roles.contains(&(
            namespace.to_string(),
            name.to_string(),
            kind.to_string(),
        ))
    }

    pub fn has_binding(&self, namespace: &str, name: &str, is_cluster: bool) -> bool {
        self.state
            .lock()
            .unwrap()
            .bindings
            .contains(&(namespace.to_string(), name.to_string(), is_cluster))
    }

    fn record(&self, op: &'static str, detail: String) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(format!("{}:{}", op, detail));
        if s.fail_ops.contains(op) {
            bail!("injected failure for {}", op);
        }
        Ok(())
    }
}

#[async_trait]
impl KubeApi for FakeKube {
    async fn create_token(
        &self,
        namespace: &str,
        name: &str,
        ttl: Duration,
    ) -> Result<TokenStatus> {
        self.record("create_token", format!("{}/{}", namespace, name))?;
        Ok(TokenStatus {
            token: format!("token-{}-{}-{}", namespace, name, ttl.as_secs()),
            expiration_timestamp: None,
        })
    }

    async fn create_service_account(
        &self,
        namespace: &str,
        name: &str,
        _metadata: &Metadata,
        _owner: Option<&OwnerReference>,
    ) -> Result<OwnerReference> {
        self.record("create_service_account", format!("{}/{}", namespace, name))?;
        self.state
            .lock()
            .unwrap()
            .service_accounts
            .insert((namespace.to_string(), name.to_string()));
        Ok(OwnerReference {
            api_version: "v1".to_string(),
            kind: "ServiceAccount".to_string(),
            name: name.to_string(),
            uid: "sa-uid".to_string(),
        })
    }

    async fn delete_service_account(&self, namespace: &str, name: &str) -> Result<()> {
        self.record("delete_service_account", format!("{}/{}", namespace, name))?;
        // not-found is success
        self.state
            .lock()
            .unwrap()
            .service_accounts
            .remove(&(namespace.to_string(), name.to_string()));
        Ok(())
    }

    async fn create_role(
        &self,
        namespace: &str,
        name: &str,
        role_type: RoleType,
        _rules: &[PolicyRule],
        _metadata: &Metadata,
    ) -> Result<OwnerReference> {
        let ns = scoped_ns(namespace, role_type == RoleType::ClusterRole);
        self.record("create_role", format!("{}/{}", ns, name))?;
        self.state
            .lock()
            .unwrap()
            .roles
            .insert((ns, name.to_string(), role_type.to_string()));
        Ok(OwnerReference {
            api_version: "rbac.authorization.k8s.io/v1".to_string(),
            kind: role_type.to_string(),
            name: name.to_string(),
            uid: "role-uid".to_string(),
        })
    }

    async fn delete_role(&self, namespace: &str, name: &str, role_type: RoleType) -> Result<()> {
        let ns = scoped_ns(namespace, role_type == RoleType::ClusterRole);
        self.record("delete_role", format!("{}/{}", ns, name))?;
        self.state
            .lock()
            .unwrap()
            .roles
            .remove(&(ns, name.to_string(), role_type.to_string()));
        Ok(())
    }

    async fn create_role_binding(
        &self,
        namespace: &str,
        name: &str,
        _role_ref_name: &str,
        _role_type: RoleType,
        is_cluster: bool,
        _metadata: &Metadata,
        _owner: Option<&OwnerReference>,
    ) -> Result<OwnerReference> {
        let ns = scoped_ns(namespace, is_cluster);
        self.record("create_role_binding", format!("{}/{}", ns, name))?;
        self.state
            .lock()
            .unwrap()
            .bindings
            .insert((ns, name.to_string(), is_cluster));
        Ok(OwnerReference {
            api_version: "rbac.authorization.k8s.io/v1".to_string(),
            kind: if is_cluster {
                "ClusterRoleBinding"
            } else {
                "RoleBinding"
            }
            .to_string(),
            name: name.to_string(),
            uid: "binding-uid".to_string(),
        })
    }

    async fn delete_role_binding(
        &self,
        namespace: &str,
        name: &str,
        is_cluster: bool,
    ) -> Result<()> {
        let ns = scoped_ns(namespace, is_cluster);
        self.record("delete_role_binding", format!("{}/{}", ns, name))?;
        self.state
            .lock()
            .unwrap()
            .bindings
            .remove(&(ns, name.to_string(), is_cluster));
        Ok(())
    }
}

fn scoped_ns(namespace: &str, is_cluster: bool) -> String {
    if is_cluster {
        String::new()
    } else {
        namespace.to_string()
    }
}

/// Backend wired to a fake cluster and in-memory storage.
pub fn test_backend() -> (Arc<FakeKube>, Arc<MemoryStorage>, Backend) {
    let kube = FakeKube::new();
    let storage = Arc::new(MemoryStorage::new());
    let backend = Backend::with_client(
        storage.clone(),
        kube.clone(),
        Duration::from_secs(3600), // system default lease TTL
    );
    (kube, storage, backend)
}
