//! Credential issuance orchestrator.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use pkg_constants::kube::DEFAULT_NAME_TEMPLATE;
use pkg_types::rbac::parse_rules;
use pkg_types::request::CredsRequest;
use pkg_types::role::{RoleEntry, RoleType};

use crate::name::{NameInputs, render_name};
use crate::revoke::RevocationData;
use crate::wal::{WalEntry, WalSet, wal_expiration};
use crate::{Backend, EngineError};

/// TTL bounds handed to the host's lease engine alongside the credential.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaseSettings {
    pub ttl: Duration,
    /// Cap enforced by the host's lease engine, from the role's
    /// `token_max_ttl`; `None` when the role leaves it unbounded.
    pub max_ttl: Option<Duration>,
}

/// A vended credential plus everything needed to reverse it later.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub service_account_namespace: String,
    pub service_account_name: String,
    pub service_account_token: String,
    pub lease: LeaseSettings,
    /// Bookkeeping the host stores with the lease and replays into
    /// [`Backend::revoke`] on expiry.
    pub revocation: RevocationData,
    /// Set when the credential was issued but retiring its WAL entries
    /// failed; the credential is usable, the stale entries will age out of
    /// the recovery sweep.
    pub wal_cleanup_error: Option<String>,
}

impl Backend {
    /// Issue credentials for `request` against its named role.
    ///
    /// Validation happens before any remote call. Depending on the role's
    /// target this requests a bare token, or builds the object chain with a
    /// WAL entry logged ahead of each create. On a mid-chain failure nothing
    /// is rolled back inline; the WAL sweep cleans up out of band, which
    /// avoids stacking a second failure-prone remote call onto the error
    /// path.
    pub async fn issue(&self, request: &CredsRequest) -> Result<IssuedCredential> {
        let role = self
            .read_role(&request.role_name)
            .await
            .context("error retrieving role")?
            .ok_or_else(|| {
                EngineError::Validation(format!("role {:?} does not exist", request.role_name))
            })?;

        if request.kubernetes_namespace.is_empty() {
            return Err(
                EngineError::Validation("'kubernetes_namespace' is required".to_string()).into(),
            );
        }
        if !role.allows_namespace(&request.kubernetes_namespace) {
            return Err(EngineError::Validation(format!(
                "kubernetes_namespace '{}' is not present in role's allowed_kubernetes_namespaces",
                request.kubernetes_namespace
            ))
            .into());
        }
        if request.cluster_role_binding && role.kubernetes_role_type == RoleType::Role {
            return Err(
                EngineError::Validation("a ClusterRoleBinding cannot ref a Role".to_string())
                    .into(),
            );
        }

        let client = self.client().await?;
        let namespace = request.kubernetes_namespace.as_str();
        let metadata = &role.additional_metadata;

        // One generated name shared by every object in the chain.
        let template = if role.name_template.is_empty() {
            DEFAULT_NAME_TEMPLATE
        } else {
            role.name_template.as_str()
        };
        let gen_name = render_name(
            template,
            &NameInputs {
                role_name: &role.name,
                display_name: &request.display_name,
            },
        )?;

        let ttl = self.resolve_ttl(&role, request);

        let mut wal = WalSet::new();
        let mut revocation = RevocationData {
            role: role.name.clone(),
            service_account_namespace: namespace.to_string(),
            cluster_role_binding: request.cluster_role_binding,
            created_service_account: String::new(),
            created_role_binding: String::new(),
            created_role: String::new(),
            created_role_type: role.kubernetes_role_type,
        };

        let service_account_name = if !role.service_account_name.is_empty() {
            // Token for an existing service account; nothing created, nothing
            // to roll back.
            role.service_account_name.clone()
        } else if !role.kubernetes_role_name.is_empty() {
            // Bind a new service account to an existing Role/ClusterRole.
            // The binding is created first and owns the service account.
            wal.log(
                self.storage.as_ref(),
                &WalEntry::RoleBinding {
                    namespace: namespace.to_string(),
                    name: gen_name.clone(),
                    is_cluster: request.cluster_role_binding,
                    expiration: wal_expiration(),
                },
            )
            .await?;
            let binding_ref = client
                .create_role_binding(
                    namespace,
                    &gen_name,
                    &role.kubernetes_role_name,
                    role.kubernetes_role_type,
                    request.cluster_role_binding,
                    metadata,
                    None,
                )
                .await
                .with_context(|| {
                    format!(
                        "failed to create RoleBinding/ClusterRoleBinding '{}' for {}",
                        gen_name, role.kubernetes_role_name
                    )
                })?;
            revocation.created_role_binding = gen_name.clone();

            wal.log(
                self.storage.as_ref(),
                &WalEntry::ServiceAccount {
                    namespace: namespace.to_string(),
                    name: gen_name.clone(),
                    expiration: wal_expiration(),
                },
            )
            .await?;
            client
                .create_service_account(namespace, &gen_name, metadata, Some(&binding_ref))
                .await
                .with_context(|| {
                    format!("failed to create service account '{}/{}'", namespace, gen_name)
                })?;
            revocation.created_service_account = gen_name.clone();

            gen_name.clone()
        } else if !role.generated_role_rules.is_empty() {
            // Generate the full chain. The new Role/ClusterRole owns the
            // binding, the binding owns the service account, so remote
            // garbage collection backs up explicit revocation.
            let rules = parse_rules(&role.generated_role_rules)
                .map_err(|e| EngineError::Validation(e.to_string()))?;

            wal.log(
                self.storage.as_ref(),
                &WalEntry::Role {
                    namespace: namespace.to_string(),
                    name: gen_name.clone(),
                    role_type: role.kubernetes_role_type,
                    expiration: wal_expiration(),
                },
            )
            .await?;
            let role_ref = client
                .create_role(
                    namespace,
                    &gen_name,
                    role.kubernetes_role_type,
                    &rules,
                    metadata,
                )
                .await
                .with_context(|| {
                    format!(
                        "failed to create {} '{}/{}'",
                        role.kubernetes_role_type, namespace, gen_name
                    )
                })?;
            revocation.created_role = gen_name.clone();

            wal.log(
                self.storage.as_ref(),
                &WalEntry::RoleBinding {
                    namespace: namespace.to_string(),
                    name: gen_name.clone(),
                    is_cluster: request.cluster_role_binding,
                    expiration: wal_expiration(),
                },
            )
            .await?;
            let binding_ref = client
                .create_role_binding(
                    namespace,
                    &gen_name,
                    &gen_name,
                    role.kubernetes_role_type,
                    request.cluster_role_binding,
                    metadata,
                    Some(&role_ref),
                )
                .await
                .with_context(|| {
                    format!(
                        "failed to create RoleBinding/ClusterRoleBinding '{}' for {}",
                        gen_name, gen_name
                    )
                })?;
            revocation.created_role_binding = gen_name.clone();

            wal.log(
                self.storage.as_ref(),
                &WalEntry::ServiceAccount {
                    namespace: namespace.to_string(),
                    name: gen_name.clone(),
                    expiration: wal_expiration(),
                },
            )
            .await?;
            client
                .create_service_account(namespace, &gen_name, metadata, Some(&binding_ref))
                .await
                .with_context(|| {
                    format!("failed to create service account '{}/{}'", namespace, gen_name)
                })?;
            revocation.created_service_account = gen_name.clone();

            gen_name.clone()
        } else {
            return Err(EngineError::Validation(
                "one of service_account_name, kubernetes_role_name, or generated_role_rules must be set"
                    .to_string(),
            )
            .into());
        };

        let token = client
            .create_token(namespace, &service_account_name, ttl)
            .await
            .with_context(|| {
                format!(
                    "failed to create a service account token for {}/{}",
                    namespace, service_account_name
                )
            })?;

        // The chain is complete; retire every intent entry from this call.
        // A retire failure does not invalidate the credential, but the
        // caller is told cleanup is pending.
        let wal_cleanup_error = match wal.retire(self.storage.as_ref()).await {
            Ok(()) => None,
            Err(e) => {
                warn!("issued credential but WAL retirement failed: {:#}", e);
                Some(format!("{:#}", e))
            }
        };

        info!(
            "Issued credentials for role {} in namespace {} (service account {})",
            role.name, namespace, service_account_name
        );

        Ok(IssuedCredential {
            service_account_namespace: namespace.to_string(),
            service_account_name,
            service_account_token: token.token,
            lease: LeaseSettings {
                ttl,
                max_ttl: (role.token_max_ttl > 0)
                    .then(|| Duration::from_secs(role.token_max_ttl)),
            },
            revocation,
            wal_cleanup_error,
        })
    }

    /// Issued credentials are never renewable; the host should re-issue.
    pub fn renew(&self, _internal: &RevocationData) -> Result<IssuedCredential> {
        Err(EngineError::RenewalUnsupported.into())
    }

    /// First non-zero wins: request override, role default, system default.
    fn resolve_ttl(&self, role: &RoleEntry, request: &CredsRequest) -> Duration {
        match request.ttl {
            Some(ttl) if !ttl.is_zero() => ttl,
            _ if role.token_ttl > 0 => Duration::from_secs(role.token_ttl),
            _ => self.default_lease_ttl,
        }
    }
}
