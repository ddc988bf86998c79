//! Kubernetes API access constants.

/// Env var holding the in-cluster API server host.
pub const K8S_SERVICE_HOST_ENV: &str = "KUBERNETES_SERVICE_HOST";

/// Env var holding the in-cluster API server HTTPS port.
pub const K8S_SERVICE_PORT_ENV: &str = "KUBERNETES_SERVICE_PORT_HTTPS";

/// CA bundle mounted into every pod by the kubelet.
pub const LOCAL_CA_CERT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Projected service-account token mounted into every pod.
pub const LOCAL_JWT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// API group/version for RBAC objects.
pub const RBAC_API_VERSION: &str = "rbac.authorization.k8s.io/v1";

/// Name template applied when a role does not configure its own.
/// Rendered names are lowercased and truncated to the Kubernetes 63-char limit.
pub const DEFAULT_NAME_TEMPLATE: &str = "v-{{display_name}}-{{role_name}}-{{unix_time}}-{{random 8}}";
