//! Storage key layout for the host-backed key/value store.

/// Prefix under which role definitions are stored, keyed by role name.
pub const ROLES_PREFIX: &str = "roles/";

/// Prefix under which write-ahead-log entries are stored, keyed by WAL id.
pub const WAL_PREFIX: &str = "wal/";

/// Key holding the Kubernetes connection configuration.
pub const CONFIG_KEY: &str = "config";
