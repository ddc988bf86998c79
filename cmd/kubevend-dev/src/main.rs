use clap::Parser;
use pkg_engine::Backend;
use pkg_kube::KubeConfig;
use pkg_state::{StateStore, Storage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Development harness for the kubevend engine. In production the engine is
/// embedded in a secrets-management host that owns storage, leases, and the
/// recovery schedule; this binary stands in for that host so the engine can
/// be exercised against a real cluster.
#[derive(Parser, Debug)]
#[command(name = "kubevend-dev", about = "kubevend engine dev harness (WAL sweep loop)")]
struct Cli {
    /// Directory for the SlateDB state store
    #[arg(long, default_value = "./kubevend-data")]
    data_dir: String,

    /// Kubernetes API server URL (falls back to in-cluster env when empty)
    #[arg(long, default_value = "")]
    kubernetes_host: String,

    /// Bearer JWT for the engine's own API access (falls back to the
    /// in-cluster service-account mount when empty)
    #[arg(long, default_value = "")]
    service_account_jwt: String,

    /// PEM CA bundle for the API server (falls back to the in-cluster mount)
    #[arg(long, default_value = "")]
    kubernetes_ca_cert: String,

    /// Do not fall back to the in-cluster CA/JWT mount
    #[arg(long)]
    disable_local_ca_jwt: bool,

    /// Seconds between WAL recovery sweeps
    #[arg(long, default_value = "60")]
    sweep_interval: u64,

    /// Default lease TTL in seconds when neither request nor role sets one
    #[arg(long, default_value = "3600")]
    default_lease_ttl: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let store = StateStore::open(&cli.data_dir).await?;
    let storage: Arc<dyn Storage> = Arc::new(store);
    let backend = Backend::new(storage, Duration::from_secs(cli.default_lease_ttl));

    let missing = backend.check();
    if !missing.is_empty() && cli.kubernetes_host.is_empty() {
        warn!("Missing environment variables: {}", missing.join(", "));
    }

    if !cli.kubernetes_host.is_empty()
        || !cli.service_account_jwt.is_empty()
        || !cli.kubernetes_ca_cert.is_empty()
        || cli.disable_local_ca_jwt
    {
        backend
            .write_config(KubeConfig {
                kubernetes_host: cli.kubernetes_host,
                kubernetes_ca_cert: cli.kubernetes_ca_cert,
                service_account_jwt: cli.service_account_jwt,
                disable_local_ca_jwt: cli.disable_local_ca_jwt,
            })
            .await?;
    }

    info!(
        "Starting WAL recovery sweep (interval={}s)",
        cli.sweep_interval
    );
    let mut interval = tokio::time::interval(Duration::from_secs(cli.sweep_interval));
    loop {
        interval.tick().await;
        match backend.process_wal().await {
            Ok(0) => {}
            Ok(n) => info!("WAL sweep retired {} entries", n),
            Err(e) => warn!("WAL sweep error: {:#}", e),
        }
    }
}
