use kube::Client;
use kulta_reject::cluster::kube_cluster::KubeCluster;
use kulta_reject::config::ActionConfig;
use kulta_reject::controller::{reject, Context};
use kulta_reject::manifest::load_manifest_files;
use kulta_reject::types::DeploymentStrategy;
use tracing::{error, info, warn};

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => Ok("SIGTERM"),
        _ = sigint.recv() => Ok("SIGINT"),
    }
}

/// Wait for Ctrl+C (Windows)
#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("CTRL_C")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting KULTA reject action");

    let config = match ActionConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Invalid action inputs");
            return Err(e.into());
        }
    };

    // An unknown strategy is rejected before anything touches the cluster
    let strategy = match config.strategy.as_deref() {
        Some(raw) => Some(raw.parse::<DeploymentStrategy>()?),
        None => None,
    };

    let manifests = load_manifest_files(&config.manifests)?;
    info!(
        manifests = manifests.len(),
        namespace = %config.namespace,
        strategy = ?strategy,
        "Loaded manifests"
    );

    // Idempotent; the kube client needs a process-wide crypto provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    let client = match Client::try_default().await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Failed to create Kubernetes client");
            return Err(e.into());
        }
    };
    info!("Connected to Kubernetes cluster");

    let ctx = Context::new(
        KubeCluster::new(client, &config.namespace),
        config.reject.clone(),
    );

    tokio::select! {
        result = reject(&ctx, &manifests, strategy, config.timeout.as_deref()) => {
            match result {
                Ok(()) => {
                    info!("Rollout rejected");
                    Ok(())
                }
                Err(e) => {
                    error!(error = %e, "Rejection failed");
                    Err(e.into())
                }
            }
        }
        signal = wait_for_signal() => {
            let signal = signal?;
            warn!(signal = signal, "Interrupted - rejection may be incomplete");
            Err(anyhow::anyhow!("rejection interrupted by {}", signal))
        }
    }
}
