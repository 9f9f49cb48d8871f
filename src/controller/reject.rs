use crate::cluster::Cluster;
use crate::config::{ConfigError, RejectInputs};
use crate::controller::strategies::{ClusterRollbackOps, RollbackOps, StrategyError};
use crate::manifest::{group_manifests, ManifestError};
use crate::types::{DeploymentStrategy, RouteStrategy, TrafficSplitMethod};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, info_span, Instrument};

#[derive(Debug, Error)]
pub enum RejectError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("No deployment strategy given")]
    MissingStrategy,

    #[error("Invalid manifests: {0}")]
    ManifestError(#[from] ManifestError),

    #[error("Rollback step failed: {0}")]
    StrategyError(#[from] StrategyError),
}

pub struct Context {
    pub cluster: Arc<dyn Cluster>,
    pub ops: Arc<dyn RollbackOps>,
    /// Options the workflows resolve their sub-mode from
    pub inputs: RejectInputs,
}

impl Context {
    /// Create a Context using the production rollback helpers
    pub fn new(cluster: impl Cluster + 'static, inputs: RejectInputs) -> Self {
        Context {
            cluster: Arc::new(cluster),
            ops: Arc::new(ClusterRollbackOps),
            inputs,
        }
    }

    /// Create a Context with custom rollback operations
    pub fn with_ops(
        cluster: Arc<dyn Cluster>,
        ops: Arc<dyn RollbackOps>,
        inputs: RejectInputs,
    ) -> Self {
        Context {
            cluster,
            ops,
            inputs,
        }
    }
}

/// Reject an in-flight rollout
///
/// Selects the rollback workflow for `strategy`:
/// 1. Canary → delete canary/baseline objects (redirecting SMI traffic first)
/// 2. Blue-green → revert routing to the stable workload
///
/// # Arguments
/// * `ctx` - Cluster handle, rollback operations and inputs
/// * `manifests` - Raw manifests of the rollout being rejected
/// * `strategy` - Deployment strategy; `None` fails with `MissingStrategy`
/// * `timeout` - Passed unchanged to every cluster call
///
/// # Errors
/// An absent strategy fails before any cluster call is made. Any failing
/// step aborts the remaining steps; nothing already done is compensated.
pub async fn reject(
    ctx: &Context,
    manifests: &[String],
    strategy: Option<DeploymentStrategy>,
    timeout: Option<&str>,
) -> Result<(), RejectError> {
    match strategy {
        Some(DeploymentStrategy::Canary) => reject_canary(ctx, manifests, timeout).await,
        Some(DeploymentStrategy::BlueGreen) => reject_blue_green(ctx, manifests, timeout).await,
        None => Err(RejectError::MissingStrategy),
    }
}

/// Reject a canary rollout
///
/// With SMI traffic splitting, traffic is moved back to stable before the
/// canary and baseline objects (Services included) are deleted. Without it,
/// only the workloads are deleted.
pub async fn reject_canary(
    ctx: &Context,
    manifests: &[String],
    timeout: Option<&str>,
) -> Result<(), RejectError> {
    let traffic_split_method = ctx.inputs.traffic_split_method()?;
    let mut include_services = false;

    if traffic_split_method == TrafficSplitMethod::Smi {
        include_services = true;

        async {
            info!("Rejecting deployment with SMI canary strategy");
            ctx.ops
                .redirect_traffic_to_stable_deployment(ctx.cluster.as_ref(), manifests, timeout)
                .await
        }
        .instrument(info_span!("smi_redirect", strategy = "canary"))
        .await?;
    }

    async {
        info!(
            include_services = include_services,
            "Deleting baseline and canary workloads"
        );
        ctx.ops
            .delete_canary_deployment(ctx.cluster.as_ref(), manifests, include_services, timeout)
            .await
    }
    .instrument(info_span!("delete_canary", strategy = "canary"))
    .await?;

    Ok(())
}

/// Reject a blue-green rollout
///
/// Exactly one routing reversion runs, chosen by the route method; Service
/// selector reversion is the fallback.
pub async fn reject_blue_green(
    ctx: &Context,
    manifests: &[String],
    timeout: Option<&str>,
) -> Result<(), RejectError> {
    let route_strategy = ctx.inputs.route_strategy()?;

    async {
        info!(
            route_method = %route_strategy,
            "Rejecting deployment with blue green strategy"
        );
        let bundle = group_manifests(manifests)?;
        let cluster = ctx.cluster.as_ref();

        match route_strategy {
            RouteStrategy::Ingress => ctx.ops.reject_ingress(cluster, &bundle, timeout).await?,
            RouteStrategy::Smi => ctx.ops.reject_smi(cluster, &bundle, timeout).await?,
            RouteStrategy::Service => ctx.ops.reject_service(cluster, &bundle, timeout).await?,
        }

        Ok::<(), RejectError>(())
    }
    .instrument(info_span!("reject_blue_green", route_method = %route_strategy))
    .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "reject_test.rs"]
mod tests;
