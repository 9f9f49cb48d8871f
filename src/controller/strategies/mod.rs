//! Rollback helpers for each rollout mechanism
//!
//! This module defines the RollbackOps trait and the helpers behind it:
//! - canary: delete canary and baseline workloads (and optionally Services)
//! - smi: redirect SMI TrafficSplits back to the stable workload
//! - blue_green: revert ingress, Service selector or TrafficSplit routing

pub mod blue_green;
pub mod canary;
pub mod smi;

use crate::cluster::{Cluster, ClusterError};
use crate::manifest::{BlueGreenManifests, ManifestError};
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by rollback helpers
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("Cluster call failed: {0}")]
    ClusterError(#[from] ClusterError),

    #[error("Invalid manifests: {0}")]
    ManifestError(#[from] ManifestError),
}

/// Rollback operations the reject workflows sequence
///
/// Each method performs one logical rollback step against `cluster`. The
/// `timeout` is passed through to every cluster call unchanged.
///
/// # Ordering
/// Implementations must finish all of their cluster calls before returning,
/// so callers can rely on "returned Ok" meaning "step completed".
#[async_trait]
pub trait RollbackOps: Send + Sync {
    /// Delete canary and baseline workloads, plus their Services if asked
    async fn delete_canary_deployment(
        &self,
        cluster: &dyn Cluster,
        manifests: &[String],
        include_services: bool,
        timeout: Option<&str>,
    ) -> Result<(), StrategyError>;

    /// Send 100% of mesh traffic back to the stable workload
    async fn redirect_traffic_to_stable_deployment(
        &self,
        cluster: &dyn Cluster,
        manifests: &[String],
        timeout: Option<&str>,
    ) -> Result<(), StrategyError>;

    /// Point ingress rules back at the stable Services
    async fn reject_ingress(
        &self,
        cluster: &dyn Cluster,
        manifests: &BlueGreenManifests,
        timeout: Option<&str>,
    ) -> Result<(), StrategyError>;

    /// Point Service selectors back at the stable workload
    async fn reject_service(
        &self,
        cluster: &dyn Cluster,
        manifests: &BlueGreenManifests,
        timeout: Option<&str>,
    ) -> Result<(), StrategyError>;

    /// Point blue-green TrafficSplits back at the stable workload
    async fn reject_smi(
        &self,
        cluster: &dyn Cluster,
        manifests: &BlueGreenManifests,
        timeout: Option<&str>,
    ) -> Result<(), StrategyError>;
}

/// Production rollback operations, built from the helpers in this module
pub struct ClusterRollbackOps;

#[async_trait]
impl RollbackOps for ClusterRollbackOps {
    async fn delete_canary_deployment(
        &self,
        cluster: &dyn Cluster,
        manifests: &[String],
        include_services: bool,
        timeout: Option<&str>,
    ) -> Result<(), StrategyError> {
        canary::delete_canary_deployment(cluster, manifests, include_services, timeout).await
    }

    async fn redirect_traffic_to_stable_deployment(
        &self,
        cluster: &dyn Cluster,
        manifests: &[String],
        timeout: Option<&str>,
    ) -> Result<(), StrategyError> {
        smi::redirect_traffic_to_stable_deployment(cluster, manifests, timeout).await
    }

    async fn reject_ingress(
        &self,
        cluster: &dyn Cluster,
        manifests: &BlueGreenManifests,
        timeout: Option<&str>,
    ) -> Result<(), StrategyError> {
        blue_green::reject_ingress(cluster, manifests, timeout).await
    }

    async fn reject_service(
        &self,
        cluster: &dyn Cluster,
        manifests: &BlueGreenManifests,
        timeout: Option<&str>,
    ) -> Result<(), StrategyError> {
        blue_green::reject_service(cluster, manifests, timeout).await
    }

    async fn reject_smi(
        &self,
        cluster: &dyn Cluster,
        manifests: &BlueGreenManifests,
        timeout: Option<&str>,
    ) -> Result<(), StrategyError> {
        blue_green::reject_smi(cluster, manifests, timeout).await
    }
}
