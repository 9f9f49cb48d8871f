//! Canary rejection: remove canary and baseline twins
//!
//! A canary rollout runs `<name>-canary` and `<name>-baseline` next to the
//! stable `<name>`. Rejecting it deletes the twins and leaves the stable
//! objects untouched.

use super::StrategyError;
use crate::cluster::{Cluster, ObjectTarget};
use crate::manifest::{
    is_service, is_workload, parse_manifests, suffixed, BASELINE_SUFFIX, CANARY_SUFFIX,
};
use kube::core::DynamicObject;
use kube::ResourceExt;
use tracing::info;

/// Canary and baseline objects derived from the applied manifests
///
/// Workload twins are always included; Service twins only when
/// `include_services` is set (SMI canaries create them, pod canaries do not).
pub fn canary_and_baseline_targets(
    objects: &[DynamicObject],
    include_services: bool,
) -> Vec<ObjectTarget> {
    objects
        .iter()
        .filter(|object| is_workload(object) || (include_services && is_service(object)))
        .flat_map(|object| {
            let name = object.name_any();
            [CANARY_SUFFIX, BASELINE_SUFFIX]
                .into_iter()
                .filter_map(move |suffix| ObjectTarget::renamed(object, suffixed(&name, suffix)))
        })
        .collect()
}

/// Delete canary and baseline workloads, plus their Services if asked
///
/// Issues a single delete call carrying every target; no call is made when
/// the manifests produce no targets.
pub async fn delete_canary_deployment(
    cluster: &dyn Cluster,
    manifests: &[String],
    include_services: bool,
    timeout: Option<&str>,
) -> Result<(), StrategyError> {
    let objects = parse_manifests(manifests)?;
    let targets = canary_and_baseline_targets(&objects, include_services);

    if targets.is_empty() {
        info!("No canary or baseline objects to delete");
        return Ok(());
    }

    info!(
        targets = targets.len(),
        include_services = include_services,
        "Deleting canary and baseline objects"
    );
    cluster.delete(&targets, timeout).await?;

    Ok(())
}
