//! SMI TrafficSplit helpers
//!
//! Canary rollouts with the `smi` traffic split method front every Service
//! `<svc>` with a TrafficSplit `<svc>-workflow-rollout` weighting the stable,
//! baseline and canary Services. Rejection rewrites it so the stable Service
//! takes all traffic, before anything is deleted.

use super::StrategyError;
use crate::cluster::Cluster;
use crate::manifest::{
    is_service, parse_manifests, suffixed, BASELINE_SUFFIX, CANARY_SUFFIX, STABLE_SUFFIX,
};
use kube::api::GroupVersionKind;
use kube::core::DynamicObject;
use kube::discovery::ApiResource;
use kube::ResourceExt;
use serde_json::json;
use tracing::info;

pub const TRAFFIC_SPLIT_GROUP: &str = "split.smi-spec.io";
pub const TRAFFIC_SPLIT_VERSION: &str = "v1alpha3";
pub const TRAFFIC_SPLIT_KIND: &str = "TrafficSplit";

/// Suffix of the TrafficSplit created for canary rollouts
pub const CANARY_TRAFFIC_SPLIT_SUFFIX: &str = "-workflow-rollout";

/// ApiResource for SMI TrafficSplits
pub fn traffic_split_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(
        TRAFFIC_SPLIT_GROUP,
        TRAFFIC_SPLIT_VERSION,
        TRAFFIC_SPLIT_KIND,
    ))
}

/// Build a TrafficSplit for `root_service` with weighted backends
///
/// # Arguments
/// * `name` - TrafficSplit name
/// * `namespace` - Namespace, or `None` for the handle's default
/// * `root_service` - Service clients address
/// * `backends` - `(service, weight)` pairs, in order
pub fn build_traffic_split(
    name: &str,
    namespace: Option<&str>,
    root_service: &str,
    backends: &[(String, i32)],
) -> DynamicObject {
    let backends = backends
        .iter()
        .map(|(service, weight)| json!({ "service": service, "weight": weight }))
        .collect::<Vec<_>>();

    let mut split = DynamicObject::new(name, &traffic_split_resource()).data(json!({
        "spec": {
            "service": root_service,
            "backends": backends
        }
    }));
    split.metadata.namespace = namespace.map(str::to_string);
    split
}

/// TrafficSplit sending all of `service`'s traffic to its stable twin
pub fn stable_canary_traffic_split(service: &DynamicObject) -> DynamicObject {
    let name = service.name_any();

    build_traffic_split(
        &suffixed(&name, CANARY_TRAFFIC_SPLIT_SUFFIX),
        service.namespace().as_deref(),
        &name,
        &[
            (suffixed(&name, STABLE_SUFFIX), 100),
            (suffixed(&name, BASELINE_SUFFIX), 0),
            (suffixed(&name, CANARY_SUFFIX), 0),
        ],
    )
}

/// Shift 100% of canary TrafficSplit weight to the stable Services
pub async fn redirect_traffic_to_stable_deployment(
    cluster: &dyn Cluster,
    manifests: &[String],
    timeout: Option<&str>,
) -> Result<(), StrategyError> {
    let splits = parse_manifests(manifests)?
        .iter()
        .filter(|object| is_service(object))
        .map(stable_canary_traffic_split)
        .collect::<Vec<_>>();

    if splits.is_empty() {
        info!("No Services in manifests - no TrafficSplit to redirect");
        return Ok(());
    }

    info!(
        traffic_splits = splits.len(),
        "Redirecting TrafficSplits to stable Services"
    );
    cluster.apply(&splits, timeout).await?;

    Ok(())
}
