//! Blue-green rejection
//!
//! A blue-green rollout runs a full green twin (`<name>-green`) next to each
//! stable workload and flips routing to it on promotion. Rejection points
//! routing back at the stable side, then removes the green objects.
//!
//! Three routing mechanisms are supported:
//! - Ingress: ingress rules reference the stable Services
//! - Service: Service selectors pick the stable pods
//! - SMI: a TrafficSplit per Service weights stable against green

use super::smi::{build_traffic_split, traffic_split_resource};
use super::StrategyError;
use crate::cluster::{Cluster, ObjectTarget};
use crate::manifest::{
    suffixed, BlueGreenManifests, COLOR_LABEL, GREEN_SUFFIX, NONE_LABEL_VALUE, STABLE_SUFFIX,
};
use kube::core::DynamicObject;
use kube::ResourceExt;
use serde_json::Value;
use tracing::info;

/// Suffix of the TrafficSplit created for blue-green rollouts
pub const BLUE_GREEN_TRAFFIC_SPLIT_SUFFIX: &str = "-trafficsplit";

/// Copy of `object` labelled as the stable (`None`) side
fn with_stable_color(object: &DynamicObject) -> DynamicObject {
    let mut object = object.clone();
    object
        .labels_mut()
        .insert(COLOR_LABEL.to_string(), NONE_LABEL_VALUE.to_string());
    object
}

/// Copy of `ingress` whose backends all reference stable Services
///
/// Backends already pointing at a green Service are rewritten to its stable
/// counterpart through `service_name_map`.
pub fn ingress_routed_to_stable(
    ingress: &DynamicObject,
    manifests: &BlueGreenManifests,
) -> DynamicObject {
    let mut ingress = with_stable_color(ingress);

    if let Some(spec) = ingress.data.get_mut("spec") {
        route_backends_to_stable(spec, manifests);
    }

    ingress
}

fn route_backends_to_stable(spec: &mut Value, manifests: &BlueGreenManifests) {
    if let Some(backend) = spec.get_mut("defaultBackend") {
        rewrite_backend(backend, manifests);
    }

    let Some(rules) = spec.get_mut("rules").and_then(Value::as_array_mut) else {
        return;
    };

    for rule in rules {
        let paths = rule
            .get_mut("http")
            .and_then(|http| http.get_mut("paths"))
            .and_then(Value::as_array_mut);

        for path in paths.into_iter().flatten() {
            if let Some(backend) = path.get_mut("backend") {
                rewrite_backend(backend, manifests);
            }
        }
    }
}

fn rewrite_backend(backend: &mut Value, manifests: &BlueGreenManifests) {
    let Some(service) = backend.get_mut("service") else {
        return;
    };

    let stable = service
        .get("name")
        .and_then(Value::as_str)
        .and_then(|name| manifests.stable_service_for(name));

    if let Some(stable) = stable {
        service["name"] = Value::String(stable.to_string());
    }
}

/// Copy of `service` whose selector picks only stable pods
pub fn service_routed_to_stable(service: &DynamicObject) -> DynamicObject {
    let mut service = with_stable_color(service);

    let selector = service
        .data
        .get_mut("spec")
        .and_then(|spec| spec.get_mut("selector"))
        .and_then(Value::as_object_mut);

    if let Some(selector) = selector {
        selector.insert(
            COLOR_LABEL.to_string(),
            Value::String(NONE_LABEL_VALUE.to_string()),
        );
    }

    service
}

/// TrafficSplit sending all of `service`'s traffic to its stable twin
pub fn stable_blue_green_traffic_split(service: &DynamicObject) -> DynamicObject {
    let name = service.name_any();

    build_traffic_split(
        &suffixed(&name, BLUE_GREEN_TRAFFIC_SPLIT_SUFFIX),
        service.namespace().as_deref(),
        &name,
        &[
            (suffixed(&name, STABLE_SUFFIX), 100),
            (suffixed(&name, GREEN_SUFFIX), 0),
        ],
    )
}

/// Green twins of the given objects
fn green_targets(objects: &[DynamicObject]) -> Vec<ObjectTarget> {
    objects
        .iter()
        .filter_map(|object| {
            ObjectTarget::renamed(object, suffixed(&object.name_any(), GREEN_SUFFIX))
        })
        .collect()
}

async fn apply_if_any(
    cluster: &dyn Cluster,
    objects: &[DynamicObject],
    timeout: Option<&str>,
) -> Result<(), StrategyError> {
    if !objects.is_empty() {
        cluster.apply(objects, timeout).await?;
    }
    Ok(())
}

async fn delete_if_any(
    cluster: &dyn Cluster,
    targets: &[ObjectTarget],
    timeout: Option<&str>,
) -> Result<(), StrategyError> {
    if !targets.is_empty() {
        cluster.delete(targets, timeout).await?;
    }
    Ok(())
}

/// Route ingresses back to the stable Services, then delete green objects
pub async fn reject_ingress(
    cluster: &dyn Cluster,
    manifests: &BlueGreenManifests,
    timeout: Option<&str>,
) -> Result<(), StrategyError> {
    let ingresses = manifests
        .ingresses
        .iter()
        .map(|ingress| ingress_routed_to_stable(ingress, manifests))
        .collect::<Vec<_>>();

    info!(
        ingresses = ingresses.len(),
        "Routing ingresses to stable Services"
    );
    apply_if_any(cluster, &ingresses, timeout).await?;

    let mut green = green_targets(&manifests.deployments);
    green.extend(green_targets(&manifests.services));

    info!(objects = green.len(), "Deleting green workloads and Services");
    delete_if_any(cluster, &green, timeout).await
}

/// Route Service selectors back to stable pods, then delete green workloads
pub async fn reject_service(
    cluster: &dyn Cluster,
    manifests: &BlueGreenManifests,
    timeout: Option<&str>,
) -> Result<(), StrategyError> {
    let services = manifests
        .services
        .iter()
        .map(service_routed_to_stable)
        .collect::<Vec<_>>();

    info!(services = services.len(), "Routing Services to stable workloads");
    apply_if_any(cluster, &services, timeout).await?;

    let green = green_targets(&manifests.deployments);
    info!(workloads = green.len(), "Deleting green workloads");
    delete_if_any(cluster, &green, timeout).await
}

/// Route TrafficSplits back to stable, delete green workloads, then clean up
///
/// Cleanup removes the TrafficSplits and the `-green`/`-stable` Services
/// created for the rollout; the original Services stay.
pub async fn reject_smi(
    cluster: &dyn Cluster,
    manifests: &BlueGreenManifests,
    timeout: Option<&str>,
) -> Result<(), StrategyError> {
    let splits = manifests
        .services
        .iter()
        .map(stable_blue_green_traffic_split)
        .collect::<Vec<_>>();

    info!(
        traffic_splits = splits.len(),
        "Routing TrafficSplits to stable Services"
    );
    apply_if_any(cluster, &splits, timeout).await?;

    let green = green_targets(&manifests.deployments);
    info!(workloads = green.len(), "Deleting green workloads");
    delete_if_any(cluster, &green, timeout).await?;

    let split_resource = traffic_split_resource();
    let mut cleanup = Vec::new();
    for service in &manifests.services {
        let name = service.name_any();
        cleanup.push(ObjectTarget {
            api_version: split_resource.api_version.clone(),
            kind: split_resource.kind.clone(),
            name: suffixed(&name, BLUE_GREEN_TRAFFIC_SPLIT_SUFFIX),
            namespace: service.namespace(),
        });
        cleanup.extend(ObjectTarget::renamed(service, suffixed(&name, GREEN_SUFFIX)));
        cleanup.extend(ObjectTarget::renamed(service, suffixed(&name, STABLE_SUFFIX)));
    }

    info!(
        objects = cleanup.len(),
        "Cleaning up TrafficSplits and extra Services"
    );
    delete_if_any(cluster, &cleanup, timeout).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
#[path = "blue_green_test.rs"]
mod tests;
