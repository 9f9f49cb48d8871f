use super::{
    is_ingress, is_service, is_workload, kind_of, parse_manifests, suffixed, ManifestError,
    COLOR_LABEL, GREEN_SUFFIX,
};
use kube::core::DynamicObject;
use kube::ResourceExt;
use serde_json::Value;
use std::collections::BTreeMap;

/// Manifest objects grouped for blue-green rejection
///
/// Built fresh from the raw manifests on every call and never mutated by the
/// helpers that consume it; they derive new objects from it instead.
#[derive(Debug, Clone, Default)]
pub struct BlueGreenManifests {
    /// Workloads (Deployment, ReplicaSet, StatefulSet, DaemonSet, Pod)
    pub deployments: Vec<DynamicObject>,

    /// Services whose selector targets one of `deployments`
    pub services: Vec<DynamicObject>,

    /// Services that do not front any workload in the bundle
    pub unrouted_services: Vec<DynamicObject>,

    pub ingresses: Vec<DynamicObject>,

    /// Routed Service name -> name of its green twin
    pub service_name_map: BTreeMap<String, String>,
}

impl BlueGreenManifests {
    /// Look up the stable Service for a green Service name
    pub fn stable_service_for(&self, green_name: &str) -> Option<&str> {
        self.service_name_map
            .iter()
            .find(|(_, green)| green.as_str() == green_name)
            .map(|(stable, _)| stable.as_str())
    }
}

/// Parse manifests and group them into a `BlueGreenManifests` bundle
///
/// # Errors
/// Fails on malformed manifest text, see [`parse_manifests`].
pub fn group_manifests(manifests: &[String]) -> Result<BlueGreenManifests, ManifestError> {
    let objects = parse_manifests(manifests)?;

    let mut bundle = BlueGreenManifests::default();
    let mut services = Vec::new();

    for object in objects {
        if is_workload(&object) {
            bundle.deployments.push(object);
        } else if is_service(&object) {
            services.push(object);
        } else if is_ingress(&object) {
            bundle.ingresses.push(object);
        }
    }

    for service in services {
        let routed = bundle
            .deployments
            .iter()
            .any(|workload| selector_matches(&service, workload));

        if routed {
            let name = service.name_any();
            bundle
                .service_name_map
                .insert(name.clone(), suffixed(&name, GREEN_SUFFIX));
            bundle.services.push(service);
        } else {
            bundle.unrouted_services.push(service);
        }
    }

    Ok(bundle)
}

/// Does the Service selector pick the workload's pods?
///
/// The color label is ignored: a Service that was already switched to one
/// side still fronts the same workload.
fn selector_matches(service: &DynamicObject, workload: &DynamicObject) -> bool {
    let Some(selector) = service.data["spec"]["selector"].as_object() else {
        return false;
    };

    let labels = pod_labels(workload);
    let mut matched_any = false;

    for (key, value) in selector {
        if key == COLOR_LABEL {
            continue;
        }
        if labels.get(key).map(|l| l.as_str()) != value.as_str() {
            return false;
        }
        matched_any = true;
    }

    matched_any
}

/// Labels carried by the pods a workload creates
fn pod_labels(workload: &DynamicObject) -> BTreeMap<String, String> {
    if kind_of(workload).eq_ignore_ascii_case("pod") {
        return workload.labels().clone();
    }

    match &workload.data["spec"]["template"]["metadata"]["labels"] {
        Value::Object(map) => map
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect(),
        _ => BTreeMap::new(),
    }
}
