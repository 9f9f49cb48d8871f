//! Manifest parsing and naming conventions
//!
//! Manifests arrive as raw YAML text (one or more documents per entry) and are
//! parsed into `DynamicObject`s so every helper can work with any kind, CRDs
//! included, without a typed model per resource.

pub mod grouping;

pub use grouping::{group_manifests, BlueGreenManifests};

use kube::core::DynamicObject;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Suffix of the canary twin of a workload or Service
pub const CANARY_SUFFIX: &str = "-canary";
/// Suffix of the baseline twin of a workload or Service
pub const BASELINE_SUFFIX: &str = "-baseline";
/// Suffix of the Service that selects only stable pods
pub const STABLE_SUFFIX: &str = "-stable";
/// Suffix of the green twin in a blue-green rollout
pub const GREEN_SUFFIX: &str = "-green";

/// Label that records which side of a blue-green rollout an object belongs to
pub const COLOR_LABEL: &str = "k8s.deploy.color";
/// Color of the stable side
pub const NONE_LABEL_VALUE: &str = "None";

const WORKLOAD_KINDS: [&str; 5] = ["deployment", "replicaset", "statefulset", "daemonset", "pod"];

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Manifest {index} is not valid YAML: {source}")]
    Yaml {
        index: usize,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Manifest {index} has an object without apiVersion/kind")]
    MissingTypeMeta { index: usize },

    #[error("Manifest {index} has a {kind} without metadata.name")]
    MissingName { index: usize, kind: String },

    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parse raw manifest texts into objects, in input order
///
/// Each entry may hold several `---` separated documents. Empty documents
/// are skipped; anything else must be a named object with apiVersion/kind.
///
/// # Errors
/// Returns the first malformed document, tagged with its manifest index.
pub fn parse_manifests(manifests: &[String]) -> Result<Vec<DynamicObject>, ManifestError> {
    let mut objects = Vec::new();

    for (index, text) in manifests.iter().enumerate() {
        for document in serde_yaml::Deserializer::from_str(text) {
            let value = serde_yaml::Value::deserialize(document)
                .map_err(|source| ManifestError::Yaml { index, source })?;

            if value.is_null() {
                continue;
            }

            let object: DynamicObject = serde_yaml::from_value(value)
                .map_err(|source| ManifestError::Yaml { index, source })?;

            let kind = match &object.types {
                Some(types) if !types.kind.is_empty() && !types.api_version.is_empty() => {
                    types.kind.clone()
                }
                _ => return Err(ManifestError::MissingTypeMeta { index }),
            };

            if object.metadata.name.as_deref().unwrap_or_default().is_empty() {
                return Err(ManifestError::MissingName { index, kind });
            }

            objects.push(object);
        }
    }

    debug!(
        manifests = manifests.len(),
        objects = objects.len(),
        "Parsed manifests"
    );
    Ok(objects)
}

/// Read manifest files, expanding directories to their YAML/JSON files
///
/// Directory entries are read in file-name order so the resulting sequence
/// is deterministic.
pub fn load_manifest_files(paths: &[PathBuf]) -> Result<Vec<String>, ManifestError> {
    let mut manifests = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut files = Vec::new();
            for entry in std::fs::read_dir(path).map_err(|source| io_error(path, source))? {
                let file = entry.map_err(|source| io_error(path, source))?.path();
                if file.is_file() && has_manifest_extension(&file) {
                    files.push(file);
                }
            }
            files.sort();

            for file in files {
                manifests.push(read_manifest(&file)?);
            }
        } else {
            manifests.push(read_manifest(path)?);
        }
    }

    Ok(manifests)
}

fn read_manifest(path: &Path) -> Result<String, ManifestError> {
    std::fs::read_to_string(path).map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: std::io::Error) -> ManifestError {
    ManifestError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn has_manifest_extension(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml" | "json")
    )
}

/// Kind of a parsed object (empty if the object has no type metadata)
pub fn kind_of(object: &DynamicObject) -> &str {
    object
        .types
        .as_ref()
        .map(|t| t.kind.as_str())
        .unwrap_or_default()
}

/// Workloads that get canary/baseline/green twins
pub fn is_workload(object: &DynamicObject) -> bool {
    let kind = kind_of(object).to_ascii_lowercase();
    WORKLOAD_KINDS.contains(&kind.as_str())
}

pub fn is_service(object: &DynamicObject) -> bool {
    kind_of(object).eq_ignore_ascii_case("service")
}

pub fn is_ingress(object: &DynamicObject) -> bool {
    kind_of(object).eq_ignore_ascii_case("ingress")
}

/// Name of a derived object, e.g. `suffixed("app", GREEN_SUFFIX)` is `app-green`
pub fn suffixed(name: &str, suffix: &str) -> String {
    format!("{name}{suffix}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "manifest_test.rs"]
mod tests;
