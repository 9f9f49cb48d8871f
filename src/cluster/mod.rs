//! Cluster handle used by the rollback helpers
//!
//! The `Cluster` trait is the only way rollback code touches the cluster.
//! Production code uses `KubeCluster`; tests use `MockCluster`, which records
//! every call for ordering assertions.

pub mod kube_cluster;
pub mod timeout;

pub use kube_cluster::KubeCluster;
pub use timeout::{parse_duration, with_timeout};

use async_trait::async_trait;
use kube::core::DynamicObject;
use kube::ResourceExt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Invalid timeout {0:?}: expected a duration like 30s, 5m or 1h")]
    InvalidTimeout(String),

    #[error("Cluster call did not finish within {0}")]
    TimedOut(String),

    #[error("Object {0:?} has no apiVersion/kind")]
    MissingTypeMeta(String),

    #[error("Object has no metadata.name")]
    MissingName,
}

/// Identity of an object to delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectTarget {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    /// Falls back to the handle's default namespace when `None`
    pub namespace: Option<String>,
}

impl ObjectTarget {
    /// Target an object of the same type and namespace as `object`, under `name`
    ///
    /// Returns `None` for objects without type metadata.
    pub fn renamed(object: &DynamicObject, name: impl Into<String>) -> Option<Self> {
        let types = object.types.as_ref()?;
        Some(ObjectTarget {
            api_version: types.api_version.clone(),
            kind: types.kind.clone(),
            name: name.into(),
            namespace: object.namespace(),
        })
    }
}

impl std::fmt::Display for ObjectTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{} in {}", self.kind, self.name, ns),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// Cluster-mutating calls used during rejection
///
/// `timeout` is passed through untouched from the caller; implementations
/// decide how to enforce it.
#[async_trait]
pub trait Cluster: Send + Sync {
    /// Create or update objects, in order
    async fn apply(&self, objects: &[DynamicObject], timeout: Option<&str>)
        -> Result<(), ClusterError>;

    /// Delete objects, in order; objects that are already gone are not an error
    async fn delete(&self, targets: &[ObjectTarget], timeout: Option<&str>)
        -> Result<(), ClusterError>;
}

/// A call recorded by `MockCluster`
#[cfg(test)]
#[derive(Debug, Clone)]
pub enum ClusterCall {
    Apply {
        objects: Vec<DynamicObject>,
        timeout: Option<String>,
    },
    Delete {
        targets: Vec<ObjectTarget>,
        timeout: Option<String>,
    },
}

/// Mock cluster for testing - stores calls in memory
#[cfg(test)]
#[allow(clippy::expect_used)]
pub struct MockCluster {
    calls: std::sync::Mutex<Vec<ClusterCall>>,
    fail_apply: bool,
    fail_delete: bool,
}

#[cfg(test)]
impl Default for MockCluster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl MockCluster {
    pub fn new() -> Self {
        MockCluster {
            calls: std::sync::Mutex::new(Vec::new()),
            fail_apply: false,
            fail_delete: false,
        }
    }

    /// Every apply call fails (after being recorded)
    pub fn failing_apply() -> Self {
        MockCluster {
            fail_apply: true,
            ..Self::new()
        }
    }

    /// Every delete call fails (after being recorded)
    pub fn failing_delete() -> Self {
        MockCluster {
            fail_delete: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<ClusterCall> {
        self.calls.lock().expect("MockCluster lock poisoned").clone()
    }

    fn record(&self, call: ClusterCall) {
        self.calls
            .lock()
            .expect("MockCluster lock poisoned")
            .push(call);
    }
}

#[cfg(test)]
#[async_trait]
impl Cluster for MockCluster {
    async fn apply(
        &self,
        objects: &[DynamicObject],
        timeout: Option<&str>,
    ) -> Result<(), ClusterError> {
        self.record(ClusterCall::Apply {
            objects: objects.to_vec(),
            timeout: timeout.map(str::to_string),
        });
        if self.fail_apply {
            return Err(ClusterError::TimedOut("mock".to_string()));
        }
        Ok(())
    }

    async fn delete(
        &self,
        targets: &[ObjectTarget],
        timeout: Option<&str>,
    ) -> Result<(), ClusterError> {
        self.record(ClusterCall::Delete {
            targets: targets.to_vec(),
            timeout: timeout.map(str::to_string),
        });
        if self.fail_delete {
            return Err(ClusterError::TimedOut("mock".to_string()));
        }
        Ok(())
    }
}
