use super::{with_timeout, Cluster, ClusterError, ObjectTarget};
use async_trait::async_trait;
use kube::api::{Api, DeleteParams, GroupVersionKind, Patch, PatchParams};
use kube::core::DynamicObject;
use kube::discovery::{pinned_kind, Scope};
use kube::{Client, ResourceExt};
use tracing::{debug, error, info};

/// Field manager recorded on server-side applied objects
pub const FIELD_MANAGER: &str = "kulta-reject";

/// Cluster handle backed by the Kubernetes API
///
/// Types are resolved through discovery per call, so any kind the API server
/// serves (TrafficSplit included) can be applied or deleted.
pub struct KubeCluster {
    client: Client,
    namespace: String,
}

impl KubeCluster {
    /// Create a handle; objects without a namespace land in `namespace`
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        KubeCluster {
            client,
            namespace: namespace.into(),
        }
    }

    async fn api_for(
        &self,
        api_version: &str,
        kind: &str,
        namespace: Option<&str>,
    ) -> Result<Api<DynamicObject>, ClusterError> {
        let gvk = parse_gvk(api_version, kind);
        let (resource, capabilities) = pinned_kind(&self.client, &gvk).await?;

        let api = match capabilities.scope {
            Scope::Namespaced => Api::namespaced_with(
                self.client.clone(),
                namespace.unwrap_or(&self.namespace),
                &resource,
            ),
            Scope::Cluster => Api::all_with(self.client.clone(), &resource),
        };
        Ok(api)
    }

    async fn apply_all(&self, objects: &[DynamicObject]) -> Result<(), ClusterError> {
        let params = PatchParams::apply(FIELD_MANAGER).force();

        for object in objects {
            let name = object
                .metadata
                .name
                .as_deref()
                .ok_or(ClusterError::MissingName)?;
            let types = object
                .types
                .as_ref()
                .ok_or_else(|| ClusterError::MissingTypeMeta(name.to_string()))?;

            let api = self
                .api_for(&types.api_version, &types.kind, object.namespace().as_deref())
                .await?;

            match api.patch(name, &params, &Patch::Apply(object)).await {
                Ok(_) => {
                    info!(kind = %types.kind, name = %name, "Applied object");
                }
                Err(e) => {
                    error!(error = ?e, kind = %types.kind, name = %name, "Failed to apply object");
                    return Err(e.into());
                }
            }
        }

        Ok(())
    }

    async fn delete_all(&self, targets: &[ObjectTarget]) -> Result<(), ClusterError> {
        for target in targets {
            let api = self
                .api_for(&target.api_version, &target.kind, target.namespace.as_deref())
                .await?;

            match api.delete(&target.name, &DeleteParams::default()).await {
                Ok(_) => {
                    info!(target = %target, "Deleted object");
                }
                Err(kube::Error::Api(err)) if err.code == 404 => {
                    // Already gone - nothing left to roll back
                    debug!(target = %target, "Object not found - skipping delete");
                }
                Err(e) => {
                    error!(error = ?e, target = %target, "Failed to delete object");
                    return Err(e.into());
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Cluster for KubeCluster {
    async fn apply(
        &self,
        objects: &[DynamicObject],
        timeout: Option<&str>,
    ) -> Result<(), ClusterError> {
        with_timeout(timeout, self.apply_all(objects)).await
    }

    async fn delete(
        &self,
        targets: &[ObjectTarget],
        timeout: Option<&str>,
    ) -> Result<(), ClusterError> {
        with_timeout(timeout, self.delete_all(targets)).await
    }
}

/// Split `group/version` (or a bare core `version`) into a GroupVersionKind
pub fn parse_gvk(api_version: &str, kind: &str) -> GroupVersionKind {
    match api_version.split_once('/') {
        Some((group, version)) => GroupVersionKind::gvk(group, version, kind),
        None => GroupVersionKind::gvk("", api_version, kind),
    }
}
