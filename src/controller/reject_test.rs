use super::*;
use crate::cluster::{ClusterCall, ClusterError, MockCluster};
use crate::manifest::BlueGreenManifests;
use async_trait::async_trait;
use std::sync::Mutex;

const BASELINE_DEPLOYMENT: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web-baseline
spec:
  template:
    metadata:
      labels:
        app: web
"#;

const BLUE_GREEN_MANIFESTS: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  template:
    metadata:
      labels:
        app: web
---
apiVersion: v1
kind: Service
metadata:
  name: web-svc
spec:
  selector:
    app: web
---
apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: web-ingress
spec:
  defaultBackend:
    service:
      name: web-svc
"#;

/// Call recorded by `RecordingOps`
#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Redirect {
        timeout: Option<String>,
    },
    DeleteCanary {
        include_services: bool,
        timeout: Option<String>,
    },
    RejectIngress {
        deployments: usize,
        services: usize,
        ingresses: usize,
    },
    RejectSmi,
    RejectService,
}

/// RollbackOps double that records calls and can fail the redirect step
#[derive(Default)]
struct RecordingOps {
    calls: Mutex<Vec<Call>>,
    fail_redirect: bool,
}

impl RecordingOps {
    fn failing_redirect() -> Self {
        RecordingOps {
            fail_redirect: true,
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("RecordingOps lock poisoned").clone()
    }

    fn record(&self, call: Call) {
        self.calls
            .lock()
            .expect("RecordingOps lock poisoned")
            .push(call);
    }
}

#[async_trait]
impl RollbackOps for RecordingOps {
    async fn delete_canary_deployment(
        &self,
        _cluster: &dyn Cluster,
        _manifests: &[String],
        include_services: bool,
        timeout: Option<&str>,
    ) -> Result<(), StrategyError> {
        self.record(Call::DeleteCanary {
            include_services,
            timeout: timeout.map(str::to_string),
        });
        Ok(())
    }

    async fn redirect_traffic_to_stable_deployment(
        &self,
        _cluster: &dyn Cluster,
        _manifests: &[String],
        timeout: Option<&str>,
    ) -> Result<(), StrategyError> {
        self.record(Call::Redirect {
            timeout: timeout.map(str::to_string),
        });
        if self.fail_redirect {
            return Err(ClusterError::TimedOut("10m".to_string()).into());
        }
        Ok(())
    }

    async fn reject_ingress(
        &self,
        _cluster: &dyn Cluster,
        manifests: &BlueGreenManifests,
        _timeout: Option<&str>,
    ) -> Result<(), StrategyError> {
        self.record(Call::RejectIngress {
            deployments: manifests.deployments.len(),
            services: manifests.services.len(),
            ingresses: manifests.ingresses.len(),
        });
        Ok(())
    }

    async fn reject_service(
        &self,
        _cluster: &dyn Cluster,
        _manifests: &BlueGreenManifests,
        _timeout: Option<&str>,
    ) -> Result<(), StrategyError> {
        self.record(Call::RejectService);
        Ok(())
    }

    async fn reject_smi(
        &self,
        _cluster: &dyn Cluster,
        _manifests: &BlueGreenManifests,
        _timeout: Option<&str>,
    ) -> Result<(), StrategyError> {
        self.record(Call::RejectSmi);
        Ok(())
    }
}

fn inputs(traffic_split_method: Option<&str>, route_method: Option<&str>) -> RejectInputs {
    RejectInputs {
        traffic_split_method: traffic_split_method.map(str::to_string),
        route_method: route_method.map(str::to_string),
    }
}

fn recording_context(inputs: RejectInputs) -> (Context, Arc<RecordingOps>, Arc<MockCluster>) {
    let ops = Arc::new(RecordingOps::default());
    let cluster = Arc::new(MockCluster::new());
    let ctx = Context::with_ops(cluster.clone(), ops.clone(), inputs);
    (ctx, ops, cluster)
}

fn manifests(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| t.to_string()).collect()
}

#[tokio::test]
async fn test_reject_without_strategy_fails_before_any_call() {
    let (ctx, ops, cluster) = recording_context(inputs(Some("smi"), Some("ingress")));

    let result = reject(&ctx, &manifests(&[BASELINE_DEPLOYMENT]), None, None).await;

    match result {
        Err(RejectError::MissingStrategy) => {}
        other => panic!("expected missing strategy, got {other:?}"),
    }
    assert!(ops.calls().is_empty());
    assert!(cluster.calls().is_empty());
}

#[tokio::test]
async fn test_reject_canary_smi_redirects_before_deleting() {
    let (ctx, ops, _) = recording_context(inputs(Some("smi"), None));

    reject(
        &ctx,
        &manifests(&[BASELINE_DEPLOYMENT]),
        Some(DeploymentStrategy::Canary),
        Some("5m"),
    )
    .await
    .unwrap();

    assert_eq!(
        ops.calls(),
        vec![
            Call::Redirect {
                timeout: Some("5m".to_string())
            },
            Call::DeleteCanary {
                include_services: true,
                timeout: Some("5m".to_string())
            },
        ]
    );
}

#[tokio::test]
async fn test_reject_canary_pod_only_deletes_workloads() {
    for method in ["pod", "none", "POD"] {
        let (ctx, ops, _) = recording_context(inputs(Some(method), None));

        reject(
            &ctx,
            &manifests(&[BASELINE_DEPLOYMENT]),
            Some(DeploymentStrategy::Canary),
            None,
        )
        .await
        .unwrap();

        assert_eq!(
            ops.calls(),
            vec![Call::DeleteCanary {
                include_services: false,
                timeout: None
            }],
            "traffic split method {method}"
        );
    }
}

#[tokio::test]
async fn test_reject_canary_redirect_failure_skips_delete() {
    let ops = Arc::new(RecordingOps::failing_redirect());
    let ctx = Context::with_ops(
        Arc::new(MockCluster::new()),
        ops.clone(),
        inputs(Some("smi"), None),
    );

    let result = reject(
        &ctx,
        &manifests(&[BASELINE_DEPLOYMENT]),
        Some(DeploymentStrategy::Canary),
        None,
    )
    .await;

    assert!(matches!(result, Err(RejectError::StrategyError(_))));
    assert_eq!(ops.calls(), vec![Call::Redirect { timeout: None }]);
}

#[tokio::test]
async fn test_reject_canary_requires_traffic_split_method() {
    for method in [None, Some(""), Some("linkerd")] {
        let (ctx, ops, _) = recording_context(inputs(method, Some("ingress")));

        let result = reject(
            &ctx,
            &manifests(&[BASELINE_DEPLOYMENT]),
            Some(DeploymentStrategy::Canary),
            None,
        )
        .await;

        assert!(
            matches!(result, Err(RejectError::ConfigError(_))),
            "traffic split method {method:?}"
        );
        assert!(ops.calls().is_empty());
    }
}

#[tokio::test]
async fn test_reject_blue_green_ingress_calls_only_ingress_revert() {
    let (ctx, ops, _) = recording_context(inputs(None, Some("ingress")));

    reject(
        &ctx,
        &manifests(&[BLUE_GREEN_MANIFESTS]),
        Some(DeploymentStrategy::BlueGreen),
        None,
    )
    .await
    .unwrap();

    assert_eq!(
        ops.calls(),
        vec![Call::RejectIngress {
            deployments: 1,
            services: 1,
            ingresses: 1
        }]
    );
}

#[tokio::test]
async fn test_reject_blue_green_smi_calls_only_smi_revert() {
    let (ctx, ops, _) = recording_context(inputs(None, Some("smi")));

    reject(
        &ctx,
        &manifests(&[BLUE_GREEN_MANIFESTS]),
        Some(DeploymentStrategy::BlueGreen),
        None,
    )
    .await
    .unwrap();

    assert_eq!(ops.calls(), vec![Call::RejectSmi]);
}

#[tokio::test]
async fn test_reject_blue_green_falls_back_to_service_revert() {
    for method in ["service", "gateway", "SERVICE", "istio"] {
        let (ctx, ops, _) = recording_context(inputs(None, Some(method)));

        reject(
            &ctx,
            &manifests(&[BLUE_GREEN_MANIFESTS]),
            Some(DeploymentStrategy::BlueGreen),
            None,
        )
        .await
        .unwrap();

        assert_eq!(ops.calls(), vec![Call::RejectService], "route method {method}");
    }
}

#[tokio::test]
async fn test_reject_blue_green_requires_route_method() {
    let (ctx, ops, _) = recording_context(inputs(Some("smi"), None));

    let result = reject(
        &ctx,
        &manifests(&[BLUE_GREEN_MANIFESTS]),
        Some(DeploymentStrategy::BlueGreen),
        None,
    )
    .await;

    assert!(matches!(
        result,
        Err(RejectError::ConfigError(ConfigError::MissingInput(_)))
    ));
    assert!(ops.calls().is_empty());
}

#[tokio::test]
async fn test_reject_blue_green_malformed_manifests_skip_revert() {
    let (ctx, ops, cluster) = recording_context(inputs(None, Some("ingress")));

    let result = reject(
        &ctx,
        &manifests(&["kind: [unclosed"]),
        Some(DeploymentStrategy::BlueGreen),
        None,
    )
    .await;

    assert!(matches!(result, Err(RejectError::ManifestError(_))));
    assert!(ops.calls().is_empty());
    assert!(cluster.calls().is_empty());
}

#[tokio::test]
async fn test_reject_blue_green_empty_manifests_still_dispatches() {
    let (ctx, ops, _) = recording_context(inputs(None, Some("service")));

    reject(&ctx, &[], Some(DeploymentStrategy::BlueGreen), None)
        .await
        .unwrap();

    assert_eq!(ops.calls(), vec![Call::RejectService]);
}

// End-to-end through the production helpers against a recording cluster

#[tokio::test]
async fn test_reject_canary_smi_end_to_end_call_order() {
    let cluster = Arc::new(MockCluster::new());
    let ctx = Context::with_ops(
        cluster.clone(),
        Arc::new(ClusterRollbackOps),
        inputs(Some("smi"), None),
    );
    let texts = manifests(&[
        BASELINE_DEPLOYMENT,
        "apiVersion: v1\nkind: Service\nmetadata:\n  name: web-svc\n",
    ]);

    reject(&ctx, &texts, Some(DeploymentStrategy::Canary), Some("1m"))
        .await
        .unwrap();

    let calls = cluster.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(&calls[0], ClusterCall::Apply { objects, .. } if objects.len() == 1));
    match &calls[1] {
        ClusterCall::Delete { targets, timeout } => {
            let names: Vec<&str> = targets.iter().map(|t| t.name.as_str()).collect();
            assert_eq!(
                names,
                vec![
                    "web-baseline-canary",
                    "web-baseline-baseline",
                    "web-svc-canary",
                    "web-svc-baseline",
                ]
            );
            assert_eq!(timeout.as_deref(), Some("1m"));
        }
        other => panic!("expected delete, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reject_blue_green_service_end_to_end() {
    let cluster = Arc::new(MockCluster::new());
    let ctx = Context::with_ops(
        cluster.clone(),
        Arc::new(ClusterRollbackOps),
        inputs(None, Some("service")),
    );

    reject(
        &ctx,
        &manifests(&[BLUE_GREEN_MANIFESTS]),
        Some(DeploymentStrategy::BlueGreen),
        None,
    )
    .await
    .unwrap();

    let calls = cluster.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(&calls[0], ClusterCall::Apply { .. }));
    match &calls[1] {
        ClusterCall::Delete { targets, .. } => assert_eq!(targets[0].name, "web-green"),
        other => panic!("expected delete, got {other:?}"),
    }
}

#[test]
fn test_context_new_uses_cluster_helpers() {
    let ctx = Context::new(MockCluster::new(), inputs(Some("pod"), None));
    assert_eq!(ctx.inputs.traffic_split_method.as_deref(), Some("pod"));
}
