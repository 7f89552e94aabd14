//! KubernetesCluster adapter: creates a batch `Job` manifest via `k8s-openapi` types and submits
//! it through the `kubectl` CLI.

use k8s_openapi::api::batch::v1::{Job as K8sJob, JobSpec as K8sJobSpec};
use k8s_openapi::api::core::v1::{
    Container as K8sContainer, EnvVar, PodSpec, PodTemplateSpec, ResourceRequirements, Toleration,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

use crate::{
    error::CalibanError,
    kubectl::{self, Kubectl},
};

use super::{labels, BackendAdapter, CancellationToken, JobSpec, JobStatus, StopOutcome, SubmitResult};

pub struct KubernetesCluster {
    server: String,
}

impl KubernetesCluster {
    pub fn new(server: &str) -> Self {
        KubernetesCluster {
            server: server.to_string(),
        }
    }

    fn kubectl(&self) -> Kubectl<'_> {
        Kubectl::new(&self.server)
    }

    fn build_manifest(&self, spec: &JobSpec, generate_name: &str) -> K8sJob {
        let mut resource_limits = BTreeMap::new();
        if spec.resources.accelerator.count > 0 {
            resource_limits.insert(
                "nvidia.com/gpu".to_string(),
                Quantity(spec.resources.accelerator.count.to_string()),
            );
        }
        if let Some(cpu_millis) = spec.resources.cpu_millis {
            resource_limits.insert("cpu".to_string(), Quantity(format!("{cpu_millis}m")));
        }
        if let Some(memory) = spec.resources.memory {
            resource_limits.insert("memory".to_string(), Quantity(memory.to_string()));
        }

        let tolerations = if spec.resources.accelerator.count > 0 {
            Some(vec![Toleration {
                key: Some("nvidia.com/gpu".to_string()),
                operator: Some("Exists".to_string()),
                effect: Some("NoSchedule".to_string()),
                ..Default::default()
            }])
        } else {
            None
        };

        let mut argv = spec.entrypoint.clone();
        argv.extend(spec.argv.iter().cloned());

        let auto_labels = BTreeMap::from([
            ("launched-by".to_string(), whoami::username()),
            ("app.kubernetes.io/managed-by".to_string(), "caliban".to_string()),
        ]);
        let merged_labels = labels::sanitize_and_merge(
            &auto_labels.into_iter().collect(),
            &spec.options.labels,
        );
        let annotations = BTreeMap::from([
            (kubectl::annotation::VERSION.to_string(), crate::version::VERSION.to_string()),
            (kubectl::annotation::LAUNCHED_BY.to_string(), whoami::username()),
        ]);

        K8sJob {
            metadata: ObjectMeta {
                generate_name: Some(format!("{generate_name}-")),
                namespace: Some(kubectl::NAMESPACE.to_string()),
                labels: Some(merged_labels.clone().into_iter().collect()),
                annotations: Some(annotations.into_iter().collect()),
                ..Default::default()
            },
            spec: Some(K8sJobSpec {
                backoff_limit: Some(0),
                ttl_seconds_after_finished: Some(86400),
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(merged_labels.into_iter().collect()),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        restart_policy: Some("Never".to_string()),
                        tolerations,
                        containers: vec![K8sContainer {
                            name: "main".to_string(),
                            image: Some(spec.image_reference.clone()),
                            command: Some(argv),
                            env: Some(vec![EnvVar {
                                name: "GIT_PYTHON_REFRESH".to_string(),
                                value: Some("QUIET".to_string()),
                                ..Default::default()
                            }]),
                            resources: Some(ResourceRequirements {
                                limits: Some(resource_limits.into_iter().collect()),
                                ..Default::default()
                            }),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

impl BackendAdapter for KubernetesCluster {
    fn validate(&self, spec: &JobSpec) -> Result<(), CalibanError> {
        if spec.resources.accelerator.count > 8 {
            return Err(CalibanError::ValidationError {
                message: format!(
                    "requested {count} accelerators exceeds the largest node pool (8)",
                    count = spec.resources.accelerator.count
                ),
                suggestion: Some("valid counts: 1, 2, 4, 8".to_string()),
            });
        }
        Ok(())
    }

    fn submit(&self, spec: &JobSpec, cancel: &CancellationToken) -> Result<SubmitResult, CalibanError> {
        cancel.check()?;

        let generate_name = kubectl::to_rfc_1035_label_lossy(&spec.name_hint)
            .map(|cow| cow.into_owned())
            .unwrap_or_else(|| "job".to_string());

        let manifest = self.build_manifest(spec, &generate_name);
        let manifest_yaml = serde_yaml::to_string(&manifest)
            .map_err(|err| CalibanError::RecipeInvalid(err.to_string()))?;

        let handle = self
            .kubectl()
            .create(&manifest_yaml)
            .map_err(CalibanError::from)?;

        Ok(SubmitResult {
            backend_handle: handle.name.clone(),
            details: serde_json::json!({ "namespace": handle.namespace, "name": handle.name }),
        })
    }

    fn query(&self, backend_handle: &str, previous_status: JobStatus) -> Result<JobStatus, CalibanError> {
        let job = self
            .kubectl()
            .try_get_job(kubectl::NAMESPACE, backend_handle)
            .map_err(CalibanError::from)?;

        let Some(job) = job else {
            // A missing job is ambiguous: it could have been deleted by an explicit stop, or
            // reaped by `ttl_seconds_after_finished` after succeeding. Only report STOPPED when
            // the registry already recorded this job as stopped; otherwise we genuinely don't
            // know what happened to it.
            return Ok(if previous_status == JobStatus::Stopped {
                JobStatus::Stopped
            } else {
                JobStatus::Unknown
            });
        };

        if job.status.succeeded.unwrap_or(0) > 0 {
            return Ok(JobStatus::Succeeded);
        }
        if job
            .status
            .conditions
            .iter()
            .any(|c| matches!(c.r#type, kubectl::JobConditionType::Failed) && c.status)
        {
            return Ok(JobStatus::Failed);
        }
        if job.status.active.unwrap_or(0) > 0 {
            return Ok(JobStatus::Running);
        }

        Ok(JobStatus::Submitted)
    }

    fn stop(&self, backend_handle: &str) -> Result<StopOutcome, CalibanError> {
        match self.query(backend_handle, JobStatus::Unknown) {
            Ok(status) if status.is_terminal() => return Ok(StopOutcome::StoppedNoChange),
            _ => {}
        }
        self.kubectl()
            .delete_job(backend_handle, kubectl::NAMESPACE)
            .map_err(CalibanError::from)?;
        Ok(StopOutcome::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AcceleratorRequest, BackendOptions, ResourceRequest};
    use crate::build::Mode;

    fn spec(accelerator_count: u32) -> JobSpec {
        JobSpec {
            image_reference: "registry.io/img:latest".to_string(),
            entrypoint: vec!["python".to_string(), "-m".to_string(), "pkg.main".to_string()],
            argv: vec!["--epochs".to_string(), "2".to_string()],
            mode: Mode::Gpu,
            resources: ResourceRequest {
                cpu_millis: None,
                memory: None,
                accelerator: AcceleratorRequest {
                    count: accelerator_count,
                    memory: None,
                },
            },
            options: BackendOptions::default(),
            name_hint: "my-job".to_string(),
        }
    }

    #[test]
    fn validate_rejects_excessive_accelerator_count() {
        let adapter = KubernetesCluster::new("https://example.com");
        assert!(adapter.validate(&spec(16)).is_err());
    }

    #[test]
    fn manifest_sets_gpu_resource_limit_and_toleration() {
        let adapter = KubernetesCluster::new("https://example.com");
        let manifest = adapter.build_manifest(&spec(2), "my-job");
        let pod_spec = manifest.spec.unwrap().template.spec.unwrap();
        assert!(pod_spec.tolerations.is_some());
        let container = &pod_spec.containers[0];
        let limits = container.resources.as_ref().unwrap().limits.as_ref().unwrap();
        assert_eq!(limits.get("nvidia.com/gpu").unwrap().0, "2");
    }

    #[test]
    fn manifest_without_accelerator_has_no_toleration() {
        let adapter = KubernetesCluster::new("https://example.com");
        let manifest = adapter.build_manifest(&spec(0), "my-job");
        let pod_spec = manifest.spec.unwrap().template.spec.unwrap();
        assert!(pod_spec.tolerations.is_none());
    }
}
