//! CloudTraining adapter: submits jobs to a managed training service over HTTP. Client-side
//! validation against a static compatibility table, with bounded exponential-backoff retry on
//! rate-limited submissions.

use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff};
use log::{debug, warn};

use crate::error::CalibanError;

use super::{labels, BackendAdapter, CancellationToken, JobSpec, JobStatus, StopOutcome, SubmitResult};

/// `(region, accelerator_type, valid accelerator counts)`. A real deployment would load this
/// from the backend's capacity API; a static table keeps client-side validation available
/// without a network round trip.
const COMPATIBILITY: &[(&str, &str, &[u32])] = &[
    ("us-central1", "V100", &[1, 2, 4, 8]),
    ("us-central1", "A100", &[1, 2, 4, 8, 16]),
    ("europe-west4", "V100", &[1, 2, 4, 8]),
];

pub struct CloudTraining {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl CloudTraining {
    pub fn new() -> Self {
        CloudTraining {
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("failed to build HTTP client"),
            base_url: "https://cloudtraining.example.com".to_string(),
        }
    }

    fn validate_accelerator(&self, spec: &JobSpec) -> Result<(), CalibanError> {
        let region = spec.options.region.as_deref().unwrap_or("us-central1");
        let accelerator_count = spec.resources.accelerator.count;
        if accelerator_count == 0 {
            return Ok(());
        }
        let accelerator_type = spec.options.machine_type.as_deref().unwrap_or("V100");

        let Some((_, _, valid_counts)) = COMPATIBILITY
            .iter()
            .find(|(r, a, _)| *r == region && *a == accelerator_type)
        else {
            return Err(CalibanError::ValidationError {
                message: format!("region `{region}` does not offer accelerator `{accelerator_type}`"),
                suggestion: Some(
                    COMPATIBILITY
                        .iter()
                        .map(|(r, a, _)| format!("{r}/{a}"))
                        .collect::<Vec<_>>()
                        .join(", "),
                ),
            });
        };

        if !valid_counts.contains(&accelerator_count) {
            return Err(CalibanError::ValidationError {
                message: format!(
                    "`{accelerator_count}x{accelerator_type}` is not offered in `{region}`"
                ),
                suggestion: Some(format!("valid counts: {valid_counts:?}")),
            });
        }

        Ok(())
    }
}

impl Default for CloudTraining {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendAdapter for CloudTraining {
    fn validate(&self, spec: &JobSpec) -> Result<(), CalibanError> {
        if spec.options.force {
            debug!("--force set, skipping cloud training compatibility-table validation");
            return Ok(());
        }
        self.validate_accelerator(spec)
    }

    fn submit(&self, spec: &JobSpec, cancel: &CancellationToken) -> Result<SubmitResult, CalibanError> {
        cancel.check()?;

        let merged_labels = labels::sanitize_and_merge(
            &std::collections::HashMap::from([("launched-by".to_string(), whoami::username())]),
            &spec.options.labels,
        );

        let body = serde_json::json!({
            "image": spec.image_reference,
            "entrypoint": spec.entrypoint,
            "args": spec.argv,
            "region": spec.options.region,
            "machineType": spec.options.machine_type,
            "acceleratorCount": spec.resources.accelerator.count,
            "preemptible": spec.options.preemptible,
            "labels": merged_labels,
        });

        let mut backoff_policy = ExponentialBackoff {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(10),
            max_elapsed_time: Some(Duration::from_secs(60)),
            ..ExponentialBackoff::default()
        };

        loop {
            cancel.check()?;
            let response = self
                .client
                .post(format!("{}/v1/jobs", self.base_url))
                .json(&body)
                .send();

            match response {
                Ok(response) if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    match backoff_policy.next_backoff() {
                        Some(delay) => {
                            warn!("cloud training backend rate-limited submission, retrying in {delay:?}");
                            std::thread::sleep(delay);
                            continue;
                        }
                        None => {
                            return Err(CalibanError::TransientBackendError(
                                "rate limited; retries exhausted".to_string(),
                            ))
                        }
                    }
                }
                Ok(response) if response.status().is_success() => {
                    let parsed: serde_json::Value = response
                        .json()
                        .map_err(|err| CalibanError::BackendError(err.to_string()))?;
                    let handle = parsed["jobId"]
                        .as_str()
                        .ok_or_else(|| CalibanError::BackendError("response missing jobId".to_string()))?
                        .to_string();
                    debug!("submitted cloud training job {handle}");
                    return Ok(SubmitResult {
                        backend_handle: handle,
                        details: parsed,
                    });
                }
                Ok(response) => {
                    return Err(CalibanError::BackendError(format!(
                        "cloud training backend rejected submission: {status}",
                        status = response.status()
                    )))
                }
                Err(err) if err.is_timeout() || err.is_connect() => {
                    match backoff_policy.next_backoff() {
                        Some(delay) => {
                            warn!("transient error contacting cloud training backend: {err}, retrying in {delay:?}");
                            std::thread::sleep(delay);
                            continue;
                        }
                        None => return Err(CalibanError::TransientBackendError(err.to_string())),
                    }
                }
                Err(err) => return Err(CalibanError::BackendError(err.to_string())),
            }
        }
    }

    fn query(&self, backend_handle: &str, _previous_status: JobStatus) -> Result<JobStatus, CalibanError> {
        let response = self
            .client
            .get(format!("{}/v1/jobs/{backend_handle}", self.base_url))
            .send();

        let response = match response {
            Ok(response) => response,
            Err(_) => return Ok(JobStatus::Unknown),
        };

        if !response.status().is_success() {
            return Ok(JobStatus::Unknown);
        }

        let parsed: serde_json::Value = response
            .json()
            .map_err(|err| CalibanError::BackendError(err.to_string()))?;

        Ok(match parsed["state"].as_str().unwrap_or("UNKNOWN") {
            "PENDING" | "QUEUED" => JobStatus::Submitted,
            "RUNNING" => JobStatus::Running,
            "SUCCEEDED" => JobStatus::Succeeded,
            "FAILED" => JobStatus::Failed,
            "CANCELLED" => JobStatus::Stopped,
            _ => JobStatus::Unknown,
        })
    }

    fn stop(&self, backend_handle: &str) -> Result<StopOutcome, CalibanError> {
        let response = self
            .client
            .post(format!("{}/v1/jobs/{backend_handle}/cancel", self.base_url))
            .send()
            .map_err(|err| CalibanError::BackendError(err.to_string()))?;

        if response.status().is_success() {
            Ok(StopOutcome::Stopped)
        } else if response.status() == reqwest::StatusCode::CONFLICT {
            Ok(StopOutcome::StoppedNoChange)
        } else {
            Ok(StopOutcome::NotStoppable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AcceleratorRequest, BackendOptions, ResourceRequest};
    use crate::build::Mode;

    fn spec_with_accelerator(region: &str, kind: &str, count: u32) -> JobSpec {
        JobSpec {
            image_reference: "registry.io/img:latest".to_string(),
            entrypoint: vec![],
            argv: vec![],
            mode: Mode::Gpu,
            resources: ResourceRequest {
                cpu_millis: None,
                memory: None,
                accelerator: AcceleratorRequest { count, memory: None },
            },
            options: BackendOptions {
                region: Some(region.to_string()),
                machine_type: Some(kind.to_string()),
                preemptible: false,
                labels: Default::default(),
                force: false,
            },
            name_hint: "job".to_string(),
        }
    }

    #[test]
    fn rejects_impossible_accelerator_count() {
        let backend = CloudTraining::new();
        let err = backend
            .validate(&spec_with_accelerator("us-central1", "V100", 3))
            .unwrap_err();
        match err {
            CalibanError::ValidationError { suggestion, .. } => {
                assert!(suggestion.unwrap().contains("1"));
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn accepts_valid_accelerator_count() {
        let backend = CloudTraining::new();
        assert!(backend
            .validate(&spec_with_accelerator("us-central1", "V100", 4))
            .is_ok());
    }

    #[test]
    fn unrecognized_region_accelerator_pair_rejected() {
        let backend = CloudTraining::new();
        assert!(backend
            .validate(&spec_with_accelerator("mars-west1", "V100", 1))
            .is_err());
    }

    #[test]
    fn force_skips_validation() {
        let backend = CloudTraining::new();
        let mut spec = spec_with_accelerator("mars-west1", "V100", 1);
        spec.options.force = true;
        assert!(backend.validate(&spec).is_ok());
    }
}
