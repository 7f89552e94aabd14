//! LocalRuntime adapter: runs the built image synchronously via the local container runtime,
//! using `docker.rs`'s subprocess-wrapper pattern.

use log::debug;

use crate::{error::CalibanError, process};

use super::{BackendAdapter, CancellationToken, JobSpec, JobStatus, StopOutcome, SubmitResult};

pub struct LocalRuntime;

impl BackendAdapter for LocalRuntime {
    fn validate(&self, spec: &JobSpec) -> Result<(), CalibanError> {
        if spec.mode.is_gpu() && !host_supports_gpu() {
            return Err(CalibanError::PlatformUnsupported(
                "GPU mode requested but this host has no usable GPU container runtime (`nvidia-smi` unavailable or failed)".to_string(),
            ));
        }
        if spec.resources.accelerator.count > 0 {
            debug!("local runtime does not enforce accelerator availability; proceeding best-effort");
        }
        if spec.image_reference.is_empty() {
            return Err(CalibanError::ValidationError {
                message: "image reference is empty".to_string(),
                suggestion: None,
            });
        }
        Ok(())
    }

    fn submit(&self, spec: &JobSpec, cancel: &CancellationToken) -> Result<SubmitResult, CalibanError> {
        cancel.check()?;

        let home_dir = home::home_dir().ok_or_else(|| CalibanError::BackendError("failed to determine home directory".to_string()))?;
        let cwd = std::env::current_dir()?;
        let container_name = format!("{name_hint}-{suffix}", name_hint = spec.name_hint, suffix = random_suffix());

        let mut command = process::command!(
            "docker",
            "run",
            "--name",
            &container_name,
            "-v",
            format!("{}:/workspace", cwd.display()),
            "-v",
            format!("{}:/root", home_dir.display()),
            "-w",
            "/workspace",
        );
        if spec.resources.accelerator.count > 0 {
            command = process::args!(command, "--gpus", format!("{}", spec.resources.accelerator.count));
        }
        command = process::args!(command, &spec.image_reference);
        command = command.args(spec.argv.iter().map(AsRef::as_ref));

        let status = command.try_status().map_err(CalibanError::from)?;

        let details = serde_json::json!({ "container_name": container_name });

        match status.require_success() {
            Ok(()) => Ok(SubmitResult {
                backend_handle: container_name,
                details,
            }),
            Err(process::Error {
                kind: process::ErrorKind::NonZeroExitStatus(code),
                ..
            }) => Err(CalibanError::RuntimeExit(code.map(|c| c.get()).unwrap_or(1))),
            Err(err) => Err(err.into()),
        }
    }

    fn query(&self, _backend_handle: &str, _previous_status: JobStatus) -> Result<JobStatus, CalibanError> {
        // Local submission is synchronous: by the time `submit` returns, the container has
        // already reached a terminal state. A caller that still wants to `query` after the fact
        // is asking about a container we no longer track; report it as unknown rather than
        // guessing.
        Ok(JobStatus::Unknown)
    }

    fn stop(&self, backend_handle: &str) -> Result<StopOutcome, CalibanError> {
        let status = process::args!(process::Command::new("docker"), "kill", backend_handle)
            .try_status()
            .map_err(CalibanError::from)?;
        match status.require_success() {
            Ok(()) => Ok(StopOutcome::Stopped),
            Err(_) => Ok(StopOutcome::StoppedNoChange),
        }
    }
}

/// Probes for a usable GPU container runtime via `nvidia-smi`. Missing binary or non-zero exit
/// (no driver, no device) both mean "no GPU support"; a successful run means the host can back
/// `docker run --gpus`.
fn host_supports_gpu() -> bool {
    process::Command::new("nvidia-smi")
        .try_status()
        .is_ok_and(|status| status.require_success().is_ok())
}

fn random_suffix() -> String {
    use rand::Rng;
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..6)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendOptions, ResourceRequest};
    use crate::build::Mode;

    fn spec() -> JobSpec {
        JobSpec {
            image_reference: "registry.io/img:latest".to_string(),
            entrypoint: vec![],
            argv: vec!["--epochs".to_string(), "2".to_string()],
            mode: Mode::Cpu,
            resources: ResourceRequest::default(),
            options: BackendOptions::default(),
            name_hint: "job".to_string(),
        }
    }

    #[test]
    fn validate_rejects_empty_image() {
        let mut s = spec();
        s.image_reference.clear();
        assert!(LocalRuntime.validate(&s).is_err());
    }

    #[test]
    fn validate_accepts_well_formed_spec() {
        assert!(LocalRuntime.validate(&spec()).is_ok());
    }

    #[test]
    fn validate_rejects_gpu_mode_without_host_support() {
        if host_supports_gpu() {
            return;
        }
        let mut s = spec();
        s.mode = Mode::Gpu;
        assert!(matches!(
            LocalRuntime.validate(&s),
            Err(CalibanError::PlatformUnsupported(_))
        ));
    }

    #[test]
    fn random_suffix_is_six_lowercase_alphanumeric_chars() {
        let suffix = random_suffix();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
