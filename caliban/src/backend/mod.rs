//! BackendAdapter interface and the three concrete backends: one explicit interface and an
//! explicit enum selecting among them, rather than duck-typed per-cluster execution backends.

pub mod cloud;
pub mod kubernetes;
pub mod labels;
pub mod local;

use std::collections::HashMap;

use crate::{build::Mode, error::CalibanError, unit::bytes::Bytes};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, clap::ValueEnum)]
pub enum Backend {
    Local,
    Cloud,
    Cluster,
}

/// An accelerator request, kept concrete (NVIDIA GPU count) rather than fully backend-agnostic:
/// every backend this system targets exposes accelerators as a count of a named GPU kind.
#[derive(Debug, Clone, Default)]
pub struct AcceleratorRequest {
    pub count: u32,
    pub memory: Option<Bytes>,
}

#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub cpu_millis: Option<u32>,
    pub memory: Option<Bytes>,
    pub accelerator: AcceleratorRequest,
}

impl Default for ResourceRequest {
    fn default() -> Self {
        ResourceRequest {
            cpu_millis: None,
            memory: None,
            accelerator: AcceleratorRequest::default(),
        }
    }
}

/// Backend-specific submission options.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    pub region: Option<String>,
    pub machine_type: Option<String>,
    pub preemptible: bool,
    pub labels: HashMap<String, String>,
    /// Skips the cloud-training adapter's client-side compatibility-table validation.
    /// Ignored by the other two adapters.
    pub force: bool,
}

/// The normalized job specification every adapter translates into backend-specific form.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub image_reference: String,
    pub entrypoint: Vec<String>,
    pub argv: Vec<String>,
    pub mode: Mode,
    pub resources: ResourceRequest,
    pub options: BackendOptions,
    pub name_hint: String,
}

#[derive(Debug, Clone)]
pub struct SubmitResult {
    pub backend_handle: String,
    pub details: serde_json::Value,
}

/// The normalized job status vocabulary every backend's query result is mapped into.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum JobStatus {
    Submitted,
    Running,
    Succeeded,
    Failed,
    Stopped,
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed | JobStatus::Stopped)
    }
}

/// Whether a stop request changed anything observable.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StopOutcome {
    Stopped,
    StoppedNoChange,
    NotStoppable,
}

/// A cancellation signal threaded explicitly through every adapter call, replacing reliance on
/// any process-global interrupt state.
#[derive(Clone)]
pub struct CancellationToken(std::sync::Arc<std::sync::atomic::AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), CalibanError> {
        if self.is_cancelled() {
            Err(CalibanError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Common contract every backend implements.
pub trait BackendAdapter {
    fn validate(&self, spec: &JobSpec) -> Result<(), CalibanError>;
    fn submit(&self, spec: &JobSpec, cancel: &CancellationToken) -> Result<SubmitResult, CalibanError>;
    /// `previous_status` is the job's last status recorded in the registry, so an adapter that
    /// finds no trace of the job on the backend can tell a registry-initiated stop (previous
    /// status already `Stopped`) apart from disappearing for any other reason (garbage
    /// collection, external deletion), which is reported as `Unknown` instead.
    fn query(&self, backend_handle: &str, previous_status: JobStatus) -> Result<JobStatus, CalibanError>;
    fn stop(&self, backend_handle: &str) -> Result<StopOutcome, CalibanError>;
}

pub fn adapter_for(backend: Backend, cluster_server: &str) -> Box<dyn BackendAdapter> {
    match backend {
        Backend::Local => Box::new(local::LocalRuntime),
        Backend::Cloud => Box::new(cloud::CloudTraining::new()),
        Backend::Cluster => Box::new(kubernetes::KubernetesCluster::new(cluster_server)),
    }
}
