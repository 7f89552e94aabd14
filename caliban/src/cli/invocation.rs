//! Shared flags for the verbs that build an image and/or submit work (`build`, `run`,
//! `submit-cloud`, `submit-cluster`, `shell`, `notebook`): one `#[derive(Args)]` struct flattened
//! into each subcommand, a trailing `last = true` argv capture, and small `value_parser`
//! functions for unit-bearing flags.

use std::{collections::HashMap, path::PathBuf};

use clap::Args;

use crate::{
    backend::{AcceleratorRequest, Backend, BackendOptions, ResourceRequest},
    build::Mode,
    dispatcher::{ExperimentConfigSource, Invocation},
    error::CalibanError,
    unit::bytes::{self, Bytes},
};

fn gibibyte(raw: &str) -> Result<Bytes, String> {
    let value: u64 = raw.parse().map_err(|_| format!("{raw:?} is not a number"))?;
    Bytes::new::<bytes::gibibyte>(value).ok_or_else(|| "value too large".to_string())
}

fn label(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("{raw:?} is not of the form key=value"))
}

#[derive(Debug, Args)]
pub struct InvocationArgs {
    /// Project directory to build from.
    #[arg(long, default_value = ".")]
    pub project_dir: PathBuf,

    /// Execution mode the image is built and scheduled for.
    #[arg(long, value_enum, default_value_t = Mode::Cpu)]
    pub mode: Mode,

    /// Extra dependency groups to install in addition to the mode-appropriate set.
    #[arg(long = "extra")]
    pub extras: Vec<String>,

    /// Additional source directories to copy into the build context, in the order given.
    #[arg(long = "extra-dir")]
    pub extra_dirs: Vec<PathBuf>,

    /// Read the experiment-config document from this file instead of expanding to one tuple.
    #[arg(long, conflicts_with = "experiment_config_stdin")]
    pub experiment_config: Option<PathBuf>,

    /// Read the experiment-config document from standard input.
    #[arg(long = "experiment-config-stdin", default_value_t)]
    pub experiment_config_stdin: bool,

    /// Use this image reference instead of building one.
    #[arg(long)]
    pub image: Option<String>,

    /// Image repository to tag built images under.
    #[arg(long, default_value = "caliban")]
    pub image_repository: String,

    /// Experiment group name. A fresh timestamped name is generated when omitted.
    #[arg(long)]
    pub group: Option<String>,

    /// Kubernetes API server URL, required for `submit-cluster`.
    #[arg(long)]
    pub cluster_server: Option<String>,

    /// GCP region for cloud submissions.
    #[arg(long)]
    pub region: Option<String>,

    /// Machine type for cloud submissions.
    #[arg(long)]
    pub machine_type: Option<String>,

    /// Request a preemptible/spot instance.
    #[arg(long, default_value_t)]
    pub preemptible: bool,

    /// A `key=value` label attached to the submitted job. May be repeated.
    #[arg(long = "label", value_parser = label)]
    pub labels: Vec<(String, String)>,

    /// Millicpus requested per job.
    #[arg(long)]
    pub cpu_millis: Option<u32>,

    /// Memory requested per job, in gibibytes.
    #[arg(long, value_parser = gibibyte)]
    pub memory: Option<Bytes>,

    /// Number of accelerators requested per job.
    #[arg(long = "accelerator-count", default_value_t)]
    pub accelerator_count: u32,

    /// Accelerator memory requested per job, in gibibytes.
    #[arg(long = "accelerator-memory", value_parser = gibibyte)]
    pub accelerator_memory: Option<Bytes>,

    /// Skip the cloud-training backend's client-side compatibility-table validation.
    #[arg(long, default_value_t)]
    pub force: bool,

    /// Path to a service-account credential to bake into the image.
    #[arg(long)]
    pub credential: Option<PathBuf>,

    /// Plan and validate everything but do not build, register, or submit.
    #[arg(long, default_value_t)]
    pub dry_run: bool,

    /// Suppress the warning issued when the working tree has uncommitted changes.
    #[arg(long, default_value_t)]
    pub allow_dirty: bool,

    /// Suppress the warning issued when the current commit has not been pushed.
    #[arg(long, default_value_t)]
    pub allow_unpushed: bool,

    /// Module to run: a dotted Python module, a `.py` script path, or any other script path run
    /// via `/bin/bash`.
    pub module_spec: String,

    /// Arguments passed through to every job, before any experiment-config bindings.
    #[arg(last = true)]
    pub prefix_args: Vec<String>,
}

impl InvocationArgs {
    pub fn into_invocation(self, backend: Backend) -> Result<Invocation, CalibanError> {
        let experiment_config = match (&self.experiment_config, self.experiment_config_stdin) {
            (Some(path), _) => ExperimentConfigSource::File(path.clone()),
            (None, true) => ExperimentConfigSource::Stdin,
            (None, false) => ExperimentConfigSource::None,
        };

        Ok(Invocation {
            project_dir: self.project_dir,
            mode: self.mode,
            requested_extras: self.extras,
            module_spec: self.module_spec,
            extra_dirs: self.extra_dirs,
            image_override: self.image,
            image_repository: self.image_repository,
            group_name: self.group,
            backend,
            cluster_server: self.cluster_server,
            experiment_config,
            prefix_args: self.prefix_args,
            resources: ResourceRequest {
                cpu_millis: self.cpu_millis,
                memory: self.memory,
                accelerator: AcceleratorRequest {
                    count: self.accelerator_count,
                    memory: self.accelerator_memory,
                },
            },
            backend_options: BackendOptions {
                region: self.region,
                machine_type: self.machine_type,
                preemptible: self.preemptible,
                labels: HashMap::from_iter(self.labels),
                force: self.force,
            },
            credential_path: self.credential,
            dry_run: self.dry_run,
            allow_dirty: self.allow_dirty,
            allow_unpushed: self.allow_unpushed,
        })
    }
}
