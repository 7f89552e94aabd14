//! Flags for the verbs that read or act on registry state: `status`, `stop`, `resubmit`, and
//! `expand-experiments`.

use std::path::PathBuf;

use clap::Args;
use constcat::concat;

use crate::registry::DEFAULT_REGISTRY_RELATIVE_PATH;

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[arg(long, help = concat!("Show only jobs in this experiment group. Reads from $HOME/", DEFAULT_REGISTRY_RELATIVE_PATH, "."))]
    pub group: Option<String>,

    /// Maximum number of jobs to show per experiment when `--group` is given.
    #[arg(long)]
    pub max_per_experiment: Option<usize>,

    /// Number of recent jobs to show when `--group` is omitted.
    #[arg(long, default_value_t = 20)]
    pub recent: usize,
}

#[derive(Debug, Args)]
pub struct GroupArgs {
    pub group: String,

    /// Report what would be stopped without contacting any backend.
    #[arg(long, default_value_t)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct ResubmitArgs {
    pub group: String,

    /// Resubmit every experiment's latest job, not just failed/stopped ones.
    #[arg(long, default_value_t)]
    pub all_jobs: bool,

    /// Plan the resubmission without building, registering, or submitting anything.
    #[arg(long, default_value_t)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct ExpandArgs {
    /// Read the experiment-config document from this file instead of standard input.
    pub experiment_config: Option<PathBuf>,

    /// Arguments passed through to every tuple, before any experiment-config bindings.
    #[arg(last = true)]
    pub prefix_args: Vec<String>,
}
