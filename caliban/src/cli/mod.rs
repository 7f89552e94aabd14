//! CLI surface: the ten verbs, each parsed with `clap`'s derive API and dispatched to the core.
//! A top-level `Cli` wrapping a `Commands` enum, with per-verb argument structs in sibling
//! modules.

mod invocation;
mod status_args;

use clap::{Parser, Subcommand};
use log::info;

use crate::{
    backend::{Backend, CancellationToken},
    dispatcher::{self, DispatchOutcome, TupleOutcome},
    error::CalibanError,
    registry::RegistryStore,
    status::StatusService,
};

use invocation::InvocationArgs;
use status_args::{ExpandArgs, GroupArgs, ResubmitArgs, StatusArgs};

#[derive(Debug, Parser)]
#[command(name = "caliban", version = crate::version::VERSION, about)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build the container image without submitting any jobs.
    Build(InvocationArgs),
    /// Run on the local container runtime.
    Run(InvocationArgs),
    /// Submit to the managed cloud-training backend.
    SubmitCloud(InvocationArgs),
    /// Submit to a Kubernetes cluster.
    SubmitCluster(InvocationArgs),
    /// Start an interactive shell in the built image (entrypoint UX is a collaborator's concern).
    Shell(InvocationArgs),
    /// Start a notebook server in the built image (entrypoint UX is a collaborator's concern).
    Notebook(InvocationArgs),
    /// Show recent jobs, or every job in a group.
    Status(StatusArgs),
    /// Stop every non-terminal job in a group.
    Stop(GroupArgs),
    /// Resubmit jobs in a group.
    Resubmit(ResubmitArgs),
    /// Expand an experiment-config document into argv sequences without building or submitting.
    ExpandExperiments(ExpandArgs),
}

impl Cli {
    pub fn run(self) -> Result<i32, CalibanError> {
        let cancel = CancellationToken::new();
        {
            let cancel = cancel.clone();
            ctrlc::set_handler(move || {
                info!("received interrupt, cancelling after the current job");
                cancel.cancel();
            })
            .expect("failed to install Ctrl+C handler");
        }

        match self.command {
            Commands::Build(args) => {
                let invocation = args.into_invocation(Backend::Local)?;
                let output = dispatcher::build_image(&invocation)?;
                println!("{}", output.image_reference);
                Ok(0)
            }
            Commands::Run(args) => run_dispatch(args, Backend::Local, &cancel),
            Commands::SubmitCloud(args) => run_dispatch(args, Backend::Cloud, &cancel),
            Commands::SubmitCluster(args) => run_dispatch(args, Backend::Cluster, &cancel),
            Commands::Shell(args) => run_dispatch(args, Backend::Local, &cancel),
            Commands::Notebook(args) => run_dispatch(args, Backend::Local, &cancel),
            Commands::Status(args) => {
                let mut registry = RegistryStore::open_default()?;
                let service = StatusService::new(&mut registry);
                let table = match &args.group {
                    Some(group) => service.group(group, args.max_per_experiment)?,
                    None => service.recent(args.recent)?,
                };
                println!("{table}");
                Ok(0)
            }
            Commands::Stop(args) => {
                let mut registry = RegistryStore::open_default()?;
                let mut service = StatusService::new(&mut registry);
                let outcomes = service.stop(&args.group, args.dry_run)?;
                for (job_id, outcome) in &outcomes {
                    info!("job {job_id}: {outcome:?}");
                }
                Ok(0)
            }
            Commands::Resubmit(args) => {
                let mut registry = RegistryStore::open_default()?;
                let mut service = StatusService::new(&mut registry);
                let resubmitted = service.resubmit(&args.group, args.all_jobs, args.dry_run, &cancel)?;
                info!("resubmitted {count} job(s)", count = resubmitted.len());
                Ok(0)
            }
            Commands::ExpandExperiments(args) => expand_experiments(args),
        }
    }
}

fn run_dispatch(args: InvocationArgs, backend: Backend, cancel: &CancellationToken) -> Result<i32, CalibanError> {
    let dry_run = args.dry_run;
    let invocation = args.into_invocation(backend)?;
    let mut registry = if dry_run {
        RegistryStore::open_in_memory()?
    } else {
        RegistryStore::open_default()?
    };
    let outcome = dispatcher::dispatch(&mut registry, invocation, cancel)?;
    report(&outcome);
    Ok(exit_code_for(&outcome))
}

fn report(outcome: &DispatchOutcome) {
    let succeeded = outcome.results.iter().filter(|r| r.is_success()).count();
    let failed = outcome.results.len() - succeeded;
    info!(
        "group {name}: {succeeded} succeeded, {failed} failed, {total} total",
        name = outcome.group.name,
        total = outcome.results.len(),
    );
    for result in &outcome.results {
        match &result.outcome {
            TupleOutcome::ValidationFailed(err) => {
                eprintln!("job {index}: validation failed: {err}", index = result.index);
            }
            TupleOutcome::SubmissionFailed(err) => {
                eprintln!("job {index}: submission failed: {err}", index = result.index);
            }
            TupleOutcome::Submitted { job_id, backend_handle } => {
                println!("job {index}: submitted as job {job_id} ({backend_handle})", index = result.index);
            }
            TupleOutcome::DryRunOk => {
                println!("job {index}: ok (dry run)", index = result.index);
            }
        }
    }
}

fn exit_code_for(outcome: &DispatchOutcome) -> i32 {
    outcome
        .results
        .iter()
        .filter_map(|result| match &result.outcome {
            TupleOutcome::ValidationFailed(err) | TupleOutcome::SubmissionFailed(err) => Some(err.exit_code()),
            _ => None,
        })
        .max()
        .unwrap_or(0)
}

fn expand_experiments(args: ExpandArgs) -> Result<i32, CalibanError> {
    let text = match &args.experiment_config {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|err| CalibanError::ConfigInvalid(format!("{}: {err}", path.display())))?,
        None => {
            use std::io::Read;
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|err| CalibanError::ConfigInvalid(err.to_string()))?;
            buffer
        }
    };

    let argvs = crate::experiment::expand_to_argv(&text, &args.prefix_args)?;
    for argv in &argvs {
        println!("{}", crate::bash_escape::quote_join(argv.iter().map(String::as_str)));
    }
    Ok(0)
}
