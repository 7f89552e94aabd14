//! Dispatcher: per-invocation orchestration. Resolves the experiment
//! group, builds (or reuses) an image, registers the container, expands the experiment config,
//! and submits each resulting argument tuple through the chosen backend, recording every
//! registry row along the way.

use std::path::PathBuf;

use container_image_name::ImageName;
use log::{debug, info, warn};

use crate::{
    backend::{
        Backend, BackendAdapter, BackendOptions, CancellationToken, JobSpec, ResourceRequest,
    },
    build::{self, BuildOutput, Builder, DockerBuilder, DryRunBuilder, Entrypoint, Mode, PlanInput},
    error::CalibanError,
    experiment::{self, ArgTuple, Key},
    git,
    registry::{Container, ExperimentGroup, RegistryStore},
};

/// Where the experiment-config document text comes from.
pub enum ExperimentConfigSource {
    File(PathBuf),
    Stdin,
    /// No document at all: expands to exactly one tuple with only the prefix args, the same
    /// outcome as an empty document.
    None,
}

impl ExperimentConfigSource {
    fn read(&self) -> Result<String, CalibanError> {
        match self {
            ExperimentConfigSource::File(path) => std::fs::read_to_string(path)
                .map_err(|err| CalibanError::ConfigInvalid(format!("{}: {err}", path.display()))),
            ExperimentConfigSource::Stdin => {
                use std::io::Read;
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .map_err(|err| CalibanError::ConfigInvalid(err.to_string()))?;
                Ok(buffer)
            }
            ExperimentConfigSource::None => Ok(String::new()),
        }
    }
}

/// A fully resolved user request, threaded explicitly through the dispatcher rather than read
/// from process-wide globals.
pub struct Invocation {
    pub project_dir: PathBuf,
    pub mode: Mode,
    pub requested_extras: Vec<String>,
    pub module_spec: String,
    pub extra_dirs: Vec<PathBuf>,
    pub image_override: Option<String>,
    pub image_repository: String,
    pub group_name: Option<String>,
    pub backend: Backend,
    pub cluster_server: Option<String>,
    pub experiment_config: ExperimentConfigSource,
    pub prefix_args: Vec<String>,
    pub resources: ResourceRequest,
    pub backend_options: BackendOptions,
    pub credential_path: Option<PathBuf>,
    pub dry_run: bool,
    pub allow_dirty: bool,
    pub allow_unpushed: bool,
}

#[derive(Debug)]
pub enum TupleOutcome {
    DryRunOk,
    Submitted { job_id: i64, backend_handle: String },
    ValidationFailed(CalibanError),
    SubmissionFailed(CalibanError),
}

#[derive(Debug)]
pub struct TupleResult {
    pub index: usize,
    pub argv: Vec<String>,
    pub outcome: TupleOutcome,
}

impl TupleResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TupleOutcome::DryRunOk | TupleOutcome::Submitted { .. })
    }
}

pub struct DispatchOutcome {
    pub group: ExperimentGroup,
    pub container: Option<Container>,
    pub results: Vec<TupleResult>,
}

impl DispatchOutcome {
    /// Success iff every attempted submission succeeded.
    pub fn success(&self) -> bool {
        self.results.iter().all(TupleResult::is_success)
    }
}

/// Builds (or resolves, if `image_override` is set) the image for an invocation without
/// expanding experiments or submitting anything. Backs the standalone `build` CLI verb.
pub fn build_image(invocation: &Invocation) -> Result<BuildOutput, CalibanError> {
    check_git_reproducibility(invocation);
    resolve_image(invocation)
}

/// Runs one invocation to completion (or until cancelled / a fatal registry error).
pub fn dispatch(
    registry: &mut RegistryStore,
    invocation: Invocation,
    cancel: &CancellationToken,
) -> Result<DispatchOutcome, CalibanError> {
    let group = registry.get_or_create_group(invocation.group_name.as_deref())?;

    check_git_reproducibility(&invocation);

    let build_output = resolve_image(&invocation)?;

    let container = if invocation.dry_run {
        None
    } else {
        Some(registry.get_or_create_container(
            &build_output.image_reference,
            invocation.mode,
            invocation.project_dir.display().to_string().as_str(),
            &invocation
                .extra_dirs
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>(),
        )?)
    };

    let document_text = invocation.experiment_config.read()?;
    let document = experiment::parse(&document_text)?;
    let tuples = experiment::expand(&document);

    info!(
        "expanded experiment config into {count} job{plural}",
        count = tuples.len(),
        plural = if tuples.len() == 1 { "" } else { "s" }
    );

    let adapter = crate::backend::adapter_for(
        invocation.backend,
        invocation.cluster_server.as_deref().unwrap_or_default(),
    );

    let entrypoint = Entrypoint::classify(&invocation.module_spec).command_prefix();

    let mut results = Vec::with_capacity(tuples.len());
    let mut succeeded = 0usize;
    let mut failed = 0usize;

    for (index, tuple) in tuples.iter().enumerate() {
        cancel.check()?;

        let argv = experiment::materialize(&invocation.prefix_args, tuple);
        let kwargs = tuple_kwargs(tuple);

        let spec = JobSpec {
            image_reference: build_output.image_reference.clone(),
            entrypoint: entrypoint.clone(),
            argv: argv.clone(),
            mode: invocation.mode,
            resources: invocation.resources.clone(),
            options: invocation.backend_options.clone(),
            name_hint: format!("{name}-{index}", name = group.name),
        };

        let outcome = if invocation.dry_run {
            match adapter.validate(&spec) {
                Ok(()) => {
                    info!("[dry run] would submit job {index}: {argv:?}", argv = argv);
                    succeeded += 1;
                    TupleOutcome::DryRunOk
                }
                Err(err) => {
                    warn!("[dry run] job {index} would fail validation: {err}");
                    failed += 1;
                    TupleOutcome::ValidationFailed(err)
                }
            }
        } else {
            submit_one(registry, &*adapter, &group, container.as_ref(), &invocation, &spec, &kwargs, cancel, index)
                .map(|outcome| {
                    match &outcome {
                        TupleOutcome::Submitted { .. } => succeeded += 1,
                        _ => failed += 1,
                    }
                    outcome
                })?
        };

        debug!(
            "progress: {done}/{total} attempted, {succeeded} succeeded, {failed} failed",
            done = index + 1,
            total = tuples.len(),
        );

        results.push(TupleResult { index, argv, outcome });
    }

    Ok(DispatchOutcome { group, container, results })
}

fn submit_one(
    registry: &mut RegistryStore,
    adapter: &dyn BackendAdapter,
    group: &ExperimentGroup,
    container: Option<&Container>,
    invocation: &Invocation,
    spec: &JobSpec,
    kwargs: &[(String, String)],
    cancel: &CancellationToken,
    index: usize,
) -> Result<TupleOutcome, CalibanError> {
    let container = container.expect("non-dry-run dispatch always registers a container");

    if let Err(err) = adapter.validate(spec) {
        warn!("job {index} failed validation: {err}");
        return Ok(TupleOutcome::ValidationFailed(err));
    }

    let experiment = registry.get_or_create_experiment(
        group.id,
        container.id,
        &invocation.module_spec,
        &invocation.prefix_args,
        kwargs,
    )?;

    match adapter.submit(spec, cancel) {
        Ok(result) => {
            let job = registry.create_job(experiment.id, invocation.backend, &result.backend_handle, &result.details)?;
            info!("job {index} submitted: {handle}", handle = result.backend_handle);
            Ok(TupleOutcome::Submitted { job_id: job.id, backend_handle: result.backend_handle })
        }
        Err(CalibanError::Cancelled) => Err(CalibanError::Cancelled),
        Err(err) => {
            warn!("job {index} submission failed: {err}");
            Ok(TupleOutcome::SubmissionFailed(err))
        }
    }
}

fn tuple_kwargs(tuple: &ArgTuple) -> Vec<(String, String)> {
    let mut kwargs = Vec::new();
    for (key, values) in &tuple.bindings {
        match key {
            Key::Plain(name) => kwargs.push((name.clone(), values[0].to_string())),
            Key::Compound(names) => {
                for (name, value) in names.iter().zip(values.iter()) {
                    kwargs.push((name.clone(), value.to_string()));
                }
            }
        }
    }
    kwargs
}

/// Resolves the built image, skipping the build step entirely when the invocation supplies an
/// explicit image reference.
fn resolve_image(invocation: &Invocation) -> Result<BuildOutput, CalibanError> {
    if let Some(image_override) = &invocation.image_override {
        ImageName::new(image_override.clone())
            .map_err(|err| CalibanError::RecipeInvalid(err.to_string()))?;
        return Ok(BuildOutput {
            image_reference: image_override.clone(),
            entrypoint: Entrypoint::classify(&invocation.module_spec).command_prefix(),
        });
    }

    let recipe = build::plan(PlanInput {
        project_dir: &invocation.project_dir,
        mode: invocation.mode,
        extra_dirs: invocation.extra_dirs.clone(),
        module_spec: &invocation.module_spec,
        requested_extras: invocation.requested_extras.clone(),
        base_image_override: None,
        credential_path: invocation.credential_path.clone(),
    })?;

    for warning in &recipe.warnings {
        warn!("{warning}");
    }

    let git_commit_hash = git::info().map(|info| info.commit_hash).unwrap_or_else(|err| {
        debug!("could not determine git commit hash: {err}");
        "unknown".to_string()
    });

    let image_tag = format!(
        "{repository}/{project}:{mode}",
        repository = invocation.image_repository,
        project = project_name(&invocation.project_dir),
        mode = invocation.mode,
    );
    ImageName::new(image_tag.clone()).map_err(|err| CalibanError::RecipeInvalid(err.to_string()))?;

    let builder: Box<dyn Builder> = if invocation.dry_run {
        Box::new(DryRunBuilder)
    } else {
        Box::new(DockerBuilder)
    };

    builder.build(&recipe, &image_tag, &git_commit_hash)
}

fn project_name(project_dir: &std::path::Path) -> String {
    project_dir
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("project")
        .to_string()
}

fn check_git_reproducibility(invocation: &Invocation) {
    match git::info() {
        Ok(info) => {
            if !invocation.allow_dirty && !info.is_clean {
                warn!(
                    "the working tree has uncommitted changes; results may not be reproducible. \
                     pass --allow-dirty to suppress this warning."
                );
            }
            if !invocation.allow_unpushed && !info.is_pushed {
                warn!(
                    "the current commit has not been pushed to a remote; results may not be \
                     reproducible. pass --allow-unpushed to suppress this warning."
                );
            }
        }
        Err(err) => debug!("not a git repository, or git is unavailable; skipping reproducibility checks: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::parse;

    #[test]
    fn tuple_kwargs_flattens_compound_keys() {
        let document = parse("\"[a,b]\":\n  - [a1, b1]\n").unwrap();
        let tuples = experiment::expand(&document);
        let kwargs = tuple_kwargs(&tuples[0]);
        assert_eq!(kwargs, vec![("a".to_string(), "a1".to_string()), ("b".to_string(), "b1".to_string())]);
    }

    #[test]
    fn experiment_config_source_none_expands_to_one_empty_tuple() {
        let text = ExperimentConfigSource::None.read().unwrap();
        let document = parse(&text).unwrap();
        let tuples = experiment::expand(&document);
        assert_eq!(tuples.len(), 1);
        assert!(tuples[0].bindings.is_empty());
    }
}
