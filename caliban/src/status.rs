//! StatusService: renders registry state and drives stop/resubmit.
//! Table rendering follows a column list of (header, accessor)
//! pairs, collected once per row so formatting errors surface before anything is printed.

use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use time::macros::format_description;

use crate::{
    backend::{self, Backend, CancellationToken, JobStatus, StopOutcome},
    dispatcher::{dispatch, Invocation},
    error::CalibanError,
    registry::{JobWithContext, RegistryStore},
};

pub struct StatusService<'a> {
    registry: &'a mut RegistryStore,
}

impl<'a> StatusService<'a> {
    pub fn new(registry: &'a mut RegistryStore) -> Self {
        StatusService { registry }
    }

    /// Renders the `n` most recently created jobs across all groups.
    pub fn recent(&self, n: usize) -> Result<String, CalibanError> {
        Ok(render_jobs(&self.registry.list_recent_jobs(n)?))
    }

    /// Renders every job in `group_name`, capped to `max_per_experiment` per experiment.
    pub fn group(&self, group_name: &str, max_per_experiment: Option<usize>) -> Result<String, CalibanError> {
        let view = self.registry.list_group(group_name, max_per_experiment)?;
        let group = view.group.clone();
        let rows: Vec<JobWithContext> = view
            .experiments
            .iter()
            .flat_map(|grouped| {
                let group = group.clone();
                grouped.jobs.iter().map(move |job| JobWithContext {
                    job: job.clone(),
                    experiment: grouped.experiment.clone(),
                    container: grouped.container.clone(),
                    group: group.clone(),
                })
            })
            .collect();
        Ok(render_jobs(&rows))
    }

    /// Stops every non-terminal job in `group_name`. A dry run reports what would be stopped
    /// without calling any adapter.
    pub fn stop(&mut self, group_name: &str, dry_run: bool) -> Result<Vec<(i64, StopOutcome)>, CalibanError> {
        let jobs = self
            .registry
            .jobs_in_group_matching(group_name, |status| !status.is_terminal())?;

        let mut outcomes = Vec::with_capacity(jobs.len());
        for row in jobs {
            if dry_run {
                outcomes.push((row.job.id, StopOutcome::Stopped));
                continue;
            }
            let adapter = backend::adapter_for(row.job.backend, "");
            let outcome = adapter.stop(&row.job.backend_handle)?;
            if outcome != StopOutcome::NotStoppable {
                self.registry.update_job_status(row.job.id, JobStatus::Stopped, Some("stopped by user"))?;
            }
            outcomes.push((row.job.id, outcome));
        }
        Ok(outcomes)
    }

    /// Resubmits every job in `group_name`, or only the failed/stopped ones when `all_jobs` is
    /// false, by replaying each job's experiment as a fresh single-tuple invocation on the same
    /// backend and container.
    pub fn resubmit(
        &mut self,
        group_name: &str,
        all_jobs: bool,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<i64>, CalibanError> {
        let view = self.registry.list_group(group_name, None)?;
        let mut resubmitted = Vec::new();

        for grouped in &view.experiments {
            let candidate = if all_jobs {
                grouped.jobs.last()
            } else {
                grouped
                    .jobs
                    .iter()
                    .rev()
                    .find(|job| matches!(job.status, JobStatus::Failed | JobStatus::Stopped))
            };
            let Some(previous) = candidate else { continue };

            let invocation = Invocation {
                project_dir: std::path::PathBuf::from(&grouped.container.build_context_path),
                mode: grouped.container.mode,
                requested_extras: Vec::new(),
                module_spec: grouped.experiment.module_spec.clone(),
                extra_dirs: grouped
                    .container
                    .extra_dirs
                    .iter()
                    .map(std::path::PathBuf::from)
                    .collect(),
                image_override: Some(grouped.container.image_reference.clone()),
                image_repository: String::new(),
                group_name: Some(group_name.to_string()),
                backend: previous.backend,
                cluster_server: None,
                experiment_config: crate::dispatcher::ExperimentConfigSource::None,
                prefix_args: grouped.experiment.args.clone(),
                resources: Default::default(),
                backend_options: Default::default(),
                credential_path: None,
                dry_run,
                allow_dirty: true,
                allow_unpushed: true,
            };

            let outcome = dispatch(self.registry, invocation, cancel)?;
            resubmitted.extend(outcome.results.iter().filter_map(|result| match &result.outcome {
                crate::dispatcher::TupleOutcome::Submitted { job_id, .. } => Some(*job_id),
                _ => None,
            }));
        }

        Ok(resubmitted)
    }
}

fn render_jobs(rows: &[JobWithContext]) -> String {
    type Accessor = fn(&JobWithContext) -> String;

    fn accessor(f: Accessor) -> Accessor {
        f
    }

    fn format_timestamp(value: time::OffsetDateTime) -> String {
        let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
        value.format(format).unwrap_or_else(|_| value.to_string())
    }

    let columns: [(&str, Accessor); 6] = [
        ("group", accessor(|row| row.group.name.clone())),
        ("job", accessor(|row| row.job.id.to_string())),
        ("backend", accessor(|row| backend_label(row.job.backend).to_string())),
        ("status", accessor(|row| format!("{:?}", row.job.status))),
        ("module", accessor(|row| row.experiment.module_spec.clone())),
        ("created", accessor(|row| format_timestamp(row.job.created_at))),
    ];

    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(columns.iter().map(|(name, _)| Cell::new(*name).add_attribute(Attribute::Bold)));

    for row in rows {
        table.add_row(columns.iter().map(|(_, f)| f(row)));
    }

    table.to_string()
}

fn backend_label(backend: Backend) -> &'static str {
    match backend {
        Backend::Local => "local",
        Backend::Cloud => "cloud",
        Backend::Cluster => "cluster",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Mode;

    #[test]
    fn recent_renders_header_even_with_no_jobs() {
        let mut store = RegistryStore::open_in_memory().unwrap();
        let service = StatusService::new(&mut store);
        let output = service.recent(10).unwrap();
        assert!(output.contains("group"));
        assert!(output.contains("status"));
    }

    #[test]
    fn group_flattens_grouped_experiments_into_rows() {
        let mut store = RegistryStore::open_in_memory().unwrap();
        let group = store.get_or_create_group(Some("g")).unwrap();
        let container = store
            .get_or_create_container("img@sha256:a", Mode::Cpu, "/proj", &[])
            .unwrap();
        let experiment = store
            .get_or_create_experiment(group.id, container.id, "pkg.main", &[], &[])
            .unwrap();
        store
            .create_job(experiment.id, Backend::Local, "handle", &serde_json::json!({}))
            .unwrap();

        let service = StatusService::new(&mut store);
        let output = service.group("g", None).unwrap();
        assert!(output.contains("pkg.main"));
        assert!(output.contains("SUBMITTED") || output.contains("Submitted"));
    }
}
