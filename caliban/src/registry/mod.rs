//! RegistryStore: the authoritative, single-host persistent record of experiment groups,
//! containers, experiments, jobs, and job status history.
//!
//! Backed by a single `rusqlite` connection in rollback-journal mode, with every public method
//! wrapped in a transaction so a failed mutation never leaves a partial write. A sibling `.lock`
//! file, held exclusively for the lifetime of the store via `fs2`, serializes concurrent mutators
//! on the same host; a second process that can't acquire the lock fails fast with a
//! `RegistryError` instead of racing the sqlite file.

mod model;
mod schema;

pub use model::{Container, Experiment, ExperimentGroup, GroupedExperiment, GroupView, JobRow, JobWithContext};

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use fs2::FileExt;
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    backend::{Backend, JobStatus},
    build::Mode,
    error::CalibanError,
};

pub struct RegistryStore {
    conn: Connection,
    // Held for the lifetime of the store; dropping it releases the advisory lock. `None` for
    // the in-memory store used by tests and dry runs, which has nothing to serialize against.
    _lock: Option<File>,
}

/// Where [`RegistryStore::open_default`] looks, relative to the user's home directory.
pub const DEFAULT_REGISTRY_RELATIVE_PATH: &str = ".caliban/registry.sqlite3";

impl RegistryStore {
    /// Opens (creating if absent) the registry file at `path`, taking an exclusive advisory lock
    /// on a sibling `<path>.lock` file. A second concurrent mutator on the same host fails fast.
    pub fn open(path: &Path) -> Result<Self, CalibanError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(registry_io_error)?;
        }

        let lock_path = lock_path(path);
        let lock_file = File::create(&lock_path).map_err(registry_io_error)?;
        lock_file.try_lock_exclusive().map_err(|_| {
            CalibanError::RegistryError(format!(
                "registry at {path} is locked by another process",
                path = path.display()
            ))
        })?;

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "DELETE")?;
        schema::migrate(&conn)?;

        Ok(RegistryStore { conn, _lock: Some(lock_file) })
    }

    /// Opens the default registry location, `~/.caliban/registry.sqlite3`.
    pub fn open_default() -> Result<Self, CalibanError> {
        let home = home::home_dir().ok_or_else(|| {
            CalibanError::RegistryError("failed to determine home directory".to_string())
        })?;
        Self::open(&home.join(DEFAULT_REGISTRY_RELATIVE_PATH))
    }

    /// In-memory registry, used by tests and by dry runs that must never touch disk.
    pub fn open_in_memory() -> Result<Self, CalibanError> {
        let conn = Connection::open_in_memory()?;
        schema::migrate(&conn)?;
        Ok(RegistryStore { conn, _lock: None })
    }

    pub fn get_or_create_group(&mut self, name: Option<&str>) -> Result<ExperimentGroup, CalibanError> {
        let name = name.map(str::to_string).unwrap_or_else(default_group_name);
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO experiment_groups (name, created_at) VALUES (?1, ?2)",
            rusqlite::params![name, now()],
        )?;
        let group = tx.query_row(
            "SELECT id, name, created_at FROM experiment_groups WHERE name = ?1",
            [&name],
            model::row_to_group,
        )?;
        tx.commit()?;
        Ok(group)
    }

    pub fn get_or_create_container(
        &mut self,
        image_reference: &str,
        mode: Mode,
        build_context_path: &str,
        extra_dirs: &[String],
    ) -> Result<Container, CalibanError> {
        let extra_dirs_json = serde_json::to_string(extra_dirs)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO containers (image_reference, mode, build_context_path, extra_dirs, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![image_reference, mode.to_string(), build_context_path, extra_dirs_json, now()],
        )?;
        let container = tx.query_row(
            "SELECT id, image_reference, mode, build_context_path, extra_dirs, created_at
             FROM containers WHERE image_reference = ?1",
            [image_reference],
            model::row_to_container,
        )?;
        tx.commit()?;
        Ok(container)
    }

    pub fn get_or_create_experiment(
        &mut self,
        group_id: i64,
        container_id: i64,
        module_spec: &str,
        args: &[String],
        kwargs: &[(String, String)],
    ) -> Result<Experiment, CalibanError> {
        let args_json = serde_json::to_string(args)?;
        let kwargs_json = serde_json::to_string(kwargs)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO experiments (group_id, container_id, module_spec, args, kwargs, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![group_id, container_id, module_spec, args_json, kwargs_json, now()],
        )?;
        let experiment = tx.query_row(
            "SELECT id, group_id, container_id, module_spec, args, kwargs, created_at
             FROM experiments
             WHERE group_id = ?1 AND container_id = ?2 AND module_spec = ?3 AND args = ?4 AND kwargs = ?5",
            rusqlite::params![group_id, container_id, module_spec, args_json, kwargs_json],
            model::row_to_experiment,
        )?;
        tx.commit()?;
        Ok(experiment)
    }

    pub fn create_job(
        &mut self,
        experiment_id: i64,
        backend: Backend,
        backend_handle: &str,
        details: &serde_json::Value,
    ) -> Result<JobRow, CalibanError> {
        let details_json = serde_json::to_string(details)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO jobs (experiment_id, backend, backend_handle, details, created_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                experiment_id,
                backend_name(backend),
                backend_handle,
                details_json,
                now(),
                status_name(JobStatus::Submitted),
            ],
        )?;
        let job_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO job_status_history (job_id, status, observed_at, message) VALUES (?1, ?2, ?3, NULL)",
            rusqlite::params![job_id, status_name(JobStatus::Submitted), now()],
        )?;
        let job = tx.query_row(
            "SELECT id, experiment_id, backend, backend_handle, details, created_at, status FROM jobs WHERE id = ?1",
            [job_id],
            model::row_to_job,
        )?;
        tx.commit()?;
        Ok(job)
    }

    /// Appends to the job's status history and updates its current status. Rejects transitions
    /// outside the allowed graph (UNKNOWN is a wildcard sink/source).
    pub fn update_job_status(
        &mut self,
        job_id: i64,
        new_status: JobStatus,
        message: Option<&str>,
    ) -> Result<(), CalibanError> {
        let tx = self.conn.transaction()?;
        let current: String = tx.query_row("SELECT status FROM jobs WHERE id = ?1", [job_id], |row| row.get(0))?;
        let current = parse_status(&current)?;

        if !is_valid_transition(current, new_status) {
            return Err(CalibanError::RegistryError(format!(
                "invalid job status transition: {current:?} -> {new_status:?}"
            )));
        }

        tx.execute(
            "INSERT INTO job_status_history (job_id, status, observed_at, message) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![job_id, status_name(new_status), now(), message],
        )?;
        tx.execute(
            "UPDATE jobs SET status = ?1 WHERE id = ?2",
            rusqlite::params![status_name(new_status), job_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// The most recent `limit` jobs across all groups, newest first, with enough context
    /// (experiment, container, group) to render a grouped view.
    pub fn list_recent_jobs(&self, limit: usize) -> Result<Vec<JobWithContext>, CalibanError> {
        let mut stmt = self.conn.prepare(
            "SELECT j.id, j.experiment_id, j.backend, j.backend_handle, j.details, j.created_at, j.status,
                    e.id, e.group_id, e.container_id, e.module_spec, e.args, e.kwargs, e.created_at,
                    c.id, c.image_reference, c.mode, c.build_context_path, c.extra_dirs, c.created_at,
                    g.id, g.name, g.created_at
             FROM jobs j
             JOIN experiments e ON e.id = j.experiment_id
             JOIN containers c ON c.id = e.container_id
             JOIN experiment_groups g ON g.id = e.group_id
             ORDER BY j.created_at DESC, j.id DESC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit as i64], model::row_to_job_with_context)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Jobs in `group_name`, grouped by experiment, ordered by experiment id then job
    /// `created_at`. `max_per_experiment` caps how many jobs are kept per experiment (newest
    /// kept).
    pub fn list_group(&self, group_name: &str, max_per_experiment: Option<usize>) -> Result<GroupView, CalibanError> {
        let group = self.conn.query_row(
            "SELECT id, name, created_at FROM experiment_groups WHERE name = ?1",
            [group_name],
            model::row_to_group,
        )?;

        let mut exp_stmt = self.conn.prepare(
            "SELECT id, group_id, container_id, module_spec, args, kwargs, created_at
             FROM experiments WHERE group_id = ?1 ORDER BY id ASC",
        )?;
        let experiments = exp_stmt
            .query_map([group.id], model::row_to_experiment)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut grouped = Vec::with_capacity(experiments.len());
        for experiment in experiments {
            let container = self.conn.query_row(
                "SELECT id, image_reference, mode, build_context_path, extra_dirs, created_at
                 FROM containers WHERE id = ?1",
                [experiment.container_id],
                model::row_to_container,
            )?;

            let mut job_stmt = self.conn.prepare(
                "SELECT id, experiment_id, backend, backend_handle, details, created_at, status
                 FROM jobs WHERE experiment_id = ?1 ORDER BY created_at ASC, id ASC",
            )?;
            let mut jobs = job_stmt
                .query_map([experiment.id], model::row_to_job)?
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(max) = max_per_experiment {
                if jobs.len() > max {
                    jobs = jobs.split_off(jobs.len() - max);
                }
            }

            grouped.push(GroupedExperiment { experiment, container, jobs });
        }

        Ok(GroupView { group, experiments: grouped })
    }

    /// Jobs in `group_name` whose current status matches `predicate`.
    pub fn jobs_in_group_matching(
        &self,
        group_name: &str,
        predicate: impl Fn(JobStatus) -> bool,
    ) -> Result<Vec<JobWithContext>, CalibanError> {
        let mut stmt = self.conn.prepare(
            "SELECT j.id, j.experiment_id, j.backend, j.backend_handle, j.details, j.created_at, j.status,
                    e.id, e.group_id, e.container_id, e.module_spec, e.args, e.kwargs, e.created_at,
                    c.id, c.image_reference, c.mode, c.build_context_path, c.extra_dirs, c.created_at,
                    g.id, g.name, g.created_at
             FROM jobs j
             JOIN experiments e ON e.id = j.experiment_id
             JOIN containers c ON c.id = e.container_id
             JOIN experiment_groups g ON g.id = e.group_id
             WHERE g.name = ?1
             ORDER BY e.id ASC, j.created_at ASC",
        )?;
        let rows = stmt
            .query_map([group_name], model::row_to_job_with_context)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|row: &JobWithContext| predicate(row.job.status))
            .collect();
        Ok(rows)
    }
}

fn registry_io_error(err: std::io::Error) -> CalibanError {
    CalibanError::RegistryError(err.to_string())
}

fn lock_path(path: &Path) -> PathBuf {
    let mut os_string = path.as_os_str().to_owned();
    os_string.push(".lock");
    PathBuf::from(os_string)
}

fn default_group_name() -> String {
    let now = OffsetDateTime::now_utc();
    let format = time::macros::format_description!(
        "[year]-[month]-[day]-[hour]-[minute]-[second]"
    );
    format!(
        "{user}-xgroup-{timestamp}",
        user = whoami::username(),
        timestamp = now.format(format).unwrap_or_default()
    )
}

fn now() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .expect("OffsetDateTime::now_utc always formats")
}

pub(crate) fn backend_name(backend: Backend) -> &'static str {
    match backend {
        Backend::Local => "LOCAL",
        Backend::Cloud => "CLOUD",
        Backend::Cluster => "CLUSTER",
    }
}

pub(crate) fn parse_backend(value: &str) -> Result<Backend, CalibanError> {
    match value {
        "LOCAL" => Ok(Backend::Local),
        "CLOUD" => Ok(Backend::Cloud),
        "CLUSTER" => Ok(Backend::Cluster),
        other => Err(CalibanError::RegistryError(format!("unknown backend {other:?} in registry"))),
    }
}

pub(crate) fn status_name(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Submitted => "SUBMITTED",
        JobStatus::Running => "RUNNING",
        JobStatus::Succeeded => "SUCCEEDED",
        JobStatus::Failed => "FAILED",
        JobStatus::Stopped => "STOPPED",
        JobStatus::Unknown => "UNKNOWN",
    }
}

pub(crate) fn parse_status(value: &str) -> Result<JobStatus, CalibanError> {
    match value {
        "SUBMITTED" => Ok(JobStatus::Submitted),
        "RUNNING" => Ok(JobStatus::Running),
        "SUCCEEDED" => Ok(JobStatus::Succeeded),
        "FAILED" => Ok(JobStatus::Failed),
        "STOPPED" => Ok(JobStatus::Stopped),
        "UNKNOWN" => Ok(JobStatus::Unknown),
        other => Err(CalibanError::RegistryError(format!("unknown job status {other:?} in registry"))),
    }
}

pub(crate) fn parse_mode(value: &str) -> Result<Mode, CalibanError> {
    match value {
        "cpu" => Ok(Mode::Cpu),
        "gpu" => Ok(Mode::Gpu),
        "tpu-host" => Ok(Mode::TpuHost),
        other => Err(CalibanError::RegistryError(format!("unknown mode {other:?} in registry"))),
    }
}

fn is_valid_transition(current: JobStatus, new: JobStatus) -> bool {
    use JobStatus::*;
    if current == new {
        return true;
    }
    match (current, new) {
        (Submitted, Running | Succeeded | Failed | Stopped) => true,
        (Running, Succeeded | Failed | Stopped) => true,
        (_, Unknown) if !current.is_terminal() => true,
        (Unknown, _) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_group_is_idempotent() {
        let mut store = RegistryStore::open_in_memory().unwrap();
        let a = store.get_or_create_group(Some("g")).unwrap();
        let b = store.get_or_create_group(Some("g")).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn get_or_create_container_reuses_row_by_image_reference() {
        let mut store = RegistryStore::open_in_memory().unwrap();
        let a = store
            .get_or_create_container("img@sha256:a", Mode::Cpu, "/proj", &[])
            .unwrap();
        let b = store
            .get_or_create_container("img@sha256:a", Mode::Gpu, "/other", &[])
            .unwrap();
        assert_eq!(a.id, b.id);
        // The first write wins; identity is the image reference alone.
        assert_eq!(b.mode, Mode::Cpu);
    }

    #[test]
    fn resubmission_creates_two_jobs_for_one_experiment() {
        let mut store = RegistryStore::open_in_memory().unwrap();
        let group = store.get_or_create_group(Some("g")).unwrap();
        let container = store
            .get_or_create_container("img@sha256:a", Mode::Cpu, "/proj", &[])
            .unwrap();
        let experiment = store
            .get_or_create_experiment(group.id, container.id, "pkg.main", &["--x".to_string()], &[])
            .unwrap();
        let job_a = store
            .create_job(experiment.id, Backend::Local, "handle-a", &serde_json::json!({}))
            .unwrap();
        let job_b = store
            .create_job(experiment.id, Backend::Local, "handle-b", &serde_json::json!({}))
            .unwrap();
        assert_ne!(job_a.id, job_b.id);
        assert_eq!(job_a.experiment_id, job_b.experiment_id);
    }

    #[test]
    fn update_job_status_rejects_invalid_transition() {
        let mut store = RegistryStore::open_in_memory().unwrap();
        let group = store.get_or_create_group(Some("g")).unwrap();
        let container = store
            .get_or_create_container("img@sha256:a", Mode::Cpu, "/proj", &[])
            .unwrap();
        let experiment = store
            .get_or_create_experiment(group.id, container.id, "pkg.main", &[], &[])
            .unwrap();
        let job = store
            .create_job(experiment.id, Backend::Local, "handle", &serde_json::json!({}))
            .unwrap();
        store.update_job_status(job.id, JobStatus::Succeeded, None).unwrap();
        let err = store.update_job_status(job.id, JobStatus::Running, None).unwrap_err();
        assert!(matches!(err, CalibanError::RegistryError(_)));
    }

    #[test]
    fn unknown_is_reachable_from_submitted_and_recoverable() {
        let mut store = RegistryStore::open_in_memory().unwrap();
        let group = store.get_or_create_group(Some("g")).unwrap();
        let container = store
            .get_or_create_container("img@sha256:a", Mode::Cpu, "/proj", &[])
            .unwrap();
        let experiment = store
            .get_or_create_experiment(group.id, container.id, "pkg.main", &[], &[])
            .unwrap();
        let job = store
            .create_job(experiment.id, Backend::Local, "handle", &serde_json::json!({}))
            .unwrap();
        store.update_job_status(job.id, JobStatus::Unknown, None).unwrap();
        store.update_job_status(job.id, JobStatus::Running, None).unwrap();
    }

    #[test]
    fn list_group_orders_by_experiment_then_job_created_at() {
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
        let view = store.list_group("g", None).unwrap();
        assert_eq!(view.experiments.len(), 1);
        assert_eq!(view.experiments[0].jobs.len(), 1);
    }
}
