//! Row types returned by [`super::RegistryStore`] and the `rusqlite::Row` mapping functions for
//! each, kept in one place so the SQL column order and the struct field order can be checked
//! against each other at a glance.

use rusqlite::Row;
use time::OffsetDateTime;

use crate::backend::{Backend, JobStatus};
use crate::build::Mode;

use super::{parse_backend, parse_mode, parse_status};

fn parse_timestamp(value: &str) -> OffsetDateTime {
    OffsetDateTime::parse(value, &time::format_description::well_known::Rfc3339)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentGroup {
    pub id: i64,
    pub name: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub id: i64,
    pub image_reference: String,
    pub mode: Mode,
    pub build_context_path: String,
    pub extra_dirs: Vec<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    pub id: i64,
    pub group_id: i64,
    pub container_id: i64,
    pub module_spec: String,
    pub args: Vec<String>,
    pub kwargs: Vec<(String, String)>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: i64,
    pub experiment_id: i64,
    pub backend: Backend,
    pub backend_handle: String,
    pub details: serde_json::Value,
    pub created_at: OffsetDateTime,
    pub status: JobStatus,
}

/// A [`JobRow`] joined with the experiment, container, and group it belongs to, for rendering
/// grouped views without a second round trip per row.
#[derive(Debug, Clone)]
pub struct JobWithContext {
    pub job: JobRow,
    pub experiment: Experiment,
    pub container: Container,
    pub group: ExperimentGroup,
}

#[derive(Debug, Clone)]
pub struct GroupedExperiment {
    pub experiment: Experiment,
    pub container: Container,
    pub jobs: Vec<JobRow>,
}

#[derive(Debug, Clone)]
pub struct GroupView {
    pub group: ExperimentGroup,
    pub experiments: Vec<GroupedExperiment>,
}

pub(super) fn row_to_group(row: &Row) -> rusqlite::Result<ExperimentGroup> {
    Ok(ExperimentGroup {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_timestamp(&row.get::<_, String>(2)?),
    })
}

pub(super) fn row_to_container(row: &Row) -> rusqlite::Result<Container> {
    let extra_dirs: String = row.get(4)?;
    Ok(Container {
        id: row.get(0)?,
        image_reference: row.get(1)?,
        mode: parse_mode(&row.get::<_, String>(2)?).map_err(rusqlite_custom)?,
        build_context_path: row.get(3)?,
        extra_dirs: serde_json::from_str(&extra_dirs).map_err(|e| rusqlite_custom(crate::error::CalibanError::RegistryError(e.to_string())))?,
        created_at: parse_timestamp(&row.get::<_, String>(5)?),
    })
}

pub(super) fn row_to_experiment(row: &Row) -> rusqlite::Result<Experiment> {
    let args: String = row.get(4)?;
    let kwargs: String = row.get(5)?;
    Ok(Experiment {
        id: row.get(0)?,
        group_id: row.get(1)?,
        container_id: row.get(2)?,
        module_spec: row.get(3)?,
        args: serde_json::from_str(&args).map_err(|e| rusqlite_custom(crate::error::CalibanError::RegistryError(e.to_string())))?,
        kwargs: serde_json::from_str(&kwargs).map_err(|e| rusqlite_custom(crate::error::CalibanError::RegistryError(e.to_string())))?,
        created_at: parse_timestamp(&row.get::<_, String>(6)?),
    })
}

pub(super) fn row_to_job(row: &Row) -> rusqlite::Result<JobRow> {
    let details: String = row.get(4)?;
    Ok(JobRow {
        id: row.get(0)?,
        experiment_id: row.get(1)?,
        backend: parse_backend(&row.get::<_, String>(2)?).map_err(rusqlite_custom)?,
        backend_handle: row.get(3)?,
        details: serde_json::from_str(&details).map_err(|e| rusqlite_custom(crate::error::CalibanError::RegistryError(e.to_string())))?,
        created_at: parse_timestamp(&row.get::<_, String>(5)?),
        status: parse_status(&row.get::<_, String>(6)?).map_err(rusqlite_custom)?,
    })
}

/// Maps the 23-column join used by `list_recent_jobs` and `jobs_in_group_matching`: 7 job
/// columns, 7 experiment columns, 6 container columns, 3 group columns, in that order.
pub(super) fn row_to_job_with_context(row: &Row) -> rusqlite::Result<JobWithContext> {
    let job_details: String = row.get(4)?;
    let job = JobRow {
        id: row.get(0)?,
        experiment_id: row.get(1)?,
        backend: parse_backend(&row.get::<_, String>(2)?).map_err(rusqlite_custom)?,
        backend_handle: row.get(3)?,
        details: serde_json::from_str(&job_details).map_err(|e| rusqlite_custom(crate::error::CalibanError::RegistryError(e.to_string())))?,
        created_at: parse_timestamp(&row.get::<_, String>(5)?),
        status: parse_status(&row.get::<_, String>(6)?).map_err(rusqlite_custom)?,
    };

    let exp_args: String = row.get(11)?;
    let exp_kwargs: String = row.get(12)?;
    let experiment = Experiment {
        id: row.get(7)?,
        group_id: row.get(8)?,
        container_id: row.get(9)?,
        module_spec: row.get(10)?,
        args: serde_json::from_str(&exp_args).map_err(|e| rusqlite_custom(crate::error::CalibanError::RegistryError(e.to_string())))?,
        kwargs: serde_json::from_str(&exp_kwargs).map_err(|e| rusqlite_custom(crate::error::CalibanError::RegistryError(e.to_string())))?,
        created_at: parse_timestamp(&row.get::<_, String>(13)?),
    };

    let container_extra_dirs: String = row.get(18)?;
    let container = Container {
        id: row.get(14)?,
        image_reference: row.get(15)?,
        mode: parse_mode(&row.get::<_, String>(16)?).map_err(rusqlite_custom)?,
        build_context_path: row.get(17)?,
        extra_dirs: serde_json::from_str(&container_extra_dirs).map_err(|e| rusqlite_custom(crate::error::CalibanError::RegistryError(e.to_string())))?,
        created_at: parse_timestamp(&row.get::<_, String>(19)?),
    };

    let group = ExperimentGroup {
        id: row.get(20)?,
        name: row.get(21)?,
        created_at: parse_timestamp(&row.get::<_, String>(22)?),
    };

    Ok(JobWithContext { job, experiment, container, group })
}

fn rusqlite_custom(err: crate::error::CalibanError) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(err))
}
