use crate::{process, Result};

mod name;
pub use name::*;

mod job;
pub use job::*;

mod common;
pub use common::*;

pub struct Kubectl<'a> {
    server: &'a str,
}

impl<'a> Kubectl<'a> {
    pub fn new(server: &'a str) -> Self {
        Self { server }
    }

    /// Returns the kubectl command where authentication arguments have already been set.
    fn kubectl(&self) -> process::Command {
        process::command!(
            "kubectl",
            // Despite passing `--server` and `--token`, kubectl will still load the kubeconfig if
            // present. By setting `--kubeconfig` to an empty file, we can make sure no other
            // options apply.
            "--kubeconfig=/dev/null", // Does not work on Windows but Windows users develop inside WSL.
            "--server",
            self.server,
            "--token=unused",
        )
    }

    /// The input is written to stdin and should be a [YAML or JSON formatted kubernetes
    /// configuration](https://kubernetes.io/docs/tasks/manage-kubernetes-objects/imperative-config/).
    pub fn create(&self, input: &str) -> Result<ResourceHandle> {
        let output = process::args!(self.kubectl(), "create", "--output=json", "-f", "-")
            .output_with_input(input.as_bytes().to_owned())?;

        // The following should probably be integrated with a custom error type, but useful and good enough for now.
        if log::log_enabled!(log::Level::Error) && !output.status.success() {
            if let Ok(stderr) = std::str::from_utf8(&output.stderr) {
                let path = crate::temp_path::tmp_json_path();
                if std::fs::write(&path, input).is_ok() {
                    log::error!("Invalid spec (written to {}): {stderr}", path.display())
                }
            }
        }

        let output = output.require_success()?;

        let root: CreateJobRoot = serde_json::from_slice(&output.stdout)?;

        Ok(ResourceHandle {
            namespace: root.metadata.namespace,
            name: root.metadata.name,
        })
    }

    pub fn try_get_job(&self, namespace: &str, job_name: &str) -> Result<Option<Job>> {
        let output = process::args!(
            self.kubectl(),
            "get",
            "job",
            "--namespace",
            namespace,
            job_name,
            "--output=json"
        )
        .try_output()?;

        let process::Output { command, output } = output;

        if output.status.success() {
            Ok(Some(serde_json::from_slice(&output.stdout)?))
        } else if output.stderr.starts_with(b"Error from server (NotFound): ") {
            Ok(None)
        } else {
            Err(process::Error {
                command,
                kind: process::ErrorKind::NonZeroExitStatus(
                    output.status.code().and_then(std::num::NonZeroI32::new),
                ),
            }
            .into())
        }
    }

    pub fn delete_job(&self, job_name: &str, namespace: &str) -> Result<()> {
        let _ = process::args!(
            self.kubectl(),
            "--namespace",
            namespace,
            "delete",
            "job",
            job_name
        )
        .output()?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct ResourceHandle {
    pub namespace: String,
    pub name: String,
}

impl From<CreateJobRoot> for ResourceHandle {
    fn from(value: CreateJobRoot) -> Self {
        let CreateOutputMetadata { namespace, name } = value.metadata;
        Self { namespace, name }
    }
}
#[derive(serde::Deserialize)]
struct CreateJobRoot {
    metadata: CreateOutputMetadata,
}

#[derive(serde::Deserialize)]
struct CreateOutputMetadata {
    namespace: String,
    name: String,
}

pub const NAMESPACE: &str = "caliban";

pub mod annotation {
    pub const LAUNCHED_BY: &str = "caliban.dev/launched-by";
    pub const VERSION: &str = "caliban.dev/version";
}
