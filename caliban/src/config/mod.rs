//! Project-directory configuration: the optional config document, dependency declarations, and
//! the `.dockerignore`-equivalent exclusion list consulted by the build planner.

mod dockerignore;
mod requirements;

pub use dockerignore::BuildContext;
pub use requirements::{DependencyDeclaration, Extras};

use serde::Deserialize;
use std::{collections::HashMap, path::Path};

use crate::error::CalibanError;

/// A value that may be given uniformly or split per [`Mode`](crate::build::Mode).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PerMode<T> {
    Uniform(T),
    Split { cpu: Option<T>, gpu: Option<T> },
}

impl<T: Clone + Default> PerMode<T> {
    pub fn for_mode(&self, gpu: bool) -> T {
        match self {
            PerMode::Uniform(value) => value.clone(),
            PerMode::Split { cpu, gpu: gpu_value } => {
                if gpu {
                    gpu_value.clone().unwrap_or_default()
                } else {
                    cpu.clone().unwrap_or_default()
                }
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CloudSqlProxyConfig {
    pub project: String,
    pub region: String,
    pub db: String,
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    pub artifact_root: String,
    #[serde(default)]
    pub debug: bool,
}

/// The optional `caliban.yaml` / `.caliban.yaml` project configuration document.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub apt_packages: Option<PerMode<Vec<String>>>,
    #[serde(default)]
    pub base_image: Option<PerMode<String>>,
    #[serde(default)]
    pub cloud_sql_proxy: Option<CloudSqlProxyConfig>,
}

impl ProjectConfig {
    /// Loads the project configuration from `project_dir/.calibanconfig.yaml`, returning the
    /// default (empty) configuration when the file does not exist.
    pub fn load(project_dir: &Path) -> Result<Self, CalibanError> {
        let path = project_dir.join(".calibanconfig.yaml");
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                serde_yaml::from_str(&contents).map_err(|err| CalibanError::ConfigInvalid(
                    format!("{path}: {err}", path = path.display()),
                ))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(ProjectConfig::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn apt_packages(&self, gpu: bool) -> Vec<String> {
        let mut packages = self
            .apt_packages
            .as_ref()
            .map(|value| value.for_mode(gpu))
            .unwrap_or_default();
        packages.sort();
        packages.dedup();
        packages
    }

    pub fn base_image_override(&self, gpu: bool) -> Option<String> {
        self.base_image
            .as_ref()
            .map(|value| value.for_mode(gpu))
            .filter(|value| !value.is_empty())
    }
}

/// Labels supplied on the command line, merged with auto-derived labels by
/// [`crate::backend::labels::sanitize_and_merge`].
#[derive(Debug, Clone, Default)]
pub struct UserLabels(pub HashMap<String, String>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_mode_uniform_applies_to_both() {
        let value = PerMode::Uniform(vec!["curl".to_string()]);
        assert_eq!(value.for_mode(false), vec!["curl".to_string()]);
        assert_eq!(value.for_mode(true), vec!["curl".to_string()]);
    }

    #[test]
    fn per_mode_split_picks_branch() {
        let value = PerMode::Split {
            cpu: Some(vec!["cpu-only".to_string()]),
            gpu: Some(vec!["nvidia-cuda".to_string()]),
        };
        assert_eq!(value.for_mode(false), vec!["cpu-only".to_string()]);
        assert_eq!(value.for_mode(true), vec!["nvidia-cuda".to_string()]);
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap();
        assert!(config.apt_packages(false).is_empty());
    }
}
