//! Dependency declarations read from the project directory: a requirements-style plain-text
//! file and/or a packaging descriptor's "extras" map.

use std::path::Path;

/// The mode-keyed "extras" a packaging descriptor may expose (at minimum `cpu` and `gpu`).
#[derive(Debug, Clone, Default)]
pub struct Extras {
    pub available: Vec<String>,
}

impl Extras {
    /// Detects `extras_require`/`[project.optional-dependencies]`-style extras by a shallow
    /// text scan; the core never executes the project's build backend.
    pub fn discover(project_dir: &Path) -> Self {
        let mut available = Vec::new();
        for candidate in ["setup.py", "pyproject.toml"] {
            let Ok(contents) = std::fs::read_to_string(project_dir.join(candidate)) else {
                continue;
            };
            for line in contents.lines() {
                let trimmed = line.trim();
                if let Some(rest) = trimmed.strip_prefix('"').or(Some(trimmed)) {
                    if let Some((key, _)) = rest.split_once('=') {
                        let key = key.trim().trim_matches('"').trim_matches('\'');
                        if matches!(key, "cpu" | "gpu") {
                            available.push(key.to_string());
                        }
                    }
                }
            }
        }
        available.sort();
        available.dedup();
        Extras { available }
    }

    /// Returns the requested extra, plus a flag indicating whether it is missing (the caller
    /// must only warn, never fail, on a missing extra).
    pub fn requested(&self, gpu: bool, user_requested: &[String]) -> (Vec<String>, Vec<String>) {
        let mode_extra = if gpu { "gpu" } else { "cpu" };
        let mut requested = vec![mode_extra.to_string()];
        requested.extend(user_requested.iter().cloned());
        requested.sort();
        requested.dedup();

        let missing = requested
            .iter()
            .filter(|extra| !self.available.contains(extra))
            .cloned()
            .collect();

        (requested, missing)
    }
}

/// The dependency-declaration file (`requirements.txt`-equivalent), if present.
#[derive(Debug, Clone)]
pub struct DependencyDeclaration {
    pub path: std::path::PathBuf,
}

impl DependencyDeclaration {
    pub fn discover(project_dir: &Path) -> Option<Self> {
        for candidate in ["requirements.txt", "setup.py", "pyproject.toml"] {
            let path = project_dir.join(candidate);
            if path.exists() {
                return Some(DependencyDeclaration { path });
            }
        }
        None
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("requirements.txt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_extra_is_reported_not_fatal() {
        let extras = Extras {
            available: vec!["cpu".to_string()],
        };
        let (requested, missing) = extras.requested(true, &[]);
        assert_eq!(requested, vec!["gpu".to_string()]);
        assert_eq!(missing, vec!["gpu".to_string()]);
    }

    #[test]
    fn discover_prefers_requirements_txt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "numpy\n").unwrap();
        std::fs::write(dir.path().join("setup.py"), "").unwrap();
        let decl = DependencyDeclaration::discover(dir.path()).unwrap();
        assert_eq!(decl.file_name(), "requirements.txt");
    }
}
