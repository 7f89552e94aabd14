use std::path::{Path, PathBuf};

/// The module-spec the user passed on the command line, classified into one of three shapes.
/// Replaces string-sniffing at every downstream call site with a single tagged variant.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Entrypoint {
    /// `a.b.c` — run as `python -m a.b.c`.
    PyModule(String),
    /// `path/to/file.py` — run as `python path/to/file.py`.
    PyScript(PathBuf),
    /// `path/to/file` (any other extension) — run as `/bin/bash path/to/file`.
    Shell(PathBuf),
}

impl Entrypoint {
    pub fn classify(spec: &str) -> Self {
        let path = Path::new(spec);
        if path.extension().is_none() && spec.contains('.') && !spec.contains('/') {
            return Entrypoint::PyModule(spec.to_string());
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("py") => Entrypoint::PyScript(path.to_owned()),
            _ => Entrypoint::Shell(path.to_owned()),
        }
    }

    /// The argv prefix used to invoke this entrypoint inside the container, before any
    /// user-supplied arguments.
    pub fn command_prefix(&self) -> Vec<String> {
        match self {
            Entrypoint::PyModule(module) => vec!["python".to_string(), "-m".to_string(), module.clone()],
            Entrypoint::PyScript(path) => vec!["python".to_string(), path.display().to_string()],
            Entrypoint::Shell(path) => vec!["/bin/bash".to_string(), path.display().to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_module() {
        assert_eq!(
            Entrypoint::classify("trainer.experiment.main"),
            Entrypoint::PyModule("trainer.experiment.main".to_string())
        );
    }

    #[test]
    fn classifies_py_script() {
        assert_eq!(
            Entrypoint::classify("trainer/main.py"),
            Entrypoint::PyScript(PathBuf::from("trainer/main.py"))
        );
    }

    #[test]
    fn classifies_shell() {
        assert_eq!(
            Entrypoint::classify("scripts/run.sh"),
            Entrypoint::Shell(PathBuf::from("scripts/run.sh"))
        );
    }

    #[test]
    fn command_prefixes() {
        assert_eq!(
            Entrypoint::PyModule("a.b".to_string()).command_prefix(),
            vec!["python", "-m", "a.b"]
        );
        assert_eq!(
            Entrypoint::Shell(PathBuf::from("run")).command_prefix(),
            vec!["/bin/bash", "run"]
        );
    }
}
