//! Build-context enumeration honoring a `.dockerignore`-equivalent exclusion list, without
//! reading the contents of excluded files.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::CalibanError;

/// The set of files that make up a build context: the project directory plus any user-named
/// extra directories, filtered through `.calibanignore` (falling back to `.dockerignore`) and a
/// small built-in default ignore set.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub root: PathBuf,
    pub extra_dirs: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
}

const DEFAULT_IGNORES: &[&str] = &[".git", "__pycache__", "*.pyc", "*.egg-info"];

impl BuildContext {
    pub fn build(root: &Path, extra_dirs: &[PathBuf]) -> Result<Self, CalibanError> {
        let mut files = Vec::new();
        for dir in std::iter::once(root).chain(extra_dirs.iter().map(PathBuf::as_path)) {
            if !dir.exists() {
                return Err(CalibanError::RecipeInvalid(format!(
                    "extra directory does not exist: {}",
                    dir.display()
                )));
            }
            files.extend(enumerate(dir)?);
        }

        Ok(BuildContext {
            root: root.to_owned(),
            extra_dirs: extra_dirs.to_owned(),
            files,
        })
    }
}

fn enumerate(dir: &Path) -> Result<Vec<PathBuf>, CalibanError> {
    let mut builder = WalkBuilder::new(dir);
    builder
        .hidden(false)
        .add_custom_ignore_filename(".calibanignore")
        .add_custom_ignore_filename(".dockerignore");

    let mut overrides = ignore::overrides::OverrideBuilder::new(dir);
    for pattern in DEFAULT_IGNORES {
        // Leading `!` would negate in the `ignore` override grammar; none of our defaults do.
        overrides
            .add(&format!("!{pattern}"))
            .map_err(|err| CalibanError::RecipeInvalid(err.to_string()))?;
    }
    builder.overrides(
        overrides
            .build()
            .map_err(|err| CalibanError::RecipeInvalid(err.to_string()))?,
    );

    let mut paths = Vec::new();
    for entry in builder.build() {
        let entry = entry.map_err(|err| CalibanError::RecipeInvalid(err.to_string()))?;
        if entry.file_type().is_some_and(|ft| ft.is_file()) {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerates_files_deterministically() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.py"), "").unwrap();
        std::fs::write(dir.path().join("a.py"), "").unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git").join("HEAD"), "").unwrap();

        let context = BuildContext::build(dir.path(), &[]).unwrap();
        let names: Vec<_> = context
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.py".to_string(), "b.py".to_string()]);
    }

    #[test]
    fn missing_extra_dir_is_recipe_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let err = BuildContext::build(dir.path(), &[dir.path().join("nope")]).unwrap_err();
        assert!(matches!(err, CalibanError::RecipeInvalid(_)));
    }
}
