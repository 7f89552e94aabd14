use std::path::PathBuf;

use crate::{
    config::{BuildContext, DependencyDeclaration, Extras, ProjectConfig},
    error::CalibanError,
};

use super::{Entrypoint, Mode};

/// One step of the build, in the fixed order a byte-identical Dockerfile-equivalent is rendered
/// in. Ordering here is itself the determinism contract: two `BuildRecipe`s with equal
/// `directives` render to equal text.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum LayerDirective {
    From(String),
    AptInstall(Vec<String>),
    CopyCredential { host_path: String, container_path: String, env_var: String },
    InstallCloudSqlProxy,
    CopyDependencyFile { file_name: String },
    InstallDependencies { extras: Vec<String> },
    CopySource { paths: Vec<PathBuf> },
    Entrypoint(Entrypoint),
}

#[derive(Debug, Clone)]
pub struct BuildRecipe {
    pub base_image: String,
    pub directives: Vec<LayerDirective>,
    pub context: BuildContext,
    /// Non-fatal warnings accumulated while planning (e.g. a requested extra that isn't
    /// declared by the project).
    pub warnings: Vec<String>,
}

pub struct PlanInput<'a> {
    pub project_dir: &'a std::path::Path,
    pub mode: Mode,
    pub extra_dirs: Vec<PathBuf>,
    pub module_spec: &'a str,
    pub requested_extras: Vec<String>,
    pub base_image_override: Option<String>,
    pub credential_path: Option<PathBuf>,
}

/// Deterministically synthesizes a [`BuildRecipe`] from a project directory and mode, preserving
/// a fixed layer ordering so identical inputs always render identical Dockerfile text.
pub fn plan(input: PlanInput) -> Result<BuildRecipe, CalibanError> {
    let config = ProjectConfig::load(input.project_dir)?;
    let gpu = input.mode.is_gpu();

    let base_image = resolve_base_image(&input, &config);

    let mut directives = vec![LayerDirective::From(base_image.clone())];

    let apt_packages = config.apt_packages(gpu);
    if !apt_packages.is_empty() {
        directives.push(LayerDirective::AptInstall(apt_packages));
    }

    if let Some(credential_path) = &input.credential_path {
        directives.push(LayerDirective::CopyCredential {
            host_path: credential_path.display().to_string(),
            container_path: "/secrets/credential.json".to_string(),
            env_var: "GOOGLE_APPLICATION_CREDENTIALS".to_string(),
        });
    }

    if config.cloud_sql_proxy.is_some() {
        directives.push(LayerDirective::InstallCloudSqlProxy);
    }

    let mut warnings = Vec::new();

    if let Some(declaration) = DependencyDeclaration::discover(input.project_dir) {
        directives.push(LayerDirective::CopyDependencyFile {
            file_name: declaration.file_name().to_string(),
        });

        let extras = Extras::discover(input.project_dir);
        let (requested, missing) = extras.requested(gpu, &input.requested_extras);
        for extra in &missing {
            warnings.push(format!(
                "requested extra `{extra}` is not declared by the project; installing without it"
            ));
        }
        directives.push(LayerDirective::InstallDependencies { extras: requested });
    }

    let context = BuildContext::build(input.project_dir, &input.extra_dirs)?;
    directives.push(LayerDirective::CopySource {
        paths: std::iter::once(input.project_dir.to_owned())
            .chain(input.extra_dirs.iter().cloned())
            .collect(),
    });

    directives.push(LayerDirective::Entrypoint(Entrypoint::classify(
        input.module_spec,
    )));

    Ok(BuildRecipe {
        base_image,
        directives,
        context,
        warnings,
    })
}

fn resolve_base_image(input: &PlanInput, config: &ProjectConfig) -> String {
    let template = input
        .base_image_override
        .clone()
        .or_else(|| config.base_image_override(input.mode.is_gpu()))
        .unwrap_or_else(|| input.mode.default_base_image().to_string());
    input.mode.expand_placeholder(&template)
}

/// Renders a [`BuildRecipe`] as Dockerfile-equivalent text. Pure function of the recipe: equal
/// recipes render to byte-identical text, which is what makes the external builder's layer
/// cache effective across invocations.
pub fn render_dockerfile(recipe: &BuildRecipe) -> String {
    let mut out = String::new();
    for directive in &recipe.directives {
        match directive {
            LayerDirective::From(image) => out.push_str(&format!("FROM {image}\n")),
            LayerDirective::AptInstall(packages) => {
                out.push_str(&format!(
                    "RUN apt-get update && apt-get install -y {}\n",
                    packages.join(" ")
                ));
            }
            LayerDirective::CopyCredential {
                host_path,
                container_path,
                env_var,
            } => {
                out.push_str(&format!("COPY {host_path} {container_path}\n"));
                out.push_str(&format!("ENV {env_var}={container_path}\n"));
            }
            LayerDirective::InstallCloudSqlProxy => {
                out.push_str("RUN curl -o /usr/local/bin/cloud_sql_proxy https://dl.google.com/cloudsql/cloud_sql_proxy && chmod +x /usr/local/bin/cloud_sql_proxy\n");
            }
            LayerDirective::CopyDependencyFile { file_name } => {
                out.push_str(&format!("COPY {file_name} {file_name}\n"));
            }
            LayerDirective::InstallDependencies { extras } => {
                if extras.is_empty() {
                    out.push_str("RUN pip install .\n");
                } else {
                    out.push_str(&format!("RUN pip install .[{}]\n", extras.join(",")));
                }
            }
            LayerDirective::CopySource { paths } => {
                for path in paths {
                    out.push_str(&format!("COPY {path} {path}\n", path = path.display()));
                }
            }
            LayerDirective::Entrypoint(entrypoint) => {
                let argv = entrypoint.command_prefix();
                let quoted: Vec<String> = argv.iter().map(|a| format!("{a:?}")).collect();
                out.push_str(&format!("ENTRYPOINT [{}]\n", quoted.join(", ")));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_with(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, contents) in files {
            std::fs::write(dir.path().join(name), contents).unwrap();
        }
        dir
    }

    #[test]
    fn plan_is_deterministic_for_identical_inputs() {
        let dir = project_with(&[("requirements.txt", "numpy\n")]);

        let make_input = || PlanInput {
            project_dir: dir.path(),
            mode: Mode::Cpu,
            extra_dirs: vec![],
            module_spec: "pkg.main",
            requested_extras: vec![],
            base_image_override: None,
            credential_path: None,
        };

        let a = plan(make_input()).unwrap();
        let b = plan(make_input()).unwrap();
        assert_eq!(render_dockerfile(&a), render_dockerfile(&b));
    }

    #[test]
    fn missing_extra_is_a_warning_not_an_error() {
        let dir = project_with(&[("requirements.txt", "numpy\n")]);
        let recipe = plan(PlanInput {
            project_dir: dir.path(),
            mode: Mode::Gpu,
            extra_dirs: vec![],
            module_spec: "pkg.main",
            requested_extras: vec![],
            base_image_override: None,
            credential_path: None,
        })
        .unwrap();
        assert!(recipe.warnings.iter().any(|w| w.contains("gpu")));
    }

    #[test]
    fn base_image_placeholder_expands_per_mode() {
        let dir = project_with(&[]);
        let recipe = plan(PlanInput {
            project_dir: dir.path(),
            mode: Mode::Gpu,
            extra_dirs: vec![],
            module_spec: "pkg.main",
            requested_extras: vec![],
            base_image_override: Some("dlvm:tf2-{}-2.2".to_string()),
            credential_path: None,
        })
        .unwrap();
        assert_eq!(recipe.base_image, "dlvm:tf2-gpu-2.2");
    }
}
