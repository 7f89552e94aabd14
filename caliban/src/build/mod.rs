//! BuildPlanner: deterministic container-build recipe synthesis plus the external-builder
//! invocation seam, behind one `Builder` trait implemented by a single `DockerBuilder`.

mod entrypoint;
mod mode;
mod recipe;

pub use entrypoint::Entrypoint;
pub use mode::Mode;
pub use recipe::{plan, render_dockerfile, BuildRecipe, LayerDirective, PlanInput};

use log::debug;

use crate::{docker, error::CalibanError};

/// Invokes the external builder: the core only produces a recipe and a build context, and
/// hands both to a collaborator that knows how to actually build and push an image.
pub trait Builder {
    fn build(&self, recipe: &BuildRecipe, image_tag: &str, git_commit_hash: &str) -> Result<BuildOutput, CalibanError>;
}

pub struct BuildOutput {
    pub image_reference: String,
    pub entrypoint: Vec<String>,
}

pub struct DockerBuilder;

impl Builder for DockerBuilder {
    fn build(&self, recipe: &BuildRecipe, image_tag: &str, git_commit_hash: &str) -> Result<BuildOutput, CalibanError> {
        let dockerfile = render_dockerfile(recipe);
        let dockerfile_path = crate::temp_path::tmp_json_path().with_extension("dockerfile");
        std::fs::write(&dockerfile_path, dockerfile)?;

        let output = docker::build_and_push(docker::BuildArgs {
            git_commit_hash,
            image_tag,
            platform: docker::Platform::LinuxAmd64,
            dockerfile_path: &dockerfile_path,
            context_dir: &recipe.context.root,
        })
        .map_err(|err| CalibanError::BackendError(err.to_string()))?;

        let entrypoint = docker::entrypoint(image_tag)
            .map_err(|err| CalibanError::BackendError(err.to_string()))?
            .unwrap_or_default();

        debug!("image_digest: {:?}", output.image_digest);

        Ok(BuildOutput {
            image_reference: format!("{image_tag}@{digest}", digest = output.image_digest),
            entrypoint,
        })
    }
}

/// A no-op builder for dry runs: validates that a recipe exists and stops short of invoking
/// the external builder.
pub struct DryRunBuilder;

impl Builder for DryRunBuilder {
    fn build(&self, _recipe: &BuildRecipe, image_tag: &str, _git_commit_hash: &str) -> Result<BuildOutput, CalibanError> {
        Ok(BuildOutput {
            image_reference: format!("{image_tag}@dry-run"),
            entrypoint: Vec::new(),
        })
    }
}
