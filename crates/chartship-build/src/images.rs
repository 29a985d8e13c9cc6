use chartship_core::{ImageConfig, Project};
use chartship_tools::{DockerError, GitError, ToolClient, ToolExecutor};

/// What happened to one configured image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageStatus {
    Built { image_ref: String, pushed: bool },
    /// None of the image's paths changed in the commit range.
    Skipped { commit_range: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOutcome {
    pub name: String,
    pub status: ImageStatus,
}

/// Fully qualified image reference: `<prefix><name>:<tag>`.
pub fn image_ref(prefix: &str, name: &str, tag: &str) -> String {
    format!("{prefix}{name}:{tag}")
}

/// Build every configured image in order, optionally pushing each one.
///
/// With a commit range, images whose contributing paths did not change in
/// that range are skipped without invoking docker.
pub async fn build_images<E: ToolExecutor>(
    client: &ToolClient<E>,
    project: &Project,
    prefix: &str,
    commit_range: Option<&str>,
    push: bool,
) -> Result<Vec<ImageOutcome>, ImageError> {
    let mut outcomes = Vec::with_capacity(project.config.images.len());
    for image in &project.config.images {
        let status = build_image(client, project, image, prefix, commit_range, push).await?;
        outcomes.push(ImageOutcome {
            name: image.name.clone(),
            status,
        });
    }
    Ok(outcomes)
}

async fn build_image<E: ToolExecutor>(
    client: &ToolClient<E>,
    project: &Project,
    image: &ImageConfig,
    prefix: &str,
    commit_range: Option<&str>,
    push: bool,
) -> Result<ImageStatus, ImageError> {
    let paths = project.image_paths(image);

    if let Some(range) = commit_range {
        let changed = client
            .path_changed(&project.root, &paths, range)
            .await
            .map_err(|e| ImageError::ChangeDetection {
                image: image.name.clone(),
                source: e,
            })?;
        if !changed {
            tracing::info!(image = %image.name, commit_range = %range, "skipping {}, not touched in {}", image.name, range);
            return Ok(ImageStatus::Skipped {
                commit_range: range.to_owned(),
            });
        }
    }

    let tag = client
        .last_modified(&project.root, &paths)
        .await
        .map_err(|e| ImageError::Version {
            image: image.name.clone(),
            source: e,
        })?;
    let image_ref = image_ref(prefix, &image.name, &tag);

    tracing::info!(image = %image.name, %image_ref, "building image");
    client
        .build_image(
            &project.image_context(image),
            &image_ref,
            &[(image.version_build_arg.clone(), tag)],
        )
        .await
        .map_err(|e| ImageError::Build { source: e })?;

    if push {
        tracing::info!(%image_ref, "pushing image");
        client
            .push_image(&image_ref)
            .await
            .map_err(|e| ImageError::Push { source: e })?;
    }

    Ok(ImageStatus::Built {
        image_ref,
        pushed: push,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("change detection for image '{image}' failed")]
    ChangeDetection { image: String, source: GitError },

    #[error("could not determine version of image '{image}'")]
    Version { image: String, source: GitError },

    #[error("image build failed")]
    Build { source: DockerError },

    #[error("image push failed")]
    Push { source: DockerError },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_ref_concatenates_prefix_name_and_tag() {
        assert_eq!(
            image_ref("acme/k8s-", "binderhub", "abc1234"),
            "acme/k8s-binderhub:abc1234"
        );
        assert_eq!(
            image_ref("gcr.io/proj/", "hub", "0f0f0f0"),
            "gcr.io/proj/hub:0f0f0f0"
        );
    }
}
