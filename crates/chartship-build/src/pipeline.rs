use crate::deployment::{DeploymentError, DeploymentOutcome, update_deployment};
use crate::images::{ImageError, ImageOutcome, ImageStatus, build_images};
use crate::publish::{PublishError, PublishOutcome, publish_pages};
use crate::stamp::{ChartStamp, StampError, ValuesStamp, stamp_chart, stamp_values};
use chartship_core::Project;
use chartship_tools::{ToolClient, ToolExecutor};

/// Options of the `build` subcommand.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub image_prefix: String,
    /// Only rebuild images whose paths changed in this range
    pub commit_range: Option<String>,
    /// Push images and publish the chart
    pub push: bool,
}

/// Everything a `build` run did, in order.
#[derive(Debug, Clone)]
pub struct ReleaseReport {
    pub images: Vec<ImageOutcome>,
    pub values: ValuesStamp,
    pub chart: ChartStamp,
    pub published: Option<PublishOutcome>,
    pub deployment: Option<DeploymentOutcome>,
}

impl ReleaseReport {
    /// Human-readable summary lines.
    pub fn steps(&self) -> Vec<String> {
        let mut steps = Vec::new();
        for image in &self.images {
            steps.push(match &image.status {
                ImageStatus::Built {
                    image_ref,
                    pushed: true,
                } => format!("Built and pushed {image_ref}"),
                ImageStatus::Built { image_ref, .. } => format!("Built {image_ref}"),
                ImageStatus::Skipped { commit_range } => {
                    format!("Skipped {}, not touched in {commit_range}", image.name)
                }
            });
        }
        steps.push(format!(
            "Stamped values: image {}:{}",
            self.values.name, self.values.tag
        ));
        steps.push(format!(
            "Stamped chart version: {} -> {}",
            self.chart.previous, self.chart.version
        ));
        if let Some(published) = &self.published {
            steps.push(format!(
                "Published chart for commit {} to {}",
                published.commit, published.branch
            ));
        }
        if let Some(deployment) = &self.deployment {
            steps.push(format!(
                "Pushed deployment branch {} (version {})",
                deployment.branch, deployment.version
            ));
        }
        steps
    }
}

/// Run the release pipeline: images → values → chart → publish → deployment.
///
/// Publishing and the deployment update only happen when pushing.
pub async fn run_build<E: ToolExecutor>(
    client: &ToolClient<E>,
    project: &Project,
    options: &BuildOptions,
) -> Result<ReleaseReport, ReleaseError> {
    let images = build_images(
        client,
        project,
        &options.image_prefix,
        options.commit_range.as_deref(),
        options.push,
    )
    .await?;

    let values = stamp_values(client, project, &options.image_prefix).await?;
    let chart = stamp_chart(client, project).await?;

    let (published, deployment) = if options.push {
        let published = publish_pages(client, project).await?;
        let deployment = if project.config.deployment.enabled {
            Some(update_deployment(client, project, &chart.previous).await?)
        } else {
            tracing::debug!("deployment update disabled");
            None
        };
        (Some(published), deployment)
    } else {
        (None, None)
    };

    Ok(ReleaseReport {
        images,
        values,
        chart,
        published,
        deployment,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    #[error("image stage failed")]
    Images(#[from] ImageError),

    #[error("manifest stage failed")]
    Stamp(#[from] StampError),

    #[error("publish stage failed")]
    Publish(#[from] PublishError),

    #[error("deployment stage failed")]
    Deployment(#[from] DeploymentError),
}
