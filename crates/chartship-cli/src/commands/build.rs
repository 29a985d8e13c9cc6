use anyhow::Context;
use chartship_build::{BuildOptions, run_build};
use chartship_core::Project;
use chartship_tools::ToolClient;
use std::path::Path;

/// Build images, stamp chart manifests, and publish when pushing.
pub async fn build(
    project_dir: &Path,
    image_prefix: Option<&str>,
    commit_range: Option<String>,
    push: bool,
) -> anyhow::Result<()> {
    let project = Project::open(project_dir)
        .with_context(|| format!("failed to open project at {}", project_dir.display()))?;

    let options = BuildOptions {
        image_prefix: image_prefix
            .map(str::to_owned)
            .unwrap_or_else(|| project.config.image_prefix.clone()),
        commit_range,
        push,
    };

    tracing::debug!(
        root = %project.root.display(),
        prefix = %options.image_prefix,
        commit_range = ?options.commit_range,
        push,
        "starting build"
    );

    println!("Building {} chart...", project.config.chart.name);
    let client = ToolClient::new();
    let report = run_build(&client, &project, &options).await?;

    println!();
    for step in report.steps() {
        println!("  {step}");
    }
    if !push {
        println!();
        println!("Images and chart were not pushed (pass --push to publish).");
    }

    Ok(())
}
