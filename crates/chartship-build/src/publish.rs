use chartship_core::Project;
use chartship_tools::{GitError, HelmError, ToolClient, ToolExecutor};
use std::path::{Path, PathBuf};

/// Result of publishing the chart to the pages repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Short hash of the project commit the publish was made for
    pub commit: String,
    /// Pages branch the chart was pushed to
    pub branch: String,
}

/// Commit message used for automatic updates of hosting repositories.
pub fn update_message(chart_name: &str, commit: &str) -> String {
    format!("[{chart_name}] Automatic update for commit {commit}")
}

/// Package the chart into the pages branch, regenerate the index, and push.
pub async fn publish_pages<E: ToolExecutor>(
    client: &ToolClient<E>,
    project: &Project,
) -> Result<PublishOutcome, PublishError> {
    let publish = &project.config.publish;
    let commit = client
        .last_modified(&project.root, std::slice::from_ref(&project.root))
        .await
        .map_err(|e| PublishError::Version { source: e })?;

    let clone_dir = project.resolve(&publish.clone_dir);
    let deploy_key = project.resolve(&publish.deploy_key);
    remove_stale_clone(&clone_dir).map_err(|e| PublishError::Cleanup {
        path: clone_dir.clone(),
        source: e,
    })?;

    tracing::info!(repo = %publish.pages_repo, dir = %clone_dir.display(), "cloning pages repository");
    client
        .clone_no_checkout(&publish.pages_repo, &clone_dir, Some(&deploy_key))
        .await
        .map_err(|e| PublishError::Git { source: e })?;
    client
        .checkout(&clone_dir, &publish.pages_branch)
        .await
        .map_err(|e| PublishError::Git { source: e })?;

    client
        .helm_repo_add(&publish.chart_repo_name, &publish.chart_repo_url)
        .await
        .map_err(|e| PublishError::Helm { source: e })?;
    client
        .helm_repo_update()
        .await
        .map_err(|e| PublishError::Helm { source: e })?;
    let package = client
        .helm_package(&project.chart_dir(), &clone_dir)
        .await
        .map_err(|e| PublishError::Helm { source: e })?;
    tracing::debug!(%package, "chart packaged");
    client
        .helm_repo_index(&clone_dir, publish.chart_repo_url.trim_end_matches('/'))
        .await
        .map_err(|e| PublishError::Helm { source: e })?;

    client
        .add_all(&clone_dir)
        .await
        .map_err(|e| PublishError::Git { source: e })?;
    client
        .commit(&clone_dir, &update_message(&project.config.chart.name, &commit))
        .await
        .map_err(|e| PublishError::Git { source: e })?;
    client
        .push(&clone_dir, "origin", &publish.pages_branch, Some(&deploy_key))
        .await
        .map_err(|e| PublishError::Git { source: e })?;

    tracing::info!(branch = %publish.pages_branch, %commit, "chart published");
    Ok(PublishOutcome {
        commit,
        branch: publish.pages_branch.clone(),
    })
}

/// Remove a clone directory left behind by an earlier, interrupted run.
pub(crate) fn remove_stale_clone(dir: &Path) -> std::io::Result<()> {
    if dir.exists() {
        tracing::info!(dir = %dir.display(), "removing stale clone");
        std::fs::remove_dir_all(dir)?;
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("could not determine project commit for publish")]
    Version { source: GitError },

    #[error("failed to remove stale clone at {path}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("pages repository update failed")]
    Git { source: GitError },

    #[error("chart packaging failed")]
    Helm { source: HelmError },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_message_names_chart_and_commit() {
        assert_eq!(
            update_message("binderhub", "b3a9f1e"),
            "[binderhub] Automatic update for commit b3a9f1e"
        );
    }

    #[test]
    fn remove_stale_clone_is_noop_when_missing() {
        let tmp = tempfile::TempDir::new().unwrap();
        remove_stale_clone(&tmp.path().join("gh-pages")).unwrap();
    }

    #[test]
    fn remove_stale_clone_deletes_leftovers() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("gh-pages");
        std::fs::create_dir_all(dir.join(".git")).unwrap();
        std::fs::write(dir.join("index.yaml"), "stale").unwrap();

        remove_stale_clone(&dir).unwrap();
        assert!(!dir.exists());
    }
}
