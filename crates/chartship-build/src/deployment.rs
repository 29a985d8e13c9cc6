use crate::publish::{remove_stale_clone, update_message};
use chartship_core::{Project, YamlDocument};
use chartship_tools::{GitError, ToolClient, ToolExecutor};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentOutcome {
    /// Branch pushed to the deployment remote
    pub branch: String,
    pub version: String,
}

/// Name of the branch proposing a deployment of `commit`.
pub fn autodeploy_branch(commit: &str) -> String {
    format!("autodeploy-{commit}")
}

/// Stamp `chart_version` into the deployment repository and push it as an
/// `autodeploy-<commit>` branch.
///
/// Only invoked when `[deployment].enabled` is set.
pub async fn update_deployment<E: ToolExecutor>(
    client: &ToolClient<E>,
    project: &Project,
    chart_version: &str,
) -> Result<DeploymentOutcome, DeploymentError> {
    let deployment = &project.config.deployment;
    let commit = client
        .last_modified(&project.root, std::slice::from_ref(&project.root))
        .await
        .map_err(|e| DeploymentError::Version { source: e })?;

    let clone_dir = project.resolve(&deployment.clone_dir);
    let deploy_key = project.resolve(&deployment.deploy_key);
    remove_stale_clone(&clone_dir).map_err(|e| DeploymentError::Cleanup {
        path: clone_dir.clone(),
        source: e,
    })?;

    tracing::info!(repo = %deployment.repo, dir = %clone_dir.display(), "cloning deployment repository");
    client
        .clone_no_checkout(&deployment.repo, &clone_dir, Some(&deploy_key))
        .await
        .map_err(|e| DeploymentError::Git { source: e })?;
    client
        .checkout(&clone_dir, &deployment.branch)
        .await
        .map_err(|e| DeploymentError::Git { source: e })?;
    client
        .remote_add(&clone_dir, &deployment.remote_name, &deployment.remote_url)
        .await
        .map_err(|e| DeploymentError::Git { source: e })?;

    let mut config = YamlDocument::load(&clone_dir.join(&deployment.config_file))
        .map_err(|e| DeploymentError::Manifest { source: e })?;
    config
        .set_str(&["version"], chart_version)
        .and_then(|()| config.save())
        .map_err(|e| DeploymentError::Manifest { source: e })?;

    let branch = autodeploy_branch(&commit);
    client
        .add_all(&clone_dir)
        .await
        .map_err(|e| DeploymentError::Git { source: e })?;
    client
        .commit(&clone_dir, &update_message(&project.config.chart.name, &commit))
        .await
        .map_err(|e| DeploymentError::Git { source: e })?;
    client
        .push(
            &clone_dir,
            &deployment.remote_name,
            &format!("HEAD:{branch}"),
            Some(&deploy_key),
        )
        .await
        .map_err(|e| DeploymentError::Git { source: e })?;

    tracing::info!(remote = %deployment.remote_name, %branch, version = %chart_version, "deployment update pushed");
    Ok(DeploymentOutcome {
        branch,
        version: chart_version.to_owned(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum DeploymentError {
    #[error("could not determine project commit for deployment update")]
    Version { source: GitError },

    #[error("failed to remove stale clone at {path}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("deployment repository update failed")]
    Git { source: GitError },

    #[error("deployment config update failed")]
    Manifest { source: chartship_core::Error },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autodeploy_branch_embeds_commit() {
        assert_eq!(autodeploy_branch("b3a9f1e"), "autodeploy-b3a9f1e");
    }
}
