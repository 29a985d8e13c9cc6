use crate::command::{ToolCommand, ToolError};
use crate::executor::{RealExecutor, ToolExecutor};
use std::path::{Path, PathBuf};

/// git, docker and helm operations, parameterized over the executor for testability.
///
/// Every operation takes the directory it works in explicitly.
pub struct ToolClient<E: ToolExecutor = RealExecutor> {
    executor: E,
}

impl ToolClient<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor,
        }
    }
}

impl Default for ToolClient<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ToolExecutor> ToolClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    // ── Git: history queries ──

    /// Have any of `paths` changed within `commit_range`?
    pub async fn path_changed(
        &self,
        repo: &Path,
        paths: &[PathBuf],
        commit_range: &str,
    ) -> Result<bool, GitError> {
        let cmd = git(repo)
            .args(["diff", "--name-only", commit_range, "--"])
            .args(path_strings(paths));

        let output = self
            .executor
            .exec(&cmd)
            .await
            .map_err(|e| GitError::Diff {
                range: commit_range.to_owned(),
                source: e,
            })?;

        Ok(!output.trim().is_empty())
    }

    /// Short hash of the most recent commit touching any of `paths`.
    pub async fn last_modified(&self, repo: &Path, paths: &[PathBuf]) -> Result<String, GitError> {
        let cmd = git(repo)
            .args(["log", "-n", "1", "--pretty=format:%h", "--"])
            .args(path_strings(paths));

        let output = self
            .executor
            .exec(&cmd)
            .await
            .map_err(|e| GitError::Log { source: e })?;

        let hash = output.trim();
        if hash.is_empty() {
            return Err(GitError::NoCommits {
                paths: paths.to_vec(),
            });
        }
        Ok(hash.to_owned())
    }

    // ── Git: publishing ──

    /// Clone `url` into `dest` without checking out a working tree.
    pub async fn clone_no_checkout(
        &self,
        url: &str,
        dest: &Path,
        ssh_key: Option<&Path>,
    ) -> Result<(), GitError> {
        let mut cmd = ToolCommand::new("git")
            .args(["clone", "--no-checkout", url])
            .path_arg(dest);
        if let Some(key) = ssh_key {
            cmd = with_ssh_key(cmd, key);
        }

        self.executor
            .exec(&cmd)
            .await
            .map_err(|e| GitError::Clone {
                url: url.to_owned(),
                source: e,
            })?;
        Ok(())
    }

    pub async fn checkout(&self, repo: &Path, branch: &str) -> Result<(), GitError> {
        self.executor
            .exec(&git(repo).args(["checkout", branch]))
            .await
            .map_err(|e| GitError::Checkout {
                branch: branch.to_owned(),
                source: e,
            })?;
        Ok(())
    }

    pub async fn remote_add(&self, repo: &Path, name: &str, url: &str) -> Result<(), GitError> {
        self.executor
            .exec(&git(repo).args(["remote", "add", name, url]))
            .await
            .map_err(|e| GitError::RemoteAdd {
                name: name.to_owned(),
                source: e,
            })?;
        Ok(())
    }

    /// Stage every change in the work tree.
    pub async fn add_all(&self, repo: &Path) -> Result<(), GitError> {
        self.executor
            .exec(&git(repo).args(["add", "."]))
            .await
            .map_err(|e| GitError::Add { source: e })?;
        Ok(())
    }

    pub async fn commit(&self, repo: &Path, message: &str) -> Result<(), GitError> {
        self.executor
            .exec(&git(repo).args(["commit", "-m", message]))
            .await
            .map_err(|e| GitError::Commit { source: e })?;
        Ok(())
    }

    pub async fn push(
        &self,
        repo: &Path,
        remote: &str,
        refspec: &str,
        ssh_key: Option<&Path>,
    ) -> Result<(), GitError> {
        let mut cmd = git(repo).args(["push", remote, refspec]);
        if let Some(key) = ssh_key {
            cmd = with_ssh_key(cmd, key);
        }

        self.executor
            .exec(&cmd)
            .await
            .map_err(|e| GitError::Push {
                remote: remote.to_owned(),
                refspec: refspec.to_owned(),
                source: e,
            })?;
        Ok(())
    }

    // ── Docker ──

    /// `docker build -t <image_ref> [--build-arg K=V]... <context>`
    pub async fn build_image(
        &self,
        context: &Path,
        image_ref: &str,
        build_args: &[(String, String)],
    ) -> Result<(), DockerError> {
        let mut cmd = ToolCommand::new("docker").args(["build", "-t", image_ref]);
        for (key, value) in build_args {
            cmd = cmd.arg("--build-arg").arg(format!("{key}={value}"));
        }
        let cmd = cmd.path_arg(context);

        self.executor
            .exec_streaming(&cmd)
            .await
            .map_err(|e| DockerError::Build {
                image: image_ref.to_owned(),
                source: e,
            })
    }

    pub async fn push_image(&self, image_ref: &str) -> Result<(), DockerError> {
        self.executor
            .exec_streaming(&ToolCommand::new("docker").args(["push", image_ref]))
            .await
            .map_err(|e| DockerError::Push {
                image: image_ref.to_owned(),
                source: e,
            })
    }

    // ── Helm ──

    pub async fn helm_repo_add(&self, name: &str, url: &str) -> Result<(), HelmError> {
        self.executor
            .exec(&ToolCommand::new("helm").args(["repo", "add", name, url]))
            .await
            .map_err(|e| HelmError::RepoAdd {
                name: name.to_owned(),
                source: e,
            })?;
        Ok(())
    }

    pub async fn helm_repo_update(&self) -> Result<(), HelmError> {
        self.executor
            .exec(&ToolCommand::new("helm").args(["repo", "update"]))
            .await
            .map_err(|e| HelmError::RepoUpdate { source: e })?;
        Ok(())
    }

    /// Package `chart_dir` into `destination`, resolving chart dependencies first.
    pub async fn helm_package(&self, chart_dir: &Path, destination: &Path) -> Result<String, HelmError> {
        let cmd = ToolCommand::new("helm")
            .args(["package", "--dependency-update"])
            .path_arg(chart_dir)
            .arg("--destination")
            .path_arg(destination);

        let output = self
            .executor
            .exec(&cmd)
            .await
            .map_err(|e| HelmError::Package {
                chart: chart_dir.to_path_buf(),
                source: e,
            })?;
        Ok(output.trim().to_owned())
    }

    /// Regenerate `index.yaml` in `repo_dir` with chart URLs rooted at `url`.
    pub async fn helm_repo_index(&self, repo_dir: &Path, url: &str) -> Result<(), HelmError> {
        let cmd = ToolCommand::new("helm")
            .args(["repo", "index", ".", "--url", url])
            .current_dir(repo_dir);

        self.executor
            .exec(&cmd)
            .await
            .map_err(|e| HelmError::Index { source: e })?;
        Ok(())
    }
}

// ── Helpers ──

fn git(repo: &Path) -> ToolCommand {
    ToolCommand::new("git").current_dir(repo)
}

fn with_ssh_key(cmd: ToolCommand, key: &Path) -> ToolCommand {
    cmd.env("GIT_SSH_COMMAND", format!("ssh -i {}", key.display()))
}

fn path_strings(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect()
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Error types ──

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("git diff over commit range '{range}' failed")]
    Diff { range: String, source: ToolError },

    #[error("git log failed")]
    Log { source: ToolError },

    #[error("no commit touches any of: {}", format_paths(.paths))]
    NoCommits { paths: Vec<PathBuf> },

    #[error("git clone of {url} failed")]
    Clone { url: String, source: ToolError },

    #[error("git checkout of '{branch}' failed")]
    Checkout { branch: String, source: ToolError },

    #[error("failed to add git remote '{name}'")]
    RemoteAdd { name: String, source: ToolError },

    #[error("git add failed")]
    Add { source: ToolError },

    #[error("git commit failed")]
    Commit { source: ToolError },

    #[error("git push of {refspec} to '{remote}' failed")]
    Push {
        remote: String,
        refspec: String,
        source: ToolError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    #[error("docker build of {image} failed")]
    Build { image: String, source: ToolError },

    #[error("docker push of {image} failed")]
    Push { image: String, source: ToolError },
}

#[derive(Debug, thiserror::Error)]
pub enum HelmError {
    #[error("helm repo add '{name}' failed")]
    RepoAdd { name: String, source: ToolError },

    #[error("helm repo update failed")]
    RepoUpdate { source: ToolError },

    #[error("helm package of {chart} failed")]
    Package { chart: PathBuf, source: ToolError },

    #[error("helm repo index failed")]
    Index { source: ToolError },
}
