use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// File name of the release configuration, looked up in the project root.
pub const CONFIG_FILE_NAME: &str = "chartship.toml";

/// chartship.toml configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Registry/namespace prepended to every image name
    #[serde(default = "default_image_prefix")]
    pub image_prefix: String,
    #[serde(default)]
    pub chart: ChartConfig,
    /// Images built for the chart, in build order
    #[serde(default = "default_images")]
    pub images: Vec<ImageConfig>,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub deployment: DeploymentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Chart name, used in automatic commit messages
    #[serde(default = "default_chart_name")]
    pub name: String,
    /// Chart directory containing Chart.yaml and values.yaml
    #[serde(default = "default_chart_path")]
    pub path: PathBuf,
    /// Image whose name and tag are stamped into values.yaml
    #[serde(default = "default_chart_image")]
    pub image: String,
    /// Paths contributing to the chart version besides image paths and the chart directory
    #[serde(default = "default_chart_extra_paths")]
    pub extra_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Image name, appended to the image prefix
    pub name: String,
    /// Docker build context directory
    pub context: PathBuf,
    /// Paths whose history determines the image tag.
    /// When empty, the build context alone is used.
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    /// Build argument receiving the image version
    #[serde(default = "default_version_build_arg")]
    pub version_build_arg: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Git remote hosting the chart repository pages
    #[serde(default = "default_pages_repo")]
    pub pages_repo: String,
    /// Branch served as the chart repository
    #[serde(default = "default_pages_branch")]
    pub pages_branch: String,
    /// Local clone directory, relative to the project root
    #[serde(default = "default_pages_clone_dir")]
    pub clone_dir: PathBuf,
    /// Helm repository name registered before packaging
    #[serde(default = "default_chart_repo_name")]
    pub chart_repo_name: String,
    /// Public base URL of the chart repository
    #[serde(default = "default_chart_repo_url")]
    pub chart_repo_url: String,
    /// SSH private key used to push to `pages_repo`
    #[serde(default = "default_pages_deploy_key")]
    pub deploy_key: PathBuf,
}

/// Deployment repository update. Inactive unless `enabled` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_deployment_repo")]
    pub repo: String,
    #[serde(default = "default_deployment_branch")]
    pub branch: String,
    #[serde(default = "default_deployment_clone_dir")]
    pub clone_dir: PathBuf,
    /// Remote receiving the autodeploy branch
    #[serde(default = "default_deployment_remote_name")]
    pub remote_name: String,
    #[serde(default = "default_deployment_remote_url")]
    pub remote_url: String,
    /// Document inside the clone whose top-level `version` is stamped
    #[serde(default = "default_deployment_config_file")]
    pub config_file: PathBuf,
    #[serde(default = "default_deployment_deploy_key")]
    pub deploy_key: PathBuf,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            image_prefix: default_image_prefix(),
            chart: ChartConfig::default(),
            images: default_images(),
            publish: PublishConfig::default(),
            deployment: DeploymentConfig::default(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            name: default_chart_name(),
            path: default_chart_path(),
            image: default_chart_image(),
            extra_paths: default_chart_extra_paths(),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            pages_repo: default_pages_repo(),
            pages_branch: default_pages_branch(),
            clone_dir: default_pages_clone_dir(),
            chart_repo_name: default_chart_repo_name(),
            chart_repo_url: default_chart_repo_url(),
            deploy_key: default_pages_deploy_key(),
        }
    }
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            repo: default_deployment_repo(),
            branch: default_deployment_branch(),
            clone_dir: default_deployment_clone_dir(),
            remote_name: default_deployment_remote_name(),
            remote_url: default_deployment_remote_url(),
            config_file: default_deployment_config_file(),
            deploy_key: default_deployment_deploy_key(),
        }
    }
}

impl ImageConfig {
    /// Paths contributing to this image, falling back to the build context.
    pub fn contributing_paths(&self) -> Vec<PathBuf> {
        if self.paths.is_empty() {
            vec![self.context.clone()]
        } else {
            self.paths.clone()
        }
    }
}

impl ReleaseConfig {
    /// Load from chartship.toml in the given directory, or return defaults if not found.
    pub fn load(project_dir: &Path) -> crate::Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE_NAME);
        let config = if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path,
                source: e,
            })?
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> crate::Result<()> {
        if self.images.is_empty() {
            return Err(crate::Error::InvalidConfig {
                reason: "at least one [[images]] entry is required".to_owned(),
            });
        }

        let mut seen = HashSet::new();
        for image in &self.images {
            if image.name.trim().is_empty() {
                return Err(crate::Error::InvalidConfig {
                    reason: "image name must not be empty".to_owned(),
                });
            }
            if !seen.insert(image.name.as_str()) {
                return Err(crate::Error::InvalidConfig {
                    reason: format!("duplicate image name '{}'", image.name),
                });
            }
        }

        if self.image(&self.chart.image).is_none() {
            return Err(crate::Error::InvalidConfig {
                reason: format!(
                    "chart.image '{}' does not name a configured image",
                    self.chart.image
                ),
            });
        }

        let tracked = self.tracked_paths();
        validate_clone_dir("publish.clone_dir", &self.publish.clone_dir, &tracked)?;
        validate_clone_dir("deployment.clone_dir", &self.deployment.clone_dir, &tracked)?;

        Ok(())
    }

    /// Every configured path that belongs to the project checkout itself.
    fn tracked_paths(&self) -> Vec<&Path> {
        let mut paths: Vec<&Path> = vec![&self.chart.path];
        paths.extend(self.chart.extra_paths.iter().map(PathBuf::as_path));
        for image in &self.images {
            paths.push(&image.context);
            paths.extend(image.paths.iter().map(PathBuf::as_path));
        }
        paths
    }

    /// Look up an image by name.
    pub fn image(&self, name: &str) -> Option<&ImageConfig> {
        self.images.iter().find(|i| i.name == name)
    }
}

/// Clone directories are deleted before every publish, so they must be a
/// plain relative subdirectory that overlaps nothing in the checkout.
fn validate_clone_dir(field: &str, dir: &Path, tracked: &[&Path]) -> crate::Result<()> {
    let invalid = |why: &str| crate::Error::InvalidConfig {
        reason: format!("{field} '{}' {why}", dir.display()),
    };

    if dir.as_os_str().is_empty() {
        return Err(invalid("must not be empty"));
    }
    if !dir.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(invalid(
            "must be a relative path without '.' or '..' components",
        ));
    }
    if dir.components().next() == Some(Component::Normal(".git".as_ref())) {
        return Err(invalid("must not point into .git"));
    }
    if let Some(path) = tracked
        .iter()
        .find(|path| path.starts_with(dir) || dir.starts_with(path))
    {
        return Err(invalid(&format!(
            "overlaps project path '{}'",
            path.display()
        )));
    }
    Ok(())
}

fn default_image_prefix() -> String {
    "jupyterhub/k8s-".to_owned()
}

fn default_chart_name() -> String {
    "binderhub".to_owned()
}

fn default_chart_path() -> PathBuf {
    PathBuf::from("helm-chart/binderhub")
}

fn default_chart_image() -> String {
    "binderhub".to_owned()
}

fn default_chart_extra_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("helm-chart")]
}

fn default_images() -> Vec<ImageConfig> {
    vec![ImageConfig {
        name: "binderhub".to_owned(),
        context: PathBuf::from("helm-chart/images/binderhub"),
        paths: vec![
            PathBuf::from("setup.py"),
            PathBuf::from("binderhub"),
            PathBuf::from("helm-chart/images/binderhub"),
        ],
        version_build_arg: default_version_build_arg(),
    }]
}

fn default_version_build_arg() -> String {
    "BINDERHUB_VERSION".to_owned()
}

fn default_pages_repo() -> String {
    "git@github.com:jupyterhub/helm-chart".to_owned()
}

fn default_pages_branch() -> String {
    "gh-pages".to_owned()
}

fn default_pages_clone_dir() -> PathBuf {
    PathBuf::from("gh-pages")
}

fn default_chart_repo_name() -> String {
    "jupyterhub".to_owned()
}

fn default_chart_repo_url() -> String {
    "https://jupyterhub.github.io/helm-chart/".to_owned()
}

fn default_pages_deploy_key() -> PathBuf {
    PathBuf::from("travis")
}

fn default_deployment_repo() -> String {
    "https://github.com/jupyterhub/mybinder.org-deploy".to_owned()
}

fn default_deployment_branch() -> String {
    "staging".to_owned()
}

fn default_deployment_clone_dir() -> PathBuf {
    PathBuf::from("staging")
}

fn default_deployment_remote_name() -> String {
    "meeseeks".to_owned()
}

fn default_deployment_remote_url() -> String {
    "ssh://git@github.com/MeeseeksBox/mybinder.org-deploy".to_owned()
}

fn default_deployment_config_file() -> PathBuf {
    PathBuf::from("config/common.yaml")
}

fn default_deployment_deploy_key() -> PathBuf {
    PathBuf::from("mybinder-deploy")
}
