use crate::config::{ImageConfig, ReleaseConfig};
use std::path::{Path, PathBuf};

/// A project checkout together with its release configuration.
///
/// Every path handed to external tools is resolved through this type, so
/// no operation depends on the process working directory.
#[derive(Debug, Clone)]
pub struct Project {
    /// Absolute path to the project root (the git work tree)
    pub root: PathBuf,
    pub config: ReleaseConfig,
}

impl Project {
    /// Open the project at `root`, loading `chartship.toml` if present.
    pub fn open(root: &Path) -> crate::Result<Self> {
        let root = root
            .canonicalize()
            .map_err(|e| crate::Error::ProjectDirResolve {
                path: root.to_path_buf(),
                source: e,
            })?;
        let config = ReleaseConfig::load(&root)?;

        tracing::debug!(
            root = %root.display(),
            images = config.images.len(),
            chart = %config.chart.path.display(),
            "project opened"
        );

        Ok(Self { root, config })
    }

    /// Build a project from an already loaded configuration.
    pub fn with_config(root: PathBuf, config: ReleaseConfig) -> Self {
        Self { root, config }
    }

    /// Resolve a configured path against the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn chart_dir(&self) -> PathBuf {
        self.resolve(&self.config.chart.path)
    }

    pub fn values_path(&self) -> PathBuf {
        self.chart_dir().join("values.yaml")
    }

    pub fn chart_yaml_path(&self) -> PathBuf {
        self.chart_dir().join("Chart.yaml")
    }

    /// The image whose name and tag live in values.yaml.
    pub fn chart_image(&self) -> crate::Result<&ImageConfig> {
        self.config
            .image(&self.config.chart.image)
            .ok_or_else(|| crate::Error::UnknownImage {
                name: self.config.chart.image.clone(),
            })
    }

    /// Absolute paths contributing to an image.
    pub fn image_paths(&self, image: &ImageConfig) -> Vec<PathBuf> {
        image
            .contributing_paths()
            .iter()
            .map(|p| self.resolve(p))
            .collect()
    }

    pub fn image_context(&self, image: &ImageConfig) -> PathBuf {
        self.resolve(&image.context)
    }

    /// Absolute paths contributing to the chart version:
    /// every image's paths, the chart directory, and `chart.extra_paths`.
    pub fn chart_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = Vec::new();
        let candidates = self
            .config
            .images
            .iter()
            .flat_map(|image| self.image_paths(image))
            .chain(std::iter::once(self.chart_dir()))
            .chain(self.config.chart.extra_paths.iter().map(|p| self.resolve(p)));

        for path in candidates {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Project {
        Project::with_config(PathBuf::from("/repo"), ReleaseConfig::default())
    }

    #[test]
    fn chart_files_resolve_under_root() {
        let p = project();
        assert_eq!(p.values_path(), PathBuf::from("/repo/helm-chart/binderhub/values.yaml"));
        assert_eq!(p.chart_yaml_path(), PathBuf::from("/repo/helm-chart/binderhub/Chart.yaml"));
    }

    #[test]
    fn absolute_paths_are_kept() {
        let p = project();
        assert_eq!(p.resolve(Path::new("/elsewhere/key")), PathBuf::from("/elsewhere/key"));
    }

    #[test]
    fn chart_paths_cover_images_chart_and_extras_without_duplicates() {
        let p = project();
        let paths = p.chart_paths();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/repo/setup.py"),
                PathBuf::from("/repo/binderhub"),
                PathBuf::from("/repo/helm-chart/images/binderhub"),
                PathBuf::from("/repo/helm-chart/binderhub"),
                PathBuf::from("/repo/helm-chart"),
            ]
        );
    }

    #[test]
    fn image_without_paths_uses_context() {
        let image = ImageConfig {
            name: "tiny".to_owned(),
            context: PathBuf::from("images/tiny"),
            paths: vec![],
            version_build_arg: "VERSION".to_owned(),
        };
        assert_eq!(project().image_paths(&image), vec![PathBuf::from("/repo/images/tiny")]);
    }
}
