use chartship_core::{Project, YamlDocument};
use chartship_tools::{GitError, ToolClient, ToolExecutor};

/// Image name and tag written to values.yaml.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuesStamp {
    pub name: String,
    pub tag: String,
}

/// Chart version before and after stamping Chart.yaml.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartStamp {
    /// Version string as it was before the stamp; used as the release identifier.
    pub previous: String,
    pub version: String,
}

/// Everything before the first hyphen of a chart version.
pub fn version_prefix(version: &str) -> &str {
    version.split('-').next().unwrap_or(version)
}

/// Replace the suffix of `version` with `vcs_id`, keeping its semver prefix.
pub fn stamped_version(version: &str, vcs_id: &str) -> String {
    format!("{}-{vcs_id}", version_prefix(version))
}

/// Set `image.name` and `image.tag` in values.yaml for the chart's image.
pub async fn stamp_values<E: ToolExecutor>(
    client: &ToolClient<E>,
    project: &Project,
    prefix: &str,
) -> Result<ValuesStamp, StampError> {
    let image = project
        .chart_image()
        .map_err(|e| StampError::Manifest { source: e })?;
    let tag = client
        .last_modified(&project.root, &project.image_paths(image))
        .await
        .map_err(|e| StampError::Version { source: e })?;
    let name = format!("{prefix}{}", image.name);

    let mut values = YamlDocument::load(&project.values_path())
        .map_err(|e| StampError::Manifest { source: e })?;
    values
        .set_str(&["image", "name"], &name)
        .and_then(|()| values.set_str(&["image", "tag"], &tag))
        .and_then(|()| values.save())
        .map_err(|e| StampError::Manifest { source: e })?;

    tracing::info!(path = %values.path().display(), %name, %tag, "values stamped");
    Ok(ValuesStamp { name, tag })
}

/// Replace the VCS suffix of the chart version in Chart.yaml.
///
/// Returns the version as it was before the update.
pub async fn stamp_chart<E: ToolExecutor>(
    client: &ToolClient<E>,
    project: &Project,
) -> Result<ChartStamp, StampError> {
    let vcs_id = client
        .last_modified(&project.root, &project.chart_paths())
        .await
        .map_err(|e| StampError::Version { source: e })?;

    let mut chart = YamlDocument::load(&project.chart_yaml_path())
        .map_err(|e| StampError::Manifest { source: e })?;
    let previous = chart
        .get_str(&["version"])
        .map_err(|e| StampError::Manifest { source: e })?;
    let version = stamped_version(&previous, &vcs_id);

    chart
        .set_str(&["version"], &version)
        .and_then(|()| chart.save())
        .map_err(|e| StampError::Manifest { source: e })?;

    tracing::info!(path = %chart.path().display(), %previous, %version, "chart version stamped");
    Ok(ChartStamp { previous, version })
}

#[derive(Debug, thiserror::Error)]
pub enum StampError {
    #[error("could not determine version for manifest stamp")]
    Version { source: GitError },

    #[error("manifest update failed")]
    Manifest { source: chartship_core::Error },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_stops_at_first_hyphen() {
        assert_eq!(version_prefix("1.2.3-abc123"), "1.2.3");
        assert_eq!(version_prefix("0.1.0-alpha-abc"), "0.1.0");
        assert_eq!(version_prefix("0.2.0"), "0.2.0");
        assert_eq!(version_prefix(""), "");
    }

    #[test]
    fn stamped_version_replaces_suffix() {
        assert_eq!(stamped_version("1.2.3-abc123", "def456"), "1.2.3-def456");
        assert_eq!(stamped_version("v0.1.0", "def456"), "v0.1.0-def456");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prefix_is_preserved(
                semver in "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}",
                old in "[0-9a-f]{7}",
                new in "[0-9a-f]{7}",
            ) {
                let stamped = stamped_version(&format!("{semver}-{old}"), &new);
                prop_assert_eq!(stamped, format!("{semver}-{new}"));
            }

            #[test]
            fn stamping_twice_is_stable(version in "[0-9.]{1,8}(-[a-z0-9]{1,8})?", id in "[0-9a-f]{7}") {
                let once = stamped_version(&version, &id);
                prop_assert_eq!(stamped_version(&once, &id), once.clone());
            }
        }
    }
}
