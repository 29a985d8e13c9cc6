use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("failed to resolve project directory {path}")]
    ProjectDirResolve {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("image '{name}' is not configured")]
    UnknownImage { name: String },

    // ── Manifest documents ──
    #[error("failed to read {path}")]
    ManifestRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse YAML in {path}")]
    ManifestParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("cannot map YAML structure of {path}: {reason}")]
    ManifestStructure { path: PathBuf, reason: String },

    #[error("failed to write {path}")]
    ManifestWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("field `{field}` not found in {path}")]
    FieldMissing { path: PathBuf, field: String },

    #[error("field `{field}` in {path} is not a scalar value")]
    FieldNotScalar { path: PathBuf, field: String },

    #[error(
        "field `{field}` in {path} uses a layout that cannot be edited in place \
         (flow mapping or multi-line scalar) — convert it to a block mapping entry"
    )]
    UnsupportedLayout { path: PathBuf, field: String },

    #[error("edited field `{field}` in {path} reads back as {actual:?}, expected {expected:?}")]
    EditVerify {
        path: PathBuf,
        field: String,
        expected: String,
        actual: Option<String>,
    },
}
