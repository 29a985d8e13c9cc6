//! Core types and configuration for chartship.
//!
//! This crate defines the `chartship.toml` schema ([`ReleaseConfig`]),
//! project path resolution ([`Project`]), format-preserving YAML editing
//! ([`YamlDocument`]), and shared error types.

pub mod config;
pub mod error;
pub mod manifest;
pub mod project;

pub use config::{
    CONFIG_FILE_NAME, ChartConfig, DeploymentConfig, ImageConfig, PublishConfig, ReleaseConfig,
};
pub use error::{Error, Result};
pub use manifest::YamlDocument;
pub use project::Project;
