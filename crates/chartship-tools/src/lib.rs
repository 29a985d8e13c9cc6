pub mod client;
pub mod command;
pub mod executor;

pub use client::{DockerError, GitError, HelmError, ToolClient};
pub use command::{ToolCommand, ToolError};
pub use executor::{RealExecutor, ToolExecutor};
