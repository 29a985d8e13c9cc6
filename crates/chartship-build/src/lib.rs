//! Release stages for a Helm chart and its images.
//!
//! # Build pipeline
//!
//! ```text
//! chartship build [--commit-range R] [--push]
//!   1. Images      ── git diff --name-only R (skip unchanged) → docker build [→ docker push]
//!   2. Values      ── git log -n 1 %h → values.yaml image.name / image.tag
//!   3. Chart       ── git log -n 1 %h → Chart.yaml version <semver>-<hash>
//!   4. Publish     ── git clone → helm package → helm repo index → git push   (--push only)
//!   5. Deployment  ── git clone → common.yaml version → git push autodeploy-*  (--push, opt-in)
//! ```
//!
//! # Tags
//!
//! Image tags and the chart version suffix are the short hash of the last
//! commit touching the relevant paths, so rebuilding an unchanged tree
//! produces the same tags and the same manifests.

pub mod deployment;
pub mod images;
pub mod pipeline;
pub mod publish;
pub mod stamp;

pub use pipeline::{BuildOptions, ReleaseError, ReleaseReport, run_build};
