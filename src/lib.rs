//! awgraph - job-graph compiler and artifact-flow simulator
//!
//! awgraph is the part of an agentic-workflow compiler that turns a set of
//! generated jobs into the `jobs:` block of a GitHub Actions workflow, and
//! predicts at compile time where artifacts moved between jobs end up.
//!
//! ## Key Features
//!
//! - **Job graph**: `needs` validation, cycle detection, deterministic
//!   topological order
//! - **Stable output**: jobs render in name order with fixed field order, so
//!   the same input always yields the same YAML
//! - **Artifact flow**: reproduces upload common-parent stripping and the three
//!   download layouts, and checks every download has a producer
//!
//! ## Example
//!
//! ```
//! use awgraph::artifacts::{ArtifactDownload, ArtifactTracker, ArtifactUpload};
//! use awgraph::jobs::{Job, JobManager};
//!
//! let mut jobs = JobManager::new();
//! jobs.add_job(Job::new("deploy").with_needs(["build"])).unwrap();
//! jobs.add_job(Job::new("build")).unwrap();
//! assert_eq!(jobs.topological_order().unwrap(), vec!["build", "deploy"]);
//!
//! let mut artifacts = ArtifactTracker::new();
//! artifacts.set_current_job("build");
//! artifacts
//!     .record_upload(ArtifactUpload::new("dist", ["out/dist/app.js", "out/index.html"]))
//!     .unwrap();
//!
//! let download = ArtifactDownload::by_name("dist", "/out").with_depends_on(["build"]);
//! let found = artifacts.find_uploaded_artifact("dist", &download.depends_on).unwrap();
//! assert_eq!(
//!     awgraph::artifacts::compute_download_path(&download, found.upload, "out/dist/app.js"),
//!     "/out/dist/app.js"
//! );
//! ```

pub mod artifacts;
pub mod config;
pub mod error;
pub mod jobs;
pub mod manifest;

pub use error::{Error, Result};
