//! Error types for awgraph.
//!
//! Every variant carries the job, dependency or artifact identifiers needed to
//! surface the failure directly to a workflow author.

use thiserror::Error;

use crate::artifacts::ArtifactReport;

/// Result type alias for awgraph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// awgraph error types.
///
/// Each variant maps to a stable code (see [`Error::code`]) that callers can
/// match on without parsing messages.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Job name cannot be empty")]
    EmptyJobName,

    #[error("Job '{0}' already exists")]
    DuplicateJob(String),

    #[error("Job '{job}' depends on non-existent job '{dependency}'")]
    UnknownDependency { job: String, dependency: String },

    #[error("Cycle detected: job '{job}' depends on '{dependency}' which creates a cycle")]
    DependencyCycle { job: String, dependency: String },

    /// A generator emitted the same step twice. Never a workflow-author error.
    #[error(
        "Compiler bug: duplicate step '{step}' found in job '{job}' (positions {first} and {second})"
    )]
    DuplicateStep {
        job: String,
        step: String,
        first: usize,
        second: usize,
    },

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("Artifact validation failed:\n{0}")]
    ArtifactValidation(ArtifactReport),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Error::EmptyJobName => "EMPTY_JOB_NAME",
            Error::DuplicateJob(_) => "DUPLICATE_JOB",
            Error::UnknownDependency { .. } => "UNKNOWN_DEPENDENCY",
            Error::DependencyCycle { .. } => "DEPENDENCY_CYCLE",
            Error::DuplicateStep { .. } => "DUPLICATE_STEP",
            Error::Artifact(_) => "ARTIFACT_ERROR",
            Error::ArtifactValidation(_) => "ARTIFACT_VALIDATION_ERROR",
            Error::Manifest(_) => "MANIFEST_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Parse(_) => "PARSE_ERROR",
            Error::Yaml(_) => "YAML_ERROR",
            Error::Toml(_) => "TOML_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }

    /// Whether this error signals a bug in the generator rather than in the
    /// workflow being compiled.
    ///
    /// Such output must be treated as untrusted and the compilation aborted.
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::DuplicateStep { .. })
    }

    /// Whether the error makes the job graph impossible to linearize.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::UnknownDependency { .. } | Error::DependencyCycle { .. }
        )
    }
}
