//! Artifact transfer records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What `upload-artifact` does when no file matches its paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IfNoFilesFound {
    #[default]
    Warn,
    Error,
    Ignore,
}

impl IfNoFilesFound {
    pub fn as_str(&self) -> &'static str {
        match self {
            IfNoFilesFound::Warn => "warn",
            IfNoFilesFound::Error => "error",
            IfNoFilesFound::Ignore => "ignore",
        }
    }
}

impl std::fmt::Display for IfNoFilesFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One upload event.
///
/// Uploads are immutable: uploading the same name twice creates two records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactUpload {
    /// Artifact name, not necessarily unique across jobs
    pub name: String,

    /// Source paths as given to the upload step
    pub paths: Vec<String>,

    pub if_no_files_found: IfNoFilesFound,
    pub include_hidden_files: bool,

    /// Owning job; filled from the tracker's current job when empty
    pub job_name: String,

    /// Original path -> path inside the artifact, set on registration
    pub(crate) normalized_paths: BTreeMap<String, String>,
}

impl ArtifactUpload {
    pub fn new<I, S>(name: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            paths: paths.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_job(mut self, job_name: impl Into<String>) -> Self {
        self.job_name = job_name.into();
        self
    }

    pub fn with_if_no_files_found(mut self, policy: IfNoFilesFound) -> Self {
        self.if_no_files_found = policy;
        self
    }

    pub fn with_hidden_files(mut self, include: bool) -> Self {
        self.include_hidden_files = include;
        self
    }

    /// Path-as-stored for every original path.
    ///
    /// Empty until the upload is recorded by an [`super::ArtifactTracker`].
    pub fn normalized_paths(&self) -> &BTreeMap<String, String> {
        &self.normalized_paths
    }

    pub fn normalized_path(&self, original: &str) -> Option<&str> {
        self.normalized_paths.get(original).map(String::as_str)
    }
}

/// How a download selects its source artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadSource {
    /// Exactly one artifact, extracted flat into the destination
    Name(String),
    /// Every artifact whose name matches the pattern
    Pattern {
        pattern: String,
        /// Extract all matches into the destination instead of one
        /// subdirectory per artifact
        merge_multiple: bool,
    },
}

impl DownloadSource {
    /// The name or pattern string.
    pub fn selector(&self) -> &str {
        match self {
            DownloadSource::Name(name) => name,
            DownloadSource::Pattern { pattern, .. } => pattern,
        }
    }
}

/// One download event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDownload {
    pub source: DownloadSource,

    /// Destination directory
    pub path: String,

    /// Owning job; filled from the tracker's current job when empty
    pub job_name: String,

    /// Jobs the owning job declares in `needs`
    pub depends_on: Vec<String>,
}

impl ArtifactDownload {
    pub fn by_name(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            source: DownloadSource::Name(name.into()),
            path: path.into(),
            job_name: String::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn by_pattern(
        pattern: impl Into<String>,
        path: impl Into<String>,
        merge_multiple: bool,
    ) -> Self {
        Self {
            source: DownloadSource::Pattern {
                pattern: pattern.into(),
                merge_multiple,
            },
            path: path.into(),
            job_name: String::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_job(mut self, job_name: impl Into<String>) -> Self {
        self.job_name = job_name.into();
        self
    }

    pub fn with_depends_on<I, S>(mut self, jobs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = jobs.into_iter().map(Into::into).collect();
        self
    }
}
