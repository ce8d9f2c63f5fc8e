//! Cross-job artifact flow tracking.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::paths::{compute_download_path, compute_normalized_paths};
use super::pattern::matches_pattern;
use super::types::{ArtifactDownload, ArtifactUpload, DownloadSource};
use crate::error::{Error, Result};

/// How far artifact lookups may look for a producer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupMode {
    /// Search `depends_on` jobs, then every job.
    #[default]
    Lenient,
    /// Search `depends_on` jobs only.
    Strict,
}

/// Where a lookup found its upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScope {
    /// In one of the consumer's `depends_on` jobs
    Dependency,
    /// Somewhere else; nothing guarantees the producer runs first
    Global,
}

/// Result of [`ArtifactTracker::find_uploaded_artifact`].
#[derive(Debug, Clone, Copy)]
pub struct ArtifactMatch<'a> {
    pub upload: &'a ArtifactUpload,
    pub scope: MatchScope,
}

/// A single unresolved download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFailure {
    pub job: String,
    pub message: String,
}

impl fmt::Display for ArtifactFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job '{}': {}", self.job, self.message)
    }
}

/// Every unresolved download of a compilation, collected in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactReport {
    pub failures: Vec<ArtifactFailure>,
}

impl ArtifactReport {
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Turn a non-empty report into an error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::ArtifactValidation(self))
        }
    }
}

impl fmt::Display for ArtifactReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {}", failure)?;
        }
        Ok(())
    }
}

/// One file a download will produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub artifact: String,
    pub source_job: String,
    pub original: String,
    pub local: String,
}

/// Records uploads and downloads per job.
///
/// Records are append-only. Fill the tracker first, then query it.
#[derive(Debug, Clone, Default)]
pub struct ArtifactTracker {
    uploads: BTreeMap<String, Vec<ArtifactUpload>>,
    downloads: BTreeMap<String, Vec<ArtifactDownload>>,
    current_job: Option<String>,
    lookup: LookupMode,
}

impl ArtifactTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lookup_mode(lookup: LookupMode) -> Self {
        Self {
            lookup,
            ..Self::default()
        }
    }

    pub fn lookup_mode(&self) -> LookupMode {
        self.lookup
    }

    /// Set the job stamped on records that leave `job_name` empty.
    pub fn set_current_job(&mut self, job_name: impl Into<String>) {
        self.current_job = Some(job_name.into());
    }

    pub fn current_job(&self) -> Option<&str> {
        self.current_job.as_deref()
    }

    /// Record an upload and compute its normalized paths.
    pub fn record_upload(&mut self, mut upload: ArtifactUpload) -> Result<&ArtifactUpload> {
        if upload.name.is_empty() {
            return Err(Error::Artifact("artifact upload must have a name".into()));
        }
        if upload.paths.is_empty() {
            return Err(Error::Artifact(format!(
                "artifact upload '{}' must have at least one path",
                upload.name
            )));
        }
        if upload.job_name.is_empty() {
            upload.job_name = self.current_job.clone().unwrap_or_default();
        }

        upload.normalized_paths = compute_normalized_paths(&upload.paths);

        debug!(
            artifact = %upload.name,
            job = %upload.job_name,
            paths = upload.paths.len(),
            "Recorded artifact upload"
        );

        let name = upload.name.clone();
        let list = self.uploads.entry(upload.job_name.clone()).or_default();
        list.push(upload);
        list.last()
            .ok_or_else(|| Error::Artifact(format!("artifact upload '{}' was not recorded", name)))
    }

    /// Record a download.
    pub fn record_download(&mut self, mut download: ArtifactDownload) -> Result<()> {
        if download.source.selector().is_empty() {
            return Err(Error::Artifact(
                "artifact download must have either name or pattern".into(),
            ));
        }
        if download.path.is_empty() {
            return Err(Error::Artifact(format!(
                "artifact download '{}' must have a path",
                download.source.selector()
            )));
        }
        if download.job_name.is_empty() {
            download.job_name = self.current_job.clone().unwrap_or_default();
        }

        debug!(
            selector = %download.source.selector(),
            job = %download.job_name,
            path = %download.path,
            "Recorded artifact download"
        );

        self.downloads
            .entry(download.job_name.clone())
            .or_default()
            .push(download);
        Ok(())
    }

    pub fn uploads_for_job(&self, job_name: &str) -> &[ArtifactUpload] {
        self.uploads.get(job_name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn downloads_for_job(&self, job_name: &str) -> &[ArtifactDownload] {
        self.downloads.get(job_name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All downloads, grouped by job in name order.
    pub fn downloads(&self) -> impl Iterator<Item = &ArtifactDownload> {
        self.downloads.values().flatten()
    }

    /// Find the first upload named `name`.
    ///
    /// `depends_on` jobs are searched first, in the given order. In lenient
    /// mode every job is searched next; such a match is reported with
    /// [`MatchScope::Global`].
    pub fn find_uploaded_artifact(
        &self,
        name: &str,
        depends_on: &[String],
    ) -> Option<ArtifactMatch<'_>> {
        let scoped = depends_on
            .iter()
            .flat_map(|job| self.uploads_for_job(job))
            .find(|upload| upload.name == name);
        if let Some(upload) = scoped {
            return Some(ArtifactMatch {
                upload,
                scope: MatchScope::Dependency,
            });
        }

        if self.lookup == LookupMode::Strict {
            return None;
        }

        self.uploads
            .values()
            .flatten()
            .find(|upload| upload.name == name)
            .map(|upload| ArtifactMatch {
                upload,
                scope: MatchScope::Global,
            })
    }

    /// Uploads whose name matches `pattern`, preferring `depends_on` jobs.
    pub fn find_matching_uploads(
        &self,
        pattern: &str,
        depends_on: &[String],
    ) -> (Vec<&ArtifactUpload>, MatchScope) {
        let scoped: Vec<&ArtifactUpload> = depends_on
            .iter()
            .flat_map(|job| self.uploads_for_job(job))
            .filter(|upload| matches_pattern(&upload.name, pattern))
            .collect();
        if !scoped.is_empty() || self.lookup == LookupMode::Strict {
            return (scoped, MatchScope::Dependency);
        }

        let global = self
            .uploads
            .values()
            .flatten()
            .filter(|upload| matches_pattern(&upload.name, pattern))
            .collect();
        (global, MatchScope::Global)
    }

    /// Check that a download can be served by some upload.
    pub fn validate_download(&self, download: &ArtifactDownload) -> Result<()> {
        let scope = match &download.source {
            DownloadSource::Name(name) => self
                .find_uploaded_artifact(name, &download.depends_on)
                .map(|m| m.scope)
                .ok_or_else(|| {
                    Error::Artifact(format!(
                        "artifact '{}' downloaded by job '{}' not found in any dependent jobs",
                        name, download.job_name
                    ))
                })?,
            DownloadSource::Pattern { pattern, .. } => {
                let (matches, scope) = self.find_matching_uploads(pattern, &download.depends_on);
                if matches.is_empty() {
                    return Err(Error::Artifact(format!(
                        "no artifacts matching pattern '{}' found for job '{}'",
                        pattern, download.job_name
                    )));
                }
                scope
            }
        };

        if scope == MatchScope::Global {
            warn!(
                selector = %download.source.selector(),
                job = %download.job_name,
                "Artifact resolved outside the job's dependencies"
            );
        }
        Ok(())
    }

    /// Validate every recorded download and collect all failures.
    pub fn validate_all_downloads(&self) -> ArtifactReport {
        let mut report = ArtifactReport::default();
        for (job, downloads) in &self.downloads {
            for download in downloads {
                if let Err(e) = self.validate_download(download) {
                    report.failures.push(ArtifactFailure {
                        job: job.clone(),
                        message: match e {
                            Error::Artifact(msg) => msg,
                            other => other.to_string(),
                        },
                    });
                }
            }
        }
        report
    }

    /// Resolve every file a download would produce.
    ///
    /// Unresolvable downloads yield an empty plan; use
    /// [`ArtifactTracker::validate_download`] to find out why.
    pub fn plan_download(&self, download: &ArtifactDownload) -> Vec<PlannedFile> {
        let uploads: Vec<&ArtifactUpload> = match &download.source {
            DownloadSource::Name(name) => self
                .find_uploaded_artifact(name, &download.depends_on)
                .map(|m| vec![m.upload])
                .unwrap_or_default(),
            DownloadSource::Pattern { pattern, .. } => {
                self.find_matching_uploads(pattern, &download.depends_on).0
            }
        };

        uploads
            .into_iter()
            .flat_map(|upload| {
                upload.paths.iter().map(move |original| PlannedFile {
                    artifact: upload.name.clone(),
                    source_job: upload.job_name.clone(),
                    original: original.clone(),
                    local: compute_download_path(download, upload, original),
                })
            })
            .collect()
    }

    /// Clear all records and the current job. The lookup mode is kept.
    pub fn reset(&mut self) {
        self.uploads.clear();
        self.downloads.clear();
        self.current_job = None;
    }
}
