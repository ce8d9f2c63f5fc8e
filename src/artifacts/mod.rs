//! Artifact flow between jobs.
//!
//! Models what `actions/upload-artifact` and `actions/download-artifact` do
//! with file paths, so the compiler can predict where a downloaded file ends
//! up and check that every download has a producer:
//! - Uploads strip the deepest directory shared by all their files
//! - Downloads by name, and merged pattern downloads, extract flat
//! - Unmerged pattern downloads extract into one directory per artifact

mod paths;
mod pattern;
mod tracker;
mod types;

pub use paths::{
    base_name, clean_path, compute_download_path, compute_normalized_paths, find_common_parent,
    join_path,
};
pub use pattern::matches_pattern;
pub use tracker::{
    ArtifactFailure, ArtifactMatch, ArtifactReport, ArtifactTracker, LookupMode, MatchScope,
    PlannedFile,
};
pub use types::{ArtifactDownload, ArtifactUpload, DownloadSource, IfNoFilesFound};
