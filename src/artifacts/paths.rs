//! Artifact path semantics.
//!
//! Reproduces what the upload and download actions do to file paths on the
//! runner. Paths are runner paths and always use `/`, whatever the host.

use std::collections::BTreeMap;

use super::types::{ArtifactDownload, ArtifactUpload, DownloadSource};

/// A path split into the segments of its cleaned form.
#[derive(Debug)]
struct Segments {
    absolute: bool,
    parts: Vec<String>,
}

impl Segments {
    fn parse(path: &str) -> Self {
        let cleaned = clean_path(path);
        Self {
            absolute: cleaned.starts_with('/'),
            parts: cleaned
                .split('/')
                .filter(|s| !s.is_empty() && *s != ".")
                .map(String::from)
                .collect(),
        }
    }
}

/// Lexically clean a path: collapse repeated separators, drop `.` segments
/// and resolve `..` against preceding segments.
pub fn clean_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut stack: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match stack.last() {
                Some(&last) if last != ".." => {
                    stack.pop();
                }
                _ if absolute => {}
                _ => stack.push(".."),
            },
            other => stack.push(other),
        }
    }

    let joined = stack.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Join path components and clean the result.
pub fn join_path(parts: &[&str]) -> String {
    let joined = parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        return String::new();
    }
    clean_path(&joined)
}

/// Final component of a path.
pub fn base_name(path: &str) -> String {
    let cleaned = clean_path(path);
    match cleaned.rsplit('/').next() {
        Some(last) if !last.is_empty() => last.to_string(),
        _ => cleaned,
    }
}

/// Map every upload path to the path it is stored under inside the artifact.
///
/// The deepest directory shared by all paths is stripped. A single path keeps
/// only its file name. Relative paths with nothing in common also fall back to
/// their file names, while absolute paths always share at least the root.
pub fn compute_normalized_paths(paths: &[String]) -> BTreeMap<String, String> {
    let mut normalized = BTreeMap::new();

    match paths {
        [] => {}
        [single] => {
            normalized.insert(single.clone(), base_name(single));
        }
        _ => {
            let split: Vec<Segments> = paths.iter().map(|p| Segments::parse(p)).collect();
            let common = common_parent_len(&split);

            for (path, segments) in paths.iter().zip(&split) {
                let relative = match common {
                    Some(len) => segments.parts[len..].join("/"),
                    None => base_name(path),
                };
                normalized.insert(path.clone(), relative);
            }
        }
    }

    normalized
}

/// Number of leading segments shared by every path, never reaching the last
/// segment of the shortest path. `None` when relative paths share nothing or
/// absolute and relative paths are mixed.
fn common_parent_len(paths: &[Segments]) -> Option<usize> {
    let first = paths.first()?;
    if paths.iter().any(|p| p.absolute != first.absolute) {
        return None;
    }

    let min_len = paths.iter().map(|p| p.parts.len()).min()?;
    let mut shared = 0;
    for i in 0..min_len.saturating_sub(1) {
        let part = &first.parts[i];
        if paths.iter().all(|p| &p.parts[i] == part) {
            shared += 1;
        } else {
            break;
        }
    }

    if shared == 0 && !first.absolute {
        return None;
    }
    Some(shared)
}

/// Common parent directory of a set of paths, as the upload action computes it.
pub fn find_common_parent(paths: &[String]) -> Option<String> {
    match paths {
        [] => None,
        [single] => {
            let cleaned = clean_path(single);
            cleaned
                .rfind('/')
                .map(|idx| if idx == 0 { "/".to_string() } else { cleaned[..idx].to_string() })
        }
        _ => {
            let split: Vec<Segments> = paths.iter().map(|p| Segments::parse(p)).collect();
            let len = common_parent_len(&split)?;
            let joined = split[0].parts[..len].join("/");
            Some(if split[0].absolute {
                format!("/{}", joined)
            } else {
                joined
            })
        }
    }
}

/// Where `original`, uploaded as part of `upload`, lands after `download`.
///
/// By name, and by pattern with `merge_multiple`, files land directly under
/// the download path. By pattern without merging, each artifact gets its own
/// subdirectory named after the artifact.
pub fn compute_download_path(
    download: &ArtifactDownload,
    upload: &ArtifactUpload,
    original: &str,
) -> String {
    let normalized = upload
        .normalized_path(original)
        .unwrap_or_else(|| original.strip_prefix("./").unwrap_or(original));

    match &download.source {
        DownloadSource::Name(_)
        | DownloadSource::Pattern {
            merge_multiple: true,
            ..
        } => join_path(&[&download.path, normalized]),
        DownloadSource::Pattern {
            merge_multiple: false,
            ..
        } => join_path(&[&download.path, &upload.name, normalized]),
    }
}
