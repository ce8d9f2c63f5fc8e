//! Artifact name patterns.
//!
//! Only four shapes are understood: `name`, `*suffix`, `prefix*` and
//! `prefix*suffix`. Anything else is compared literally. Validation results
//! depend on exactly this behavior, so this is not a glob engine.

/// Check whether an artifact name matches a download pattern.
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    let wildcards = pattern.matches('*').count();

    if wildcards == 0 {
        return name == pattern;
    }

    if wildcards == 1 {
        if let Some(suffix) = pattern.strip_prefix('*') {
            return name.ends_with(suffix);
        }
        if let Some(prefix) = pattern.strip_suffix('*') {
            return name.starts_with(prefix);
        }
        if let Some((prefix, suffix)) = pattern.split_once('*') {
            return name.len() >= prefix.len() + suffix.len()
                && name.starts_with(prefix)
                && name.ends_with(suffix);
        }
    }

    name == pattern
}
