//! Job manifest YAML parser.

use std::path::Path;

use super::types::Manifest;
use crate::error::{Error, Result};

/// Parse a manifest from a YAML string.
pub fn parse_manifest(yaml: &str) -> Result<Manifest> {
    if yaml.trim().is_empty() {
        return Err(Error::Parse("Empty job manifest".to_string()));
    }

    let manifest: Manifest = serde_yaml::from_str(yaml).map_err(|e| {
        let msg = e.to_string();
        if let Some(field) = extract_missing_field(&msg) {
            Error::Parse(format!("Missing required field: {}", field))
        } else {
            Error::Parse(format!("Invalid YAML: {}", msg))
        }
    })?;
    Ok(manifest)
}

/// Parse a manifest from a file path.
pub fn parse_manifest_file(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)?;
    parse_manifest(&content)
}

fn extract_missing_field(error_message: &str) -> Option<&str> {
    let marker = "missing field `";
    let start = error_message.find(marker)? + marker.len();
    let rest = &error_message[start..];
    let end = rest.find('`')?;
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::StepSpec;

    #[test]
    fn test_parse_simple_manifest() {
        let yaml = r#"
jobs:
  - name: build
    runs-on: ubuntu-latest
    steps:
      - name: Build
        run: make
    uploads:
      - name: dist
        path: [dist/app.js, dist/lib/util.js]

  - name: deploy
    needs: build
    downloads:
      - name: dist
        path: /tmp/dist
"#;

        let manifest = parse_manifest(yaml).unwrap();
        assert_eq!(manifest.jobs.len(), 2);
        assert_eq!(manifest.jobs[0].name, "build");
        assert!(matches!(manifest.jobs[0].steps[0], StepSpec::Mapping(_)));
        assert_eq!(manifest.jobs[0].uploads[0].name, "dist");
        assert_eq!(manifest.jobs[1].needs.clone().into_vec(), vec!["build"]);
        assert_eq!(manifest.jobs[1].downloads[0].path, "/tmp/dist");
    }

    #[test]
    fn test_parse_needs_list() {
        let yaml = r#"
jobs:
  - name: c
    needs: [a, b]
"#;
        let manifest = parse_manifest(yaml).unwrap();
        assert_eq!(manifest.jobs[0].needs.clone().into_vec(), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_empty_manifest() {
        let result = parse_manifest("   \n");
        assert!(result
            .unwrap_err()
            .to_string()
            .to_lowercase()
            .contains("empty job manifest"));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = parse_manifest("jobs: [broken");
        assert!(result
            .unwrap_err()
            .to_string()
            .to_lowercase()
            .contains("invalid yaml"));
    }

    #[test]
    fn test_parse_missing_required_field() {
        let yaml = r#"
jobs:
  - runs-on: ubuntu-latest
"#;
        let result = parse_manifest(yaml);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Missing required field: name"));
    }

    #[test]
    fn test_parse_manifest_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.yaml");
        std::fs::write(&path, "jobs:\n  - name: only\n").unwrap();
        let manifest = parse_manifest_file(&path).unwrap();
        assert_eq!(manifest.jobs[0].name, "only");

        let err = parse_manifest_file(&dir.path().join("missing.yaml")).unwrap_err();
        assert_eq!(err.code(), "IO_ERROR");
    }
}
