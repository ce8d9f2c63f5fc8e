//! Job manifests.
//!
//! A manifest lists jobs together with the artifacts they upload and
//! download. Compiling one registers every job with a [`JobManager`] and
//! records every transfer with an [`ArtifactTracker`]; the two stay
//! independent, the manifest only feeds both.

mod parser;
mod types;

use tracing::debug;

pub use parser::{parse_manifest, parse_manifest_file};
pub use types::*;

use crate::artifacts::{ArtifactReport, ArtifactTracker, LookupMode};
use crate::error::Result;
use crate::jobs::{JobManager, RenderOptions};

/// The state of one compilation pass.
#[derive(Debug, Clone, Default)]
pub struct Compilation {
    pub jobs: JobManager,
    pub artifacts: ArtifactTracker,
}

impl Compilation {
    /// Register every job and transfer of a manifest.
    ///
    /// Downloads depend on the jobs listed in their owner's `needs`.
    pub fn from_manifest(
        manifest: &Manifest,
        options: RenderOptions,
        lookup: LookupMode,
    ) -> Result<Self> {
        let mut jobs = JobManager::with_options(options);
        let mut artifacts = ArtifactTracker::with_lookup_mode(lookup);

        for spec in &manifest.jobs {
            let job = spec.to_job()?;
            let needs = job.needs.clone();
            jobs.add_job(job)?;

            artifacts.set_current_job(spec.name.as_str());
            for upload in &spec.uploads {
                artifacts.record_upload(upload.to_upload())?;
            }
            for download in &spec.downloads {
                artifacts.record_download(download.to_download(&needs)?)?;
            }
        }

        debug!(jobs = jobs.len(), "Compiled manifest");
        Ok(Self { jobs, artifacts })
    }

    /// Run every check.
    ///
    /// Graph and duplicate-step failures are returned as errors. Artifact
    /// failures are returned as a report so the caller decides whether they
    /// are fatal.
    pub fn validate(&self) -> Result<ArtifactReport> {
        self.jobs.validate_dependencies()?;
        self.jobs.validate_no_duplicate_steps()?;
        Ok(self.artifacts.validate_all_downloads())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const PIPELINE: &str = r#"
jobs:
  - name: deploy
    needs: [build]
    runs-on: ubuntu-latest
    steps:
      - name: Deploy
        run: ./deploy.sh
    downloads:
      - name: build-output
        path: /tmp/out

  - name: build
    runs-on: ubuntu-latest
    permissions:
      contents: read
    steps:
      - name: Build
        run: make
    uploads:
      - name: build-output
        path:
          - /tmp/gh-aw/dist/app.js
          - /tmp/gh-aw/README.md
"#;

    fn compile(yaml: &str) -> Result<Compilation> {
        let manifest = parse_manifest(yaml)?;
        Compilation::from_manifest(&manifest, RenderOptions::default(), LookupMode::Lenient)
    }

    #[test]
    fn test_compile_pipeline() {
        let compilation = compile(PIPELINE).unwrap();
        assert_eq!(
            compilation.jobs.topological_order().unwrap(),
            vec!["build", "deploy"]
        );
        assert!(compilation.validate().unwrap().is_empty());

        let download = &compilation.artifacts.downloads_for_job("deploy")[0];
        assert_eq!(download.depends_on, vec!["build"]);
        let plan = compilation.artifacts.plan_download(download);
        assert_eq!(plan[0].local, "/tmp/out/dist/app.js");
        assert_eq!(plan[1].local, "/tmp/out/README.md");
    }

    #[test]
    fn test_rendered_pipeline() {
        let yaml = compile(PIPELINE).unwrap().jobs.render();
        let expected = "jobs:\n  build:\n    runs-on: ubuntu-latest\n    permissions:\n      contents: read\n    steps:\n      - name: Build\n        run: make\n\n  deploy:\n    needs: build\n    runs-on: ubuntu-latest\n    steps:\n      - name: Deploy\n        run: ./deploy.sh\n\n";
        assert_eq!(yaml, expected);

        // The rendered block is valid YAML.
        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert!(parsed["jobs"]["deploy"]["steps"].is_sequence());
    }

    #[test]
    fn test_rendered_env_keeps_string_values() {
        let yaml = r#"
jobs:
  - name: notify
    env:
      MSG: "key: value"
      FLAG: "true"
      RETRIES: 3
"#;
        let rendered = compile(yaml).unwrap().jobs.render();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&rendered).unwrap();
        let env = &parsed["jobs"]["notify"]["env"];
        assert_eq!(env["MSG"].as_str(), Some("key: value"));
        assert_eq!(env["FLAG"].as_str(), Some("true"));
        assert_eq!(env["RETRIES"].as_u64(), Some(3));
    }

    #[test]
    fn test_unresolved_download_is_reported() {
        let yaml = r#"
jobs:
  - name: deploy
    downloads:
      - pattern: agent-*
        path: /tmp/agent
      - name: missing
        path: /tmp/missing
"#;
        let report = compile(yaml).unwrap().validate().unwrap();
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn test_graph_errors_are_fatal() {
        let yaml = r#"
jobs:
  - name: a
    needs: b
  - name: b
    needs: a
"#;
        let err = compile(yaml).unwrap().validate().unwrap_err();
        assert!(matches!(err, Error::DependencyCycle { .. }));
    }

    #[test]
    fn test_duplicate_job_rejected() {
        let yaml = "jobs:\n  - name: a\n  - name: a\n";
        assert!(matches!(compile(yaml), Err(Error::DuplicateJob(_))));
    }

    #[test]
    fn test_empty_download_selector_rejected() {
        let yaml = "jobs:\n  - name: a\n    downloads:\n      - path: /tmp\n";
        let err = compile(yaml).unwrap_err();
        assert!(err.to_string().contains("either name or pattern"));
    }
}
