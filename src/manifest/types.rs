//! Job manifest type definitions.
//!
//! Field names follow the GitHub Actions spelling (`runs-on`,
//! `timeout-minutes`, `if-no-files-found`) so manifests read like the
//! workflow they compile to.

use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;

use crate::artifacts::{ArtifactDownload, ArtifactUpload, DownloadSource, IfNoFilesFound};
use crate::error::{Error, Result};
use crate::jobs::{Job, JobBody, WorkflowCall};

const STEP_INDENT: &str = "      ";
const STEP_CONTINUATION: &str = "        ";

/// A job manifest.
///
/// # Example YAML
///
/// ```yaml
/// jobs:
///   - name: build
///     runs-on: ubuntu-latest
///     steps:
///       - name: Build
///         run: make
///     uploads:
///       - name: dist
///         path: [dist/app.js, dist/lib/util.js]
///
///   - name: deploy
///     needs: build
///     downloads:
///       - name: dist
///         path: /tmp/dist
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub jobs: Vec<JobSpec>,
}

/// A value given either once or as a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl OneOrMany {
    /// A single string is split on newlines, matching multi-line `path:`
    /// inputs of the artifact actions.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => s
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
            OneOrMany::Many(v) => v,
        }
    }
}

/// A step, either raw pre-rendered text or a mapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StepSpec {
    Raw(String),
    Mapping(serde_yaml::Mapping),
}

/// One job in a manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobSpec {
    pub name: String,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub runs_on: Option<Value>,

    #[serde(default, rename = "if")]
    pub condition: Option<String>,

    #[serde(default)]
    pub needs: OneOrMany,

    #[serde(default)]
    pub environment: Option<Value>,
    #[serde(default)]
    pub container: Option<Value>,
    #[serde(default)]
    pub services: Option<Value>,
    #[serde(default)]
    pub permissions: Option<Value>,
    #[serde(default)]
    pub concurrency: Option<Value>,

    #[serde(default)]
    pub timeout_minutes: Option<u32>,

    #[serde(default)]
    pub env: BTreeMap<String, Value>,

    #[serde(default)]
    pub outputs: BTreeMap<String, Value>,

    #[serde(default)]
    pub uses: Option<String>,
    #[serde(default)]
    pub with: BTreeMap<String, Value>,
    #[serde(default)]
    pub secrets: BTreeMap<String, Value>,

    #[serde(default)]
    pub steps: Vec<StepSpec>,

    #[serde(default)]
    pub uploads: Vec<UploadSpec>,

    #[serde(default)]
    pub downloads: Vec<DownloadSpec>,
}

/// An `upload-artifact` invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UploadSpec {
    pub name: String,
    pub path: OneOrMany,
    #[serde(default)]
    pub if_no_files_found: IfNoFilesFound,
    #[serde(default)]
    pub include_hidden_files: bool,
}

/// A `download-artifact` invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DownloadSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    pub path: String,
    #[serde(default)]
    pub merge_multiple: bool,
}

impl JobSpec {
    /// Build the job, rendering configuration values into fragments.
    pub fn to_job(&self) -> Result<Job> {
        if self.uses.is_some() && !self.steps.is_empty() {
            return Err(Error::Manifest(format!(
                "job '{}' cannot have both 'uses' and 'steps'",
                self.name
            )));
        }

        let body = match &self.uses {
            Some(uses) => JobBody::Call(WorkflowCall {
                uses: uses.clone(),
                with: scalar_map(&self.name, "with", &self.with)?,
                secrets: scalar_map(&self.name, "secrets", &self.secrets)?,
            }),
            None => JobBody::Steps(
                self.steps
                    .iter()
                    .map(render_step)
                    .collect::<Result<Vec<_>>>()?,
            ),
        };

        Ok(Job {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            runs_on: optional_fragment("runs-on", &self.runs_on)?,
            condition: self.condition.clone(),
            needs: self.needs.clone().into_vec(),
            environment: optional_fragment("environment", &self.environment)?,
            container: optional_fragment("container", &self.container)?,
            services: optional_fragment("services", &self.services)?,
            permissions: optional_fragment("permissions", &self.permissions)?,
            concurrency: optional_fragment("concurrency", &self.concurrency)?,
            timeout_minutes: self.timeout_minutes,
            env: scalar_map(&self.name, "env", &self.env)?,
            outputs: scalar_map(&self.name, "outputs", &self.outputs)?,
            body,
        })
    }
}

impl UploadSpec {
    pub fn to_upload(&self) -> ArtifactUpload {
        ArtifactUpload::new(self.name.clone(), self.path.clone().into_vec())
            .with_if_no_files_found(self.if_no_files_found)
            .with_hidden_files(self.include_hidden_files)
    }
}

impl DownloadSpec {
    /// Build the download. An empty selector is left for the tracker to reject.
    pub fn to_download(&self, depends_on: &[String]) -> Result<ArtifactDownload> {
        let source = match (&self.name, &self.pattern) {
            (Some(_), Some(_)) => {
                return Err(Error::Manifest(format!(
                    "download to '{}' cannot have both 'name' and 'pattern'",
                    self.path
                )));
            }
            (Some(name), None) => DownloadSource::Name(name.clone()),
            (None, Some(pattern)) => DownloadSource::Pattern {
                pattern: pattern.clone(),
                merge_multiple: self.merge_multiple,
            },
            (None, None) => DownloadSource::Name(String::new()),
        };

        Ok(ArtifactDownload {
            source,
            path: self.path.clone(),
            job_name: String::new(),
            depends_on: depends_on.to_vec(),
        })
    }
}

/// Render `key: value` for scalars, or `key:` followed by the YAML of the
/// value indented under the job body.
pub fn render_fragment(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::Mapping(_) | Value::Sequence(_) => {
            let body = serde_yaml::to_string(value)?;
            let mut out = format!("{}:", key);
            for line in body.lines() {
                out.push('\n');
                out.push_str(STEP_INDENT);
                out.push_str(line);
            }
            Ok(out)
        }
        _ => Ok(format!("{}: {}", key, render_scalar(value)?)),
    }
}

fn optional_fragment(key: &str, value: &Option<Value>) -> Result<Option<String>> {
    value.as_ref().map(|v| render_fragment(key, v)).transpose()
}

/// Scalars in their YAML form, quoted where a plain scalar would change
/// meaning. Multi-line strings become one double-quoted line so they stay
/// inside their `key: value` line.
fn render_scalar(value: &Value) -> Result<String> {
    match value {
        Value::String(s) if s.contains('\n') => Ok(double_quoted(s)),
        Value::Mapping(_) | Value::Sequence(_) => Err(Error::Manifest(
            "expected a scalar value, found a mapping or sequence".into(),
        )),
        other => Ok(serde_yaml::to_string(other)?.trim_end().to_string()),
    }
}

fn double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

fn scalar_map(
    job: &str,
    field: &str,
    values: &BTreeMap<String, Value>,
) -> Result<BTreeMap<String, String>> {
    values
        .iter()
        .map(|(k, v)| {
            render_scalar(v)
                .map(|s| (k.clone(), s))
                .map_err(|_| Error::Manifest(format!("job '{}': {}.{} must be a scalar", job, field, k)))
        })
        .collect()
}

/// Render a step as a list item at step indentation.
fn render_step(step: &StepSpec) -> Result<String> {
    match step {
        StepSpec::Raw(text) => Ok(text.clone()),
        StepSpec::Mapping(mapping) => {
            let body = serde_yaml::to_string(mapping)?;
            let mut out = String::new();
            for (i, line) in body.lines().enumerate() {
                out.push_str(if i == 0 { STEP_INDENT } else { STEP_CONTINUATION });
                if i == 0 {
                    out.push_str("- ");
                }
                out.push_str(line);
                out.push('\n');
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_fragment() {
        let value = Value::String("ubuntu-latest".into());
        assert_eq!(
            render_fragment("runs-on", &value).unwrap(),
            "runs-on: ubuntu-latest"
        );
    }

    #[test]
    fn test_mapping_fragment() {
        let value: Value = serde_yaml::from_str("contents: read\nissues: write\n").unwrap();
        assert_eq!(
            render_fragment("permissions", &value).unwrap(),
            "permissions:\n      contents: read\n      issues: write"
        );
    }

    #[test]
    fn test_sequence_fragment() {
        let value: Value = serde_yaml::from_str("[self-hosted, linux]").unwrap();
        assert_eq!(
            render_fragment("runs-on", &value).unwrap(),
            "runs-on:\n      - self-hosted\n      - linux"
        );
    }

    #[test]
    fn test_mapping_step() {
        let step: StepSpec = serde_yaml::from_str("name: Build\nrun: make\n").unwrap();
        assert_eq!(
            render_step(&step).unwrap(),
            "      - name: Build\n        run: make\n"
        );
    }

    #[test]
    fn test_raw_step_is_verbatim() {
        let step = StepSpec::Raw("      - run: echo hi\n".into());
        assert_eq!(render_step(&step).unwrap(), "      - run: echo hi\n");
    }

    #[test]
    fn test_multiline_path() {
        let spec: UploadSpec =
            serde_yaml::from_str("name: logs\npath: |\n  /tmp/a.log\n\n  /tmp/b.log\n").unwrap();
        assert_eq!(spec.to_upload().paths, vec!["/tmp/a.log", "/tmp/b.log"]);
    }

    #[test]
    fn test_download_with_name_and_pattern_rejected() {
        let spec: DownloadSpec =
            serde_yaml::from_str("name: a\npattern: a-*\npath: /tmp\n").unwrap();
        let err = spec.to_download(&[]).unwrap_err();
        assert!(err.to_string().contains("both 'name' and 'pattern'"));
    }

    #[test]
    fn test_uses_and_steps_rejected() {
        let spec: JobSpec = serde_yaml::from_str(
            "name: x\nuses: ./.github/workflows/a.yml\nsteps:\n  - run: echo\n",
        )
        .unwrap();
        assert!(spec.to_job().is_err());
    }

    #[test]
    fn test_non_scalar_env_rejected() {
        let spec: JobSpec = serde_yaml::from_str("name: x\nenv:\n  A: [1, 2]\n").unwrap();
        let err = spec.to_job().unwrap_err();
        assert!(err.to_string().contains("env.A must be a scalar"));
    }

    #[test]
    fn test_ambiguous_strings_are_quoted() {
        let spec: JobSpec = serde_yaml::from_str(
            "name: x\nenv:\n  MSG: \"key: value\"\n  FLAG: \"true\"\n  PLAIN: hello\n",
        )
        .unwrap();
        let job = spec.to_job().unwrap();
        assert_eq!(job.env["PLAIN"], "hello");

        let msg: Value = serde_yaml::from_str(&job.env["MSG"]).unwrap();
        assert_eq!(msg.as_str(), Some("key: value"));
        let flag: Value = serde_yaml::from_str(&job.env["FLAG"]).unwrap();
        assert_eq!(flag.as_str(), Some("true"));
    }

    #[test]
    fn test_multiline_string_stays_on_one_line() {
        let value = Value::String("line \"one\"\nline\\two".into());
        let rendered = render_fragment("MSG", &value).unwrap();
        assert_eq!(rendered, r#"MSG: "line \"one\"\nline\\two""#);

        let parsed: Value = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(parsed["MSG"].as_str(), Some("line \"one\"\nline\\two"));
    }

    #[test]
    fn test_numeric_scalars() {
        let spec: JobSpec =
            serde_yaml::from_str("name: x\nenv:\n  RETRIES: 3\n  DEBUG: true\n").unwrap();
        let job = spec.to_job().unwrap();
        assert_eq!(job.env["RETRIES"], "3");
        assert_eq!(job.env["DEBUG"], "true");
    }
}
