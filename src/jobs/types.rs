//! Job type definitions.
//!
//! Configuration values such as `runs-on` or `permissions` are opaque,
//! pre-rendered YAML fragments. A fragment already contains its own key, and
//! any continuation lines are indented relative to the job body:
//!
//! ```text
//! permissions:
//!       contents: read
//!       issues: write
//! ```
//!
//! The renderer places the first line at job-body indentation and copies the
//! remaining lines verbatim.

use std::collections::BTreeMap;

/// A compiled job.
///
/// Jobs are immutable once registered with a [`super::JobManager`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Job {
    /// Unique job identifier (the key under `jobs:`)
    pub name: String,

    /// Human-readable name rendered as `name:`
    pub display_name: Option<String>,

    /// `runs-on` fragment
    pub runs_on: Option<String>,

    /// Boolean `if` expression
    pub condition: Option<String>,

    /// Upstream jobs, in declaration order
    pub needs: Vec<String>,

    pub environment: Option<String>,
    pub container: Option<String>,
    pub services: Option<String>,
    pub permissions: Option<String>,
    pub concurrency: Option<String>,

    /// Rendered only when greater than zero
    pub timeout_minutes: Option<u32>,

    pub env: BTreeMap<String, String>,
    pub outputs: BTreeMap<String, String>,

    /// Either step blocks or a reusable workflow call, never both
    pub body: JobBody,
}

/// What a job executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobBody {
    /// Pre-rendered step blocks, emitted verbatim under `steps:`
    Steps(Vec<String>),
    /// A reusable workflow call (`uses`/`with`/`secrets`)
    Call(WorkflowCall),
}

impl Default for JobBody {
    fn default() -> Self {
        JobBody::Steps(Vec::new())
    }
}

/// Reusable workflow call fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowCall {
    pub uses: String,
    pub with: BTreeMap<String, String>,
    pub secrets: BTreeMap<String, String>,
}

impl WorkflowCall {
    pub fn new(uses: impl Into<String>) -> Self {
        Self {
            uses: uses.into(),
            ..Default::default()
        }
    }

    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with.insert(key.into(), value.into());
        self
    }

    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(key.into(), value.into());
        self
    }
}

impl Job {
    /// Create a job with the given name and no configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set the `runs-on` fragment.
    pub fn with_runs_on(mut self, fragment: impl Into<String>) -> Self {
        self.runs_on = Some(fragment.into());
        self
    }

    pub fn with_condition(mut self, expression: impl Into<String>) -> Self {
        self.condition = Some(expression.into());
        self
    }

    pub fn with_needs<I, S>(mut self, needs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.needs = needs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_permissions(mut self, fragment: impl Into<String>) -> Self {
        self.permissions = Some(fragment.into());
        self
    }

    pub fn with_timeout_minutes(mut self, minutes: u32) -> Self {
        self.timeout_minutes = Some(minutes);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    /// Append a pre-rendered step block.
    ///
    /// Replaces a workflow call body, since the two are mutually exclusive.
    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        match &mut self.body {
            JobBody::Steps(steps) => steps.push(step.into()),
            JobBody::Call(_) => self.body = JobBody::Steps(vec![step.into()]),
        }
        self
    }

    pub fn with_call(mut self, call: WorkflowCall) -> Self {
        self.body = JobBody::Call(call);
        self
    }

    /// Step blocks, empty for workflow-call jobs.
    pub fn steps(&self) -> &[String] {
        match &self.body {
            JobBody::Steps(steps) => steps,
            JobBody::Call(_) => &[],
        }
    }

    pub fn is_workflow_call(&self) -> bool {
        matches!(self.body, JobBody::Call(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let job = Job::new("build")
            .with_runs_on("runs-on: ubuntu-latest")
            .with_needs(["setup"])
            .with_env("B", "2")
            .with_env("A", "1")
            .with_step("      - name: Build\n        run: make\n");

        assert_eq!(job.name, "build");
        assert_eq!(job.needs, vec!["setup"]);
        assert_eq!(job.steps().len(), 1);
        assert_eq!(
            job.env.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["A", "B"]
        );
        assert!(!job.is_workflow_call());
    }

    #[test]
    fn test_call_and_steps_are_exclusive() {
        let job = Job::new("reuse")
            .with_step("      - run: echo hi\n")
            .with_call(WorkflowCall::new("./.github/workflows/x.yml"));
        assert!(job.is_workflow_call());
        assert!(job.steps().is_empty());

        let job = job.with_step("      - run: echo again\n");
        assert!(!job.is_workflow_call());
        assert_eq!(job.steps().len(), 1);
    }
}
