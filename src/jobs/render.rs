//! Deterministic YAML rendering of jobs.
//!
//! Field order within a job is fixed. Map-valued fields come out sorted
//! because they are stored in ordered maps.

use std::collections::BTreeMap;

use super::types::{Job, JobBody};

/// Expressions longer than this are emitted as a folded block.
pub const DEFAULT_IF_FOLD_THRESHOLD: usize = 120;

const JOB_INDENT: &str = "  ";
const FIELD_INDENT: &str = "    ";
const ENTRY_INDENT: &str = "      ";

/// Rendering knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Maximum length of an inline `if:` expression
    pub if_fold_threshold: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            if_fold_threshold: DEFAULT_IF_FOLD_THRESHOLD,
        }
    }
}

/// Render one job, followed by a blank line, into `out`.
pub fn render_job(out: &mut String, job: &Job, options: &RenderOptions) {
    out.push_str(&format!("{}{}:\n", JOB_INDENT, job.name));

    if let Some(display_name) = &job.display_name {
        push_field(out, "name", display_name);
    }

    render_needs(out, &job.needs);

    if let Some(condition) = &job.condition {
        render_condition(out, condition, options.if_fold_threshold);
    }

    for fragment in [
        &job.runs_on,
        &job.environment,
        &job.container,
        &job.services,
        &job.permissions,
        &job.concurrency,
    ]
    .into_iter()
    .flatten()
    {
        push_fragment(out, fragment);
    }

    if let Some(minutes) = job.timeout_minutes.filter(|m| *m > 0) {
        push_field(out, "timeout-minutes", &minutes.to_string());
    }

    push_map(out, "env", &job.env);
    push_map(out, "outputs", &job.outputs);

    match &job.body {
        JobBody::Call(call) => {
            push_field(out, "uses", &call.uses);
            push_map(out, "with", &call.with);
            push_map(out, "secrets", &call.secrets);
        }
        JobBody::Steps(steps) if !steps.is_empty() => {
            out.push_str(&format!("{}steps:\n", FIELD_INDENT));
            for step in steps {
                out.push_str(step);
                if !step.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
        JobBody::Steps(_) => {}
    }

    out.push('\n');
}

fn render_needs(out: &mut String, needs: &[String]) {
    match needs {
        [] => {}
        [single] => push_field(out, "needs", single),
        _ => {
            let mut sorted: Vec<&str> = needs.iter().map(String::as_str).collect();
            sorted.sort_unstable();
            out.push_str(&format!("{}needs:\n", FIELD_INDENT));
            for dep in sorted {
                out.push_str(&format!("{}- {}\n", ENTRY_INDENT, dep));
            }
        }
    }
}

fn render_condition(out: &mut String, condition: &str, threshold: usize) {
    if condition.contains('\n') || condition.len() > threshold {
        out.push_str(&format!("{}if: >\n", FIELD_INDENT));
        for line in condition.lines().map(str::trim).filter(|l| !l.is_empty()) {
            out.push_str(&format!("{}{}\n", ENTRY_INDENT, line));
        }
    } else {
        push_field(out, "if", condition);
    }
}

fn push_field(out: &mut String, key: &str, value: &str) {
    out.push_str(&format!("{}{}: {}\n", FIELD_INDENT, key, value));
}

fn push_fragment(out: &mut String, fragment: &str) {
    let fragment = fragment.trim_end_matches('\n');
    if fragment.is_empty() {
        return;
    }
    out.push_str(FIELD_INDENT);
    out.push_str(fragment);
    out.push('\n');
}

fn push_map(out: &mut String, key: &str, map: &BTreeMap<String, String>) {
    if map.is_empty() {
        return;
    }
    out.push_str(&format!("{}{}:\n", FIELD_INDENT, key));
    for (k, v) in map {
        out.push_str(&format!("{}{}: {}\n", ENTRY_INDENT, k, v));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::WorkflowCall;

    fn render(job: &Job) -> String {
        let mut out = String::new();
        render_job(&mut out, job, &RenderOptions::default());
        out
    }

    #[test]
    fn test_field_order() {
        let job = Job::new("agent")
            .with_display_name("Run agent")
            .with_needs(["pre", "activation"])
            .with_condition("github.event_name == 'issues'")
            .with_runs_on("runs-on: ubuntu-latest")
            .with_permissions("permissions:\n      contents: read")
            .with_timeout_minutes(20)
            .with_env("Z_VAR", "z")
            .with_env("A_VAR", "a")
            .with_output("result", "${{ steps.run.outputs.result }}")
            .with_step("      - name: Run\n        run: ./run.sh\n");

        let expected = "  agent:\n\
                        \x20   name: Run agent\n\
                        \x20   needs:\n\
                        \x20     - activation\n\
                        \x20     - pre\n\
                        \x20   if: github.event_name == 'issues'\n\
                        \x20   runs-on: ubuntu-latest\n\
                        \x20   permissions:\n\
                        \x20     contents: read\n\
                        \x20   timeout-minutes: 20\n\
                        \x20   env:\n\
                        \x20     A_VAR: a\n\
                        \x20     Z_VAR: z\n\
                        \x20   outputs:\n\
                        \x20     result: ${{ steps.run.outputs.result }}\n\
                        \x20   steps:\n\
                        \x20     - name: Run\n\
                        \x20       run: ./run.sh\n\
                        \n";
        assert_eq!(render(&job), expected);
    }

    #[test]
    fn test_single_need_is_scalar() {
        let out = render(&Job::new("b").with_needs(["a"]));
        assert!(out.contains("    needs: a\n"));
    }

    #[test]
    fn test_long_condition_is_folded() {
        let long = format!("github.event_name == 'push' && {}", "x".repeat(120));
        let out = render(&Job::new("j").with_condition(long.clone()));
        assert!(out.contains("    if: >\n"));
        assert!(out.contains(&format!("      {}\n", long)));
    }

    #[test]
    fn test_multiline_condition_is_folded() {
        let out = render(&Job::new("j").with_condition("a &&\n   b\n\n"));
        assert!(out.contains("    if: >\n      a &&\n      b\n"));
    }

    #[test]
    fn test_threshold_is_configurable() {
        let mut out = String::new();
        render_job(
            &mut out,
            &Job::new("j").with_condition("always()"),
            &RenderOptions {
                if_fold_threshold: 4,
            },
        );
        assert!(out.contains("    if: >\n      always()\n"));
    }

    #[test]
    fn test_workflow_call() {
        let job = Job::new("reuse").with_call(
            WorkflowCall::new("owner/repo/.github/workflows/ci.yml@main")
                .with_input("b", "2")
                .with_input("a", "1")
                .with_secret("token", "${{ secrets.TOKEN }}"),
        );
        let out = render(&job);
        assert_eq!(
            out,
            "  reuse:\n    uses: owner/repo/.github/workflows/ci.yml@main\n    with:\n      a: 1\n      b: 2\n    secrets:\n      token: ${{ secrets.TOKEN }}\n\n"
        );
        assert!(!out.contains("steps:"));
    }

    #[test]
    fn test_zero_timeout_is_omitted() {
        let out = render(&Job::new("j").with_timeout_minutes(0));
        assert!(!out.contains("timeout-minutes"));
    }
}
