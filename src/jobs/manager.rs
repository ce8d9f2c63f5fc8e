//! Job registry and dependency graph.
//!
//! Jobs live in an arena (`Vec<Job>`) addressed by index. A `BTreeMap` from
//! name to index is the sorted name index: it is the order used for
//! rendering and for every traversal that needs a deterministic start.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use super::render::{render_job, RenderOptions};
use super::steps::extract_step_name;
use super::types::Job;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

/// Owns the jobs of one compilation pass.
#[derive(Debug, Clone, Default)]
pub struct JobManager {
    jobs: Vec<Job>,
    index: BTreeMap<String, usize>,
    options: RenderOptions,
}

impl JobManager {
    /// Create an empty manager with default render options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty manager with custom render options.
    pub fn with_options(options: RenderOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Register a job.
    ///
    /// `needs` entries are not checked here, so jobs may be added in any
    /// order; see [`JobManager::validate_dependencies`].
    pub fn add_job(&mut self, job: Job) -> Result<()> {
        if job.name.trim().is_empty() {
            return Err(Error::EmptyJobName);
        }
        if self.index.contains_key(&job.name) {
            return Err(Error::DuplicateJob(job.name));
        }

        debug!(job = %job.name, needs = ?job.needs, "Registered job");

        self.index.insert(job.name.clone(), self.jobs.len());
        self.jobs.push(job);
        Ok(())
    }

    /// Get a job by name.
    pub fn job(&self, name: &str) -> Option<&Job> {
        self.index.get(name).map(|&idx| &self.jobs[idx])
    }

    /// Job names in alphabetical order.
    pub fn job_names(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// Jobs in alphabetical name order.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.index.values().map(move |&idx| &self.jobs[idx])
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs that list `name` in their `needs`, sorted.
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.jobs()
            .filter(|job| job.needs.iter().any(|n| n == name))
            .map(|job| job.name.as_str())
            .collect()
    }

    /// Check that every `needs` entry exists and that the graph is acyclic.
    ///
    /// Only the first cycle found is reported.
    pub fn validate_dependencies(&self) -> Result<()> {
        let edges = self.resolve_edges()?;
        self.detect_cycle(&edges)
    }

    /// Self-check that no job carries two steps with the same name.
    ///
    /// A failure means a generator emitted a step twice; see
    /// [`Error::is_internal`].
    pub fn validate_no_duplicate_steps(&self) -> Result<()> {
        for job in self.jobs() {
            let mut seen: HashMap<&str, usize> = HashMap::new();
            for (position, step) in job.steps().iter().enumerate() {
                let Some(name) = extract_step_name(step) else {
                    continue;
                };
                if let Some(&first) = seen.get(name) {
                    return Err(Error::DuplicateStep {
                        job: job.name.clone(),
                        step: name.to_string(),
                        first,
                        second: position,
                    });
                }
                seen.insert(name, position);
            }
        }
        Ok(())
    }

    /// Execution order with dependencies first (Kahn's algorithm).
    ///
    /// Among jobs that are ready at the same time the alphabetically smallest
    /// is taken first, so the result is stable across runs. Fails without a
    /// partial result when the graph is invalid.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let edges = self.resolve_edges()?;
        self.detect_cycle(&edges)?;

        let mut in_degree: Vec<usize> = edges.iter().map(Vec::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.jobs.len()];
        for (idx, needs) in edges.iter().enumerate() {
            for &dep in needs {
                dependents[dep].push(idx);
            }
        }

        let mut ready: BTreeSet<(&str, usize)> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(idx, _)| (self.jobs[idx].name.as_str(), idx))
            .collect();

        let mut order = Vec::with_capacity(self.jobs.len());
        while let Some((name, idx)) = ready.pop_first() {
            order.push(name.to_string());
            for &next in &dependents[idx] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.insert((self.jobs[next].name.as_str(), next));
                }
            }
        }

        debug!(order = ?order, "Computed job execution order");
        Ok(order)
    }

    /// Render the `jobs:` block in alphabetical job order.
    pub fn render(&self) -> String {
        let mut out = String::from("jobs:\n");
        for job in self.jobs() {
            render_job(&mut out, job, &self.options);
        }
        out
    }

    /// Text tree of the graph, one tree per job nothing depends on.
    pub fn to_text(&self) -> String {
        let mut lines = Vec::new();
        let mut shown = BTreeSet::new();

        for name in self.job_names() {
            if self.dependents(name).is_empty() {
                self.format_node(name, 0, &mut shown, &mut lines);
            }
        }

        lines.join("\n")
    }

    fn format_node<'a>(
        &'a self,
        node: &'a str,
        depth: usize,
        shown: &mut BTreeSet<&'a str>,
        lines: &mut Vec<String>,
    ) {
        let indent = "  ".repeat(depth);
        let marker = if depth == 0 { "" } else { "└─ " };

        if !shown.insert(node) {
            lines.push(format!("{}{}{}  (already shown)", indent, marker, node));
            return;
        }
        lines.push(format!("{}{}{}", indent, marker, node));

        if let Some(job) = self.job(node) {
            for dep in &job.needs {
                self.format_node(dep, depth + 1, shown, lines);
            }
        }
    }

    /// Resolve `needs` names into arena indices.
    fn resolve_edges(&self) -> Result<Vec<Vec<usize>>> {
        let mut edges = vec![Vec::new(); self.jobs.len()];
        for (name, &idx) in &self.index {
            for dep in &self.jobs[idx].needs {
                let Some(&dep_idx) = self.index.get(dep) else {
                    return Err(Error::UnknownDependency {
                        job: name.clone(),
                        dependency: dep.clone(),
                    });
                };
                edges[idx].push(dep_idx);
            }
        }
        Ok(edges)
    }

    fn detect_cycle(&self, edges: &[Vec<usize>]) -> Result<()> {
        let mut marks = vec![Mark::Unvisited; self.jobs.len()];
        for &idx in self.index.values() {
            if marks[idx] == Mark::Unvisited {
                self.visit(idx, edges, &mut marks)?;
            }
        }
        Ok(())
    }

    fn visit(&self, node: usize, edges: &[Vec<usize>], marks: &mut [Mark]) -> Result<()> {
        marks[node] = Mark::Visiting;

        for &next in &edges[node] {
            match marks[next] {
                Mark::Unvisited => self.visit(next, edges, marks)?,
                Mark::Visiting => {
                    return Err(Error::DependencyCycle {
                        job: self.jobs[node].name.clone(),
                        dependency: self.jobs[next].name.clone(),
                    });
                }
                Mark::Visited => {}
            }
        }

        marks[node] = Mark::Visited;
        Ok(())
    }
}
