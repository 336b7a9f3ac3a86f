use std::fmt;

use crate::pool::Pool;
use crate::request::{JobCmd, JobId, Request};
use crate::rule::{RuleId, RuleReason};

/// One cause of a problem: either a user job or a rule the solver added.
///
/// Rule causes carry their display metadata, resolved when the problem is
/// captured, so problems stay renderable after the solver is gone.
#[derive(Debug, Clone)]
pub enum ProblemCause {
    /// A user job, by its index in the request
    Job(JobId),
    /// A solver rule
    Rule(ProblemRule),
}

/// A rule that contributes to a problem
#[derive(Debug, Clone)]
pub struct ProblemRule {
    /// The rule ID
    pub rule_id: RuleId,
    /// Why the rule existed
    pub reason: RuleReason,
    /// Source package in `name-version` form
    pub source: Option<String>,
    /// Target package name
    pub target: Option<String>,
    /// Constraint string
    pub constraint: Option<String>,
}

impl PartialEq for ProblemCause {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ProblemCause::Job(a), ProblemCause::Job(b)) => a == b,
            (ProblemCause::Rule(a), ProblemCause::Rule(b)) => a.rule_id == b.rule_id,
            _ => false,
        }
    }
}

impl Eq for ProblemCause {}

/// A set of jobs and rules that cannot all be satisfied together.
#[derive(Debug, Clone, Default)]
pub struct Problem {
    causes: Vec<ProblemCause>,
}

impl Problem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cause; duplicates are ignored.
    pub fn add_cause(&mut self, cause: ProblemCause) {
        if !self.causes.contains(&cause) {
            self.causes.push(cause);
        }
    }

    pub fn causes(&self) -> &[ProblemCause] {
        &self.causes
    }

    pub fn is_empty(&self) -> bool {
        self.causes.is_empty()
    }

    /// Whether any cause refers to the given job.
    pub fn involves_job(&self, job_id: JobId) -> bool {
        self.causes
            .iter()
            .any(|c| matches!(c, ProblemCause::Job(id) if *id == job_id))
    }

    /// Render a human-readable description of this problem.
    pub fn describe(&self, pool: &Pool, request: &Request) -> String {
        let mut lines = Vec::new();
        for cause in &self.causes {
            let line = match cause {
                ProblemCause::Job(job_id) => describe_job(*job_id, pool, request),
                ProblemCause::Rule(rule) => describe_rule(rule),
            };
            if !line.is_empty() {
                lines.push(format!("  - {}", line));
            }
        }
        lines.join("\n")
    }
}

fn describe_job(job_id: JobId, pool: &Pool, request: &Request) -> String {
    let Some(job) = request.job(job_id) else {
        return "unknown job".to_string();
    };
    let name = job.package_name.as_deref().unwrap_or("*");

    let candidates: Vec<String> = job
        .packages
        .iter()
        .filter_map(|&id| pool.package(id))
        .map(|p| p.pretty_string())
        .collect();

    let base = match job.cmd {
        JobCmd::Install => {
            if job.packages.is_empty() {
                return format!("install request for {} matches no package", name);
            }
            format!("install request for {}", name)
        }
        JobCmd::Remove => format!("remove request for {}", name),
        JobCmd::Lock => format!("lock request for {}", name),
        JobCmd::Update => format!("update request for {}", name),
        JobCmd::UpdateAll => "update request for all packages".to_string(),
        JobCmd::Fix => format!("fix request for {}", name),
        JobCmd::FixAll => "fix request for all packages".to_string(),
    };

    if candidates.is_empty() {
        base
    } else {
        format!("{} ({})", base, candidates.join(", "))
    }
}

fn describe_rule(rule: &ProblemRule) -> String {
    let source = rule.source.as_deref().unwrap_or("unknown");
    let target = rule.target.as_deref().unwrap_or("unknown");
    let constraint = rule.constraint.as_deref().unwrap_or("*");

    match rule.reason {
        RuleReason::PackageRequires => {
            format!("{} requires {} {}", source, target, constraint)
        }
        RuleReason::PackageConflict => format!("{} conflicts with {}", source, target),
        RuleReason::PackageSameName => {
            format!("only one version of {} can be installed", target)
        }
        RuleReason::PackageObsoletes | RuleReason::InstalledPackageObsoletes => {
            format!("{} replaces {} and cannot be installed alongside it", source, target)
        }
        RuleReason::NotInstallable => format!("{} cannot be installed", source),
        RuleReason::InternalAllowUpdate => format!("{} can only be kept or updated", source),
        RuleReason::JobInstall => format!("install request for {}", target),
        RuleReason::JobRemove => format!("remove request for {}", target),
        RuleReason::JobLock => format!("lock request for {}", target),
        RuleReason::Learned => "conclusion learned from prior conflicts".to_string(),
    }
}

/// All problems collected during a solve.
#[derive(Debug, Default)]
pub struct ProblemSet {
    problems: Vec<Problem>,
}

impl ProblemSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, problem: Problem) {
        self.problems.push(problem);
    }

    pub fn pop(&mut self) -> Option<Problem> {
        self.problems.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// Render a complete description of all problems.
    pub fn describe(&self, pool: &Pool, request: &Request) -> String {
        let descriptions: Vec<_> = self
            .problems
            .iter()
            .enumerate()
            .map(|(i, p)| format!("Problem {}:\n{}", i + 1, p.describe(pool, request)))
            .collect();
        descriptions.join("\n\n")
    }
}

impl fmt::Display for ProblemSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} problem(s) found", self.problems.len())
    }
}
