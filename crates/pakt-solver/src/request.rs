use serde::Serialize;

use crate::pool::PackageId;

/// Index of a job within its request; problems refer to jobs by this.
pub type JobId = usize;

/// The user-level commands a request can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobCmd {
    Install,
    Remove,
    Update,
    UpdateAll,
    Fix,
    FixAll,
    Lock,
}

/// One user job. Candidate resolution from name + constraint to package
/// ids is done by the caller against the pool before solving.
#[derive(Debug, Clone)]
pub struct Job {
    pub cmd: JobCmd,
    pub package_name: Option<String>,
    pub packages: Vec<PackageId>,
}

/// The ordered sequence of jobs to resolve.
#[derive(Debug, Clone, Default)]
pub struct Request {
    jobs: Vec<Job>,
}

impl Request {
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    fn push(&mut self, cmd: JobCmd, name: Option<String>, packages: Vec<PackageId>) -> &mut Self {
        self.jobs.push(Job {
            cmd,
            package_name: name,
            packages,
        });
        self
    }

    /// Install one of the given candidates.
    pub fn install(&mut self, name: impl Into<String>, packages: Vec<PackageId>) -> &mut Self {
        self.push(JobCmd::Install, Some(name.into()), packages)
    }

    /// Remove every given candidate.
    pub fn remove(&mut self, name: impl Into<String>, packages: Vec<PackageId>) -> &mut Self {
        self.push(JobCmd::Remove, Some(name.into()), packages)
    }

    /// Keep every given candidate in its current state.
    pub fn lock(&mut self, name: impl Into<String>, packages: Vec<PackageId>) -> &mut Self {
        self.push(JobCmd::Lock, Some(name.into()), packages)
    }

    /// Allow the given installed candidates to be updated.
    pub fn update(&mut self, name: impl Into<String>, packages: Vec<PackageId>) -> &mut Self {
        self.push(JobCmd::Update, Some(name.into()), packages)
    }

    /// Allow every installed package to be updated.
    pub fn update_all(&mut self) -> &mut Self {
        self.push(JobCmd::UpdateAll, None, Vec::new())
    }

    /// Re-enforce the dependency rules of the given installed candidates.
    pub fn fix(&mut self, name: impl Into<String>, packages: Vec<PackageId>) -> &mut Self {
        self.push(JobCmd::Fix, Some(name.into()), packages)
    }

    /// Re-enforce the dependency rules of every installed package.
    pub fn fix_all(&mut self) -> &mut Self {
        self.push(JobCmd::FixAll, None, Vec::new())
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
