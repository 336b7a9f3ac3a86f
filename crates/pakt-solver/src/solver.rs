use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;

use crate::decisions::Decisions;
use crate::error::{Result, SolverError};
use crate::policy::Policy;
use crate::pool::{PackageId, Pool};
use crate::problem::{Problem, ProblemCause, ProblemRule, ProblemSet};
use crate::repository::RepoId;
use crate::request::{JobCmd, JobId, Request};
use crate::rule::{literal_package, Literal, Rule, RuleId, RuleReason, RuleType};
use crate::rule_set::RuleSet;
use crate::transaction::{Operation, Transaction};
use crate::watch_graph::{WatchGraph, WatchNode};

/// Upper bound on decisions per solve; hitting it means a solver bug, not
/// a hard problem.
const MAX_DECISION_STEPS: u64 = 4_000_000;

/// The CDCL solver.
///
/// Translates package links and user jobs into rules, then searches for an
/// assignment with unit propagation over two-literal watches, conflict
/// analysis with clause learning, and backjumping. A solver is single-use:
/// [`solve`](Solver::solve) consumes it.
pub struct Solver<'a> {
    pool: &'a Pool,
    policy: &'a dyn Policy,
    installed_repo: RepoId,

    rules: RuleSet,
    watches: WatchGraph,
    decisions: Decisions,
    /// Cursor into the decision queue; decisions before it are propagated
    propagate_index: usize,
    /// Alternative candidates kept for the minimization step
    branches: Vec<Branch>,
    problems: ProblemSet,

    installed_map: HashSet<PackageId>,
    /// Installed packages whose update candidates may be chosen
    update_map: HashSet<PackageId>,
    /// Installed packages whose dependency rules are enforced again
    fix_map: HashSet<PackageId>,
    /// Installed packages that must not be kept as-is
    clean_deps_map: HashSet<PackageId>,
    update_all: bool,

    /// Packages already passed through rule generation
    added_packages: HashSet<PackageId>,
    rule_to_job: IndexMap<RuleId, JobId>,
    package_update_rule: IndexMap<PackageId, RuleId>,
    package_feature_rule: IndexMap<PackageId, RuleId>,

    /// Ancestor rules per learned clause
    learned_pool: Vec<Vec<RuleId>>,
    /// Learned rule id -> index into learned_pool
    learned_why: IndexMap<RuleId, usize>,
    /// Most recent weak rule seen while analyzing an unsolvable conflict
    last_weak_why: Option<RuleId>,

    decision_steps: u64,
}

struct Branch {
    literals: Vec<Literal>,
    level: u32,
}

impl<'a> Solver<'a> {
    /// Create a solver over a pool. `installed_repo` identifies the
    /// repository holding the currently installed packages; pass 0 when
    /// nothing is installed.
    pub fn new(pool: &'a Pool, policy: &'a dyn Policy, installed_repo: RepoId) -> Self {
        Self {
            pool,
            policy,
            installed_repo,
            rules: RuleSet::new(),
            watches: WatchGraph::new(),
            decisions: Decisions::new(),
            propagate_index: 0,
            branches: Vec::new(),
            problems: ProblemSet::new(),
            installed_map: HashSet::new(),
            update_map: HashSet::new(),
            fix_map: HashSet::new(),
            clean_deps_map: HashSet::new(),
            update_all: false,
            added_packages: HashSet::new(),
            rule_to_job: IndexMap::new(),
            package_update_rule: IndexMap::new(),
            package_feature_rule: IndexMap::new(),
            learned_pool: Vec::new(),
            learned_why: IndexMap::new(),
            last_weak_why: None,
            decision_steps: 0,
        }
    }

    /// Solve the request.
    ///
    /// Returns the transaction on success. An unsolvable request comes
    /// back as [`SolverError::Unsolvable`] carrying one problem group per
    /// independent cause.
    pub fn solve(mut self, request: &Request) -> Result<Transaction> {
        let installed: Vec<PackageId> = self.pool.repository_packages(self.installed_repo).to_vec();
        self.installed_map = installed.iter().copied().collect();

        // update/fix jobs only populate the maps; rule generation and the
        // installed-packages phase consult them
        for job in request.jobs() {
            match job.cmd {
                JobCmd::Update => {
                    for &package in &job.packages {
                        if self.installed_map.contains(&package) {
                            self.update_map.insert(package);
                        }
                    }
                }
                JobCmd::UpdateAll => {
                    self.update_all = true;
                    self.update_map.extend(installed.iter().copied());
                }
                JobCmd::Fix => {
                    for &package in &job.packages {
                        if self.installed_map.contains(&package) {
                            self.fix_map.insert(package);
                        }
                    }
                }
                JobCmd::FixAll => {
                    self.fix_map.extend(installed.iter().copied());
                }
                JobCmd::Remove => {
                    for &package in &job.packages {
                        if self.installed_map.contains(&package) {
                            self.clean_deps_map.insert(package);
                        }
                    }
                }
                _ => {}
            }
        }

        for &package in &installed {
            self.add_rules_for_package(package);
            self.add_rules_for_update_packages(package, true);
        }

        for job in request.jobs() {
            if job.cmd == JobCmd::Install {
                for &package in &job.packages {
                    self.add_rules_for_package(package);
                }
            }
        }

        self.add_update_and_feature_rules(&installed);
        self.add_job_rules(request);

        // register watches for every non-assertion rule
        {
            let rules = &self.rules;
            let watches = &mut self.watches;
            for rule in rules.iter() {
                watches.add_rule(rule);
            }
        }

        log::debug!(
            "solving {} job(s): {} rules ({} package, {} job, {} update, {} feature), {} installed",
            request.jobs().len(),
            self.rules.len(),
            self.rules.count_by_type(RuleType::Package),
            self.rules.count_by_type(RuleType::Job),
            self.rules.count_by_type(RuleType::Update),
            self.rules.count_by_type(RuleType::Feature),
            installed.len(),
        );

        self.make_assertion_rule_decisions();
        self.run_sat(true, &installed)?;

        if !self.problems.is_empty() {
            return Err(SolverError::Unsolvable(self.problems));
        }

        Ok(self.create_transaction())
    }

    fn is_installed(&self, package: PackageId) -> bool {
        self.installed_map.contains(&package)
    }

    fn rule_enabled(&self, rule_id: RuleId) -> bool {
        self.rules.get(rule_id).map(|r| r.is_enabled()).unwrap_or(false)
    }

    /// Add a rule of the given type; `None` (tautological) rules are
    /// dropped. Returns the rule id, which is the existing rule's id when
    /// an equal rule was already present.
    fn add_rule(&mut self, rule: Option<Rule>, rule_type: RuleType) -> Option<RuleId> {
        rule.map(|rule| self.rules.add(rule, rule_type))
    }

    fn cause_for(&self, rule_id: RuleId) -> ProblemCause {
        if let Some(&job) = self.rule_to_job.get(&rule_id) {
            return ProblemCause::Job(job);
        }
        let (reason, source, target, constraint) = match self.rules.get(rule_id) {
            Some(rule) => (
                rule.reason(),
                rule.source_package()
                    .and_then(|id| self.pool.package(id))
                    .map(|p| p.pretty_string()),
                rule.target_name().map(String::from),
                rule.constraint().map(String::from),
            ),
            None => (RuleReason::Learned, None, None, None),
        };
        ProblemCause::Rule(ProblemRule {
            rule_id,
            reason,
            source,
            target,
            constraint,
        })
    }

    /// Disable the rules behind a problem cause: for a job, every rule the
    /// job produced; for a rule, the rule itself.
    fn disable_cause(&mut self, cause: &ProblemCause) {
        match cause {
            ProblemCause::Job(job_id) => {
                let ids: Vec<RuleId> = self
                    .rule_to_job
                    .iter()
                    .filter(|&(_, &job)| job == *job_id)
                    .map(|(&rule_id, _)| rule_id)
                    .collect();
                for rule_id in ids {
                    self.rules.disable(rule_id);
                }
            }
            ProblemCause::Rule(rule) => self.rules.disable(rule.rule_id),
        }
    }

    // ------------------------------------------------------------------
    // rule generation
    // ------------------------------------------------------------------

    /// Generate package rules for everything reachable from `package_id`.
    ///
    /// Breadth-first over requires/conflicts links. Installed packages not
    /// named by a fix job keep their pre-existing breakage: requirements
    /// already unsatisfied on disk are not enforced, and conflicts with
    /// other installed packages are not emitted.
    fn add_rules_for_package(&mut self, package_id: PackageId) {
        let mut work_queue = VecDeque::new();
        work_queue.push_back(package_id);

        while let Some(current) = work_queue.pop_front() {
            if !self.added_packages.insert(current) {
                continue;
            }
            let Some(package) = self.pool.package(current).cloned() else {
                continue;
            };

            let dont_fix = self.is_installed(current) && !self.fix_map.contains(&current);

            if !dont_fix && !self.policy.installable(self.pool, &package) {
                self.add_rule(
                    Some(
                        Rule::remove(current, RuleReason::NotInstallable)
                            .with_source(current)
                            .with_target(package.name()),
                    ),
                    RuleType::Package,
                );
                continue;
            }

            for link in package.requires() {
                let providers = self.pool.what_provides(link.target(), link.constraint());

                if dont_fix && !providers.iter().any(|p| self.is_installed(*p)) {
                    // the dependency was already broken before this solve
                    continue;
                }

                self.add_rule(
                    Rule::require(current, &providers, RuleReason::PackageRequires).map(|r| {
                        r.with_source(current)
                            .with_target(link.target())
                            .with_constraint(link.constraint_string())
                    }),
                    RuleType::Package,
                );
                work_queue.extend(providers);
            }

            for link in package.conflicts() {
                for &candidate in &self.pool.what_provides(link.target(), link.constraint()) {
                    if dont_fix && self.is_installed(candidate) {
                        continue;
                    }
                    self.add_rule(
                        Rule::conflict(current, candidate, RuleReason::PackageConflict)
                            .map(|r| r.with_source(current).with_target(link.target())),
                        RuleType::Package,
                    );
                }
            }

            // only one version of a name can be installed, and a package
            // conflicts with everything it replaces
            let is_installed = self.is_installed(current);
            for &other in &self.pool.what_provides(package.name(), None) {
                if other == current {
                    continue;
                }
                if dont_fix && self.is_installed(other) {
                    continue;
                }
                let same_name = self
                    .pool
                    .package(other)
                    .map(|o| o.name().eq_ignore_ascii_case(package.name()))
                    .unwrap_or(false);
                if same_name {
                    self.add_rule(
                        Rule::conflict(current, other, RuleReason::PackageSameName)
                            .map(|r| r.with_source(current).with_target(package.name())),
                        RuleType::Package,
                    );
                }
            }
            for link in package.replaces() {
                for &other in &self.pool.what_provides(link.target(), link.constraint()) {
                    if other == current {
                        continue;
                    }
                    if dont_fix && self.is_installed(other) {
                        continue;
                    }
                    let reason = if is_installed {
                        RuleReason::InstalledPackageObsoletes
                    } else {
                        RuleReason::PackageObsoletes
                    };
                    self.add_rule(
                        Rule::conflict(current, other, reason)
                            .map(|r| r.with_source(current).with_target(link.target())),
                        RuleType::Package,
                    );
                }
            }

            // recommends/suggests pull providers into rule generation but
            // never constrain anything
            for link in package.recommends().iter().chain(package.suggests()) {
                work_queue.extend(self.pool.what_provides(link.target(), link.constraint()));
            }
        }
    }

    /// Generate rules for a package and all of its update candidates.
    fn add_rules_for_update_packages(&mut self, package_id: PackageId, allow_all: bool) {
        self.add_rules_for_package(package_id);

        let Some(package) = self.pool.package(package_id).cloned() else {
            return;
        };
        for candidate in self.policy.find_update_packages(self.pool, &package, allow_all) {
            self.add_rules_for_package(candidate);
        }
    }

    /// Per installed package: a feature rule (downgrades permitted) and an
    /// update rule (policy candidates only). Equal rules collapse into
    /// one; which rules are registered, and whether they are weak, follows
    /// the policy's allow_uninstall.
    fn add_update_and_feature_rules(&mut self, installed: &[PackageId]) {
        for &package_id in installed {
            let Some(package) = self.pool.package(package_id).cloned() else {
                continue;
            };

            let feature_candidates = self.policy.find_update_packages(self.pool, &package, true);
            let update_candidates = self.policy.find_update_packages(self.pool, &package, false);

            let mut feature_rule =
                Rule::update(package_id, &feature_candidates, RuleReason::InternalAllowUpdate)
                    .with_source(package_id)
                    .with_target(package.name());
            let mut update_rule =
                Rule::update(package_id, &update_candidates, RuleReason::InternalAllowUpdate)
                    .with_source(package_id)
                    .with_target(package.name());

            if update_rule.equals_literals(&feature_rule) {
                if self.policy.allow_uninstall() {
                    feature_rule.set_weak(true);
                    if let Some(id) = self.add_rule(Some(feature_rule), RuleType::Feature) {
                        self.package_feature_rule.insert(package_id, id);
                    }
                } else if let Some(id) = self.add_rule(Some(update_rule), RuleType::Update) {
                    self.package_update_rule.insert(package_id, id);
                }
            } else if self.policy.allow_uninstall() {
                feature_rule.set_weak(true);
                update_rule.set_weak(true);
                if let Some(id) = self.add_rule(Some(feature_rule), RuleType::Feature) {
                    self.package_feature_rule.insert(package_id, id);
                }
                if let Some(id) = self.add_rule(Some(update_rule), RuleType::Update) {
                    self.package_update_rule.insert(package_id, id);
                }
            } else {
                // uninstalls are off the table, so only the strong update
                // rule is registered
                if let Some(id) = self.add_rule(Some(update_rule), RuleType::Update) {
                    self.package_update_rule.insert(package_id, id);
                }
            }
        }
    }

    /// Add a job rule and remember which job it came from. A job rule
    /// equal to an already present rule is dropped; the existing rule
    /// keeps its own attribution.
    fn add_job_rule(&mut self, rule: Rule, job_id: JobId) {
        let before = self.rules.len();
        if let Some(id) = self.add_rule(Some(rule), RuleType::Job) {
            if self.rules.len() > before {
                self.rule_to_job.insert(id, job_id);
            }
        }
    }

    /// Emit job rules: install-one-of for installs, a remove rule per
    /// remove candidate, install-or-remove for locks depending on the
    /// candidate's current state.
    fn add_job_rules(&mut self, request: &Request) {
        for (job_id, job) in request.jobs().iter().enumerate() {
            match job.cmd {
                JobCmd::Install => {
                    let rule = Rule::install_one_of(&job.packages, RuleReason::JobInstall)
                        .with_target(job.package_name.clone().unwrap_or_default());
                    self.add_job_rule(rule, job_id);
                }
                JobCmd::Remove => {
                    for &package in &job.packages {
                        let target = self
                            .pool
                            .package(package)
                            .map(|p| p.name().to_string())
                            .unwrap_or_default();
                        let rule = Rule::remove(package, RuleReason::JobRemove)
                            .with_source(package)
                            .with_target(target);
                        self.add_job_rule(rule, job_id);
                    }
                }
                JobCmd::Lock => {
                    for &package in &job.packages {
                        let target = self
                            .pool
                            .package(package)
                            .map(|p| p.name().to_string())
                            .unwrap_or_default();
                        let rule = if self.is_installed(package) {
                            Rule::install(package, RuleReason::JobLock)
                        } else {
                            Rule::remove(package, RuleReason::JobLock)
                        };
                        let rule = rule.with_source(package).with_target(target);
                        self.add_job_rule(rule, job_id);
                    }
                }
                _ => {}
            }
        }
    }

    // ------------------------------------------------------------------
    // assertions
    // ------------------------------------------------------------------

    /// Decide every enabled assertion rule at level 1.
    ///
    /// Non-weak assertions go first, in rule order. A conflicting pair of
    /// job/update/feature assertions becomes a problem: every assertion
    /// over the disputed package is disabled and the scan restarts with
    /// the decisions rewound. Weak assertions follow and are silently
    /// disabled on conflict.
    fn make_assertion_rule_decisions(&mut self) {
        let decision_start = self.decisions.len();
        let mut rule_index: usize = 0;

        while rule_index < self.rules.len() {
            let rule_id = rule_index as RuleId;
            rule_index += 1;

            let Some(rule) = self.rules.get(rule_id) else {
                continue;
            };
            if rule.is_weak() || rule.is_disabled() {
                continue;
            }

            if rule.is_impossible() {
                // a job without candidates can never be satisfied
                let cause = self.cause_for(rule_id);
                let mut problem = Problem::new();
                problem.add_cause(cause.clone());
                self.problems.add(problem);
                self.disable_cause(&cause);
                continue;
            }

            if !rule.is_assertion() {
                continue;
            }

            let literal = rule.literals()[0];
            let package = literal_package(literal);

            if self.decisions.undecided(package) {
                self.decisions.decide(literal, 1, Some(rule_id));
                continue;
            }
            if self.decisions.satisfied(literal) {
                continue;
            }

            // conflict at level 1
            if rule.rule_type() == RuleType::Learned {
                self.rules.disable(rule_id);
                continue;
            }

            let Some(conflict_id) = self.decisions.decision_rule(literal) else {
                continue;
            };
            self.learned_pool.push(vec![rule_id, conflict_id]);

            let conflict_is_package = self
                .rules
                .get(conflict_id)
                .map(|r| r.rule_type() == RuleType::Package)
                .unwrap_or(false);

            if conflict_is_package {
                // the package structure wins; the job or rule alone is the
                // problem
                let cause = self.cause_for(rule_id);
                let mut problem = Problem::new();
                problem.add_cause(cause.clone());
                self.problems.add(problem);
                self.disable_cause(&cause);
                continue;
            }

            // conflicting job/update/feature assertions over one package:
            // disable them all and report them together
            log::debug!("conflicting assertions over package {}", package);
            let mut problem = Problem::new();
            let assertion_ids: Vec<RuleId> = self
                .rules
                .iter_types(&[RuleType::Job, RuleType::Update, RuleType::Feature])
                .filter(|r| {
                    r.is_enabled()
                        && !r.is_weak()
                        && r.is_assertion()
                        && literal_package(r.literals()[0]) == package
                })
                .map(|r| r.id())
                .collect();
            for assertion_id in assertion_ids {
                let cause = self.cause_for(assertion_id);
                problem.add_cause(cause.clone());
                self.disable_cause(&cause);
            }
            self.problems.add(problem);

            // some disabled rules may already have decided literals
            self.decisions.rewind_to(decision_start);
            rule_index = 0;
        }

        // weak assertions lose quietly
        let mut weak_index: usize = 0;
        while weak_index < self.rules.len() {
            let rule_id = weak_index as RuleId;
            weak_index += 1;

            let Some(rule) = self.rules.get(rule_id) else {
                continue;
            };
            if !rule.is_weak() || rule.is_disabled() || !rule.is_assertion() {
                continue;
            }

            let literal = rule.literals()[0];
            if self.decisions.undecided(literal_package(literal)) {
                self.decisions.decide(literal, 1, Some(rule_id));
                continue;
            }
            if self.decisions.satisfied(literal) {
                continue;
            }

            log::debug!("disabling conflicting weak rule {}", rule_id);
            let cause = self.cause_for(rule_id);
            self.disable_cause(&cause);
        }
    }

    // ------------------------------------------------------------------
    // propagation
    // ------------------------------------------------------------------

    /// Propagate all decisions past the cursor. Returns the conflicting
    /// rule if any clause became fully falsified.
    fn propagate(&mut self, level: u32) -> Option<RuleId> {
        while self.propagate_index < self.decisions.len() {
            let (literal, _) = self.decisions.at(self.propagate_index);
            self.propagate_index += 1;

            // the inverse of the decided literal just became false
            let false_literal = -literal;
            let watches: Vec<WatchNode> = self.watches.get_watches(false_literal).to_vec();

            for node in watches {
                let Some(rule) = self.rules.get(node.rule_id) else {
                    continue;
                };
                if rule.is_disabled() {
                    continue;
                }

                let other = node.other_watch;
                if self.decisions.satisfied(other) {
                    continue;
                }

                if rule.len() > 2 {
                    let replacement = rule.literals().iter().copied().find(|&l| {
                        l != other && l != false_literal && !self.decisions.conflict(l)
                    });
                    if let Some(replacement) = replacement {
                        self.watches
                            .move_watch(node.rule_id, false_literal, replacement, other);
                        continue;
                    }
                }

                if self.decisions.conflict(other) {
                    return Some(node.rule_id);
                }

                // unit clause: the other watch must become true
                log::trace!("propagating {} from rule {}", other, node.rule_id);
                self.decisions.decide(other, level, Some(node.rule_id));
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // conflict analysis
    // ------------------------------------------------------------------

    /// First-UIP conflict analysis.
    ///
    /// Resolves the conflicting clause against the reasons of its literals
    /// until exactly one literal of the current level remains. Returns the
    /// unit literal to decide after backjumping, the backjump level, the
    /// learned rule, and the index of its ancestry in the learned pool.
    fn analyze(&mut self, level: u32, conflict_rule: RuleId) -> Result<(Literal, u32, Rule, usize)> {
        let mut rule_id = conflict_rule;
        let mut rule_level: u32 = 1;
        let mut num: u32 = 0;
        let mut l1num: u32 = 0;
        let mut seen: HashSet<PackageId> = HashSet::new();
        let mut learned_literals: Vec<Literal> = vec![0];
        let mut decision_id = self.decisions.len();
        let mut ancestors: Vec<RuleId> = Vec::new();

        'resolution: loop {
            ancestors.push(rule_id);
            let literals: Vec<Literal> = self
                .rules
                .get(rule_id)
                .ok_or_else(|| SolverError::Internal(format!("unknown rule {} in analysis", rule_id)))?
                .literals()
                .to_vec();

            for lit in literals {
                // the satisfied literal of a reason clause is the decision
                // being explained, not part of the conflict
                if self.decisions.satisfied(lit) {
                    continue;
                }
                let package = literal_package(lit);
                if !seen.insert(package) {
                    continue;
                }

                let lit_level = self.decisions.decision_level(package);
                if lit_level == 1 {
                    l1num += 1;
                } else if lit_level == level {
                    num += 1;
                } else {
                    learned_literals.push(lit);
                    if lit_level > rule_level {
                        rule_level = lit_level;
                    }
                }
            }

            let mut l1retry = true;
            while l1retry {
                l1retry = false;

                if num == 0 {
                    if l1num == 0 {
                        return Err(SolverError::Internal(
                            "conflict analysis exhausted its literals".to_string(),
                        ));
                    }
                    l1num -= 1;
                    if l1num == 0 {
                        break 'resolution;
                    }
                }

                let literal = loop {
                    if decision_id == 0 {
                        return Err(SolverError::Internal(
                            "conflict analysis ran out of decisions".to_string(),
                        ));
                    }
                    decision_id -= 1;
                    let (lit, _) = self.decisions.at(decision_id);
                    if seen.contains(&literal_package(lit)) {
                        break lit;
                    }
                };
                seen.remove(&literal_package(literal));

                if num != 0 {
                    num -= 1;
                    if num == 0 {
                        // found the first unique implication point
                        learned_literals[0] = -literal;
                        if l1num == 0 {
                            break 'resolution;
                        }
                        // only level 1 literals are left; rescan for them
                        for &learned in learned_literals.iter().skip(1) {
                            seen.remove(&literal_package(learned));
                        }
                        l1num += 1;
                        l1retry = true;
                        continue;
                    }
                }

                let (_, reason) = self.decisions.at(decision_id);
                rule_id = reason.ok_or_else(|| {
                    SolverError::Internal("decision without reason in conflict analysis".to_string())
                })?;
            }
        }

        if learned_literals[0] == 0 {
            return Err(SolverError::Internal(
                "conflict analysis produced no unit literal".to_string(),
            ));
        }

        self.learned_pool.push(ancestors);
        let why = self.learned_pool.len() - 1;

        let unit = learned_literals[0];
        Ok((unit, rule_level, Rule::learned(learned_literals), why))
    }

    /// Place the second watch of a learned rule on the literal decided at
    /// the highest level, so backjumping wakes the rule up first.
    fn watch2_on_highest(&self, rule: &mut Rule) {
        if rule.len() < 3 {
            return;
        }
        let mut watch_level = 0;
        let mut best = 1;
        for (index, &lit) in rule.literals().iter().enumerate().skip(1) {
            let level = self.decisions.decision_level(literal_package(lit));
            if level > watch_level {
                watch_level = level;
                best = index;
            }
        }
        rule.literals_mut().swap(1, best);
    }

    /// Revert decisions and branches above the given level.
    fn revert(&mut self, level: u32) {
        self.decisions.revert_to_level(level);
        self.propagate_index = self.decisions.len();
        self.branches.retain(|b| b.level < level);
    }

    /// Decide a literal one level deeper and propagate to a fixed point,
    /// learning from every conflict on the way. Returns the new level;
    /// 0 means the problem is unsolvable at level 1.
    fn set_propagate_learn(
        &mut self,
        mut level: u32,
        literal: Literal,
        disable_rules: bool,
        reason: Option<RuleId>,
    ) -> Result<u32> {
        self.decision_steps += 1;
        if self.decision_steps > MAX_DECISION_STEPS {
            return Err(SolverError::Internal(
                "exceeded maximum decision steps".to_string(),
            ));
        }

        level += 1;
        self.decisions.decide(literal, level, reason);

        loop {
            let Some(conflict) = self.propagate(level) else {
                break;
            };

            if level == 1 {
                return Ok(if self.analyze_unsolvable(conflict, disable_rules)? {
                    1
                } else {
                    0
                });
            }

            let (unit, new_level, mut learned_rule, why) = self.analyze(level, conflict)?;
            if new_level == 0 || new_level >= level {
                return Err(SolverError::Internal(format!(
                    "bad backjump from level {} to {}",
                    level, new_level
                )));
            }
            log::debug!(
                "conflict on rule {}: learned {:?}, backjumping from {} to {}",
                conflict,
                learned_rule,
                level,
                new_level
            );

            level = new_level;
            self.revert(level);

            self.watch2_on_highest(&mut learned_rule);
            let before = self.rules.len();
            let learned_id = self.rules.add(learned_rule, RuleType::Learned);
            self.learned_why.insert(learned_id, why);
            if self.rules.len() > before {
                if let Some(rule) = self.rules.get(learned_id) {
                    self.watches.add_rule(rule);
                }
            }

            self.decisions.decide(unit, level, Some(learned_id));
        }

        Ok(level)
    }

    /// Order the candidates by policy preference, saving the also-rans as
    /// a branch, and decide the winner.
    fn select_and_install(
        &mut self,
        level: u32,
        decision_queue: Vec<Literal>,
        disable_rules: bool,
        rule_id: RuleId,
    ) -> Result<u32> {
        let literals = self.policy.select_preferred(self.pool, &decision_queue);
        let Some((&selected, alternatives)) = literals.split_first() else {
            return Err(SolverError::Internal("empty decision queue".to_string()));
        };

        if !alternatives.is_empty() {
            self.branches.push(Branch {
                literals: alternatives.to_vec(),
                level,
            });
        }

        self.set_propagate_learn(level, selected, disable_rules, Some(rule_id))
    }

    // ------------------------------------------------------------------
    // unsolvable analysis
    // ------------------------------------------------------------------

    /// Explain a conflict at level 1.
    ///
    /// Collects the jobs and rules behind the conflict into a problem. If
    /// a weak rule took part, the problem is retracted, only that rule is
    /// disabled and the solver restarts. With `disable_rules` every cause
    /// is disabled and the solver restarts. Returns whether solving can
    /// continue.
    fn analyze_unsolvable(&mut self, conflict_rule: RuleId, disable_rules: bool) -> Result<bool> {
        self.decision_steps += 1;
        if self.decision_steps > MAX_DECISION_STEPS {
            return Err(SolverError::Internal(
                "exceeded maximum recovery attempts".to_string(),
            ));
        }

        self.last_weak_why = None;

        let mut problem = Problem::new();
        problem.add_cause(self.cause_for(conflict_rule));
        self.analyze_unsolvable_rule(conflict_rule, &mut problem)?;

        let mut seen: HashSet<PackageId> = HashSet::new();
        if let Some(rule) = self.rules.get(conflict_rule) {
            for &lit in rule.literals() {
                seen.insert(literal_package(lit));
            }
        }

        // walk backward so a decision's reason is still ahead when the
        // rules depending on it mark its package as seen
        for offset in (0..self.decisions.len()).rev() {
            let (literal, reason) = self.decisions.at(offset);
            if !seen.contains(&literal_package(literal)) {
                continue;
            }
            let Some(why) = reason else {
                continue;
            };
            self.analyze_unsolvable_rule(why, &mut problem)?;
            if let Some(rule) = self.rules.get(why) {
                for &lit in rule.literals() {
                    seen.insert(literal_package(lit));
                }
            }
        }

        log::debug!(
            "unsolvable conflict on rule {}: {} cause(s)",
            conflict_rule,
            problem.causes().len()
        );
        self.problems.add(problem);

        if let Some(weak_id) = self.last_weak_why {
            // a weak rule was involved; drop it instead of reporting
            self.problems.pop();
            log::debug!("disabling weak rule {} and restarting", weak_id);
            self.rules.disable(weak_id);
            self.reset_solver();
            return Ok(true);
        }

        if disable_rules {
            let causes: Vec<ProblemCause> = self
                .problems
                .problems()
                .last()
                .map(|p| p.causes().to_vec())
                .unwrap_or_default();
            for cause in &causes {
                self.disable_cause(cause);
            }
            self.reset_solver();
            return Ok(true);
        }

        Ok(false)
    }

    /// Add a rule's contribution to a problem. Package rules are
    /// structure, not causes; learned rules recurse into their ancestors;
    /// everything else contributes its job or itself. Weak rules are
    /// remembered so the caller can retract them instead.
    fn analyze_unsolvable_rule(&mut self, rule_id: RuleId, problem: &mut Problem) -> Result<()> {
        let Some(rule) = self.rules.get(rule_id) else {
            return Ok(());
        };

        if rule.is_weak() {
            self.last_weak_why = Some(rule_id);
        }

        match rule.rule_type() {
            RuleType::Learned => {
                let why = *self.learned_why.get(&rule_id).ok_or_else(|| {
                    SolverError::Internal(format!("learned rule {} has no ancestry", rule_id))
                })?;
                let ancestors = self.learned_pool[why].clone();
                for ancestor in ancestors {
                    self.analyze_unsolvable_rule(ancestor, problem)?;
                }
            }
            RuleType::Package => {}
            _ => problem.add_cause(self.cause_for(rule_id)),
        }
        Ok(())
    }

    /// Re-enable learned rules whose ancestors are all enabled again and
    /// disable those with a disabled ancestor.
    fn enable_disable_learned_rules(&mut self) {
        for learned_id in self.rules.ids_of_type(RuleType::Learned) {
            let Some(&why) = self.learned_why.get(&learned_id) else {
                continue;
            };
            let any_disabled = self.learned_pool[why].iter().any(|&ancestor| {
                self.rules
                    .get(ancestor)
                    .map(|r| r.is_disabled())
                    .unwrap_or(false)
            });
            if any_disabled {
                self.rules.disable(learned_id);
            } else {
                self.rules.enable(learned_id);
            }
        }
    }

    /// Throw away all decisions and start over with the current set of
    /// enabled rules.
    fn reset_solver(&mut self) {
        log::debug!("resetting solver");
        self.decisions.reset();
        self.propagate_index = 0;
        self.branches.clear();
        self.enable_disable_learned_rules();
        self.make_assertion_rule_decisions();
    }

    // ------------------------------------------------------------------
    // main loop
    // ------------------------------------------------------------------

    fn run_sat(&mut self, disable_rules: bool, installed: &[PackageId]) -> Result<()> {
        self.propagate_index = 0;
        let mut level: u32 = 1;
        let mut system_level: u32 = level + 1;

        loop {
            if level == 1 {
                if let Some(conflict) = self.propagate(level) {
                    if self.analyze_unsolvable(conflict, disable_rules)? {
                        continue;
                    }
                    return Ok(());
                }
            }

            // job phase
            if level < system_level {
                let mut jumped_back = false;
                for rule_id in self.rules.ids_of_type(RuleType::Job) {
                    let Some(rule) = self.rules.get(rule_id) else {
                        continue;
                    };
                    if rule.is_disabled() {
                        continue;
                    }

                    let mut decision_queue: Vec<Literal> = Vec::new();
                    let mut none_satisfied = true;
                    for &literal in rule.literals() {
                        if self.decisions.satisfied(literal) {
                            none_satisfied = false;
                            break;
                        }
                        if literal > 0 && self.decisions.undecided(literal_package(literal)) {
                            decision_queue.push(literal);
                        }
                    }
                    if !none_satisfied || decision_queue.is_empty() {
                        continue;
                    }

                    // favour currently installed candidates unless an
                    // update job asks for the full candidate set
                    if !self.update_all
                        && decision_queue
                            .iter()
                            .any(|&l| self.is_installed(literal_package(l)))
                    {
                        let mut pruned: Vec<Literal> = Vec::new();
                        let mut keep_full = false;
                        for &literal in &decision_queue {
                            if self.is_installed(literal_package(literal)) {
                                pruned.push(literal);
                                if self.update_map.contains(&literal_package(literal)) {
                                    keep_full = true;
                                    break;
                                }
                            }
                        }
                        if !keep_full {
                            decision_queue = pruned;
                        }
                    }
                    if decision_queue.is_empty() {
                        continue;
                    }

                    let old_level = level;
                    level = self.select_and_install(level, decision_queue, disable_rules, rule_id)?;
                    if level == 0 {
                        return Ok(());
                    }
                    if level <= old_level {
                        jumped_back = true;
                        break;
                    }
                }
                system_level = level + 1;
                if jumped_back {
                    continue;
                }
            }

            // installed packages phase: pass 0 handles packages an update
            // or removal was requested for, pass 1 the rest
            if level < system_level {
                let mut pass = if self.update_map.is_empty() && self.clean_deps_map.is_empty() {
                    1
                } else {
                    0
                };
                'passes: while pass < 2 {
                    for &package in installed {
                        if self.decisions.decided(package) {
                            continue;
                        }
                        if pass == 0
                            && !self.update_map.contains(&package)
                            && !self.clean_deps_map.contains(&package)
                        {
                            continue;
                        }

                        let rule_id = self
                            .package_update_rule
                            .get(&package)
                            .copied()
                            .filter(|&id| self.rule_enabled(id))
                            .or_else(|| {
                                self.package_feature_rule
                                    .get(&package)
                                    .copied()
                                    .filter(|&id| self.rule_enabled(id))
                            });
                        let Some(rule_id) = rule_id else {
                            continue;
                        };

                        let mut decision_queue: Vec<Literal> = Vec::new();
                        if self.update_map.contains(&package)
                            || self.clean_deps_map.contains(&package)
                        {
                            let literals: Vec<Literal> = self
                                .rules
                                .get(rule_id)
                                .map(|r| r.literals().to_vec())
                                .unwrap_or_default();
                            for literal in literals {
                                // a requested removal never keeps the old version
                                if self.clean_deps_map.contains(&package) && literal == package {
                                    continue;
                                }
                                if self.decisions.undecided(literal_package(literal)) {
                                    decision_queue.push(literal);
                                }
                            }
                        }

                        let old_level = level;
                        if !decision_queue.is_empty() {
                            level = self.select_and_install(
                                level,
                                decision_queue,
                                disable_rules,
                                rule_id,
                            )?;
                        } else {
                            // nothing forces a change; keep the package
                            level = self.set_propagate_learn(
                                level,
                                package,
                                disable_rules,
                                Some(rule_id),
                            )?;
                        }
                        if level == 0 {
                            return Ok(());
                        }
                        if level <= old_level {
                            // a backjump invalidated this pass; redo it
                            continue 'passes;
                        }
                    }
                    pass += 1;
                }
                system_level = level + 1;
            }

            if level < system_level {
                system_level = level;
            }

            // general phase: any enabled rule with at least two open
            // choices gets a decision
            let mut rules_count = self.rules.len();
            let mut index: usize = 0;
            let mut visited: usize = 0;
            let mut jumped_back = false;
            while visited < rules_count {
                if index >= rules_count {
                    index = 0;
                }
                let rule_id = index as RuleId;
                index += 1;
                visited += 1;

                let Some(rule) = self.rules.get(rule_id) else {
                    continue;
                };
                if rule.is_disabled() {
                    continue;
                }

                let mut decision_queue: Vec<Literal> = Vec::new();
                let mut none_satisfied = true;
                for &literal in rule.literals() {
                    if self.decisions.satisfied(literal) {
                        none_satisfied = false;
                        break;
                    }
                    if literal > 0 && self.decisions.undecided(literal_package(literal)) {
                        decision_queue.push(literal);
                    }
                }
                // a single open choice is left to propagation
                if !none_satisfied || decision_queue.len() < 2 {
                    continue;
                }

                level = self.select_and_install(level, decision_queue, disable_rules, rule_id)?;
                if level == 0 {
                    return Ok(());
                }
                // a backjump below the job level (or a full reset back to
                // level 1) means earlier phases must run again
                if level == 1 || level < system_level {
                    jumped_back = true;
                    break;
                }

                // something changed; look at all rules again
                rules_count = self.rules.len();
                visited = 0;
            }
            if jumped_back {
                continue;
            }

            // minimization: revisit saved branches whose alternative could
            // shorten the decision stack
            if !self.branches.is_empty() {
                let mut chosen: Option<(usize, usize, Literal, u32)> = None;
                for branch_index in (0..self.branches.len()).rev() {
                    let branch = &self.branches[branch_index];
                    for (offset, &literal) in branch.literals.iter().enumerate() {
                        if literal > 0
                            && self.decisions.decision_level(literal_package(literal))
                                > branch.level + 1
                        {
                            chosen = Some((branch_index, offset, literal, branch.level));
                        }
                    }
                }

                if let Some((branch_index, offset, literal, branch_level)) = chosen {
                    log::debug!(
                        "minimizing: retrying alternative {} from level {}",
                        literal,
                        branch_level
                    );
                    self.branches[branch_index].literals[offset] = 0;
                    level = branch_level;
                    self.revert(level);
                    let reason = self.decisions.last_reason();
                    level = self.set_propagate_learn(level, literal, disable_rules, reason)?;
                    if level == 0 {
                        return Ok(());
                    }
                    continue;
                }
            }

            break;
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // transaction extraction
    // ------------------------------------------------------------------

    /// Walk the decision queue and emit an operation for every package
    /// whose decided state differs from its installed state. The list is
    /// reversed so removals that unblock come before the installs that
    /// depend on them.
    fn create_transaction(&self) -> Transaction {
        let mut operations = Vec::new();

        for &(literal, _) in self.decisions.queue() {
            let package_id = literal_package(literal);
            let Some(package) = self.pool.package(package_id) else {
                continue;
            };

            let installed = self.is_installed(package_id);
            if (literal > 0) == installed {
                continue;
            }

            if literal > 0 {
                operations.push(Operation::Install(package.clone()));
            } else {
                operations.push(Operation::Remove(package.clone()));
            }
        }

        operations.reverse();
        log::debug!("transaction with {} operation(s)", operations.len());
        Transaction::from_operations(operations)
    }
}
