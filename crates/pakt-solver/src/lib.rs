//! SAT-based dependency resolver for package ecosystems.
//!
//! Given the currently installed packages, candidate packages from one or
//! more repositories, and a request of user jobs (install, remove, lock,
//! update, fix), the solver computes a transaction: an ordered list of
//! package installs and removals that satisfies every dependency and
//! conflict constraint, or a set of problems explaining why none exists.
//!
//! # Architecture
//!
//! - [`Pool`]: registry of all candidate packages with lookup by
//!   name/constraint
//! - [`Request`]: the user jobs to resolve
//! - [`RuleSet`]: typed collection of SAT clauses representing
//!   dependencies and jobs
//! - [`Solver`]: CDCL (Conflict-Driven Clause Learning) search over the
//!   rules, using two-literal watches
//! - [`Policy`]: pluggable candidate preference and update enumeration
//!
//! # Example
//!
//! ```ignore
//! use pakt_solver::{DefaultPolicy, Pool, Repository, Request, Solver};
//!
//! let mut pool = Pool::new();
//! let installed = pool.add_repository(installed_repo);
//! pool.add_repository(remote_repo);
//!
//! let mut request = Request::new();
//! request.install("foo", pool.what_provides("foo", None));
//!
//! let policy = DefaultPolicy::new();
//! let solver = Solver::new(&pool, &policy, installed);
//!
//! match solver.solve(&request) {
//!     Ok(transaction) => println!("{} operation(s)", transaction.len()),
//!     Err(err) => println!("{}", err),
//! }
//! ```

pub mod error;
pub mod package;
pub mod policy;
pub mod pool;
pub mod problem;
pub mod repository;
pub mod request;
pub mod rule;
pub mod rule_set;
pub mod solver;
pub mod transaction;

mod decisions;
mod watch_graph;


pub use error::{Result, SolverError};
pub use package::{Link, Package};
pub use policy::{DefaultPolicy, Policy};
pub use pool::{PackageId, Pool};
pub use problem::{Problem, ProblemCause, ProblemRule, ProblemSet};
pub use repository::{RepoId, Repository};
pub use request::{Job, JobCmd, JobId, Request};
pub use rule::{Literal, Rule, RuleId, RuleReason, RuleType};
pub use rule_set::RuleSet;
pub use solver::Solver;
pub use transaction::{Operation, Transaction};
