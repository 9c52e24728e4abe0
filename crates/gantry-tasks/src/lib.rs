//! Gantry Tasks - Task graph orchestration engine
//!
//! Tasks are registered into a [`TaskGraph`], which validates dependencies,
//! rejects cycles and produces a deterministic execution order. The
//! [`Orchestrator`] walks that order one task at a time, evaluating run
//! predicates, cascading failures to dependents and recording a
//! [`RunReport`].

pub mod action;
pub mod context;
pub mod graph;
pub mod orchestrator;
pub mod outcome;
pub mod pipeline;
pub mod predicate;
pub mod reporter;
pub mod task;

pub use action::{ActionError, NoopAction, ShellAction, TaskAction};
pub use context::BuildContext;
pub use graph::{ExecutionPlan, GraphError, TaskGraph};
pub use orchestrator::{CancellationToken, Orchestrator, RunOptions, SkipPolicy};
pub use outcome::{RunReport, RunSummary, SkipReason, TaskOutcome, TaskResult};
pub use pipeline::{build_graph, run_options, PipelineError};
pub use predicate::{Predicate, PredicateError, RunPredicate};
pub use reporter::{CollectingReporter, TaskEvent, TaskReporter, TaskReporterRegistry, TracingReporter};
pub use task::{FailurePolicy, Task, TaskId};
