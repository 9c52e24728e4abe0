//! Sequential executor over a validated task graph

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::context::BuildContext;
use crate::graph::{ExecutionPlan, GraphError, TaskGraph};
use crate::outcome::{RunReport, SkipReason, TaskOutcome, TaskResult};
use crate::reporter::{TaskEvent, TaskReporter};
use crate::task::{FailurePolicy, Task, TaskId};

/// How dependents treat a dependency skipped by its own conditions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SkipPolicy {
    /// A skipped dependency counts as satisfied
    #[default]
    Satisfied,
    /// A skipped dependency blocks its dependents
    Blocking,
}

/// Cooperative cancellation, checked between tasks
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; the task currently running is allowed to finish
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options for a run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// How predicate skips affect dependents
    pub skip_policy: SkipPolicy,
    /// Treat every task as proceed-after-failure
    pub proceed_after_failure: bool,
    /// Evaluate predicates but do not invoke actions
    pub dry_run: bool,
    /// Checked before each task
    pub cancellation: CancellationToken,
}

/// Executes task graphs one task at a time in dependency order
pub struct Orchestrator {
    options: RunOptions,
    reporter: Arc<dyn TaskReporter>,
}

impl Orchestrator {
    /// Create a new orchestrator
    pub fn new(options: RunOptions, reporter: Arc<dyn TaskReporter>) -> Self {
        Self { options, reporter }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Validate the graph, plan the targets and run them.
    ///
    /// Structural errors are returned before any action executes.
    pub fn run<S: AsRef<str>>(
        &self,
        graph: &TaskGraph,
        targets: &[S],
        ctx: &BuildContext,
    ) -> Result<RunReport, GraphError> {
        let plan = graph.plan(targets)?;
        Ok(self.execute(graph, &plan, ctx))
    }

    /// Execute a plan previously computed from `graph`
    pub fn execute(&self, graph: &TaskGraph, plan: &ExecutionPlan, ctx: &BuildContext) -> RunReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results: HashMap<TaskId, TaskResult> = HashMap::new();
        let mut cancelled = false;

        info!(tasks = plan.len(), dry_run = self.options.dry_run, "starting run");
        self.reporter.report(&TaskEvent::PlanReady {
            order: plan.order.clone(),
        });

        for (position, id) in plan.order.iter().enumerate() {
            if self.options.cancellation.is_cancelled() {
                let remaining = plan.order[position..].to_vec();
                warn!(remaining = remaining.len(), "run cancelled");
                self.reporter.report(&TaskEvent::Cancelled { remaining });
                cancelled = true;
                break;
            }

            let Some(task) = graph.get(id.as_str()) else {
                continue;
            };
            let result = self.execute_task(task, &results, ctx);
            results.insert(id.clone(), result);
        }

        // Planned tasks in execution order, then everything else as NotRun
        let ordered: Vec<TaskResult> = plan
            .order
            .iter()
            .chain(graph.tasks().map(Task::id).filter(|id| !plan.contains(id)))
            .map(|id| {
                results.remove(id).unwrap_or_else(|| TaskResult {
                    id: id.clone(),
                    outcome: TaskOutcome::NotRun,
                    duration: Duration::ZERO,
                })
            })
            .collect();

        let report = RunReport {
            order: plan.order.clone(),
            results: ordered,
            started_at,
            duration: start.elapsed(),
            cancelled,
        };

        self.reporter.report(&TaskEvent::AllCompleted {
            summary: report.summary(),
            duration: report.duration,
        });

        report
    }

    fn execute_task(
        &self,
        task: &Task,
        results: &HashMap<TaskId, TaskResult>,
        ctx: &BuildContext,
    ) -> TaskResult {
        let id = task.id();

        if let Some(reason) = self.skip_reason(task, results, ctx) {
            debug!(task = %id, reason = %reason.detail(), "skipping task");
            self.reporter.report(&TaskEvent::Skipped {
                id: id.clone(),
                reason: reason.clone(),
            });
            return TaskResult {
                id: id.clone(),
                outcome: TaskOutcome::Skipped { reason },
                duration: Duration::ZERO,
            };
        }

        self.reporter.report(&TaskEvent::Started {
            id: id.clone(),
            action: task.action().describe(),
        });

        let start = Instant::now();
        let outcome = task.action().run(ctx);
        let duration = start.elapsed();

        match outcome {
            Ok(()) => {
                self.reporter.report(&TaskEvent::Completed {
                    id: id.clone(),
                    duration,
                });
                TaskResult {
                    id: id.clone(),
                    outcome: TaskOutcome::Succeeded,
                    duration,
                }
            }
            Err(e) => {
                let error = e.to_string();
                self.reporter.report(&TaskEvent::Failed {
                    id: id.clone(),
                    duration,
                    error: error.clone(),
                });
                TaskResult {
                    id: id.clone(),
                    outcome: TaskOutcome::Failed { error },
                    duration,
                }
            }
        }
    }

    /// Decide whether a task is skipped: predicates first, then dependencies,
    /// then dry run.
    fn skip_reason(
        &self,
        task: &Task,
        results: &HashMap<TaskId, TaskResult>,
        ctx: &BuildContext,
    ) -> Option<SkipReason> {
        if let Some(predicate) = task.predicates().iter().find(|p| !p.evaluate(ctx)) {
            return Some(SkipReason::ConditionFalse(predicate.describe()));
        }

        let proceed = self.options.proceed_after_failure
            || task.failure_policy() == FailurePolicy::ProceedAfterFailure;

        for dep in task.dependencies() {
            let Some(outcome) = results.get(dep).map(|r| &r.outcome) else {
                continue;
            };
            match outcome {
                TaskOutcome::Failed { .. }
                | TaskOutcome::Skipped {
                    reason: SkipReason::UpstreamFailure(_),
                } if !proceed => {
                    return Some(SkipReason::UpstreamFailure(dep.clone()));
                }
                TaskOutcome::Skipped {
                    reason: SkipReason::ConditionFalse(_) | SkipReason::UpstreamSkipped(_),
                } if self.options.skip_policy == SkipPolicy::Blocking => {
                    return Some(SkipReason::UpstreamSkipped(dep.clone()));
                }
                _ => {}
            }
        }

        if self.options.dry_run {
            return Some(SkipReason::DryRun);
        }

        None
    }
}
