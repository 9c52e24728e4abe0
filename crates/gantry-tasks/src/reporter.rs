//! Task execution reporting

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::outcome::{RunSummary, SkipReason};
use crate::task::TaskId;

/// Events emitted during a run
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// The plan was computed and execution is about to start
    PlanReady { order: Vec<TaskId> },
    /// A task's action is starting
    Started { id: TaskId, action: String },
    /// A task completed successfully
    Completed { id: TaskId, duration: Duration },
    /// A task failed
    Failed {
        id: TaskId,
        duration: Duration,
        error: String,
    },
    /// A task was skipped without running its action
    Skipped { id: TaskId, reason: SkipReason },
    /// The run was cancelled; the listed tasks will not run
    Cancelled { remaining: Vec<TaskId> },
    /// All planned tasks were processed
    AllCompleted {
        summary: RunSummary,
        duration: Duration,
    },
}

/// Trait for reporting task execution progress
pub trait TaskReporter: Send + Sync {
    /// Handle a task event
    fn report(&self, event: &TaskEvent);
}

/// Simple reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl TaskReporter for TracingReporter {
    fn report(&self, event: &TaskEvent) {
        match event {
            TaskEvent::PlanReady { order } => {
                let names: Vec<&str> = order.iter().map(TaskId::as_str).collect();
                tracing::info!("Execution plan: {}", names.join(" -> "));
            }
            TaskEvent::Started { id, action } => {
                tracing::info!("Starting {}: {}", id, action);
            }
            TaskEvent::Completed { id, duration } => {
                tracing::info!("{} completed in {:.1}s", id, duration.as_secs_f64());
            }
            TaskEvent::Failed {
                id,
                duration,
                error,
            } => {
                tracing::error!("{} failed after {:.1}s: {}", id, duration.as_secs_f64(), error);
            }
            TaskEvent::Skipped { id, reason } => {
                tracing::info!("{} skipped: {}", id, reason.detail());
            }
            TaskEvent::Cancelled { remaining } => {
                tracing::warn!("Run cancelled, {} task(s) not run", remaining.len());
            }
            TaskEvent::AllCompleted { summary, duration } => {
                tracing::info!(
                    "All tasks complete: {} succeeded, {} failed, {} skipped, {} not run ({:.1}s)",
                    summary.succeeded,
                    summary.failed,
                    summary.skipped,
                    summary.not_run,
                    duration.as_secs_f64()
                );
            }
        }
    }
}

/// Reporter that collects events for later inspection (useful for testing)
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<TaskEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<TaskEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Names of tasks whose action started, in order
    pub fn started(&self) -> Vec<TaskId> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TaskEvent::Started { id, .. } => Some(id),
                _ => None,
            })
            .collect()
    }
}

impl TaskReporter for CollectingReporter {
    fn report(&self, event: &TaskEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Registry of task reporters
pub struct TaskReporterRegistry {
    reporters: Vec<Arc<dyn TaskReporter>>,
}

impl TaskReporterRegistry {
    pub fn new() -> Self {
        Self {
            reporters: vec![Arc::new(TracingReporter)],
        }
    }

    pub fn empty() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }

    pub fn register<R: TaskReporter + 'static>(&mut self, reporter: R) {
        self.reporters.push(Arc::new(reporter));
    }

    /// Register a reporter the caller keeps a handle to
    pub fn register_shared(&mut self, reporter: Arc<dyn TaskReporter>) {
        self.reporters.push(reporter);
    }

    pub fn all(&self) -> &[Arc<dyn TaskReporter>] {
        &self.reporters
    }

    /// Broadcast an event to all registered reporters
    pub fn broadcast(&self, event: &TaskEvent) {
        for reporter in &self.reporters {
            reporter.report(event);
        }
    }
}

impl Default for TaskReporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskReporter for TaskReporterRegistry {
    fn report(&self, event: &TaskEvent) {
        self.broadcast(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_reporter() {
        let reporter = CollectingReporter::default();
        let id = TaskId::new("compile");

        reporter.report(&TaskEvent::Started {
            id: id.clone(),
            action: "dotnet build".to_string(),
        });
        reporter.report(&TaskEvent::Completed {
            id: id.clone(),
            duration: Duration::from_secs(5),
        });

        assert_eq!(reporter.events().len(), 2);
        assert_eq!(reporter.started(), vec![id]);
    }

    #[test]
    fn test_tracing_reporter() {
        let reporter = TracingReporter;
        let id = TaskId::new("push");

        // Just verify it doesn't panic
        reporter.report(&TaskEvent::Skipped {
            id: id.clone(),
            reason: SkipReason::ConditionFalse("$NUGET_API_KEY is set".to_string()),
        });
        reporter.report(&TaskEvent::AllCompleted {
            summary: RunSummary::default(),
            duration: Duration::from_secs(1),
        });
    }

    #[test]
    fn test_empty_registry() {
        let registry = TaskReporterRegistry::empty();
        assert!(registry.all().is_empty());
        assert_eq!(TaskReporterRegistry::default().all().len(), 1);
    }

    #[test]
    fn test_broadcast() {
        let collecting = Arc::new(CollectingReporter::default());
        let mut registry = TaskReporterRegistry::empty();
        registry.register_shared(collecting.clone());

        registry.report(&TaskEvent::Cancelled {
            remaining: vec![TaskId::new("pack")],
        });

        assert_eq!(collecting.events().len(), 1);
    }

    #[test]
    fn test_register() {
        let mut registry = TaskReporterRegistry::empty();
        registry.register(TracingReporter);
        registry.register(CollectingReporter::default());
        assert_eq!(registry.all().len(), 2);
    }
}
