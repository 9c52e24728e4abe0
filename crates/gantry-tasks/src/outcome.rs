//! Per-task outcomes and the run report

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::task::TaskId;

/// Why a task did not run its action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A run predicate evaluated to false
    ConditionFalse(String),
    /// A dependency failed, or was itself skipped because of a failure
    UpstreamFailure(TaskId),
    /// A dependency was skipped and skips are configured to block
    UpstreamSkipped(TaskId),
    /// Dry run; the action was not invoked
    DryRun,
}

impl SkipReason {
    /// The dependency responsible for an upstream skip
    pub fn dependency(&self) -> Option<&TaskId> {
        match self {
            Self::UpstreamFailure(id) | Self::UpstreamSkipped(id) => Some(id),
            _ => None,
        }
    }

    /// Longer form including the condition or dependency
    pub fn detail(&self) -> String {
        match self {
            Self::ConditionFalse(condition) => format!("condition not met: {}", condition),
            Self::UpstreamFailure(dep) => format!("upstream failure in {}", dep),
            Self::UpstreamSkipped(dep) => format!("upstream {} was skipped", dep),
            Self::DryRun => "dry run".to_string(),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConditionFalse(_) => f.write_str("condition not met"),
            Self::UpstreamFailure(_) => f.write_str("upstream failure"),
            Self::UpstreamSkipped(_) => f.write_str("upstream skipped"),
            Self::DryRun => f.write_str("dry run"),
        }
    }
}

/// Final state of a task after a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Not part of the plan, or the run was cancelled first
    NotRun,
    /// Reached, but the action was not invoked
    Skipped { reason: SkipReason },
    /// Action completed successfully
    Succeeded,
    /// Action reported an error
    Failed { error: String },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// The skip reason, if skipped
    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            Self::Skipped { reason } => Some(reason),
            _ => None,
        }
    }

    /// Short label for tables and summaries
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotRun => "not run",
            Self::Skipped { .. } => "skipped",
            Self::Succeeded => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped { reason } => write!(f, "skipped ({})", reason),
            Self::Failed { error } => write!(f, "failed: {}", error),
            other => f.write_str(other.label()),
        }
    }
}

/// Result of a single task in a run
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    /// Task that was considered
    pub id: TaskId,
    /// What happened to it
    #[serde(flatten)]
    pub outcome: TaskOutcome,
    /// Time spent in the action (zero when it did not run)
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Outcome counts for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub not_run: usize,
}

/// Immutable record of an orchestrator run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Linear order the plan was executed in
    pub order: Vec<TaskId>,
    /// Every registered task: planned tasks in execution order, then the rest
    pub results: Vec<TaskResult>,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Wall time of the whole run
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    /// Whether the run was cancelled before finishing the plan
    pub cancelled: bool,
}

impl RunReport {
    /// Look up a task's result
    pub fn result(&self, name: &str) -> Option<&TaskResult> {
        self.results.iter().find(|r| r.id.as_str() == name)
    }

    /// Look up a task's outcome
    pub fn outcome(&self, name: &str) -> Option<&TaskOutcome> {
        self.result(name).map(|r| &r.outcome)
    }

    /// Outcomes of the planned tasks, in execution order
    pub fn outcomes(&self) -> Vec<&TaskOutcome> {
        self.order
            .iter()
            .filter_map(|id| self.outcome(id.as_str()))
            .collect()
    }

    /// Tasks that failed, in execution order
    pub fn failed(&self) -> impl Iterator<Item = &TaskResult> {
        self.results.iter().filter(|r| r.outcome.is_failed())
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            total: self.results.len(),
            ..Default::default()
        };
        for result in &self.results {
            match result.outcome {
                TaskOutcome::NotRun => summary.not_run += 1,
                TaskOutcome::Skipped { .. } => summary.skipped += 1,
                TaskOutcome::Succeeded => summary.succeeded += 1,
                TaskOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }

    /// True when no task failed and the run was not cancelled
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.failed().next().is_none()
    }

    /// Serialize the report as pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcomes: Vec<(&str, TaskOutcome)>) -> RunReport {
        RunReport {
            order: outcomes.iter().map(|(n, _)| TaskId::new(*n)).collect(),
            results: outcomes
                .into_iter()
                .map(|(n, outcome)| TaskResult {
                    id: TaskId::new(n),
                    outcome,
                    duration: Duration::from_millis(1500),
                })
                .collect(),
            started_at: Utc::now(),
            duration: Duration::from_secs(2),
            cancelled: false,
        }
    }

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::UpstreamFailure(TaskId::new("compile"));
        assert_eq!(reason.to_string(), "upstream failure");
        assert_eq!(reason.detail(), "upstream failure in compile");
        assert_eq!(reason.dependency(), Some(&TaskId::new("compile")));
        assert!(SkipReason::DryRun.dependency().is_none());
    }

    #[test]
    fn test_outcome_predicates() {
        assert!(TaskOutcome::Succeeded.is_success());
        assert!(TaskOutcome::Failed {
            error: "x".into()
        }
        .is_failed());
        let skipped = TaskOutcome::Skipped {
            reason: SkipReason::DryRun,
        };
        assert!(skipped.is_skipped());
        assert_eq!(skipped.skip_reason(), Some(&SkipReason::DryRun));
        assert_eq!(skipped.to_string(), "skipped (dry run)");
        assert_eq!(TaskOutcome::NotRun.label(), "not run");
    }

    #[test]
    fn test_summary_and_success() {
        let ok = report(vec![
            ("restore", TaskOutcome::Succeeded),
            (
                "push",
                TaskOutcome::Skipped {
                    reason: SkipReason::ConditionFalse("$NUGET_API_KEY is set".into()),
                },
            ),
            ("docs", TaskOutcome::NotRun),
        ]);
        assert!(ok.is_success());
        assert_eq!(
            ok.summary(),
            RunSummary {
                total: 3,
                succeeded: 1,
                failed: 0,
                skipped: 1,
                not_run: 1,
            }
        );

        let failed = report(vec![(
            "compile",
            TaskOutcome::Failed {
                error: "exit 1".into(),
            },
        )]);
        assert!(!failed.is_success());
        assert_eq!(failed.failed().count(), 1);
    }

    #[test]
    fn test_cancelled_is_not_success() {
        let mut r = report(vec![("restore", TaskOutcome::Succeeded)]);
        r.cancelled = true;
        assert!(!r.is_success());
    }

    #[test]
    fn test_report_json() {
        let r = report(vec![
            ("compile", TaskOutcome::Failed { error: "boom".into() }),
            (
                "pack",
                TaskOutcome::Skipped {
                    reason: SkipReason::UpstreamFailure(TaskId::new("compile")),
                },
            ),
        ]);
        let value: serde_json::Value = serde_json::from_str(&r.to_json().unwrap()).unwrap();

        assert_eq!(value["order"][0], "compile");
        assert_eq!(value["results"][0]["status"], "failed");
        assert_eq!(value["results"][0]["error"], "boom");
        assert_eq!(value["results"][0]["duration_ms"], 1500);
        assert_eq!(value["results"][1]["status"], "skipped");
        assert_eq!(value["results"][1]["reason"]["upstream_failure"], "compile");
        assert_eq!(value["duration_ms"], 2000);
    }
}
