//! Task types and definitions

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::{NoopAction, TaskAction};
use crate::context::BuildContext;
use crate::predicate::{Predicate, RunPredicate};

/// Unique identifier for a task within a graph
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Create a new task ID
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The task name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// What happens to a task when one of its dependencies fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Skip the task when a dependency failed
    #[default]
    AbortDownstream,
    /// Run the task even when a dependency failed
    ProceedAfterFailure,
}

/// A registered unit of work
pub struct Task {
    id: TaskId,
    description: Option<String>,
    dependencies: Vec<TaskId>,
    predicates: Vec<Box<dyn RunPredicate>>,
    action: Box<dyn TaskAction>,
    failure_policy: FailurePolicy,
}

impl Task {
    /// Create a task that does nothing until an action is attached
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(name),
            description: None,
            dependencies: Vec::new(),
            predicates: Vec::new(),
            action: Box::new(NoopAction),
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a dependency; repeated names are ignored
    pub fn with_depends_on(mut self, dep: impl Into<TaskId>) -> Self {
        let dep = dep.into();
        if !self.dependencies.contains(&dep) {
            self.dependencies.push(dep);
        }
        self
    }

    /// Add a run predicate, evaluated at run time in the order added
    pub fn with_predicate(mut self, predicate: impl RunPredicate + 'static) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    /// Add a closure run predicate
    pub fn only_when<F>(self, description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&BuildContext) -> bool + Send + Sync + 'static,
    {
        self.with_predicate(Predicate::new(description, check))
    }

    /// Set the action
    pub fn with_action(mut self, action: impl TaskAction + 'static) -> Self {
        self.action = Box::new(action);
        self
    }

    /// Set the failure policy
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Shorthand for [`FailurePolicy::ProceedAfterFailure`]
    pub fn proceed_after_failure(self) -> Self {
        self.with_failure_policy(FailurePolicy::ProceedAfterFailure)
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn dependencies(&self) -> &[TaskId] {
        &self.dependencies
    }

    pub fn predicates(&self) -> &[Box<dyn RunPredicate>] {
        &self.predicates
    }

    pub fn action(&self) -> &dyn TaskAction {
        self.action.as_ref()
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let predicates: Vec<String> = self.predicates.iter().map(|p| p.describe()).collect();
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("dependencies", &self.dependencies)
            .field("predicates", &predicates)
            .field("action", &self.action.describe())
            .field("failure_policy", &self.failure_policy)
            .finish()
    }
}
