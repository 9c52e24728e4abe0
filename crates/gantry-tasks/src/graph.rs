//! Task graph construction and ordering

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::task::{Task, TaskId};

/// Structural errors, raised before any action executes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// A task with this name is already registered
    #[error("Task '{0}' is already registered")]
    DuplicateTask(TaskId),

    /// A dependency names a task that was never registered
    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: TaskId, dependency: TaskId },

    /// The dependency edges contain a cycle
    #[error("Cyclic dependency detected among tasks: {}", format_cycle(.0))]
    CyclicDependency(Vec<TaskId>),

    /// A requested target does not exist
    #[error("Unknown task '{0}'")]
    UnknownTask(String),
}

fn format_cycle(members: &[TaskId]) -> String {
    let mut names: Vec<&str> = members.iter().map(TaskId::as_str).collect();
    if let Some(first) = names.first().copied() {
        names.push(first);
    }
    names.join(" -> ")
}

/// The set of registered tasks and their dependency edges
#[derive(Debug, Default)]
pub struct TaskGraph {
    /// Tasks in registration order
    tasks: Vec<Task>,
    /// Task name to registration index
    index: HashMap<TaskId, usize>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Dependencies may name tasks registered later.
    ///
    /// Fails without modifying the graph if the name is taken.
    pub fn register(&mut self, task: Task) -> Result<(), GraphError> {
        if self.index.contains_key(task.id()) {
            return Err(GraphError::DuplicateTask(task.id().clone()));
        }
        debug!(task = %task.id(), deps = task.dependencies().len(), "registering task");
        self.index.insert(task.id().clone(), self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    /// Get a task by name
    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tasks in registration order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks that list `name` as a direct dependency, in registration order
    pub fn dependents(&self, name: &str) -> Vec<&TaskId> {
        self.tasks
            .iter()
            .filter(|t| t.dependencies().iter().any(|d| d.as_str() == name))
            .map(Task::id)
            .collect()
    }

    /// Check every dependency exists and the graph is acyclic, returning the
    /// full linearization.
    #[instrument(skip_all, fields(task_count = self.tasks.len()))]
    pub fn finalize(&self) -> Result<Vec<TaskId>, GraphError> {
        self.check_dependencies()?;
        let order = self.topological_sort()?;
        info!(task_count = order.len(), "task graph validated");
        Ok(order.into_iter().map(|i| self.tasks[i].id().clone()).collect())
    }

    /// Build an execution plan for the given targets and everything they
    /// depend on. An empty target list selects every task.
    #[instrument(skip_all, fields(targets = targets.len()))]
    pub fn plan<S: AsRef<str>>(&self, targets: &[S]) -> Result<ExecutionPlan, GraphError> {
        let order = self.finalize()?;

        let mut target_ids = Vec::new();
        for target in targets {
            let name = target.as_ref();
            match self.index.get_key_value(name) {
                Some((id, _)) => {
                    if !target_ids.contains(id) {
                        target_ids.push(id.clone());
                    }
                }
                None => return Err(GraphError::UnknownTask(name.to_string())),
            }
        }

        if target_ids.is_empty() {
            return Ok(ExecutionPlan {
                targets: order.clone(),
                order,
            });
        }

        let selected = self.dependency_closure(&target_ids);
        let order: Vec<TaskId> = order
            .into_iter()
            .filter(|id| selected.contains(id))
            .collect();

        debug!(planned = order.len(), "execution plan built");
        Ok(ExecutionPlan {
            order,
            targets: target_ids,
        })
    }

    fn check_dependencies(&self) -> Result<(), GraphError> {
        for task in &self.tasks {
            for dep in task.dependencies() {
                if !self.index.contains_key(dep) {
                    return Err(GraphError::UnknownDependency {
                        task: task.id().clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Kahn's algorithm; among ready tasks the earliest registered goes first.
    fn topological_sort(&self) -> Result<Vec<usize>, GraphError> {
        let n = self.tasks.len();
        let mut in_degree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (i, task) in self.tasks.iter().enumerate() {
            for dep in task.dependencies() {
                let d = self.index[dep];
                in_degree[i] += 1;
                dependents[d].push(i);
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, deg)| **deg == 0)
            .map(|(i, _)| Reverse(i))
            .collect();
        let mut sorted = Vec::with_capacity(n);

        while let Some(Reverse(i)) = ready.pop() {
            sorted.push(i);
            for &dependent in &dependents[i] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.push(Reverse(dependent));
                }
            }
        }

        if sorted.len() != n {
            let placed: HashSet<usize> = sorted.iter().copied().collect();
            return Err(GraphError::CyclicDependency(self.find_cycle(&placed)));
        }

        Ok(sorted)
    }

    /// Every unplaced task still has an unplaced dependency, so following
    /// those edges from any unplaced task must revisit a node.
    fn find_cycle(&self, placed: &HashSet<usize>) -> Vec<TaskId> {
        let Some(start) = (0..self.tasks.len()).find(|i| !placed.contains(i)) else {
            return Vec::new();
        };

        let mut path: Vec<usize> = Vec::new();
        let mut position: HashMap<usize, usize> = HashMap::new();
        let mut current = start;

        loop {
            if let Some(&pos) = position.get(&current) {
                let mut cycle = path.split_off(pos);
                if let Some(min_pos) = cycle
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, i)| **i)
                    .map(|(p, _)| p)
                {
                    cycle.rotate_left(min_pos);
                }
                return cycle
                    .into_iter()
                    .map(|i| self.tasks[i].id().clone())
                    .collect();
            }

            position.insert(current, path.len());
            path.push(current);

            let next = self.tasks[current]
                .dependencies()
                .iter()
                .map(|dep| self.index[dep])
                .find(|i| !placed.contains(i));
            match next {
                Some(i) => current = i,
                None => return path.into_iter().map(|i| self.tasks[i].id().clone()).collect(),
            }
        }
    }

    /// Targets plus all their transitive dependencies
    fn dependency_closure(&self, targets: &[TaskId]) -> HashSet<TaskId> {
        let mut selected: HashSet<TaskId> = HashSet::new();
        let mut stack: Vec<&TaskId> = targets.iter().collect();

        while let Some(id) = stack.pop() {
            if !selected.insert(id.clone()) {
                continue;
            }
            if let Some(task) = self.get(id.as_str()) {
                stack.extend(task.dependencies().iter());
            }
        }

        selected
    }

    /// Get a human-readable summary of an execution plan
    pub fn execution_plan(&self, plan: &ExecutionPlan) -> String {
        let mut out = String::new();
        for (i, id) in plan.order.iter().enumerate() {
            let Some(task) = self.get(id.as_str()) else {
                continue;
            };
            let action = task.action().describe();
            let deps: Vec<&str> = task.dependencies().iter().map(TaskId::as_str).collect();
            if deps.is_empty() {
                out.push_str(&format!("{:>3}. {} -> {}\n", i + 1, id, action));
            } else {
                out.push_str(&format!(
                    "{:>3}. {} -> {} (after: {})\n",
                    i + 1,
                    id,
                    action,
                    deps.join(", ")
                ));
            }
        }
        out
    }
}

/// A linearized selection of tasks to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    /// Tasks to execute, dependencies first
    pub order: Vec<TaskId>,
    /// The tasks that were asked for
    pub targets: Vec<TaskId>,
}

impl ExecutionPlan {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.order.contains(id)
    }
}
