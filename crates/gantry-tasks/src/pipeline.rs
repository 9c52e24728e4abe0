//! Building a task graph from declarative configuration

use tracing::debug;

use gantry_core::config::{Config, RunConfig, TaskConfig};

use crate::action::ShellAction;
use crate::graph::{GraphError, TaskGraph};
use crate::orchestrator::{RunOptions, SkipPolicy};
use crate::predicate::{Predicate, PredicateError};
use crate::task::Task;

/// Errors turning a config into a graph
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Task '{task}' has an invalid condition: {source}")]
    Condition {
        task: String,
        #[source]
        source: PredicateError,
    },
}

/// Register every configured task, in file order
pub fn build_graph(config: &Config) -> Result<TaskGraph, PipelineError> {
    let mut graph = TaskGraph::new();
    for task_config in &config.tasks {
        graph.register(build_task(task_config)?)?;
    }
    debug!(tasks = graph.len(), "built task graph from config");
    Ok(graph)
}

fn build_task(config: &TaskConfig) -> Result<Task, PipelineError> {
    let mut task = Task::new(config.name.as_str());

    if let Some(description) = &config.description {
        task = task.with_description(description.as_str());
    }
    for dep in &config.depends_on {
        task = task.with_depends_on(dep.as_str());
    }
    for condition in &config.conditions {
        let predicate =
            Predicate::from_condition(condition).map_err(|source| PipelineError::Condition {
                task: config.name.clone(),
                source,
            })?;
        task = task.with_predicate(predicate);
    }
    if config.proceed_after_failure {
        task = task.proceed_after_failure();
    }

    if let Some(command) = &config.command {
        let mut action = ShellAction::new(config.name.as_str(), command.as_str());
        for (key, value) in &config.env {
            action = action.with_env(key.as_str(), value.as_str());
        }
        if let Some(cwd) = &config.cwd {
            action = action.with_cwd(cwd.clone());
        }
        task = task.with_action(action);
    }

    Ok(task)
}

/// Run options from the `[run]` section
pub fn run_options(config: &RunConfig) -> RunOptions {
    RunOptions {
        skip_policy: if config.skipped_blocks_dependents {
            SkipPolicy::Blocking
        } else {
            SkipPolicy::Satisfied
        },
        proceed_after_failure: config.proceed_after_failure,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BuildContext;
    use crate::task::FailurePolicy;
    use gantry_core::config::defaults::DEFAULT_CONFIG_TEMPLATE_TOML;
    use gantry_core::config::Condition;

    fn template() -> Config {
        toml::from_str(DEFAULT_CONFIG_TEMPLATE_TOML).unwrap()
    }

    #[test]
    fn test_build_graph_from_template() {
        let graph = build_graph(&template()).unwrap();
        let order: Vec<String> = graph
            .finalize()
            .unwrap()
            .iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(order, vec!["restore", "compile", "pack", "push"]);

        let push = graph.get("push").unwrap();
        assert_eq!(push.failure_policy(), FailurePolicy::ProceedAfterFailure);
        assert_eq!(push.predicates().len(), 2);
        assert_eq!(graph.get("compile").unwrap().dependencies().len(), 1);
    }

    #[test]
    fn test_template_push_gated_on_tag_and_key() {
        let graph = build_graph(&template()).unwrap();
        let push = graph.get("push").unwrap();
        let passes = |ctx: &BuildContext| push.predicates().iter().all(|p| p.evaluate(ctx));

        let local = BuildContext::new("/work");
        let branch = BuildContext::new("/work")
            .with_env_var("GITHUB_REF", "refs/heads/main")
            .with_env_var("NUGET_API_KEY", "k");
        let tagged_no_key = BuildContext::new("/work").with_env_var("GITHUB_REF", "refs/tags/v1.0.0");
        let release = tagged_no_key.clone().with_env_var("NUGET_API_KEY", "k");

        assert!(!passes(&local));
        assert!(!passes(&branch));
        assert!(!passes(&tagged_no_key));
        assert!(passes(&release));
    }

    #[test]
    fn test_task_without_command_is_noop() {
        let mut config = Config::default();
        config.tasks.push(TaskConfig::new("all"));
        let graph = build_graph(&config).unwrap();
        assert_eq!(graph.get("all").unwrap().action().describe(), "<no command>");
    }

    #[test]
    fn test_shell_action_describes_command() {
        let mut config = Config::default();
        config
            .tasks
            .push(TaskConfig::new("compile").with_command("dotnet build"));
        let graph = build_graph(&config).unwrap();
        assert_eq!(graph.get("compile").unwrap().action().describe(), "dotnet build");
    }

    #[test]
    fn test_duplicate_task_is_graph_error() {
        let mut config = Config::default();
        config.tasks.push(TaskConfig::new("compile"));
        config.tasks.push(TaskConfig::new("compile"));
        let err = build_graph(&config).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Graph(GraphError::DuplicateTask(_))
        ));
    }

    #[test]
    fn test_invalid_condition() {
        let mut config = Config::default();
        config.tasks.push(TaskConfig::new("push").with_condition(Condition::EnvMatches {
            var: "GITHUB_REF".into(),
            pattern: "(".into(),
        }));
        let err = build_graph(&config).unwrap_err();
        assert!(err.to_string().starts_with("Task 'push' has an invalid condition"));
    }

    #[test]
    fn test_run_options() {
        let options = run_options(&RunConfig {
            proceed_after_failure: true,
            skipped_blocks_dependents: true,
        });
        assert_eq!(options.skip_policy, SkipPolicy::Blocking);
        assert!(options.proceed_after_failure);
        assert!(!options.dry_run);

        assert_eq!(run_options(&RunConfig::default()).skip_policy, SkipPolicy::Satisfied);
    }
}
