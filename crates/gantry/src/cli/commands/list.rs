//! List command

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::info;

use gantry_core::TaskConfig;
use gantry_tasks::{build_graph, TaskGraph};

use super::Project;
use crate::cli::{Cli, OutputFormat};

/// List declared tasks
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only print task names
    #[arg(long)]
    pub names_only: bool,
}

/// A task as shown by `gantry list --format json`
#[derive(Debug, Serialize)]
struct TaskSummary<'a> {
    name: &'a str,
    description: Option<&'a str>,
    command: Option<&'a str>,
    depends_on: &'a [String],
    needed_by: Vec<&'a str>,
    conditions: Vec<String>,
    proceed_after_failure: bool,
    default_target: bool,
}

impl<'a> TaskSummary<'a> {
    fn new(task: &'a TaskConfig, graph: &'a TaskGraph, default_targets: &[String]) -> Self {
        Self {
            name: &task.name,
            description: task.description.as_deref(),
            command: task.command.as_deref(),
            depends_on: &task.depends_on,
            needed_by: graph
                .dependents(&task.name)
                .into_iter()
                .map(|id| id.as_str())
                .collect(),
            conditions: task.conditions.iter().map(|c| c.describe()).collect(),
            proceed_after_failure: task.proceed_after_failure,
            default_target: default_targets.contains(&task.name),
        }
    }
}

impl ListCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(names_only = self.names_only, "executing list command");
        let project = Project::load(cli)?;
        let config = &project.config;
        let graph = build_graph(config)?;
        let tasks: Vec<TaskSummary<'_>> = config
            .tasks
            .iter()
            .map(|t| TaskSummary::new(t, &graph, &config.default_targets))
            .collect();

        if cli.format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&tasks)?);
            return Ok(());
        }

        if self.names_only || cli.quiet {
            for task in &tasks {
                println!("{}", task.name);
            }
            return Ok(());
        }

        let width = tasks.iter().map(|t| t.name.len()).max().unwrap_or(0);
        for task in &tasks {
            let marker = if task.default_target { "*" } else { " " };
            println!(
                "{} {:<width$}  {}",
                style(marker).cyan(),
                style(task.name).bold(),
                task.description.unwrap_or(""),
                width = width
            );
            if !task.depends_on.is_empty() {
                println!(
                    "  {:<width$}  {} {}",
                    "",
                    style("after:").dim(),
                    task.depends_on.join(", "),
                    width = width
                );
            }
            if !task.needed_by.is_empty() {
                println!(
                    "  {:<width$}  {} {}",
                    "",
                    style("before:").dim(),
                    task.needed_by.join(", "),
                    width = width
                );
            }
            for condition in &task.conditions {
                println!(
                    "  {:<width$}  {} {}",
                    "",
                    style("when:").dim(),
                    condition,
                    width = width
                );
            }
        }
        if !config.default_targets.is_empty() {
            println!();
            println!("{} default target", style("*").cyan());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::{Condition, Config};

    fn release_config() -> Config {
        let mut config = Config::default();
        config.tasks.push(TaskConfig::new("compile"));
        config
            .tasks
            .push(TaskConfig::new("pack").with_depends_on("compile"));
        config.tasks.push(
            TaskConfig::new("push")
                .with_depends_on("pack")
                .with_condition(Condition::EnvSet("NUGET_API_KEY".into()))
                .with_proceed_after_failure(true),
        );
        config
            .tasks
            .push(TaskConfig::new("docs").with_depends_on("compile"));
        config
    }

    #[test]
    fn test_task_summary() {
        let config = release_config();
        let graph = build_graph(&config).unwrap();
        let summary = TaskSummary::new(&config.tasks[2], &graph, &["push".to_string()]);

        assert_eq!(summary.name, "push");
        assert_eq!(summary.depends_on.to_vec(), vec!["pack"]);
        assert!(summary.needed_by.is_empty());
        assert_eq!(summary.conditions, vec!["$NUGET_API_KEY is set"]);
        assert!(summary.default_target);

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["proceed_after_failure"], true);
        assert!(value["command"].is_null());
    }

    #[test]
    fn test_task_summary_needed_by() {
        let config = release_config();
        let graph = build_graph(&config).unwrap();
        let compile = TaskSummary::new(&config.tasks[0], &graph, &[]);
        assert_eq!(compile.needed_by, vec!["pack", "docs"]);

        let value = serde_json::to_value(&compile).unwrap();
        assert_eq!(value["needed_by"], serde_json::json!(["pack", "docs"]));
    }
}
