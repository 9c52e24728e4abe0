//! Validate command

use clap::Args;
use console::style;
use tracing::info;

use gantry_core::Config;
use gantry_tasks::build_graph;

use super::Project;
use crate::cli::{Cli, OutputFormat};

/// Validate the configuration and task graph
#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Strict mode - treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

impl ValidateCommand {
    /// Execute the validate command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(strict = self.strict, "executing validate command");

        let mut errors: Vec<String> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        // First hard error, kept so the exit code reflects its kind
        let mut cause: Option<anyhow::Error> = None;

        let project = match Project::load(cli) {
            Ok(project) => Some(project),
            Err(e) => {
                errors.push(format!("Configuration: {:#}", e));
                cause = Some(e);
                None
            }
        };

        let mut order = Vec::new();
        if let Some(ref project) = project {
            match build_graph(&project.config).map_err(anyhow::Error::from).and_then(|graph| {
                graph.finalize().map_err(anyhow::Error::from)
            }) {
                Ok(ids) => order = ids.iter().map(|id| id.to_string()).collect(),
                Err(e) => {
                    errors.push(format!("Task graph: {:#}", e));
                    cause = Some(e);
                }
            }
            warnings.extend(lint(&project.config));
        }

        // If strict, promote warnings to errors
        if self.strict {
            errors.append(&mut warnings);
        }

        let passed = errors.is_empty();
        let config_path = project.as_ref().map(|p| p.config_path.clone());

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "valid": passed,
                    "config_path": config_path.map(|p| p.to_string_lossy().to_string()),
                    "order": order,
                    "errors": errors,
                    "warnings": warnings
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    println!("{}", style("Validation Results").bold());
                    println!();

                    if let Some(path) = config_path {
                        println!("Config: {}", style(path.display()).cyan());
                        println!();
                    }

                    if !order.is_empty() {
                        println!("Order:  {}", order.join(" -> "));
                        println!();
                    }

                    if !errors.is_empty() {
                        println!("{}", style("Errors:").red().bold());
                        for error in &errors {
                            println!("  {} {}", style("✗").red(), error);
                        }
                        println!();
                    }

                    if !warnings.is_empty() {
                        println!("{}", style("Warnings:").yellow().bold());
                        for warning in &warnings {
                            println!("  {} {}", style("!").yellow(), warning);
                        }
                        println!();
                    }

                    if passed {
                        if warnings.is_empty() {
                            println!("{}", style("✓ All checks passed").green().bold());
                        } else {
                            println!(
                                "{} with {} warning(s)",
                                style("✓ Validation passed").green().bold(),
                                warnings.len()
                            );
                        }
                    }
                }
            }
        }

        if !passed {
            let count = errors.len();
            return Err(match cause {
                Some(e) => e.context(format!("validation failed with {} error(s)", count)),
                None => anyhow::anyhow!("validation failed with {} error(s)", count),
            });
        }

        Ok(())
    }
}

/// Non-fatal findings in a structurally valid config
fn lint(config: &Config) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.tasks.is_empty() {
        warnings.push("No tasks declared".to_string());
    }

    for task in &config.tasks {
        if task.command.is_none() && task.depends_on.is_empty() {
            warnings.push(format!(
                "Task '{}' has no command and no dependencies",
                task.name
            ));
        }
        if task.proceed_after_failure && task.depends_on.is_empty() {
            warnings.push(format!(
                "Task '{}' sets proceed_after_failure but has no dependencies",
                task.name
            ));
        }
        if task.command.is_none() && (!task.env.is_empty() || task.cwd.is_some()) {
            warnings.push(format!(
                "Task '{}' sets env or cwd but has no command",
                task.name
            ));
        }
    }

    warnings
}
