//! Plan command

use clap::Args;
use tracing::info;

use gantry_tasks::build_graph;

use super::Project;
use crate::cli::output;
use crate::cli::{Cli, OutputFormat};

/// Show the execution order without running anything
#[derive(Debug, Args)]
pub struct PlanCommand {
    /// Tasks to plan (default: `default_targets` from the config, or every task)
    pub targets: Vec<String>,
}

impl PlanCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(targets = ?self.targets, "executing plan command");
        let project = Project::load(cli)?;
        let graph = build_graph(&project.config)?;
        let plan = graph.plan(&project.targets(&self.targets))?;

        match cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    println!("{}", output::header("Execution plan"));
                    println!(
                        "{}",
                        output::key_value(
                            "config",
                            &output::path_style()
                                .apply_to(project.config_path.display())
                                .to_string()
                        )
                    );
                    let targets: Vec<&str> = plan.targets.iter().map(|t| t.as_str()).collect();
                    println!("{}", output::key_value("targets", &targets.join(", ")));
                    println!();
                }
                println!("{}", graph.execution_plan(&plan));
            }
        }

        Ok(())
    }
}
