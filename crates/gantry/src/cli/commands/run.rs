//! Run command

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use console::style;
use tracing::{info, warn};

use gantry_core::BuildConfiguration;
use gantry_tasks::{
    build_graph, run_options, BuildContext, CancellationToken, ExecutionPlan, Orchestrator,
    RunReport, SkipPolicy, TaskEvent, TaskGraph, TaskReporter, TaskReporterRegistry,
};

use super::Project;
use crate::cli::output;
use crate::cli::{Cli, OutputFormat};

/// Run tasks and their dependencies
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Tasks to run (default: `default_targets` from the config, or every task)
    pub targets: Vec<String>,

    /// Evaluate conditions and report what would run, without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Run dependents of failed tasks anyway
    #[arg(long)]
    pub continue_on_error: bool,

    /// Tasks skipped by a condition block their dependents
    #[arg(long)]
    pub skipped_blocks: bool,

    /// Build configuration (default: release on CI, debug otherwise)
    #[arg(long)]
    pub configuration: Option<BuildConfiguration>,

    /// Set a context variable (repeatable)
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// Write the JSON run report to a file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// A run that finished without succeeding
#[derive(Debug, thiserror::Error)]
pub enum RunFailure {
    #[error("{0} task(s) failed")]
    TasksFailed(usize),

    #[error("run cancelled")]
    Cancelled,
}

impl RunCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(
            targets = ?self.targets,
            dry_run = self.dry_run,
            continue_on_error = self.continue_on_error,
            "executing run command"
        );
        let project = Project::load(cli)?;
        let graph = build_graph(&project.config)?;
        let plan = graph.plan(&project.targets(&self.targets))?;
        let ctx = self.build_context(&project);

        let mut options = run_options(&project.config.run);
        options.dry_run = self.dry_run;
        options.proceed_after_failure |= self.continue_on_error;
        if self.skipped_blocks {
            options.skip_policy = SkipPolicy::Blocking;
        }
        let cancellation = options.cancellation.clone();

        let text = cli.format == OutputFormat::Text && !cli.quiet;
        // Tracing always receives events so the log file records the run
        let mut reporters = TaskReporterRegistry::new();
        if text {
            reporters.register(ConsoleReporter::new(cli.verbose));
        }

        if text {
            println!();
            output::info(&format!(
                "{} ({}{})",
                output::plural(plan.len(), "task"),
                ctx.configuration(),
                if self.dry_run { ", dry run" } else { "" }
            ));
            if cli.verbose {
                println!();
                println!("{}", graph.execution_plan(&plan));
            }
            println!();
        }

        let orchestrator = Orchestrator::new(options, Arc::new(reporters));
        let report = run_until_interrupted(orchestrator, graph, plan, ctx, cancellation)?;

        if let Some(path) = &self.report {
            std::fs::write(path, report.to_json()?)?;
            if text {
                println!(
                    "  Report written to {}",
                    output::path_style().apply_to(path.display())
                );
            }
        }

        if cli.format == OutputFormat::Json {
            println!("{}", report.to_json()?);
        } else if text {
            print_failures(&report);
        }

        outcome(&report)?;
        Ok(())
    }

    fn build_context(&self, project: &Project) -> BuildContext {
        let mut ctx = BuildContext::from_env(&project.root)
            .apply_config(&project.config.context);
        if let Some(configuration) = self.configuration {
            ctx = ctx.with_configuration(configuration);
        }
        for (key, value) in &self.vars {
            ctx = ctx.with_variable(key, value);
        }
        ctx
    }
}

/// Run the plan on a blocking thread; Ctrl-C requests cancellation and
/// waits for the current task to finish.
fn run_until_interrupted(
    orchestrator: Orchestrator,
    graph: TaskGraph,
    plan: ExecutionPlan,
    ctx: BuildContext,
    cancellation: CancellationToken,
) -> anyhow::Result<RunReport> {
    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(async move {
        let mut run =
            tokio::task::spawn_blocking(move || orchestrator.execute(&graph, &plan, &ctx));

        tokio::select! {
            result = &mut run => result,
            Ok(()) = tokio::signal::ctrl_c() => {
                warn!("interrupt received, stopping after the current task");
                cancellation.cancel();
                run.await
            }
        }
    })?;
    Ok(report)
}

/// Skipped tasks do not fail a run; failed tasks and cancellation do
fn outcome(report: &RunReport) -> Result<(), RunFailure> {
    if report.cancelled {
        return Err(RunFailure::Cancelled);
    }
    match report.summary().failed {
        0 => Ok(()),
        failed => Err(RunFailure::TasksFailed(failed)),
    }
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing variable name in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn print_failures(report: &RunReport) {
    let failed: Vec<_> = report.failed().collect();
    if failed.is_empty() {
        return;
    }
    println!();
    println!(
        "  {} {}/{} tasks failed:",
        style("✗").red().bold(),
        failed.len(),
        report.order.len()
    );
    for result in failed {
        println!("    {} {}: {}", style("✗").red(), result.id, result.outcome);
    }
}

/// Console reporter with live output
struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl TaskReporter for ConsoleReporter {
    fn report(&self, event: &TaskEvent) {
        match event {
            TaskEvent::PlanReady { .. } => {}
            TaskEvent::Started { id, action } => {
                println!(
                    "  {} {} {}",
                    style("▸").dim(),
                    output::task_style().apply_to(id),
                    if self.verbose {
                        style(format!("({})", action)).dim().to_string()
                    } else {
                        String::new()
                    }
                );
            }
            TaskEvent::Completed { id, duration } => {
                println!(
                    "  {} {} {}",
                    style("✓").green(),
                    style(id).green(),
                    output::duration(*duration)
                );
            }
            TaskEvent::Failed {
                id,
                duration,
                error,
            } => {
                println!(
                    "  {} {} {} {}",
                    style("✗").red(),
                    style(id).red(),
                    output::duration(*duration),
                    style(error).red().dim()
                );
            }
            TaskEvent::Skipped { id, reason } => {
                let reason = if self.verbose {
                    reason.detail()
                } else {
                    reason.to_string()
                };
                println!(
                    "  {} {} {}",
                    style("○").yellow(),
                    style(id).yellow(),
                    style(format!("({})", reason)).dim()
                );
            }
            TaskEvent::Cancelled { remaining } => {
                println!();
                output::warning(&format!(
                    "Cancelled, {} not run",
                    output::plural(remaining.len(), "task")
                ));
            }
            TaskEvent::AllCompleted { summary, duration } => {
                println!();
                println!(
                    "  {} {} succeeded, {} failed, {} skipped ({:.1}s)",
                    if summary.failed == 0 {
                        style("✓").green().bold()
                    } else {
                        style("✗").red().bold()
                    },
                    summary.succeeded,
                    summary.failed,
                    summary.skipped,
                    duration.as_secs_f64()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;
    use gantry_core::Condition;
    use gantry_tasks::{ActionError, Predicate, RunOptions, Task};

    /// restore -> compile -> pack -> push, with push gated on an API key
    fn release_pipeline(compile_fails: bool) -> TaskGraph {
        let ok = |_: &BuildContext| -> Result<(), ActionError> { Ok(()) };
        let mut graph = TaskGraph::new();
        graph.register(Task::new("restore").with_action(ok)).unwrap();
        let compile = Task::new("compile").with_depends_on("restore");
        let compile = if compile_fails {
            compile.with_action(|_: &BuildContext| -> Result<(), ActionError> {
                Err(ActionError::failed("exit code 1"))
            })
        } else {
            compile.with_action(ok)
        };
        graph.register(compile).unwrap();
        graph
            .register(Task::new("pack").with_depends_on("compile").with_action(ok))
            .unwrap();
        let key = Predicate::from_condition(&Condition::EnvSet("NUGET_API_KEY".into())).unwrap();
        graph
            .register(
                Task::new("push")
                    .with_depends_on("pack")
                    .with_predicate(key)
                    .proceed_after_failure()
                    .with_action(ok),
            )
            .unwrap();
        graph
    }

    fn run(graph: &TaskGraph, options: RunOptions) -> RunReport {
        let orchestrator = Orchestrator::new(options, Arc::new(TaskReporterRegistry::new()));
        let plan = graph.plan::<&str>(&[]).unwrap();
        orchestrator.execute(graph, &plan, &BuildContext::new("/work"))
    }

    #[test]
    fn test_outcome_skipped_push_succeeds() {
        let report = run(&release_pipeline(false), RunOptions::default());
        assert_eq!(report.summary().skipped, 1);
        assert!(outcome(&report).is_ok());
    }

    #[test]
    fn test_outcome_failed_compile_exits_with_error() {
        let report = run(&release_pipeline(true), RunOptions::default());
        let failure = outcome(&report).unwrap_err();
        assert!(matches!(failure, RunFailure::TasksFailed(1)));
        assert_eq!(
            exit_codes::from_error(&anyhow::Error::new(failure)),
            exit_codes::ERROR
        );
    }

    #[test]
    fn test_outcome_cancelled_run() {
        let options = RunOptions::default();
        options.cancellation.cancel();
        let report = run(&release_pipeline(false), options);
        let failure = outcome(&report).unwrap_err();
        assert!(matches!(failure, RunFailure::Cancelled));
        assert_eq!(
            exit_codes::from_error(&anyhow::Error::new(failure)),
            exit_codes::CANCELLED
        );
    }

    #[test]
    fn test_parse_var() {
        assert_eq!(
            parse_var("channel=stable").unwrap(),
            ("channel".to_string(), "stable".to_string())
        );
        assert_eq!(
            parse_var("feed=https://x/?a=b").unwrap(),
            ("feed".to_string(), "https://x/?a=b".to_string())
        );
        assert_eq!(parse_var("empty=").unwrap().1, "");
    }

    #[test]
    fn test_parse_var_rejects_malformed() {
        assert!(parse_var("channel").is_err());
        assert!(parse_var("=stable").is_err());
    }

    #[test]
    fn test_run_failure_display() {
        assert_eq!(RunFailure::TasksFailed(2).to_string(), "2 task(s) failed");
        assert_eq!(RunFailure::Cancelled.to_string(), "run cancelled");
    }
}
