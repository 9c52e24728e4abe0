//! CLI commands

mod completions;
mod init;
mod list;
mod plan;
mod run;
mod validate;

use std::path::PathBuf;

use gantry_core::config::{load_config, load_config_from_dir, project_root};
use gantry_core::Config;
use tracing::debug;

pub use completions::CompletionsCommand;
pub use init::InitCommand;
pub use list::ListCommand;
pub use plan::PlanCommand;
pub use run::{RunCommand, RunFailure};
pub use validate::ValidateCommand;

use super::Cli;

/// A loaded configuration and the directory tasks run in
#[derive(Debug)]
pub(crate) struct Project {
    pub config: Config,
    pub config_path: PathBuf,
    pub root: PathBuf,
}

impl Project {
    /// Load the config named by `--config`, or search upward from the
    /// working directory
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()?;
        let (config, config_path) = match &cli.config {
            Some(path) => {
                let path = cwd.join(path);
                (load_config(&path)?, path)
            }
            None => load_config_from_dir(&cwd)?,
        };
        let root = project_root(&config_path);
        debug!(config = %config_path.display(), root = %root.display(), "loaded project");

        Ok(Self {
            config,
            config_path,
            root,
        })
    }

    /// Requested targets, falling back to the configured defaults
    pub fn targets(&self, requested: &[String]) -> Vec<String> {
        if requested.is_empty() {
            self.config.default_targets.clone()
        } else {
            requested.to_vec()
        }
    }
}
