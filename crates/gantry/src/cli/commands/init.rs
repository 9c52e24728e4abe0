//! Init command

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use console::style;
use dialoguer::{Confirm, Select};
use tracing::info;

use gantry_core::config::defaults::{
    DEFAULT_CONFIG_TEMPLATE_TOML, DEFAULT_CONFIG_TEMPLATE_YAML, DEFAULT_CONFIG_TOML,
    DEFAULT_CONFIG_YAML,
};
use gantry_core::config::validation::validate_config;
use gantry_core::Config;

use crate::cli::{output, Cli};

/// Initialize a new Gantry configuration
#[derive(Debug, Args)]
pub struct InitCommand {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    pub force: bool,

    /// Use defaults without prompting
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Configuration format (prompted for when omitted)
    #[arg(long = "config-format", value_enum)]
    pub config_format: Option<ConfigFormat>,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    fn file_name(self) -> &'static str {
        match self {
            Self::Toml => DEFAULT_CONFIG_TOML,
            Self::Yaml => DEFAULT_CONFIG_YAML,
        }
    }

    fn template(self) -> &'static str {
        match self {
            Self::Toml => DEFAULT_CONFIG_TEMPLATE_TOML,
            Self::Yaml => DEFAULT_CONFIG_TEMPLATE_YAML,
        }
    }

    /// Infer the format from a file extension
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Parse content in this format into a validated config
    fn parse(self, content: &str) -> anyhow::Result<Config> {
        let config: Config = match self {
            Self::Toml => toml::from_str(content)?,
            Self::Yaml => serde_yaml::from_str(content)?,
        };
        validate_config(&config)?;
        Ok(config)
    }
}

impl InitCommand {
    /// Execute the init command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(force = self.force, yes = self.yes, "executing init command");
        let cwd = std::env::current_dir()?;

        let format = self.choose_format()?;
        let config_path = self
            .output
            .clone()
            .unwrap_or_else(|| cwd.join(format.file_name()));

        // Check if config already exists
        if config_path.exists() && !self.force {
            if self.yes {
                anyhow::bail!(
                    "Configuration file already exists at {}. Use --force to overwrite.",
                    config_path.display()
                );
            }

            let overwrite = Confirm::new()
                .with_prompt(format!(
                    "Configuration file already exists at {}. Overwrite?",
                    config_path.display()
                ))
                .default(false)
                .interact()?;

            if !overwrite {
                println!("{}", style("Aborted.").yellow());
                return Ok(());
            }
        }

        let content = format.template();
        let config = format.parse(content)?;
        std::fs::write(&config_path, content)?;

        if !cli.quiet {
            output::success(&format!(
                "Created configuration at {} ({})",
                output::path_style().apply_to(config_path.display()),
                output::plural(config.tasks.len(), "task")
            ));
            println!();
            println!("Next steps:");
            println!("  1. Edit {} to describe your build", config_path.display());
            println!("  2. Run {} to check the task graph", style("gantry validate").cyan());
            println!("  3. Run {} to preview the execution order", style("gantry plan").cyan());
        }

        Ok(())
    }

    fn choose_format(&self) -> anyhow::Result<ConfigFormat> {
        if let Some(format) = self.config_format {
            return Ok(format);
        }
        if let Some(format) = self.output.as_deref().and_then(ConfigFormat::from_path) {
            return Ok(format);
        }
        if self.yes {
            return Ok(ConfigFormat::Toml);
        }

        let formats = [ConfigFormat::Toml, ConfigFormat::Yaml];
        let selection = Select::new()
            .with_prompt("Configuration format")
            .items(&["toml", "yaml"])
            .default(0)
            .interact()?;
        Ok(formats[selection])
    }
}
