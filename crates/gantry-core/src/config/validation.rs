//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::{Condition, Config, TaskConfig};

/// Validate configuration
///
/// Checks field values only. Duplicate names, unknown dependencies and
/// cycles are structural and are reported by the task graph.
pub fn validate_config(config: &Config) -> Result<()> {
    debug!(tasks = config.tasks.len(), "validating configuration");
    validate_task_names(config)?;
    for (index, task) in config.tasks.iter().enumerate() {
        validate_conditions(index, task)?;
    }
    validate_default_targets(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_task_names(config: &Config) -> Result<()> {
    for (index, task) in config.tasks.iter().enumerate() {
        if task.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("tasks[{}].name", index),
                message: "name cannot be empty".to_string(),
            }
            .into());
        }
        if task.name.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidValue {
                field: format!("tasks[{}].name", index),
                message: format!("'{}' must not contain whitespace", task.name),
            }
            .into());
        }
    }
    Ok(())
}

fn validate_conditions(index: usize, task: &TaskConfig) -> Result<()> {
    for (cond_index, condition) in task.conditions.iter().enumerate() {
        let field = format!("tasks[{}].conditions[{}]", index, cond_index);
        match condition {
            Condition::EnvSet(var) | Condition::EnvUnset(var) if var.is_empty() => {
                return Err(ConfigError::InvalidValue {
                    field,
                    message: "variable name cannot be empty".to_string(),
                }
                .into());
            }
            Condition::EnvMatches { pattern, .. } => {
                regex::Regex::new(pattern).map_err(|e| ConfigError::InvalidValue {
                    field,
                    message: format!("invalid pattern: {}", e),
                })?;
            }
            Condition::FilesExist(pattern) => {
                glob::Pattern::new(pattern).map_err(|e| ConfigError::InvalidValue {
                    field,
                    message: format!("invalid glob: {}", e),
                })?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn validate_default_targets(config: &Config) -> Result<()> {
    for target in &config.default_targets {
        if config.task(target).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "default_targets".to_string(),
                message: format!("unknown task '{}'", target),
            }
            .into());
        }
    }
    Ok(())
}
