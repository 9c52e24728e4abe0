//! Exit codes for the CLI

use gantry_core::{ConfigError, GantryError};
use gantry_tasks::{GraphError, PipelineError};

use crate::cli::commands::RunFailure;

/// Success
pub const SUCCESS: i32 = 0;

/// A task failed, or a general error
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// Duplicate task, unknown dependency or cycle, reported by the task graph
pub const GRAPH_ERROR: i32 = 3;

/// User cancelled
pub const CANCELLED: i32 = 130;

/// Map a command error to the process exit code
pub fn from_error(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(failure) = cause.downcast_ref::<RunFailure>() {
            return match failure {
                RunFailure::Cancelled => CANCELLED,
                RunFailure::TasksFailed(_) => ERROR,
            };
        }
        if cause.is::<GantryError>() || cause.is::<ConfigError>() {
            return CONFIG_ERROR;
        }
        if let Some(e) = cause.downcast_ref::<PipelineError>() {
            return match e {
                PipelineError::Graph(_) => GRAPH_ERROR,
                PipelineError::Condition { .. } => CONFIG_ERROR,
            };
        }
        if cause.is::<GraphError>() {
            return GRAPH_ERROR;
        }
    }
    ERROR
}
