//! Run predicates, lazily evaluated gates on task execution

use std::fmt;
use std::path::Path;

use regex::Regex;

use gantry_core::config::Condition;

use crate::context::BuildContext;

/// A boolean gate evaluated when the task is reached, not when it is registered
pub trait RunPredicate: Send + Sync {
    /// Whether the task should run
    fn evaluate(&self, ctx: &BuildContext) -> bool;

    /// Description used in skip reasons
    fn describe(&self) -> String;
}

/// Errors compiling a declarative condition
#[derive(Debug, thiserror::Error)]
pub enum PredicateError {
    /// Regular expression failed to compile
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Glob pattern failed to compile
    #[error("invalid glob '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

type Check = Box<dyn Fn(&BuildContext) -> bool + Send + Sync>;

/// A described closure predicate
pub struct Predicate {
    description: String,
    check: Check,
}

impl Predicate {
    /// Wrap a closure
    pub fn new<F>(description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&BuildContext) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            check: Box::new(check),
        }
    }

    /// Compile a declarative condition from configuration
    pub fn from_condition(condition: &Condition) -> Result<Self, PredicateError> {
        let description = condition.describe();
        let predicate = match condition.clone() {
            Condition::EnvSet(var) => Self::new(description, move |ctx| {
                ctx.env_var(&var).is_some_and(|v| !v.is_empty())
            }),
            Condition::EnvUnset(var) => Self::new(description, move |ctx| {
                ctx.env_var(&var).map_or(true, str::is_empty)
            }),
            Condition::EnvMatches { var, pattern } => {
                let re = Regex::new(&pattern).map_err(|e| PredicateError::InvalidPattern {
                    pattern: pattern.clone(),
                    source: e,
                })?;
                Self::new(description, move |ctx| {
                    ctx.env_var(&var).is_some_and(|v| re.is_match(v))
                })
            }
            Condition::FilesExist(pattern) => {
                glob::Pattern::new(&pattern).map_err(|e| PredicateError::InvalidGlob {
                    pattern: pattern.clone(),
                    source: e,
                })?;
                Self::new(description, move |ctx| files_exist(ctx, &pattern))
            }
            Condition::VariableEquals { name, value } => Self::new(description, move |ctx| {
                ctx.variable(&name) == Some(value.as_str())
            }),
        };
        Ok(predicate)
    }
}

impl RunPredicate for Predicate {
    fn evaluate(&self, ctx: &BuildContext) -> bool {
        (self.check)(ctx)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Whether a root-relative glob matches at least one existing path
fn files_exist(ctx: &BuildContext, pattern: &str) -> bool {
    // Only the pattern is a glob; metacharacters in the root are literal
    let root = glob::Pattern::escape(&ctx.root_dir().to_string_lossy());
    let full_pattern = Path::new(&root).join(pattern).to_string_lossy().into_owned();
    match glob::glob(&full_pattern) {
        Ok(paths) => paths.flatten().next().is_some(),
        Err(_) => false,
    }
}
