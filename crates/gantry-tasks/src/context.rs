//! Build context handed to every action and predicate

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use gantry_core::config::{BuildConfiguration, ContextConfig};

use crate::task::TaskId;

/// Environment variables that mark a CI server build
const CI_MARKERS: &[&str] = &["CI", "GITHUB_ACTIONS", "GITLAB_CI", "TF_BUILD", "BUILDKITE"];

/// Explicit build state shared by all tasks of a run.
///
/// The environment is captured once when the context is created, so
/// predicates evaluated later in the run see the same values.
#[derive(Debug, Clone)]
pub struct BuildContext {
    root_dir: PathBuf,
    configuration: BuildConfiguration,
    artifacts_dir: PathBuf,
    variables: BTreeMap<String, String>,
    env: HashMap<String, String>,
}

impl BuildContext {
    /// Create a context with an empty environment
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        let root_dir = root_dir.into();
        Self {
            artifacts_dir: root_dir.join("artifacts"),
            root_dir,
            configuration: BuildConfiguration::Debug,
            variables: BTreeMap::new(),
            env: HashMap::new(),
        }
    }

    /// Create a context from the process environment
    pub fn from_env(root_dir: impl Into<PathBuf>) -> Self {
        let env: HashMap<String, String> = std::env::vars().collect();
        let mut ctx = Self::new(root_dir).with_env(env);
        ctx.configuration = BuildConfiguration::for_environment(ctx.is_ci());
        ctx
    }

    /// Apply the `[context]` section of a configuration file
    pub fn apply_config(mut self, config: &ContextConfig) -> Self {
        if let Some(configuration) = config.configuration {
            self.configuration = configuration;
        }
        self.artifacts_dir = self.root_dir.join(&config.artifacts_dir);
        for (name, value) in &config.variables {
            self.variables.insert(name.clone(), value.clone());
        }
        self
    }

    /// Set the build configuration
    pub fn with_configuration(mut self, configuration: BuildConfiguration) -> Self {
        self.configuration = configuration;
        self
    }

    /// Set the artifacts directory (relative paths resolve against the root)
    pub fn with_artifacts_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.artifacts_dir = self.root_dir.join(dir);
        self
    }

    /// Set a context variable
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Replace the captured environment
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Set a single environment variable in the captured environment
    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn configuration(&self) -> BuildConfiguration {
        self.configuration
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// Look up a context variable
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    /// Look up a variable in the captured environment
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// Whether the captured environment looks like a CI server
    pub fn is_ci(&self) -> bool {
        CI_MARKERS.iter().any(|marker| {
            self.env_var(marker)
                .is_some_and(|v| !v.is_empty() && !v.eq_ignore_ascii_case("false"))
        })
    }

    /// Resolve a path relative to the project root
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root_dir.join(path)
    }

    /// Convert context to environment variables for a task's process
    pub fn to_env(&self, task: &TaskId) -> HashMap<String, String> {
        let mut env = HashMap::new();

        env.insert("GANTRY_TASK".to_string(), task.to_string());
        env.insert(
            "GANTRY_ROOT".to_string(),
            self.root_dir.to_string_lossy().to_string(),
        );
        env.insert(
            "GANTRY_CONFIGURATION".to_string(),
            self.configuration.to_string(),
        );
        env.insert(
            "GANTRY_ARTIFACTS_DIR".to_string(),
            self.artifacts_dir.to_string_lossy().to_string(),
        );

        for (k, v) in &self.variables {
            env.insert(format!("GANTRY_{}", k.to_uppercase()), v.clone());
        }

        env
    }
}
