//! Configuration types

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Main configuration for Gantry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project name
    pub name: Option<String>,

    /// Tasks to run when `gantry run` is invoked without targets
    pub default_targets: Vec<String>,

    /// Build context shared by every task
    pub context: ContextConfig,

    /// Run-wide execution options
    pub run: RunConfig,

    /// Task definitions, in registration order
    pub tasks: Vec<TaskConfig>,
}

impl Config {
    /// Look up a task definition by name
    pub fn task(&self, name: &str) -> Option<&TaskConfig> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Names of all declared tasks, in declaration order
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name.as_str()).collect()
    }
}

/// Build configuration handed to every task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildConfiguration {
    /// Local developer build
    #[default]
    Debug,
    /// CI / release build
    Release,
}

impl BuildConfiguration {
    /// Get the configuration name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    /// Debug for local builds, Release when running on a CI server
    pub fn for_environment(is_ci: bool) -> Self {
        if is_ci {
            Self::Release
        } else {
            Self::Debug
        }
    }
}

impl fmt::Display for BuildConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildConfiguration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "release" => Ok(Self::Release),
            other => Err(format!(
                "unknown build configuration '{}' (expected debug or release)",
                other
            )),
        }
    }
}

/// Build context configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Build configuration; detected from the environment when unset
    pub configuration: Option<BuildConfiguration>,

    /// Directory where packaging tasks drop their output, relative to the root
    pub artifacts_dir: PathBuf,

    /// Free-form variables exported to every task
    pub variables: BTreeMap<String, String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            configuration: None,
            artifacts_dir: PathBuf::from("artifacts"),
            variables: BTreeMap::new(),
        }
    }
}

/// Run-wide execution options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Treat every task as if it were marked proceed-after-failure
    pub proceed_after_failure: bool,

    /// Tasks skipped by a condition block their dependents
    pub skipped_blocks_dependents: bool,
}

/// A task in the configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Unique task name
    pub name: String,

    /// Human-readable description
    pub description: Option<String>,

    /// Shell command to execute; tasks without one only aggregate dependencies
    pub command: Option<String>,

    /// Tasks that must complete first
    pub depends_on: Vec<String>,

    /// Run even when a dependency failed
    pub proceed_after_failure: bool,

    /// Conditions evaluated at run time; all must hold for the task to run
    pub conditions: Vec<Condition>,

    /// Environment variables passed to the command
    pub env: BTreeMap<String, String>,

    /// Working directory relative to the project root
    pub cwd: Option<PathBuf>,
}

impl TaskConfig {
    /// Create a new task definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the command
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Add a dependency
    pub fn with_depends_on(mut self, dep: impl Into<String>) -> Self {
        self.depends_on.push(dep.into());
        self
    }

    /// Add a run condition
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Set whether the task runs after a dependency failure
    pub fn with_proceed_after_failure(mut self, proceed: bool) -> Self {
        self.proceed_after_failure = proceed;
        self
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Declarative run condition
///
/// A condition is written as a single-key map in both formats, e.g.
/// `{ env_set = "NUGET_API_KEY" }` in TOML or `- env_set: NUGET_API_KEY`
/// in YAML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Environment variable is present and non-empty
    EnvSet(String),
    /// Environment variable is absent or empty
    EnvUnset(String),
    /// Environment variable matches a regular expression
    EnvMatches { var: String, pattern: String },
    /// Glob (relative to the project root) matches at least one file
    FilesExist(String),
    /// Context variable has the given value
    VariableEquals { name: String, value: String },
}

impl Condition {
    /// Short description used in skip reasons and listings
    pub fn describe(&self) -> String {
        match self {
            Self::EnvSet(var) => format!("${} is set", var),
            Self::EnvUnset(var) => format!("${} is unset", var),
            Self::EnvMatches { var, pattern } => format!("${} matches /{}/", var, pattern),
            Self::FilesExist(pattern) => format!("files exist: {}", pattern),
            Self::VariableEquals { name, value } => format!("{} == {}", name, value),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

const CONDITION_KINDS: &[&str] = &[
    "env_set",
    "env_unset",
    "env_matches",
    "files_exist",
    "variable_equals",
];

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct EnvMatchesFields {
    var: String,
    pattern: String,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct VariableEqualsFields {
    name: String,
    value: String,
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::EnvSet(var) => map.serialize_entry("env_set", var)?,
            Self::EnvUnset(var) => map.serialize_entry("env_unset", var)?,
            Self::EnvMatches { var, pattern } => map.serialize_entry(
                "env_matches",
                &EnvMatchesFields {
                    var: var.clone(),
                    pattern: pattern.clone(),
                },
            )?,
            Self::FilesExist(pattern) => map.serialize_entry("files_exist", pattern)?,
            Self::VariableEquals { name, value } => map.serialize_entry(
                "variable_equals",
                &VariableEqualsFields {
                    name: name.clone(),
                    value: value.clone(),
                },
            )?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ConditionVisitor)
    }
}

struct ConditionVisitor;

impl<'de> Visitor<'de> for ConditionVisitor {
    type Value = Condition;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map with exactly one condition, e.g. `env_set: NAME`")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Condition, A::Error> {
        let kind: String = map
            .next_key()?
            .ok_or_else(|| <A::Error as de::Error>::invalid_length(0, &self))?;

        let condition = match kind.as_str() {
            "env_set" => Condition::EnvSet(map.next_value()?),
            "env_unset" => Condition::EnvUnset(map.next_value()?),
            "env_matches" => {
                let EnvMatchesFields { var, pattern } = map.next_value()?;
                Condition::EnvMatches { var, pattern }
            }
            "files_exist" => Condition::FilesExist(map.next_value()?),
            "variable_equals" => {
                let VariableEqualsFields { name, value } = map.next_value()?;
                Condition::VariableEquals { name, value }
            }
            other => return Err(de::Error::unknown_variant(other, CONDITION_KINDS)),
        };

        if map.next_key::<IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(2, &self));
        }
        Ok(condition)
    }
}
