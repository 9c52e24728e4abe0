//! Default configuration values

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "gantry.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "gantry.yaml";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ".gantry.toml",
        ".gantry.yaml",
    ]
}

/// Default configuration template (TOML)
pub const DEFAULT_CONFIG_TEMPLATE_TOML: &str = r#"# Gantry Configuration
# Tasks run in dependency order; `gantry run <task>` runs its dependencies first.

default_targets = ["pack", "push"]

[context]
artifacts_dir = "artifacts"

[run]
proceed_after_failure = false
skipped_blocks_dependents = false

[[tasks]]
name = "restore"
description = "Restore package dependencies"
command = "dotnet restore"

[[tasks]]
name = "compile"
description = "Compile the solution"
command = "dotnet build --no-restore --configuration $GANTRY_CONFIGURATION"
depends_on = ["restore"]

[[tasks]]
name = "pack"
description = "Package build output"
command = "dotnet pack --no-restore --output $GANTRY_ARTIFACTS_DIR"
depends_on = ["compile"]

[[tasks]]
name = "push"
description = "Publish packages on tagged builds"
command = "dotnet nuget push \"$GANTRY_ARTIFACTS_DIR/*.nupkg\" --api-key $NUGET_API_KEY --skip-duplicate"
depends_on = ["pack"]
proceed_after_failure = true
conditions = [
  { env_matches = { var = "GITHUB_REF", pattern = "(?i)refs/tags" } },
  { env_set = "NUGET_API_KEY" },
]
"#;

/// Default configuration template (YAML)
pub const DEFAULT_CONFIG_TEMPLATE_YAML: &str = r#"# Gantry Configuration
# Tasks run in dependency order; `gantry run <task>` runs its dependencies first.

default_targets:
  - pack
  - push

context:
  artifacts_dir: artifacts

run:
  proceed_after_failure: false
  skipped_blocks_dependents: false

tasks:
  - name: restore
    description: Restore package dependencies
    command: dotnet restore

  - name: compile
    description: Compile the solution
    command: dotnet build --no-restore --configuration $GANTRY_CONFIGURATION
    depends_on: [restore]

  - name: pack
    description: Package build output
    command: dotnet pack --no-restore --output $GANTRY_ARTIFACTS_DIR
    depends_on: [compile]

  - name: push
    description: Publish packages on tagged builds
    command: dotnet nuget push "$GANTRY_ARTIFACTS_DIR/*.nupkg" --api-key $NUGET_API_KEY --skip-duplicate
    depends_on: [pack]
    proceed_after_failure: true
    conditions:
      - env_matches:
          var: GITHUB_REF
          pattern: "(?i)refs/tags"
      - env_set: NUGET_API_KEY
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{Condition, Config};
    use crate::config::validation::validate_config;

    #[test]
    fn test_toml_template_is_valid() {
        let config: Config = toml::from_str(DEFAULT_CONFIG_TEMPLATE_TOML).unwrap();
        validate_config(&config).unwrap();
        assert_eq!(config.tasks.len(), 4);
        assert_eq!(config.default_targets, vec!["pack", "push"]);

        let push = config.task("push").unwrap();
        assert!(push.proceed_after_failure);
        assert_eq!(
            push.conditions[1],
            Condition::EnvSet("NUGET_API_KEY".to_string())
        );
    }

    #[test]
    fn test_yaml_template_is_valid() {
        let config: Config = serde_yaml::from_str(DEFAULT_CONFIG_TEMPLATE_YAML).unwrap();
        validate_config(&config).unwrap();
        assert_eq!(config.task_names(), vec!["restore", "compile", "pack", "push"]);
        assert_eq!(config.task("push").unwrap().conditions.len(), 2);
    }

    #[test]
    fn test_config_file_names_prefer_toml() {
        assert_eq!(config_file_names()[0], DEFAULT_CONFIG_TOML);
    }
}
