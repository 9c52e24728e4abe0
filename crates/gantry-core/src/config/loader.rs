//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, Result};

use super::defaults::config_file_names;
use super::types::Config;
use super::validation::validate_config;

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<Config> {
    let format = if path.extension().is_some_and(|e| e == "toml") {
        "TOML"
    } else {
        "YAML"
    };
    info!(path = %path.display(), format, "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config = parse_config(&content, format == "TOML")?;

    validate_config(&config)?;
    debug!(path = %path.display(), tasks = config.tasks.len(), "config loaded and validated");
    Ok(config)
}

fn parse_config(content: &str, is_toml: bool) -> Result<Config> {
    let config = if is_toml {
        toml::from_str(content).map_err(ConfigError::TomlError)?
    } else {
        serde_yaml::from_str(content).map_err(ConfigError::YamlError)?
    };
    Ok(config)
}

/// Find configuration file in directory or parent directories.
///
/// At each directory level the search checks:
///   1. `<dir>/<name>`          (e.g. `gantry.toml`)
///   2. `<dir>/.github/<name>`  (e.g. `.github/gantry.toml`)
///
/// The first match wins. Parents are walked until the filesystem root.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.exists() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }

            let github_path = current.join(".github").join(name);
            if github_path.exists() {
                info!(path = %github_path.display(), "found config file in .github/");
                return Some(github_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration from directory (searching parent directories)
pub fn load_config_from_dir(dir: &Path) -> Result<(Config, PathBuf)> {
    let config_path = find_config(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;

    let config = load_config(&config_path)?;
    Ok((config, config_path))
}

/// The project root for a config file: the directory holding it, or the
/// parent of a `.github/` directory holding it.
pub fn project_root(config_path: &Path) -> PathBuf {
    let dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    if dir.file_name().is_some_and(|n| n == ".github") {
        dir.parent().unwrap_or(dir).to_path_buf()
    } else {
        dir.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::Condition;
    use crate::error::GantryError;
    use tempfile::TempDir;

    const MINIMAL_TOML: &str = "[[tasks]]\nname = \"restore\"\ncommand = \"true\"\n";

    #[test]
    fn test_find_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("gantry.toml");
        std::fs::write(&config_path, MINIMAL_TOML).unwrap();

        let found = find_config(temp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_prefers_toml_over_yaml() {
        let temp = TempDir::new().unwrap();
        let toml_path = temp.path().join("gantry.toml");
        let yaml_path = temp.path().join("gantry.yaml");
        std::fs::write(&toml_path, MINIMAL_TOML).unwrap();
        std::fs::write(&yaml_path, "tasks:\n  - name: restore\n").unwrap();

        let found = find_config(temp.path()).unwrap();
        assert_eq!(found, toml_path);
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("gantry.toml");
        std::fs::write(&config_path, MINIMAL_TOML).unwrap();
        let nested = temp.path().join("src").join("lib");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config(&nested), Some(config_path));
    }

    #[test]
    fn test_find_config_in_github_dir() {
        let temp = TempDir::new().unwrap();
        let github_dir = temp.path().join(".github");
        std::fs::create_dir_all(&github_dir).unwrap();
        let config_path = github_dir.join("gantry.toml");
        std::fs::write(&config_path, MINIMAL_TOML).unwrap();

        let found = find_config(temp.path()).unwrap();
        assert_eq!(found, config_path);
        assert_eq!(project_root(&found), temp.path());
    }

    #[test]
    fn test_load_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("gantry.toml");
        std::fs::write(
            &config_path,
            r#"
default_targets = ["compile"]

[context]
configuration = "release"

[[tasks]]
name = "restore"
command = "dotnet restore"

[[tasks]]
name = "compile"
command = "dotnet build"
depends_on = ["restore"]
"#,
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.tasks.len(), 2);
        assert_eq!(config.tasks[1].depends_on, vec!["restore"]);
        assert_eq!(
            config.context.configuration,
            Some(crate::config::BuildConfiguration::Release)
        );
    }

    #[test]
    fn test_load_config_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("gantry.yaml");
        std::fs::write(
            &config_path,
            "tasks:\n  - name: restore\n    command: dotnet restore\n  - name: compile\n    depends_on: [restore]\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.task_names(), vec!["restore", "compile"]);
        assert!(config.tasks[1].command.is_none());
    }

    #[test]
    fn test_load_config_yaml_with_conditions() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("gantry.yaml");
        std::fs::write(
            &config_path,
            r#"
tasks:
  - name: pack
    command: dotnet pack
  - name: push
    depends_on: [pack]
    conditions:
      - env_set: NUGET_API_KEY
      - env_matches:
          var: GITHUB_REF
          pattern: "(?i)refs/tags"
      - files_exist: "artifacts/*.nupkg"
"#,
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        let push = config.task("push").unwrap();
        assert_eq!(
            push.conditions,
            vec![
                Condition::EnvSet("NUGET_API_KEY".to_string()),
                Condition::EnvMatches {
                    var: "GITHUB_REF".to_string(),
                    pattern: "(?i)refs/tags".to_string(),
                },
                Condition::FilesExist("artifacts/*.nupkg".to_string()),
            ]
        );
    }

    #[test]
    fn test_toml_and_yaml_conditions_agree() {
        let toml = parse_config(
            r#"
[[tasks]]
name = "push"
conditions = [{ variable_equals = { name = "channel", value = "stable" } }]
"#,
            true,
        )
        .unwrap();
        let yaml = parse_config(
            "tasks:\n  - name: push\n    conditions:\n      - variable_equals: {name: channel, value: stable}\n",
            false,
        )
        .unwrap();
        assert_eq!(toml.tasks[0].conditions, yaml.tasks[0].conditions);
    }

    #[test]
    fn test_load_config_runs_validation() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("gantry.toml");
        std::fs::write(
            &config_path,
            "default_targets = [\"publish\"]\n[[tasks]]\nname = \"compile\"\n",
        )
        .unwrap();

        let err = load_config(&config_path).unwrap_err();
        assert!(matches!(
            err,
            GantryError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_load_config_from_dir_not_found() {
        let temp = TempDir::new().unwrap();
        let err = load_config_from_dir(temp.path()).unwrap_err();
        assert!(matches!(err, GantryError::Config(ConfigError::NotFound(_))));
    }
}
