//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("at least one [[node]] is required")]
    NoNodes,
    #[error("node #{0} has an empty name")]
    EmptyNodeName(usize),
    #[error("node name '{0}' is used more than once")]
    DuplicateNodeName(String),
    #[error("one of registry.listen or registry.address is required")]
    RegistryUnset,
    #[error("registry.listen and registry.address are mutually exclusive")]
    RegistryAmbiguous,
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
    #[error("database parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Nodes
    if config.nodes.is_empty() {
        errors.push(ValidationError::NoNodes);
    }
    let mut seen = HashSet::new();
    for (index, node) in config.nodes.iter().enumerate() {
        if node.name.is_empty() {
            errors.push(ValidationError::EmptyNodeName(index));
        } else if !seen.insert(node.name.as_str()) {
            errors.push(ValidationError::DuplicateNodeName(node.name.clone()));
        }

        if let Some(ref database) = node.database {
            let db_path = Path::new(database);
            if let Some(parent) = db_path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                errors.push(ValidationError::DatabasePathInvalid(database.clone()));
            }
        }
    }

    // Registry placement
    match (config.registry.listen, config.registry.address) {
        (None, None) => errors.push(ValidationError::RegistryUnset),
        (Some(_), Some(_)) => errors.push(ValidationError::RegistryAmbiguous),
        _ => {}
    }
    if config.registry.stale_after_secs == 0 {
        errors.push(ValidationError::ZeroValue("registry.stale_after_secs"));
    }

    // Timers
    let timers = &config.timers;
    if timers.heartbeat_interval_secs == 0 {
        errors.push(ValidationError::ZeroValue("timers.heartbeat_interval_secs"));
    }
    if timers.replication_interval_secs == 0 {
        errors.push(ValidationError::ZeroValue("timers.replication_interval_secs"));
    }
    if timers.resync_every == 0 {
        errors.push(ValidationError::ZeroValue("timers.resync_every"));
    }
    if timers.register_attempts == 0 {
        errors.push(ValidationError::ZeroValue("timers.register_attempts"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_valid_config() -> String {
        r#"
[registry]
listen = "127.0.0.1:5559"

[[node]]
name = "alpha"
listen = "127.0.0.1:5556"
"#
        .to_string()
    }

    #[test]
    fn test_valid_config_passes() {
        let config: Config = toml::from_str(&minimal_valid_config()).unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_no_nodes_fails() {
        let toml = r#"
[registry]
listen = "127.0.0.1:5559"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::NoNodes)));
    }

    #[test]
    fn test_duplicate_and_empty_names_fail() {
        let toml = r#"
[registry]
address = "127.0.0.1:5559"

[[node]]
name = "alpha"

[[node]]
name = "alpha"

[[node]]
name = ""
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::DuplicateNodeName(n) if n == "alpha")));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::EmptyNodeName(2))));
    }

    #[test]
    fn test_registry_placement_must_be_unambiguous() {
        let toml = r#"
[registry]
listen = "127.0.0.1:5559"
address = "127.0.0.1:5560"

[[node]]
name = "alpha"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::RegistryAmbiguous)));
    }

    #[test]
    fn test_zero_intervals_fail() {
        let toml = r#"
[registry]
listen = "127.0.0.1:5559"

[timers]
replication_interval_secs = 0
resync_every = 0

[[node]]
name = "alpha"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_missing_database_directory_fails() {
        let toml = r#"
[registry]
listen = "127.0.0.1:5559"

[[node]]
name = "alpha"
database = "/nonexistent/meshchat/alpha.redb"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DatabasePathInvalid(_))));
    }
}
