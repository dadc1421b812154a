use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::config::schema::PortalConfig;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/portal-config-v1.json");

/// Names a config file explicitly.
pub const CONFIG_ENV: &str = "PLANPORTAL_CONFIG";
/// Overrides `data_directory`.
pub const DATA_DIR_ENV: &str = "PLANPORTAL_DATA_DIR";
/// Overrides `bind_address`.
pub const BIND_ENV: &str = "PLANPORTAL_BIND";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PortalConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<PortalConfig, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: PortalConfig = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// The config file to read: `PLANPORTAL_CONFIG` if set, else
/// `~/.planportal/config.json` when it exists.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".planportal").join("config.json"))
        .filter(|path| path.is_file())
}

/// Loads the resolved config file (or the defaults when there is none) and
/// applies environment overrides.
pub fn load_from_environment() -> Result<PortalConfig, ConfigError> {
    let mut config = match resolve_config_path() {
        Some(path) => {
            log::info!("Loading configuration from {}", path.display());
            load_config(&path)?
        }
        None => {
            log::info!("No configuration file found, using defaults");
            PortalConfig::default()
        }
    };

    apply_overrides(&mut config, |name| std::env::var(name).ok());
    validate_config(&config)?;
    Ok(config)
}

/// Applies `PLANPORTAL_DATA_DIR` and `PLANPORTAL_BIND` from `lookup`.
pub fn apply_overrides<F>(config: &mut PortalConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        config.data_directory = dir;
    }
    if let Some(bind) = lookup(BIND_ENV).filter(|v| !v.is_empty()) {
        config.bind_address = bind;
    }
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &PortalConfig) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.data_directory.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "data_directory must not be empty".to_string(),
        });
    }

    if config.bind_address.parse::<SocketAddr>().is_err() {
        return Err(ConfigError::Validation {
            message: format!("Invalid bind_address: {}", config.bind_address),
        });
    }

    if config.max_upload_bytes == 0 {
        return Err(ConfigError::Validation {
            message: "max_upload_bytes must be positive".to_string(),
        });
    }

    if config.property_api.enabled && config.property_api.base_url.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "property_api.base_url is required when the property API is enabled"
                .to_string(),
        });
    }

    Ok(())
}
