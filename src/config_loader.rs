// Configuration loader for Whisper ASR
//
// This module handles loading configuration from the TOML configuration file
// and environment variables with appropriate precedence.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use toml::{Table, Value};

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_FILE_PATH: &str = "whisper_asr.conf";

/// Environment variable overriding the configuration file location
pub const CONFIG_PATH_ENV: &str = "WHISPER_ASR_CONFIG";

/// Loads the configuration file into the environment
///
/// Configuration precedence (highest to lowest):
/// 1. Environment variables
/// 2. Configuration file values
/// 3. Default values (see `config::defaults`)
///
/// # Returns
///
/// Returns true if the config file was successfully loaded, false otherwise
pub fn load_config() -> bool {
    let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE_PATH.to_string());
    load_config_from(Path::new(&path))
}

/// Loads a specific configuration file into the environment
pub fn load_config_from(config_path: &Path) -> bool {
    if !config_path.exists() {
        debug!("Configuration file not found at: {}", config_path.display());
        return false;
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read configuration file: {}", e);
            return false;
        }
    };

    let config_map = match parse_flat_toml(&config_content) {
        Some(map) => map,
        None => return false,
    };

    // Set environment variables from config file if they don't already exist
    for (key, value) in config_map {
        if env::var(&key).is_err() {
            // The API key is never echoed to the log
            if key == crate::config::keys::API_KEY {
                debug!("Setting env var from config file: {} = ***", key);
            } else {
                debug!("Setting env var from config file: {} = {}", key, value);
            }
            env::set_var(key, value);
        } else {
            debug!("Env var already exists, skipping: {}", key);
        }
    }

    info!("Configuration loaded from {}", config_path.display());
    true
}

/// Flatten a TOML document into string key-value pairs
///
/// Only top-level scalars are kept; arrays and tables are skipped.
fn parse_flat_toml(content: &str) -> Option<HashMap<String, String>> {
    let table: Table = match toml::from_str(content) {
        Ok(table) => table,
        Err(e) => {
            warn!("Failed to parse configuration file: {}", e);
            return None;
        }
    };

    let mut config_map = HashMap::new();

    for (key, value) in table {
        match value {
            Value::String(s) => {
                config_map.insert(key, s);
            }
            Value::Integer(i) => {
                config_map.insert(key, i.to_string());
            }
            Value::Float(f) => {
                config_map.insert(key, f.to_string());
            }
            Value::Boolean(b) => {
                config_map.insert(key, b.to_string());
            }
            _ => {
                warn!("Skipping unsupported TOML value type for key: {}", key);
            }
        }
    }

    Some(config_map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn write_config(content: &str) -> std::path::PathBuf {
        let path = env::temp_dir().join(format!("whisper_asr_{}.conf", Uuid::new_v4()));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_flat_toml_keeps_scalars() {
        let map = parse_flat_toml(
            r#"
            WHISPER_API_PORT = 9000
            WHISPER_TEMPERATURE = 0.2
            WHISPER_CMD = "/opt/whisper-cli"
            ENABLED = true
            LIST = [1, 2]
            "#,
        )
        .unwrap();

        assert_eq!(map["WHISPER_API_PORT"], "9000");
        assert_eq!(map["WHISPER_TEMPERATURE"], "0.2");
        assert_eq!(map["WHISPER_CMD"], "/opt/whisper-cli");
        assert_eq!(map["ENABLED"], "true");
        assert!(!map.contains_key("LIST"));
    }

    #[test]
    fn test_parse_invalid_toml() {
        assert!(parse_flat_toml("this is = = not toml").is_none());
    }

    #[test]
    fn test_missing_file_is_not_loaded() {
        assert!(!load_config_from(Path::new("/nonexistent/whisper_asr.conf")));
    }

    #[test]
    fn test_file_values_do_not_override_environment() {
        env::set_var("WHISPER_ASR_LOADER_TEST_EXISTING", "from-env");
        env::remove_var("WHISPER_ASR_LOADER_TEST_NEW");
        let path = write_config(
            r#"
            WHISPER_ASR_LOADER_TEST_EXISTING = "from-file"
            WHISPER_ASR_LOADER_TEST_NEW = "from-file"
            "#,
        );

        assert!(load_config_from(&path));
        assert_eq!(env::var("WHISPER_ASR_LOADER_TEST_EXISTING").unwrap(), "from-env");
        assert_eq!(env::var("WHISPER_ASR_LOADER_TEST_NEW").unwrap(), "from-file");

        env::remove_var("WHISPER_ASR_LOADER_TEST_EXISTING");
        env::remove_var("WHISPER_ASR_LOADER_TEST_NEW");
        fs::remove_file(path).unwrap();
    }
}
