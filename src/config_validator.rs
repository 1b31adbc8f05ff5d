// Configuration validation module for Whisper ASR
//
// Checks the raw environment values before the service starts so that a
// typo does not silently fall back to a default. The rules live in a single
// parameter registry.

use std::env;
use std::path::Path;

use log::{error, info, warn};

use crate::config::keys;

/// Configuration parameter types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigType {
    String,
    UnsignedInteger,
    Float,
    Port,
    FilePath,
}

/// Validation severity levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidationLevel {
    Critical, // Must be valid for application to start
    Warning,  // Optional, generates warnings only
}

/// Configuration parameter definition
#[derive(Debug, Clone)]
pub struct ConfigParam {
    pub name: &'static str,
    pub description: &'static str,
    pub param_type: ConfigType,
    pub validation_level: ValidationLevel,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

impl ConfigParam {
    const fn new(
        name: &'static str,
        description: &'static str,
        param_type: ConfigType,
        validation_level: ValidationLevel,
    ) -> Self {
        Self {
            name,
            description,
            param_type,
            validation_level,
            min_value: None,
            max_value: None,
        }
    }

    const fn range(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }
}

/// Centralized configuration parameter registry
pub const CONFIG_PARAMS: &[ConfigParam] = &[
    ConfigParam::new(keys::HOST, "Server bind host", ConfigType::String, ValidationLevel::Critical),
    ConfigParam::new(keys::PORT, "Server bind port", ConfigType::Port, ValidationLevel::Critical),
    ConfigParam::new(
        keys::TIMEOUT,
        "Client disconnect timeout in seconds",
        ConfigType::UnsignedInteger,
        ValidationLevel::Critical,
    ),
    ConfigParam::new(
        keys::KEEPALIVE,
        "Keep-alive in seconds",
        ConfigType::UnsignedInteger,
        ValidationLevel::Critical,
    ),
    ConfigParam::new(
        keys::WORKERS,
        "Number of HTTP workers (0 = one per CPU)",
        ConfigType::UnsignedInteger,
        ValidationLevel::Critical,
    )
    .range(0.0, 256.0),
    ConfigParam::new(
        keys::COMMAND_PATH,
        "Path to the whisper-cli binary",
        ConfigType::String,
        ValidationLevel::Critical,
    ),
    ConfigParam::new(
        keys::MODEL_PATH,
        "Path to the ggml model file",
        ConfigType::FilePath,
        ValidationLevel::Warning,
    ),
    ConfigParam::new(
        keys::BEAM_SIZE,
        "Default beam size",
        ConfigType::UnsignedInteger,
        ValidationLevel::Critical,
    )
    .range(1.0, 16.0),
    ConfigParam::new(
        keys::BEST_OF,
        "Default number of candidates when sampling",
        ConfigType::UnsignedInteger,
        ValidationLevel::Critical,
    )
    .range(1.0, 16.0),
    ConfigParam::new(
        keys::TEMPERATURE,
        "Default sampling temperature",
        ConfigType::Float,
        ValidationLevel::Critical,
    )
    .range(0.0, 1.0),
    ConfigParam::new(
        keys::THREADS,
        "Threads used by whisper.cpp",
        ConfigType::UnsignedInteger,
        ValidationLevel::Critical,
    )
    .range(1.0, 256.0),
    ConfigParam::new(
        keys::MAX_FILE_SIZE,
        "Maximum upload size in bytes",
        ConfigType::UnsignedInteger,
        ValidationLevel::Critical,
    )
    .range(1.0, f64::MAX),
];

/// Configuration validation errors with detailed context
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub value: String,
    pub error_type: ConfigErrorType,
    pub message: String,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigErrorType {
    InvalidFormat,
    InvalidRange,
    FileNotFound,
    Insecure,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Configuration error in '{}' ({:?}): {} (value: '{}')",
            self.field, self.error_type, self.message, self.value
        )?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " - Suggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigValidationError {}

/// Result type for configuration validation
pub type ValidationResult<T> = Result<T, ConfigValidationError>;

/// Configuration validation results
#[derive(Debug, Default)]
pub struct ValidationResults {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ConfigValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ConfigValidationError) {
        self.warnings.push(warning);
    }

    pub fn print_summary(&self) {
        if !self.errors.is_empty() {
            error!(
                "Configuration validation found {} error(s):",
                self.errors.len()
            );
            for (i, err) in self.errors.iter().enumerate() {
                error!("  {}. {}", i + 1, err);
            }
        }

        if !self.warnings.is_empty() {
            warn!(
                "Configuration validation found {} warning(s):",
                self.warnings.len()
            );
            for (i, warn) in self.warnings.iter().enumerate() {
                warn!("  {}. {}", i + 1, warn);
            }
        }

        if self.is_valid() && self.warnings.is_empty() {
            info!("Configuration validation passed successfully");
        } else if self.is_valid() {
            info!(
                "Configuration validation passed with {} warning(s)",
                self.warnings.len()
            );
        }
    }
}

/// Helper functions for common validation patterns
pub mod validators {
    use super::*;

    fn invalid(field: &str, value: &str, error_type: ConfigErrorType, message: String, suggestion: String) -> ConfigValidationError {
        ConfigValidationError {
            field: field.to_string(),
            value: value.to_string(),
            error_type,
            message,
            suggestion: Some(suggestion),
        }
    }

    /// Validate a number with an optional inclusive range
    pub fn validate_number(
        field: &str,
        value: &str,
        integer: bool,
        min: Option<f64>,
        max: Option<f64>,
    ) -> ValidationResult<f64> {
        let parsed = if integer {
            value.parse::<u64>().map(|v| v as f64).ok()
        } else {
            value.parse::<f64>().ok().filter(|v| v.is_finite())
        };

        let parsed = parsed.ok_or_else(|| {
            invalid(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                if integer {
                    "Invalid unsigned integer format".to_string()
                } else {
                    "Invalid number format".to_string()
                },
                "Use a valid number".to_string(),
            )
        })?;

        if let Some(min) = min {
            if parsed < min {
                return Err(invalid(
                    field,
                    value,
                    ConfigErrorType::InvalidRange,
                    format!("Value {} is below minimum {}", parsed, min),
                    format!("Use a value >= {}", min),
                ));
            }
        }

        if let Some(max) = max {
            if parsed > max {
                return Err(invalid(
                    field,
                    value,
                    ConfigErrorType::InvalidRange,
                    format!("Value {} is above maximum {}", parsed, max),
                    format!("Use a value <= {}", max),
                ));
            }
        }

        Ok(parsed)
    }

    /// Validate port number
    pub fn validate_port(field: &str, value: &str) -> ValidationResult<u16> {
        let port = value.parse::<u16>().map_err(|_| {
            invalid(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                "Invalid port number format".to_string(),
                "Use a number between 1 and 65535".to_string(),
            )
        })?;

        if port == 0 {
            return Err(invalid(
                field,
                value,
                ConfigErrorType::InvalidRange,
                "Port number cannot be 0".to_string(),
                "Use a port between 1 and 65535".to_string(),
            ));
        }

        Ok(port)
    }

    /// Validate file path exists
    pub fn validate_file_exists(field: &str, value: &str) -> ValidationResult<String> {
        if !Path::new(value).is_file() {
            return Err(invalid(
                field,
                value,
                ConfigErrorType::FileNotFound,
                "File does not exist".to_string(),
                "Ensure the file exists and the path is correct".to_string(),
            ));
        }
        Ok(value.to_string())
    }
}

/// Validates the environment against `CONFIG_PARAMS`
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate every parameter read by the environment lookup `get`
    pub fn validate_with<F>(get: F) -> ValidationResults
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut results = ValidationResults::new();

        for param in CONFIG_PARAMS {
            let value = match get(param.name) {
                Some(value) if !value.trim().is_empty() => value.trim().to_string(),
                // Missing values use their defaults
                _ => continue,
            };

            if let Err(error) = Self::validate_parameter(param, &value) {
                match param.validation_level {
                    ValidationLevel::Critical => results.add_error(error),
                    ValidationLevel::Warning => results.add_warning(error),
                }
            }
        }

        if get(keys::API_KEY).map_or(true, |k| k.is_empty()) {
            results.add_warning(ConfigValidationError {
                field: keys::API_KEY.to_string(),
                value: String::new(),
                error_type: ConfigErrorType::Insecure,
                message: "No API key configured, every request will be accepted".to_string(),
                suggestion: Some(format!("Set {} to require a bearer token", keys::API_KEY)),
            });
        }

        results
    }

    /// Validate the process environment and log a summary
    pub fn validate_environment() -> ValidationResults {
        info!("Validating configuration...");
        let results = Self::validate_with(|key| env::var(key).ok());
        results.print_summary();
        results
    }

    fn validate_parameter(param: &ConfigParam, value: &str) -> ValidationResult<()> {
        match param.param_type {
            ConfigType::String => Ok(()),
            ConfigType::Port => validators::validate_port(param.name, value).map(|_| ()),
            ConfigType::UnsignedInteger => validators::validate_number(
                param.name,
                value,
                true,
                param.min_value,
                param.max_value,
            )
            .map(|_| ()),
            ConfigType::Float => validators::validate_number(
                param.name,
                value,
                false,
                param.min_value,
                param.max_value,
            )
            .map(|_| ()),
            ConfigType::FilePath => validators::validate_file_exists(param.name, value).map(|_| ()),
        }
    }

    /// Sample configuration file listing every parameter
    pub fn generate_sample_config() -> String {
        let mut sample = String::from("# whisper_asr configuration\n");
        sample.push_str("# Environment variables take precedence over this file.\n\n");
        for param in CONFIG_PARAMS {
            sample.push_str(&format!("# {}\n# {} = \"\"\n\n", param.description, param.name));
        }
        sample.push_str(&format!(
            "# Bearer token required on every request (unset = no authentication)\n# {} = \"\"\n",
            keys::API_KEY
        ));
        sample
    }
}
