// Whisper ASR configuration
//
// This module contains configuration structures and constants for the service.
// Every value comes from an environment variable with a default; the optional
// config file is applied to the environment beforehand (see `config_loader`).

use std::env;

use crate::asr::{self, DecodeOptions};

/// Default values for configuration
pub mod defaults {
    // Server bind address
    pub const HOST: &str = "127.0.0.1";
    pub const PORT: u16 = 8181;

    // Client disconnect timeout and keep-alive, in seconds
    pub const TIMEOUT: u64 = 480;
    pub const KEEPALIVE: u64 = 480;

    // 0 means one worker per CPU
    pub const WORKERS: usize = 0;

    // whisper.cpp binary and model
    pub const COMMAND_PATH: &str = "whisper-cli";
    pub const MODEL_PATH: &str = "models/ggml-large-v3.bin";

    // Name of the scratch folder under the system temp dir
    pub const TEMP_DIR_NAME: &str = "whisper_asr";

    // Maximum upload size (512MB)
    pub const MAX_FILE_SIZE: usize = 536870912;
}

/// Environment variable names
pub mod keys {
    pub const HOST: &str = "WHISPER_API_HOST";
    pub const PORT: &str = "WHISPER_API_PORT";
    pub const TIMEOUT: &str = "WHISPER_API_TIMEOUT";
    pub const KEEPALIVE: &str = "WHISPER_API_KEEPALIVE";
    pub const WORKERS: &str = "HTTP_WORKER_NUMBER";
    pub const API_KEY: &str = "API_KEY";
    pub const COMMAND_PATH: &str = "WHISPER_CMD";
    pub const MODEL_PATH: &str = "WHISPER_MODEL_PATH";
    pub const TEMP_DIR: &str = "WHISPER_TMP_FILES";
    pub const LANGUAGE: &str = "WHISPER_LANGUAGE";
    pub const BEAM_SIZE: &str = "WHISPER_BEAM_SIZE";
    pub const BEST_OF: &str = "WHISPER_BEST_OF";
    pub const TEMPERATURE: &str = "WHISPER_TEMPERATURE";
    pub const THREADS: &str = "WHISPER_THREADS";
    pub const MAX_FILE_SIZE: &str = "MAX_FILE_SIZE";
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// HTTP server settings
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Client disconnect timeout in seconds
    pub timeout: u64,
    /// Keep-alive in seconds
    pub keep_alive: u64,
    /// Number of HTTP workers, 0 for one per CPU
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: env_string(keys::HOST, defaults::HOST),
            port: env_parse(keys::PORT, defaults::PORT),
            timeout: env_parse(keys::TIMEOUT, defaults::TIMEOUT),
            keep_alive: env_parse(keys::KEEPALIVE, defaults::KEEPALIVE),
            workers: env_parse(keys::WORKERS, defaults::WORKERS),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Worker count with the 0 placeholder resolved
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }
}

/// Settings for the whisper.cpp backend
#[derive(Clone, Debug)]
pub struct WhisperConfig {
    /// Path to the whisper-cli binary
    pub command_path: String,
    /// Path to the ggml model file
    pub model_path: String,
    /// Directory for per-call scratch files
    pub temp_dir: String,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        let default_temp_dir = env::temp_dir().join(defaults::TEMP_DIR_NAME);
        Self {
            command_path: env_string(keys::COMMAND_PATH, defaults::COMMAND_PATH),
            model_path: env_string(keys::MODEL_PATH, defaults::MODEL_PATH),
            temp_dir: env_string(keys::TEMP_DIR, &default_temp_dir.to_string_lossy()),
        }
    }
}

impl WhisperConfig {
    /// Ensures the scratch directory exists
    pub fn ensure_temp_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.temp_dir)
    }
}

/// Base decoding options from the environment
pub fn decode_options_from_env() -> DecodeOptions {
    let fallback = DecodeOptions::default();
    DecodeOptions {
        beam_size: env_parse(keys::BEAM_SIZE, asr::defaults::BEAM_SIZE),
        best_of: env_parse(keys::BEST_OF, asr::defaults::BEST_OF),
        temperature: env_parse(keys::TEMPERATURE, asr::defaults::TEMPERATURE),
        language: env::var(keys::LANGUAGE)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        threads: env_parse(keys::THREADS, fallback.threads),
    }
}

/// Configuration for the HTTP handlers
#[derive(Clone, Debug)]
pub struct HandlerConfig {
    /// Maximum accepted upload size in bytes
    pub max_file_size: usize,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            max_file_size: env_parse(keys::MAX_FILE_SIZE, defaults::MAX_FILE_SIZE),
        }
    }
}

/// The configured API key, read once at startup
pub fn api_key_from_env() -> Option<String> {
    env::var(keys::API_KEY).ok()
}

/// Everything the service reads at startup
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub whisper: WhisperConfig,
    pub handler: HandlerConfig,
    pub decode: DecodeOptions,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::default(),
            whisper: WhisperConfig::default(),
            handler: HandlerConfig::default(),
            decode: decode_options_from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parse_falls_back_on_garbage() {
        env::set_var("WHISPER_ASR_TEST_PARSE_GARBAGE", "not-a-number");
        assert_eq!(env_parse("WHISPER_ASR_TEST_PARSE_GARBAGE", 7u32), 7);
        env::remove_var("WHISPER_ASR_TEST_PARSE_GARBAGE");
    }

    #[test]
    fn test_env_parse_reads_value() {
        env::set_var("WHISPER_ASR_TEST_PARSE_VALUE", " 42 ");
        assert_eq!(env_parse("WHISPER_ASR_TEST_PARSE_VALUE", 7u32), 42);
        env::remove_var("WHISPER_ASR_TEST_PARSE_VALUE");
    }

    #[test]
    fn test_worker_count_resolves_zero() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 9000,
            timeout: 1,
            keep_alive: 1,
            workers: 0,
        };
        assert_eq!(config.worker_count(), num_cpus::get());
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(ServerConfig { workers: 3, ..config }.worker_count(), 3);
    }
}
