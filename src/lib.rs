// Whisper ASR Library
//
// This crate provides an HTTP API for speech-to-text with whisper.cpp.
// Blocking inference is offloaded from the async request path, and an optional
// bearer token gate protects every endpoint.

pub mod asr;
pub mod audio;
pub mod config;
pub mod config_loader;
pub mod config_validator;
pub mod error;
pub mod file_utils;
pub mod handlers;
pub mod models;
pub mod security;
pub mod transcript;
pub mod whisper_cli;

// Re-export common types for easier access
pub use asr::{AsrError, DecodeOptions, ModelError, ModelRequest, SpeechModel, WhisperAsr};
pub use audio::AudioSegment;
pub use config::{AppConfig, HandlerConfig, ServerConfig, WhisperConfig};
pub use error::HandlerError;
pub use security::{AccessGate, ApiKey, AuthError};
pub use transcript::{Segment, Transcription, TranscriptionInfo, Word};
pub use whisper_cli::WhisperCli;
