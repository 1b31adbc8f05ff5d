// Whisper ASR data models
//
// This module contains the request and response types used by the HTTP API.
// Response shapes follow the OpenAI transcription endpoint.

use serde::Serialize;
use std::str::FromStr;

use crate::transcript::{Transcription, TranscriptionInfo, Word};

/// Accepted values for the `response_format` form field
pub const VALID_RESPONSE_FORMATS: [&str; 3] = ["json", "text", "verbose_json"];

/// Output format requested by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Json,
    Text,
    VerboseJson,
}

impl FromStr for ResponseFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            "verbose_json" => Ok(Self::VerboseJson),
            other => Err(other.to_string()),
        }
    }
}

/// Request parameters for transcription
#[derive(Debug, Default)]
pub struct TranscriptionParams {
    /// Initial prompt to guide transcription
    pub prompt: Option<String>,
    /// Beam width for this request only
    pub beam_size: Option<u32>,
    /// Output format
    pub response_format: ResponseFormat,
    /// Decoded audio samples
    pub samples: Vec<f32>,
}

/// `json` response body
#[derive(Debug, Serialize)]
pub struct TranscriptionJson {
    pub text: String,
}

impl From<&Transcription> for TranscriptionJson {
    fn from(transcription: &Transcription) -> Self {
        Self {
            text: transcription.text(),
        }
    }
}

/// `verbose_json` response body
#[derive(Debug, Serialize)]
pub struct VerboseTranscriptionJson {
    pub task: &'static str,
    pub language: Option<String>,
    pub duration: f64,
    pub text: String,
    pub words: Vec<Word>,
}

impl VerboseTranscriptionJson {
    pub fn new(transcription: Transcription, info: TranscriptionInfo) -> Self {
        Self {
            task: "transcribe",
            language: info.language,
            duration: info.duration,
            text: transcription.text(),
            words: transcription.words,
        }
    }
}

/// Error response for API
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Optional status information
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::DecodeOptions;

    #[test]
    fn test_response_format_parsing() {
        for format in VALID_RESPONSE_FORMATS {
            assert!(format.parse::<ResponseFormat>().is_ok());
        }
        assert_eq!("text".parse::<ResponseFormat>(), Ok(ResponseFormat::Text));
        assert_eq!("srt".parse::<ResponseFormat>(), Err("srt".to_string()));
        assert_eq!(ResponseFormat::default(), ResponseFormat::Json);
    }

    #[test]
    fn test_verbose_json_shape() {
        let transcription = Transcription::new(vec![Word {
            start: 10.5,
            end: 10.9,
            word: "hello".to_string(),
            probability: 0.5,
        }]);
        let info = TranscriptionInfo {
            language: Some("en".to_string()),
            language_probability: None,
            duration: 2.0,
            options: DecodeOptions::default(),
        };

        let value = serde_json::to_value(VerboseTranscriptionJson::new(transcription, info)).unwrap();

        assert_eq!(value["task"], "transcribe");
        assert_eq!(value["language"], "en");
        assert_eq!(value["text"], "hello");
        assert_eq!(value["words"][0]["start"], 10.5);
        assert_eq!(value["words"][0]["word"], "hello");
    }
}
