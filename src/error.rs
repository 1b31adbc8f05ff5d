// Error handling for Whisper ASR
//
// This module defines the errors returned by the HTTP handlers and how they
// map to responses. Gate rejections live in `security`, model and adapter
// errors in `asr`.

use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::asr::AsrError;
use crate::audio::AudioError;
use crate::models::{ErrorResponse, VALID_RESPONSE_FORMATS};

/// Errors that can occur in the HTTP handlers
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Error when processing multipart form data
    #[error("Form error: {0}")]
    FormError(String),

    /// Error when no audio file was provided
    #[error("No audio file provided in the request")]
    NoAudioFile,

    /// Error when the uploaded audio cannot be decoded
    #[error("Invalid audio: {0}")]
    InvalidAudio(#[from] AudioError),

    /// Error with an invalid response format
    #[error("Invalid response format: {0}. Valid formats are: {formats}", formats = VALID_RESPONSE_FORMATS.join(", "))]
    InvalidResponseFormat(String),

    /// Error with an invalid beam size
    #[error("Invalid beam size: {0}. Must be a positive integer")]
    InvalidBeamSize(String),

    /// Error when a file is too large
    #[error("File too large: {0} bytes exceeds limit of {1} bytes")]
    FileTooLarge(usize, usize),

    /// Error raised by the transcription adapter
    #[error("Transcription failed: {0}")]
    Transcription(#[from] AsrError),
}

impl HandlerError {
    /// Create a new FormError
    pub fn form_error<S: Into<String>>(msg: S) -> Self {
        Self::FormError(msg.into())
    }
}

impl ResponseError for HandlerError {
    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse {
            error: self.to_string(),
            status: None,
        };

        match self {
            HandlerError::NoAudioFile
            | HandlerError::InvalidAudio(_)
            | HandlerError::InvalidResponseFormat(_)
            | HandlerError::InvalidBeamSize(_)
            | HandlerError::FormError(_) => HttpResponse::BadRequest().json(error_response),
            HandlerError::FileTooLarge(_, _) => {
                HttpResponse::PayloadTooLarge().json(error_response)
            }
            HandlerError::Transcription(_) => {
                HttpResponse::InternalServerError().json(error_response)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::ModelError;
    use actix_web::http::StatusCode;

    #[test]
    fn test_client_errors_are_bad_requests() {
        for err in [
            HandlerError::NoAudioFile,
            HandlerError::form_error("broken"),
            HandlerError::InvalidResponseFormat("srt".to_string()),
            HandlerError::InvalidBeamSize("0".to_string()),
            HandlerError::InvalidAudio(AudioError::TruncatedPcm(3)),
            HandlerError::InvalidAudio(AudioError::Empty),
        ] {
            assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_size_and_transcription_errors() {
        assert_eq!(
            HandlerError::FileTooLarge(10, 5).error_response().status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );

        let err = HandlerError::from(AsrError::from(ModelError::Inference("boom".to_string())));
        assert_eq!(err.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Transcription failed: Inference failed: boom");
    }

    #[test]
    fn test_invalid_format_lists_valid_formats() {
        let msg = HandlerError::InvalidResponseFormat("srt".to_string()).to_string();
        assert!(msg.contains("json, text, verbose_json"));
    }
}
