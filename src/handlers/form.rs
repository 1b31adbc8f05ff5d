// Form data processing for Whisper ASR
//
// This module handles the extraction of multipart form data for transcription
// requests: the audio file and the optional decoding parameters.

use actix_multipart::{Field, Multipart};
use futures::{StreamExt, TryStreamExt};
use log::debug;

use crate::audio::decode_upload;
use crate::config::HandlerConfig;
use crate::error::HandlerError;
use crate::models::{ResponseFormat, TranscriptionParams};

/// Read a text field into a trimmed string
async fn read_text_field(field: &mut Field, name: &str) -> Result<String, HandlerError> {
    let mut value = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| {
            HandlerError::form_error(format!("Error reading field {}: {}", name, e))
        })?;
        value.extend_from_slice(&chunk);
    }

    String::from_utf8(value)
        .map(|s| s.trim().to_string())
        .map_err(|_| HandlerError::form_error(format!("Field {} is not valid UTF-8", name)))
}

/// Read the uploaded file, enforcing the size limit
async fn read_file_field(field: &mut Field, max_file_size: usize) -> Result<Vec<u8>, HandlerError> {
    let mut total_size = 0;
    let mut file_data = Vec::new();

    while let Some(chunk) = field.next().await {
        let data = chunk.map_err(|e| {
            HandlerError::form_error(format!("Error processing file upload: {}", e))
        })?;

        total_size += data.len();
        if total_size > max_file_size {
            return Err(HandlerError::FileTooLarge(total_size, max_file_size));
        }

        file_data.extend_from_slice(&data);
    }

    Ok(file_data)
}

/// Parse a beam size form value; it must be a positive integer
pub fn parse_beam_size(value: &str) -> Result<u32, HandlerError> {
    match value.parse::<u32>() {
        Ok(beam_size) if beam_size > 0 => Ok(beam_size),
        _ => Err(HandlerError::InvalidBeamSize(value.to_string())),
    }
}

/// Extract and process multipart form data for transcription requests
///
/// # Arguments
///
/// * `form` - The multipart form from the HTTP request
/// * `config` - Handler configuration
///
/// # Returns
///
/// * `Result<TranscriptionParams, HandlerError>` - Extracted parameters with decoded audio, or an error
pub async fn extract_form_data(
    mut form: Multipart,
    config: &HandlerConfig,
) -> Result<TranscriptionParams, HandlerError> {
    let mut params = TranscriptionParams::default();
    let mut audio: Option<Vec<u8>> = None;

    while let Some(mut field) = form
        .try_next()
        .await
        .map_err(|e| HandlerError::form_error(format!("Invalid multipart form: {}", e)))?
    {
        let field_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|name| name.to_string()))
            .unwrap_or_default();

        match field_name.as_str() {
            "prompt" | "beam_size" | "response_format" => {
                let value = read_text_field(&mut field, &field_name).await?;
                if value.is_empty() {
                    continue;
                }
                match field_name.as_str() {
                    "prompt" => params.prompt = Some(value),
                    "beam_size" => params.beam_size = Some(parse_beam_size(&value)?),
                    "response_format" => {
                        params.response_format = value
                            .parse::<ResponseFormat>()
                            .map_err(HandlerError::InvalidResponseFormat)?;
                    }
                    _ => {}
                }
            }
            "file" => {
                let data = read_file_field(&mut field, config.max_file_size).await?;
                debug!("Received audio upload of {} bytes", data.len());
                audio = Some(data);
            }
            _ => {
                // Skip unknown fields
                while field.next().await.is_some() {}
            }
        }
    }

    let audio = audio.ok_or(HandlerError::NoAudioFile)?;
    params.samples = decode_upload(&audio)?;

    Ok(params)
}
