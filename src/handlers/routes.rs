// API route handlers for Whisper ASR
//
// This module contains the route handlers for the HTTP API.

use actix_multipart::Multipart;
use actix_web::{get, options, post, web, HttpMessage, HttpRequest, HttpResponse};
use log::{error, info};
use std::time::Instant;

use crate::asr::WhisperAsr;
use crate::audio::AudioSegment;
use crate::config::HandlerConfig;
use crate::error::HandlerError;
use crate::handlers::authentication::AuthenticatedKey;
use crate::handlers::form::extract_form_data;
use crate::models::{ResponseFormat, TranscriptionJson, VerboseTranscriptionJson};

/// Handler for transcription requests
///
/// Accepts a multipart form with the audio `file` and optional `prompt`,
/// `beam_size` and `response_format` fields, and answers once the
/// transcription is complete.
#[post("/v1/audio/transcriptions")]
pub async fn create_transcription(
    req: HttpRequest,
    form: Multipart,
    asr: web::Data<WhisperAsr>,
    config: web::Data<HandlerConfig>,
) -> Result<HttpResponse, HandlerError> {
    let start_time = Instant::now();
    let params = extract_form_data(form, &config).await?;

    let audio = AudioSegment::new(params.samples, 0.0);
    let authenticated = req.extensions().contains::<AuthenticatedKey>();
    info!(
        "Transcription request for {} (authenticated: {})",
        audio, authenticated
    );

    let (transcription, transcription_info) = asr
        .transcribe(&audio, params.prompt.as_deref(), params.beam_size)
        .await
        .map_err(|e| {
            error!("Transcription of {} failed: {}", audio, e);
            HandlerError::from(e)
        })?;

    info!(
        "Request for {} served in {:.2} seconds",
        audio,
        start_time.elapsed().as_secs_f64()
    );

    let response = match params.response_format {
        ResponseFormat::Json => HttpResponse::Ok().json(TranscriptionJson::from(&transcription)),
        ResponseFormat::Text => HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .body(transcription.text()),
        ResponseFormat::VerboseJson => HttpResponse::Ok().json(VerboseTranscriptionJson::new(
            transcription,
            transcription_info,
        )),
    };

    Ok(response)
}

/// Liveness probe
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().content_type("text/plain").body("OK")
}

/// Handler for OPTIONS requests to the transcription endpoint
///
/// Returns the available HTTP methods and CORS headers. OPTIONS requests are
/// not subject to authentication.
#[options("/v1/audio/transcriptions")]
pub async fn transcription_options() -> HttpResponse {
    let allowed_methods = "OPTIONS, POST";

    HttpResponse::Ok()
        .append_header(("Allow", allowed_methods))
        .append_header(("Access-Control-Allow-Methods", allowed_methods))
        .append_header((
            "Access-Control-Allow-Headers",
            "Authorization, Content-Type",
        ))
        .append_header(("Access-Control-Max-Age", "86400")) // Cache preflight for 24 hours
        .finish()
}
