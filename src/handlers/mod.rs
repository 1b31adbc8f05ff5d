// Whisper ASR HTTP handlers
//
// This module contains the HTTP handlers and the authentication middleware.

pub mod authentication;
pub mod form;
pub mod routes;

use actix_web::web;

// Re-export handlers for easier access
pub use self::routes::{create_transcription, health, transcription_options};
// Re-export authentication middleware
pub use self::authentication::{AuthenticatedKey, Authentication};

/// Register every route on an app or scope
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_transcription)
        .service(transcription_options)
        .service(health);
}
