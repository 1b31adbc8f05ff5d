use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;

use whisper_asr::config::{api_key_from_env, AppConfig};
use whisper_asr::config_loader::load_config;
use whisper_asr::config_validator::ConfigValidator;
use whisper_asr::handlers::{self, Authentication};
use whisper_asr::{AccessGate, WhisperAsr, WhisperCli};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if std::env::args().skip(1).any(|arg| arg == "--sample-config") {
        print!("{}", ConfigValidator::generate_sample_config());
        return Ok(());
    }

    // Initialize logger
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // Config file values fill in missing environment variables
    load_config();

    let validation = ConfigValidator::validate_environment();
    if !validation.is_valid() {
        error!("Invalid configuration, refusing to start");
        std::process::exit(1);
    }

    let config = AppConfig::from_env();

    if let Err(e) = config.whisper.ensure_temp_dir() {
        warn!(
            "Failed to create temp directory {}: {}",
            config.whisper.temp_dir, e
        );
    }

    // The gate is chosen once here and never re-evaluated
    let gate = Arc::new(AccessGate::from_api_key(api_key_from_env()));

    let model = Arc::new(WhisperCli::new(&config.whisper));
    let asr = WhisperAsr::new(model, config.decode.clone());

    let server = config.server.clone();
    let handler_config = config.handler.clone();

    info!("Starting Whisper ASR server on http://{}", server.bind_address());
    info!("Using temp directory: {}", config.whisper.temp_dir);
    info!("Whisper command: {}", config.whisper.command_path);
    info!("Whisper model: {}", config.whisper.model_path);
    info!("Default decoding options: {:?}", config.decode);
    info!("Authentication enabled: {}", gate.is_enabled());

    HttpServer::new(move || {
        App::new()
            .wrap(Authentication::new(Arc::clone(&gate)))
            .wrap(Logger::default())
            .app_data(web::Data::new(asr.clone()))
            .app_data(web::Data::new(handler_config.clone()))
            .configure(handlers::configure)
    })
    .workers(server.worker_count())
    .bind(server.bind_address())?
    .client_disconnect_timeout(Duration::from_secs(server.timeout))
    .keep_alive(Duration::from_secs(server.keep_alive))
    .run()
    .await
}
