//! # Tajweed Gateway
//!
//! A recitation feedback service and the client that talks to it.
//!
//! A reciter types the ayah they are about to recite, records themselves, and
//! the recording is posted together with the ayah to `POST /analyze-tajweed`.
//! The gateway validates the submission, hands it to an analyzer, and answers
//! with a three-section report: the error identified, the practical
//! correction, and the Tajweed rule that applies.
//!
//! ## Application Architecture:
//! - **submission**: validation rules shared by client and gateway
//! - **report**: the three-section report and the response schema
//! - **config**: configuration (TOML file + environment variables)
//! - **state**: shared state, metrics and the analyzer
//! - **handlers**: HTTP request handlers
//! - **storage**: temporary files for in-flight uploads
//! - **audio**: container detection for uploaded recordings
//! - **analysis**: the analyzer trait and its backends
//! - **middleware**: request logging, metrics, body size limit
//! - **health**: health and metrics endpoints
//! - **error**: the gateway error type and its JSON responses
//! - **client**: the record → submit → render state machine

pub mod analysis;
pub mod audio;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod report;
pub mod state;
pub mod storage;
pub mod submission;

use actix_web::web;
use error::AppError;

/// Path of the analysis endpoint.
pub const ANALYZE_PATH: &str = "/analyze-tajweed";

/// Register every route. Shared by `main` and the tests so both serve the
/// same surface.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .route(ANALYZE_PATH, web::post().to(handlers::analyze_tajweed))
    .route("/health", web::get().to(health::health_check))
    .service(
        web::scope("/api/v1")
            .route(ANALYZE_PATH, web::post().to(handlers::analyze_tajweed))
            .route("/health", web::get().to(health::health_check))
            .route("/metrics", web::get().to(health::detailed_metrics))
            .route("/config", web::get().to(handlers::get_config))
            .route("/config", web::put().to(handlers::update_config)),
    )
    .default_service(web::to(handlers::not_found));
}
