pub mod analyze;
pub mod config;

pub use analyze::*;
pub use config::*;

use crate::error::AppError;
use actix_web::HttpRequest;

/// Fallback for unknown routes, so they answer in the same JSON shape.
pub async fn not_found(req: HttpRequest) -> Result<actix_web::HttpResponse, AppError> {
    Err(AppError::NotFound(format!("{} {}", req.method(), req.path())))
}
