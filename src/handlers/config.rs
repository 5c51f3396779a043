use crate::{config::AppConfig, error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

fn config_json(config: &AppConfig) -> serde_json::Value {
    json!({
        "server": {
            "host": config.server.host,
            "port": config.server.port
        },
        "upload": {
            "max_body_bytes": config.upload.max_body_bytes,
            "temp_dir": config.upload.temp_dir,
            "resolved_temp_dir": config.upload.temp_dir_path().display().to_string()
        },
        "analysis": {
            "backend": config.analysis.backend,
            "timeout_seconds": config.analysis.timeout_seconds
        }
    })
}

/// ## Endpoint: `GET /api/v1/config`
pub async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": config_json(&config)
    })))
}

/// ## Endpoint: `PUT /api/v1/config`
///
/// Partial update, e.g. `{"analysis": {"timeout_seconds": 30}}`. Host and port
/// changes are stored but only take effect on restart.
pub async fn update_config(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, AppError> {
    let json_str = serde_json::to_string(&body.into_inner())?;

    let mut current_config = state.get_config();
    current_config
        .update_from_json(&json_str)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    state
        .update_config(current_config.clone())
        .map_err(AppError::ValidationError)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Configuration updated successfully",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "updated_config": config_json(&current_config)
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_update_then_read() {
        let state = AppState::new(AppConfig::default()).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/config", web::get().to(get_config))
                .route("/config", web::put().to(update_config)),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/config")
            .set_json(json!({"upload": {"max_body_bytes": 1024}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.get_config().upload.max_body_bytes, 1024);

        let req = test::TestRequest::get().uri("/config").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["config"]["upload"]["max_body_bytes"], 1024);
        assert_eq!(body["config"]["analysis"]["backend"], "canned");
    }

    #[actix_web::test]
    async fn test_invalid_update_is_rejected() {
        let state = AppState::new(AppConfig::default()).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/config", web::put().to(update_config)),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/config")
            .set_json(json!({"analysis": {"timeout_seconds": 0}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["code"], "validation_error");
        assert_eq!(state.get_config().analysis.timeout_seconds, 60);
    }

    #[actix_web::test]
    async fn test_temp_dir_redirect_is_rejected() {
        let state = AppState::new(AppConfig::default()).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/config", web::put().to(update_config)),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/config")
            .set_json(json!({"upload": {"temp_dir": "/etc"}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.get_config().upload.temp_dir, "");
    }
}
