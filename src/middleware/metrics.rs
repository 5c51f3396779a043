use crate::state::AppState;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    web, Error,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    time::Instant,
};

/// Counts every request and records per-endpoint timings in [`AppState`].
///
/// Uploads refused for size are also counted here, since the body limit
/// answers before any handler runs.
pub struct MetricsMiddleware;

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService { service }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        // Use the route pattern when one matched so ids in paths don't split
        // the metrics; unmatched paths are grouped together.
        let route = req
            .match_pattern()
            .unwrap_or_else(|| "<unmatched>".to_string());
        let endpoint = format!("{} {}", req.method(), route);
        let app_state = req.app_data::<web::Data<AppState>>().cloned();

        if let Some(state) = &app_state {
            state.increment_request_count();
        }

        let fut = self.service.call(req);

        Box::pin(async move {
            let result = fut.await;
            let duration_ms = start_time.elapsed().as_millis() as u64;

            let status = match &result {
                Ok(response) => response.status(),
                Err(err) => err.as_response_error().status_code(),
            };
            let is_error = status.is_client_error() || status.is_server_error();

            if let Some(state) = app_state {
                state.record_endpoint_request(&endpoint, duration_ms, is_error);
                if is_error {
                    state.increment_error_count();
                }
                if status == StatusCode::PAYLOAD_TOO_LARGE {
                    state.record_oversized_upload();
                }
            }

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::middleware::BodyLimit;
    use actix_web::{test, App, HttpResponse};

    #[actix_web::test]
    async fn test_counts_by_route_pattern_and_oversize() {
        let mut config = AppConfig::default();
        config.upload.max_body_bytes = 8;
        let state = AppState::new(config).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .wrap(BodyLimit)
                .wrap(MetricsMiddleware)
                .route("/items/{id}", web::post().to(HttpResponse::Ok)),
        )
        .await;

        for id in ["1", "2"] {
            let req = test::TestRequest::post()
                .uri(&format!("/items/{id}"))
                .to_request();
            test::call_service(&app, req).await;
        }
        let req = test::TestRequest::post()
            .uri("/items/3")
            .insert_header(("content-length", "64"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let metrics = state.get_metrics_snapshot();
        assert_eq!(metrics.request_count, 3);
        assert_eq!(metrics.error_count, 1);
        assert_eq!(metrics.uploads_too_large, 1);
        let items = &metrics.endpoint_metrics["POST /items/{id}"];
        assert_eq!(items.request_count, 3);
    }
}
