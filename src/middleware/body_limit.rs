//! Request body size guard.
//!
//! Rejects a request whose declared `Content-Length` exceeds
//! `upload.max_body_bytes` with a 413 JSON error, before any handler (and so
//! any validation or file write) runs. Bodies sent without a length, such as
//! chunked uploads, are capped again by the multipart reader while streaming.

use crate::error::AppError;
use crate::state::AppState;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::CONTENT_LENGTH,
    web, Error, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use tracing::warn;

pub struct BodyLimit;

impl<S, B> Transform<S, ServiceRequest> for BodyLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = BodyLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BodyLimitMiddleware { service }))
    }
}

pub struct BodyLimitMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for BodyLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let limit = req
            .app_data::<web::Data<AppState>>()
            .map(|state| state.get_config().upload.max_body_bytes);

        let declared = req
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());

        if let (Some(limit), Some(declared)) = (limit, declared) {
            if declared > limit as u64 {
                warn!(
                    path = %req.path(),
                    declared_bytes = declared,
                    limit_bytes = limit,
                    "Rejecting oversized request"
                );
                let response = AppError::PayloadTooLarge { limit }.error_response();
                let (request, _payload) = req.into_parts();
                return Box::pin(async move {
                    Ok(ServiceResponse::new(request, response).map_into_right_body())
                });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}
