//! HTTP API
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /api/print | POST | submit a photo |
//! | /api/print/jobs | GET | list jobs, newest first |
//! | /api/print/jobs/{id} | GET | job status |
//! | /health | GET | liveness and platform |

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware as axum_middleware;
use http::{HeaderName, HeaderValue};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::core::ServerState;

pub mod health;
pub mod middleware;
pub mod print;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Router with every route registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(print::router())
        .merge(health::router())
}

/// Fully configured application, used by the server and by in-process tests
pub fn build_app(state: &ServerState) -> Router {
    build_router()
        // Base64 photos are large; the limit comes from config
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .with_state(state.clone())
}
