//! Print routes

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/print", post(handler::submit))
        .route("/api/print/jobs", get(handler::list_jobs))
        .route("/api/print/jobs/{id}", get(handler::get_job))
}
