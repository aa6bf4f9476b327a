//! Print request handlers

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use photo_printer::PrintError;
use uuid::Uuid;

use crate::core::{Result, ServerError, ServerState};
use crate::printing::{PrintAccepted, PrintJob, PrintRequest};

/// POST /api/print
///
/// Every failure, a malformed body included, answers 500 with the generic
/// error body.
pub async fn submit(
    State(state): State<ServerState>,
    payload: std::result::Result<Json<PrintRequest>, JsonRejection>,
) -> Result<Json<PrintAccepted>> {
    let Json(request) = payload.map_err(|e| {
        PrintError::Decode(format!("invalid request body: {}", e.body_text()))
    })?;

    let image_str = request
        .image_str
        .ok_or_else(|| PrintError::Decode("missing imageStr".to_string()))?;

    let job = state.print_service.submit(image_str).await?;
    Ok(Json(PrintAccepted::new(&job)))
}

/// GET /api/print/jobs/{id}
pub async fn get_job(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<PrintJob>> {
    let id = Uuid::parse_str(&id).map_err(|_| ServerError::JobNotFound)?;
    state
        .jobs()
        .get(&id)
        .map(Json)
        .ok_or(ServerError::JobNotFound)
}

/// GET /api/print/jobs
pub async fn list_jobs(State(state): State<ServerState>) -> Json<Vec<PrintJob>> {
    Json(state.jobs().list())
}
