//! Session lifecycle and document processing endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::session::GREETING;
use crate::types::response::{ProcessResponse, SessionStatus};
use crate::types::UploadedDocument;

/// Body of the create-session endpoint
#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
    pub greeting: &'static str,
}

/// POST /api/sessions - Start a new idle session
pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionCreated>) {
    let session_id = state.sessions().create();
    (
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id,
            greeting: GREETING,
        }),
    )
}

/// GET /api/sessions/:id - Session status
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionStatus>> {
    let session = state.sessions().get(id)?;
    let status = session.lock().await.status();
    Ok(Json(status))
}

/// DELETE /api/sessions/:id - End a session
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.sessions().remove(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/:id/process - Upload PDFs and rebuild the session's index
pub async fn process_documents(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>> {
    let session = state.sessions().get(id)?;
    let mut documents = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        Error::InvalidRequest(format!("Failed to read multipart field: {}", e))
    })? {
        // Only named, non-empty file parts are documents
        let filename = match field.file_name().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };

        let data = field.bytes().await.map_err(|e| {
            Error::InvalidRequest(format!("Failed to read {}: {}", filename, e))
        })?;

        if data.is_empty() {
            tracing::warn!("Ignoring empty upload: {}", filename);
            continue;
        }

        tracing::info!("Received file: {} ({} bytes)", filename, data.len());
        documents.push(UploadedDocument::new(filename, data));
    }

    let mut session = session.lock().await;
    let outcome = session.process(state.pipeline(), documents).await?;
    Ok(Json(outcome.into()))
}
