//! Question answering and history endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::response::{ChatResponse, HistoryResponse};
use crate::types::ChatRequest;

/// POST /api/sessions/:id/chat - Ask a question about the processed documents
pub async fn chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let question = request.validated_question()?;
    let session = state.sessions().get(id)?;

    tracing::info!("Question for session {}: {}", id, question);

    let answer = session.lock().await.ask(question).await?;
    Ok(Json(answer.into()))
}

/// GET /api/sessions/:id/history - Turns in ask order
pub async fn history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryResponse>> {
    let session = state.sessions().get(id)?;
    let turns = session.lock().await.history().to_vec();
    Ok(Json(HistoryResponse { turns }))
}
