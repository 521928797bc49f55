//! API routes for the chat server

pub mod chat;
pub mod sessions;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/sessions", post(sessions::create_session))
        .route(
            "/sessions/:id",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        // Uploads get a larger body limit
        .route(
            "/sessions/:id/process",
            post(sessions::process_documents).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/sessions/:id/chat", post(chat::chat))
        .route("/sessions/:id/history", get(chat::history))
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "kb-chat",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Chat with your PDFs through retrieval-augmented generation",
        "endpoints": {
            "POST /api/sessions": "Start a session",
            "GET /api/sessions/:id": "Session status",
            "DELETE /api/sessions/:id": "End a session",
            "POST /api/sessions/:id/process": "Upload PDFs and rebuild the index (multipart)",
            "POST /api/sessions/:id/chat": "Ask a question",
            "GET /api/sessions/:id/history": "Conversation turns"
        }
    }))
}
