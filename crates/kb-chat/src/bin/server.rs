//! Chat server binary
//!
//! Run with: cargo run -p kb-chat --bin kb-chat-server

use kb_chat::{config::ChatConfig, server::ChatServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kb_chat=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ChatConfig::load(None)?;

    // Nothing starts without a key
    if let Err(e) = config.require_credential() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                         KB Chat                           ║
║              Chat with your PDF documents                 ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    tracing::info!("Configuration loaded");
    tracing::info!("  - Chat model: {}", config.llm.chat_model);
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!(
        "  - Chunk size: {} (overlap {})",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!(
        "  - Retrieval: top {} by {:?}",
        config.retrieval.top_k,
        config.retrieval.metric
    );

    let server = ChatServer::new(config)?;

    tracing::info!("Checking API at {}...", server.config().llm.base_url);
    if server.health_check().await {
        tracing::info!("API is reachable");
    } else {
        tracing::warn!("API at {} did not answer; requests may fail", server.config().llm.base_url);
    }

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/sessions              - Start a session");
    println!("  POST /api/sessions/:id/process  - Upload PDFs");
    println!("  POST /api/sessions/:id/chat     - Ask questions");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
