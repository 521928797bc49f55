//! Interactive terminal client
//!
//! Run with: cargo run -p kb-chat --bin kb-chat -- docs/

use anyhow::Context;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkdir::WalkDir;

use kb_chat::session::{Pipeline, ProcessOutcome, Session, GREETING};
use kb_chat::{ChatConfig, UploadedDocument};

#[derive(Parser)]
#[command(name = "kb-chat", about = "Chat with your PDF documents", version)]
struct Cli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// PDF files or directories to process before the first question
    paths: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kb_chat=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ChatConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Err(e) = config.require_credential() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let pipeline = Pipeline::from_config(&config)?;
    let mut session = Session::new();

    println!("{}", style("Chat with your PDF 💬").bold());
    println!("{}", style(GREETING).cyan());
    println!(
        "{}",
        style("Type a question, /process PATH... to load PDFs, /history, or /quit").dim()
    );

    if !cli.paths.is_empty() {
        process(&mut session, &pipeline, &cli.paths).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line.split_once(' ').map_or((line, ""), |(cmd, rest)| (cmd, rest.trim())) {
            ("", _) => continue,
            ("/quit" | "/exit", _) => break,
            ("/history", _) => print_history(&session),
            ("/process", args) => {
                let paths: Vec<PathBuf> = args.split_whitespace().map(PathBuf::from).collect();
                process(&mut session, &pipeline, &paths).await;
            }
            _ => ask(&mut session, line).await,
        }
    }

    Ok(())
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Expand directories into the PDFs they contain
fn collect_pdfs(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_pdf(e.path()))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    files
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

async fn process(session: &mut Session, pipeline: &Pipeline, paths: &[PathBuf]) {
    let mut documents = Vec::new();
    for path in collect_pdfs(paths) {
        match UploadedDocument::from_path(&path).await {
            Ok(doc) => documents.push(doc),
            Err(e) => {
                println!("{} {}: {}", style("✗").red(), path.display(), e);
                return;
            }
        }
    }

    let pb = spinner("Processing...");
    let result = session.process(pipeline, documents).await;
    pb.finish_and_clear();

    match result {
        Ok(ProcessOutcome::Rejected { warning }) => println!("{}", style(warning).yellow()),
        Ok(ProcessOutcome::Processed(summary)) => {
            for doc in &summary.documents {
                println!("{} {} ({} pages)", style("✓").green(), doc.filename, doc.pages);
            }
            for skipped in &summary.skipped {
                println!("{} {}: {}", style("!").yellow(), skipped.filename, skipped.error);
            }
            println!(
                "Indexed {} chunks in {}ms. Ask away.",
                summary.total_chunks, summary.processing_time_ms
            );
        }
        Err(e) => println!("{} {}", style("Processing failed:").red(), e),
    }
}

async fn ask(session: &mut Session, question: &str) {
    let pb = spinner("Analyzing...");
    let result = session.ask(question).await;
    pb.finish_and_clear();

    match result {
        Ok(answer) => println!("{}", answer.text),
        Err(kb_chat::Error::NoActiveConversation) => println!(
            "{}",
            style("No documents processed yet. Use /process PATH... first.").yellow()
        ),
        Err(e) => println!("{} {}", style("Error:").red(), e),
    }
}

fn print_history(session: &Session) {
    if session.history().is_empty() {
        println!("{}", style("No questions yet.").dim());
        return;
    }
    for turn in session.history() {
        println!("{} {}", style("You:").bold(), turn.question);
        println!("{} {}\n", style("Bot:").bold().cyan(), turn.answer);
    }
}
