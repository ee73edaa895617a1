//! Interview Terminal - a hands-free, voice-driven interview assistant

mod app;
mod chat;
mod session;
mod ui;
mod voice;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::app::{App, AppOptions};
use crate::chat::{DEFAULT_CHAT_URL, DEFAULT_MODEL};
use crate::voice::DEFAULT_TRANSCRIBE_URL;

#[derive(Parser, Debug)]
#[command(name = "interview-terminal")]
#[command(about = "Listens for a spoken question, asks a local model, shows the answer")]
#[command(version)]
struct Args {
    /// Chat completion endpoint (Ollama-compatible /api/chat)
    #[arg(long, default_value = DEFAULT_CHAT_URL)]
    chat_url: String,

    /// Model the chat endpoint should answer with
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Speech transcription endpoint
    #[arg(long, default_value = DEFAULT_TRANSCRIBE_URL)]
    transcribe_url: String,

    /// Language tag forwarded to the transcription service
    #[arg(short, long, default_value = "en-US")]
    language: String,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Run the app
    let mut app = App::new(AppOptions {
        model: args.model,
        chat_url: args.chat_url,
        transcribe_url: args.transcribe_url,
        language: args.language,
    })?;
    app.run().await
}
