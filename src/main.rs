use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use geoquiz::gen::{GenConfig, ImageClient, LocationClient};
use geoquiz::quiz::{GamePhase, SessionConfig, SessionHandle};
use geoquiz::tui;

#[derive(Parser, Debug)]
#[command(name = "geoquiz")]
#[command(about = "AI-generated geography quiz in the terminal")]
struct Args {
    /// API key for the generation service (falls back to $GEMINI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Base URL of the generation service
    #[arg(long, default_value = "https://generativelanguage.googleapis.com")]
    base_url: String,

    /// Text model used for the location list
    #[arg(long, default_value = "gemini-3-flash-preview")]
    text_model: String,

    /// Image model used for the round photos
    #[arg(long, default_value = "gemini-2.5-flash-image")]
    image_model: String,

    /// Number of rounds per game
    #[arg(short, long, default_value = "10")]
    rounds: usize,

    /// Directory generated photos are saved under
    #[arg(long, default_value = "shots")]
    output_dir: PathBuf,

    /// Log file (the terminal is busy drawing the quiz)
    #[arg(long, default_value = "geoquiz.log")]
    log_file: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let Ok(log_file) = File::create(&args.log_file) else {
        eprintln!("cannot open log file {}", args.log_file.display());
        return ExitCode::FAILURE;
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let api_key = args
        .api_key
        .clone()
        .or_else(|| std::env::var("GEMINI_API_KEY").ok());
    let Some(api_key) = api_key else {
        eprintln!("no API key: pass --api-key or set GEMINI_API_KEY");
        return ExitCode::FAILURE;
    };
    if args.rounds == 0 {
        eprintln!("--rounds must be at least 1");
        return ExitCode::FAILURE;
    }

    let gen_config = GenConfig {
        base_url: args.base_url,
        api_key,
        text_model: args.text_model,
        image_model: args.image_model,
        output_dir: args.output_dir,
        ..GenConfig::default()
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };
    let _guard = runtime.enter();

    let locations = match LocationClient::new(gen_config.clone()) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            eprintln!("failed to build location client: {err}");
            return ExitCode::FAILURE;
        }
    };
    let images = match ImageClient::new(gen_config) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            eprintln!("failed to build image client: {err}");
            return ExitCode::FAILURE;
        }
    };

    let session_config = SessionConfig {
        round_count: args.rounds,
        ..SessionConfig::default()
    };
    let handle = SessionHandle::spawn(locations, images, session_config);
    let state_rx = handle.watch();

    // The UI blocks this thread; the session actor lives on the runtime
    if let Err(err) = tui::run(handle) {
        eprintln!("terminal error: {err}");
        return ExitCode::FAILURE;
    }

    let state = state_rx.borrow();
    if state.phase == GamePhase::Summary {
        println!("Final score: {}/{}", state.score, state.round_count());
    }
    ExitCode::SUCCESS
}
