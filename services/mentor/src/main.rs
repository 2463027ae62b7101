mod capture;
mod config;
mod playback;
mod session;
mod transcript;

use crate::config::Config;
use crate::session::LiveMentor;
use crate::transcript::Transcript;
use anyhow::{Context, Result};
use clap::Parser;
use mentor_realtime::types::Speaker;
use mentor_realtime::types::audio::Voice;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(version, about = "Voice mentor for semiconductor fabrication")]
struct Cli {
    /// Capture from this input device instead of the system default
    #[arg(long)]
    input_device: Option<String>,
    /// Play through this output device instead of the system default
    #[arg(long)]
    output_device: Option<String>,
    /// Write the session transcript to this file as JSON on exit
    #[arg(long)]
    save_transcript: Option<PathBuf>,
    /// List the available audio devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Configuration loaded successfully. Starting mentor service...");

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();

    if args.list_devices {
        println!("input devices:");
        println!("{}", fabmentor_native_utils::device::get_available_inputs()?);
        println!("output devices:");
        println!("{}", fabmentor_native_utils::device::get_available_outputs()?);
        return Ok(());
    }

    // --- 4. Build the Live Session ---
    let mut live_config = mentor_realtime::Config::builder().with_api_key(&config.gemini_api_key);
    if let Some(model) = &config.model {
        live_config = live_config.with_model(model);
    }
    if let Some(voice) = &config.voice {
        live_config = live_config.with_voice(Voice::from_str(voice)?);
    }

    // Every transcription fragment is echoed to the log and appended to the
    // session transcript, in the order the server produced it.
    let transcript = Arc::new(Mutex::new(Transcript::new()));
    let transcript_sink = transcript.clone();
    let on_transcript = move |text: &str, speaker: Speaker| {
        match speaker {
            Speaker::User => tracing::info!("You: {}", text),
            Speaker::Model => tracing::info!("Mentor: {}", text),
        }
        if let Ok(mut transcript) = transcript_sink.lock() {
            transcript.append(speaker, text);
        }
    };

    let mut mentor = LiveMentor::new(live_config.build(), on_transcript)
        .with_input_device(args.input_device)
        .with_output_device(args.output_device);

    // --- 5. Run Until Interrupted ---
    mentor
        .connect()
        .await
        .context("Failed to start the live session")?;
    tracing::info!("Session starting. Speak into the microphone; press Ctrl-C to quit.");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl-C, shutting down...");
    mentor.disconnect();

    if let Some(path) = args.save_transcript {
        if let Ok(transcript) = transcript.lock() {
            transcript
                .save_json(&path)
                .context("Failed to save transcript")?;
            tracing::info!("Transcript saved to {:?}", path);
        }
    }

    tracing::info!("Shutting down...");
    Ok(())
}
