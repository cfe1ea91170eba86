//! # Media Workbench - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento configurazione e override da flag CLI
//! - Costruzione della `JobSession` e dispatch del job richiesto
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (subcommand + flag globali)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose)
//! 3. Carica l'eventuale file di configurazione e applica gli override
//! 4. Valida le opzioni a set chiuso PRIMA di lanciare qualsiasi processo
//! 5. Esegue il job e ritorna exit code non-zero su fallimento
//!
//! ## Esempio di utilizzo:
//! ```bash
//! media-workbench inspect clip.mp4
//! media-workbench loop clip.mp4 --duration 00:02:00 --output loop_video
//! media-workbench trim track.flac --start 00:00:10 --duration 00:01:30
//! media-workbench combine --video v.mp4 --audio a.flac --codec aac
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use media_workbench::console::{ConsoleProgress, SilentProgress, StdinGate};
use media_workbench::jobs::{CombineRequest, LoopRequest, TrimRequest};
use media_workbench::monitor::ProgressSink;
use media_workbench::platform::PlatformCommands;
use media_workbench::{Config, JobRequest, JobSession};

#[derive(Parser)]
#[command(name = "media-workbench")]
#[command(about = "Inspect, loop, trim and mux media files through ffmpeg")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to a JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cancel the job after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Overwrite existing output files without asking
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Probe a media file and print its properties
    Inspect {
        /// Media file to inspect
        file: PathBuf,
    },

    /// Repeat a media file until it covers the target duration
    Loop {
        /// Source media file
        file: PathBuf,

        /// Target duration (HH:MM:SS or seconds)
        #[arg(short, long, default_value = "00:02:00")]
        duration: String,

        /// Output file name, without extension
        #[arg(short, long, default_value = "loop_video")]
        output: String,
    },

    /// Extract a segment from a media file
    Trim {
        /// Source media file
        file: PathBuf,

        /// Segment start (HH:MM:SS or seconds)
        #[arg(short, long)]
        start: String,

        /// Segment duration (HH:MM:SS or seconds)
        #[arg(short, long)]
        duration: String,

        /// Output file name, without extension
        #[arg(short, long, default_value = "trim_audio")]
        output: String,
    },

    /// Mux a video stream with a re-encoded audio stream
    Combine {
        /// Video input file
        #[arg(long)]
        video: PathBuf,

        /// Audio input file
        #[arg(long)]
        audio: PathBuf,

        /// Audio codec (flac, aac)
        #[arg(long, default_value = "aac")]
        codec: String,

        /// Audio sampling rate in Hz (48000, 96000, 128000)
        #[arg(long, default_value = "96000")]
        sampling_rate: String,

        /// Audio bitrate (128k, 256k, 384k)
        #[arg(long, default_value = "384k")]
        bit_rate: String,

        /// Output file name, without extension
        #[arg(short, long, default_value = "combined")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Config file first, CLI flags override
    let mut config = match args.config {
        Some(ref path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    if args.timeout.is_some() {
        config.job_timeout_secs = args.timeout;
    }
    if args.yes {
        config.assume_yes = true;
    }
    config.validate()?;

    if config.ffmpeg_path.is_none() && !PlatformCommands::instance().is_ffmpeg_available().await {
        warn!("ffmpeg not found on PATH; jobs will fail at launch");
    }

    // Closed option sets are validated here, before anything is spawned
    let (request, label) = match args.command {
        Command::Inspect { file } => (JobRequest::Inspect(file), None),
        Command::Loop {
            file,
            duration,
            output,
        } => (
            JobRequest::LoopMedia(LoopRequest {
                input: file,
                output_stem: output,
                duration,
            }),
            Some("Looping Progress"),
        ),
        Command::Trim {
            file,
            start,
            duration,
            output,
        } => (
            JobRequest::TrimMedia(TrimRequest {
                input: file,
                output_stem: output,
                start,
                duration,
            }),
            Some("Trimming Progress"),
        ),
        Command::Combine {
            video,
            audio,
            codec,
            sampling_rate,
            bit_rate,
            output,
        } => (
            JobRequest::CombineAv(CombineRequest {
                video,
                audio,
                codec: codec.parse()?,
                sampling_rate: sampling_rate.parse()?,
                bit_rate: bit_rate.parse()?,
                output_stem: output,
            }),
            Some("Combining Progress"),
        ),
    };

    let sink: Arc<dyn ProgressSink> = match label {
        Some(label) => Arc::new(ConsoleProgress::new(label)),
        None => Arc::new(SilentProgress),
    };

    let session = JobSession {
        gate: Box::new(StdinGate {
            assume_yes: config.assume_yes,
        }),
        sink,
        config,
    };

    request.run(&session).await
}
