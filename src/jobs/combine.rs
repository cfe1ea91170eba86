//! # Combine Job Module
//!
//! Muxa uno stream video e uno audio in un unico file: il video viene
//! copiato senza ricodifica, l'audio viene ricodificato con codec, sampling
//! rate e bitrate scelti da set chiusi di opzioni.
//!
//! I set di opzioni sono validati al parse, prima di qualsiasi lancio del
//! processo esterno: un valore fuori lista non arriva mai a ffmpeg.

use crate::error::WorkbenchError;
use crate::jobs::{confirm_output, outcome_to_result, require_file, resolve_output_path, JobSession};
use anyhow::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Audio codecs the combine job can encode to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    Flac,
    Aac,
}

impl FromStr for AudioCodec {
    type Err = WorkbenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flac" => Ok(Self::Flac),
            "aac" => Ok(Self::Aac),
            other => Err(WorkbenchError::InvalidOption(format!(
                "audio codec '{}' (expected flac or aac)",
                other
            ))),
        }
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flac => write!(f, "flac"),
            Self::Aac => write!(f, "aac"),
        }
    }
}

/// Sampling rates offered by the combine job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingRate {
    Hz48000,
    Hz96000,
    Hz128000,
}

impl FromStr for SamplingRate {
    type Err = WorkbenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "48000" => Ok(Self::Hz48000),
            "96000" => Ok(Self::Hz96000),
            "128000" => Ok(Self::Hz128000),
            other => Err(WorkbenchError::InvalidOption(format!(
                "sampling rate '{}' (expected 48000, 96000 or 128000)",
                other
            ))),
        }
    }
}

impl fmt::Display for SamplingRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hz48000 => write!(f, "48000"),
            Self::Hz96000 => write!(f, "96000"),
            Self::Hz128000 => write!(f, "128000"),
        }
    }
}

/// Audio bitrates offered by the combine job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitRate {
    K128,
    K256,
    K384,
}

impl FromStr for BitRate {
    type Err = WorkbenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "128k" => Ok(Self::K128),
            "256k" => Ok(Self::K256),
            "384k" => Ok(Self::K384),
            other => Err(WorkbenchError::InvalidOption(format!(
                "bit rate '{}' (expected 128k, 256k or 384k)",
                other
            ))),
        }
    }
}

impl fmt::Display for BitRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::K128 => write!(f, "128k"),
            Self::K256 => write!(f, "256k"),
            Self::K384 => write!(f, "384k"),
        }
    }
}

/// Parameters for one combine invocation
pub struct CombineRequest {
    pub video: PathBuf,
    pub audio: PathBuf,
    pub codec: AudioCodec,
    pub sampling_rate: SamplingRate,
    pub bit_rate: BitRate,
    /// Output file stem; the video's extension is appended
    pub output_stem: String,
}

impl CombineRequest {
    pub async fn run(self, session: &JobSession) -> Result<()> {
        require_file(&self.video)?;
        require_file(&self.audio)?;

        // Progress total comes from the video; unknown duration degrades to
        // a percentage-less monitor, not an error
        let video_info = session.probe().stream_info(&self.video).await?;
        let total_secs = video_info.duration.unwrap_or(0);

        let output = resolve_output_path(&self.video, &self.output_stem);
        if !confirm_output(session, &output) {
            return Ok(());
        }

        info!(
            "Combining {} + {} ({}, {} Hz, {})",
            self.video.display(),
            self.audio.display(),
            self.codec,
            self.sampling_rate,
            self.bit_rate
        );

        let args = build_combine_args(
            &self.video,
            &self.audio,
            &output,
            self.codec,
            self.sampling_rate,
            self.bit_rate,
        );
        let outcome = session.run_transform(args, total_secs as f64).await;
        outcome_to_result(outcome, &output)
    }
}

/// Fixed argument template for the combine transform: video copied as-is,
/// audio re-encoded with the selected options.
fn build_combine_args(
    video: &Path,
    audio: &Path,
    output: &Path,
    codec: AudioCodec,
    sampling_rate: SamplingRate,
    bit_rate: BitRate,
) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        video.to_string_lossy().to_string(),
        "-i".to_string(),
        audio.to_string_lossy().to_string(),
        "-c:v".to_string(),
        "copy".to_string(),
        "-c:a".to_string(),
        codec.to_string(),
        "-ar".to_string(),
        sampling_rate.to_string(),
        "-b:a".to_string(),
        bit_rate.to_string(),
        output.to_string_lossy().to_string(),
    ]
}
