//! # Trim Job Module
//!
//! Estrae un segmento dal file sorgente: punto di inizio più durata.
//! Stessa pipeline del loop, senza probe preliminare: la durata totale per
//! il progress è la durata del segmento richiesto.

use crate::jobs::{confirm_output, outcome_to_result, require_file, resolve_output_path, JobSession};
use crate::timecode;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Parameters for one trim invocation
pub struct TrimRequest {
    /// Source media file
    pub input: PathBuf,
    /// Output file stem; the source's extension is appended
    pub output_stem: String,
    /// Segment start, `HH:MM:SS[.frac]` or bare seconds
    pub start: String,
    /// Segment duration, `HH:MM:SS[.frac]` or bare seconds
    pub duration: String,
}

impl TrimRequest {
    pub async fn run(self, session: &JobSession) -> Result<()> {
        require_file(&self.input)?;

        // Both inputs must be well-formed before any side effect
        timecode::parse_duration(&self.start)?;
        let segment_secs = timecode::parse_duration(&self.duration)?;

        let output = resolve_output_path(&self.input, &self.output_stem);
        if !confirm_output(session, &output) {
            return Ok(());
        }

        info!(
            "Trimming {}: start {}, duration {}",
            self.input.display(),
            self.start,
            self.duration
        );

        let args = build_trim_args(&self.input, &output, &self.start, &self.duration);
        let outcome = session.run_transform(args, segment_secs as f64).await;
        outcome_to_result(outcome, &output)
    }
}

/// Fixed argument template for the trim transform.
fn build_trim_args(input: &Path, output: &Path, start: &str, duration: &str) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-ss".to_string(),
        start.to_string(),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-t".to_string(),
        duration.to_string(),
        output.to_string_lossy().to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_args_template() {
        let args = build_trim_args(
            Path::new("/m/track.flac"),
            Path::new("/m/trim_audio.flac"),
            "00:00:10",
            "00:01:30",
        );
        assert_eq!(
            args,
            vec![
                "-y",
                "-ss",
                "00:00:10",
                "-i",
                "/m/track.flac",
                "-t",
                "00:01:30",
                "/m/trim_audio.flac",
            ]
        );
    }
}
