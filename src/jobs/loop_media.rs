//! # Loop Job Module
//!
//! Ripete il file sorgente N volte e tronca alla durata target.
//!
//! ## Pipeline:
//! 1. Probe della sorgente per conoscerne la durata
//! 2. `loop_times = ceil(durata_target / durata_sorgente)`
//! 3. Conferma sovrascrittura se l'output esiste già
//! 4. `ffmpeg -y -stream_loop <N> -i <src> -t <durata> <dst>` con progress
//!    monitor agganciato al canale diagnostico

use crate::error::WorkbenchError;
use crate::jobs::{confirm_output, outcome_to_result, require_file, resolve_output_path, JobSession};
use crate::timecode;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Parameters for one loop invocation
pub struct LoopRequest {
    /// Source media file
    pub input: PathBuf,
    /// Output file stem; the source's extension is appended
    pub output_stem: String,
    /// Target duration, `HH:MM:SS[.frac]` or bare seconds
    pub duration: String,
}

impl LoopRequest {
    pub async fn run(self, session: &JobSession) -> Result<()> {
        require_file(&self.input)?;

        let target_secs = timecode::parse_duration(&self.duration)?;

        let info = session.probe().stream_info(&self.input).await?;
        let source_secs = info.duration.ok_or_else(|| {
            WorkbenchError::Parse(format!(
                "could not determine duration of {}",
                self.input.display()
            ))
        })?;

        let loop_times = compute_loop_count(source_secs, target_secs)?;
        debug!(
            "Source {}s, target {}s, looping {} times",
            source_secs, target_secs, loop_times
        );

        let output = resolve_output_path(&self.input, &self.output_stem);
        if !confirm_output(session, &output) {
            return Ok(());
        }

        info!(
            "Looping {} -> {} (duration {})",
            self.input.display(),
            output.display(),
            self.duration
        );

        let args = build_loop_args(&self.input, &output, loop_times, &self.duration);
        let outcome = session.run_transform(args, target_secs as f64).await;
        outcome_to_result(outcome, &output)
    }
}

/// How many times the source must repeat to cover the target duration.
pub fn compute_loop_count(source_secs: u64, target_secs: u64) -> Result<u64, WorkbenchError> {
    if source_secs == 0 {
        return Err(WorkbenchError::Parse(
            "source duration is zero, cannot compute loop count".to_string(),
        ));
    }
    Ok(target_secs.div_ceil(source_secs))
}

/// Fixed argument template for the loop transform. Always `-y`: overwrite
/// confirmation happened before launch.
fn build_loop_args(input: &Path, output: &Path, loop_times: u64, duration: &str) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-stream_loop".to_string(),
        loop_times.to_string(),
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
    fn test_loop_count_rounds_up() {
        // 37s source, 125s target -> ceil(125/37) = 4
        assert_eq!(compute_loop_count(37, 125).unwrap(), 4);
    }

    #[test]
    fn test_loop_count_exact_multiple() {
        assert_eq!(compute_loop_count(60, 120).unwrap(), 2);
        assert_eq!(compute_loop_count(120, 120).unwrap(), 1);
    }

    #[test]
    fn test_loop_count_zero_source() {
        assert!(compute_loop_count(0, 125).is_err());
    }

    #[test]
    fn test_loop_args_template() {
        let args = build_loop_args(
            Path::new("/m/clip.mp4"),
            Path::new("/m/loop_video.mp4"),
            4,
            "00:02:05",
        );
        assert_eq!(
            args,
            vec![
                "-y",
                "-stream_loop",
                "4",
                "-i",
                "/m/clip.mp4",
                "-t",
                "00:02:05",
                "/m/loop_video.mp4",
            ]
        );
    }
}
