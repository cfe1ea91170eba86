//! # Jobs Module
//!
//! Dispatch chiuso dei job supportati e contesto di sessione esplicito:
//! - `inspect`: Probe metadata e report proprietà file
//! - `loop_media`: Ripete la sorgente fino alla durata target
//! - `trim`: Estrae un segmento (start + durata)
//! - `combine`: Muxa video e audio con opzioni da set chiuso
//!
//! Ogni job è una variante di `JobRequest` legata staticamente al proprio
//! handler: niente lookup di callback per nome. Lo stato "pagina attiva" del
//! design originale è sostituito da un oggetto `JobSession` passato per
//! riferimento a ogni operazione.

pub mod combine;
pub mod loop_media;
pub mod trim;

pub use combine::{AudioCodec, BitRate, CombineRequest, SamplingRate};
pub use loop_media::LoopRequest;
pub use trim::TrimRequest;

use crate::config::Config;
use crate::console::OverwriteGate;
use crate::error::WorkbenchError;
use crate::monitor::{JobOutcome, ProgressMonitor, ProgressSink};
use crate::probe::MediaProbe;
use crate::runner::ProcessRunner;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Per-job context: presentation sink, overwrite confirmation and config.
/// Created by the caller for each job invocation; nothing here is global.
pub struct JobSession {
    pub config: Config,
    pub sink: Arc<dyn ProgressSink>,
    pub gate: Box<dyn OverwriteGate + Send + Sync>,
}

impl JobSession {
    pub fn probe(&self) -> MediaProbe {
        MediaProbe::new(self.config.clone())
    }

    /// Launch a transform and monitor it to its terminal state.
    pub async fn run_transform(&self, args: Vec<String>, total_duration_secs: f64) -> JobOutcome {
        let runner = ProcessRunner::new(self.config.clone());
        let handle = runner.spawn_transform(args, total_duration_secs);
        let monitor = ProgressMonitor::new(self.config.poll_interval_ms);
        monitor.run(handle, self.sink.clone()).await
    }
}

/// The closed set of operations the workbench performs
pub enum JobRequest {
    Inspect(PathBuf),
    LoopMedia(LoopRequest),
    TrimMedia(TrimRequest),
    CombineAv(CombineRequest),
}

impl JobRequest {
    /// Run the job to completion. Statically dispatched per variant.
    pub async fn run(self, session: &JobSession) -> Result<()> {
        match self {
            JobRequest::Inspect(path) => inspect(session, &path).await,
            JobRequest::LoopMedia(request) => request.run(session).await,
            JobRequest::TrimMedia(request) => request.run(session).await,
            JobRequest::CombineAv(request) => request.run(session).await,
        }
    }
}

/// Probe a file and print its properties as a key/value table.
async fn inspect(session: &JobSession, path: &Path) -> Result<()> {
    require_file(path)?;

    let report = session.probe().file_report(path).await?;
    for (key, value) in report {
        println!("{:<16} {}", key, value);
    }
    Ok(())
}

/// Check a caller-supplied input path before doing anything with it.
pub(crate) fn require_file(path: &Path) -> Result<(), WorkbenchError> {
    if path.as_os_str().is_empty() {
        return Err(WorkbenchError::MissingInput("no file selected".to_string()));
    }
    if !path.is_file() {
        return Err(WorkbenchError::MissingInput(format!(
            "file does not exist: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Build the output path next to the input: same directory, caller-chosen
/// stem, input's extension.
pub(crate) fn resolve_output_path(input: &Path, output_stem: &str) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    match input.extension() {
        Some(ext) => dir.join(format!("{}.{}", output_stem, ext.to_string_lossy())),
        None => dir.join(output_stem),
    }
}

/// Ask before clobbering an existing output file. The external tool itself
/// is always invoked with `-y`; confirmation happens here, before launch.
pub(crate) fn confirm_output(session: &JobSession, output: &Path) -> bool {
    if output.is_file() && !session.gate.confirm_overwrite(output) {
        info!("User canceled the operation");
        return false;
    }
    true
}

/// Map a terminal outcome to the job's result.
pub(crate) fn outcome_to_result(outcome: JobOutcome, output: &Path) -> Result<()> {
    match outcome {
        JobOutcome::Completed => {
            info!("Output written to {}", output.display());
            Ok(())
        }
        JobOutcome::Cancelled => Err(anyhow::anyhow!("job cancelled")),
        JobOutcome::Failed(reason) => Err(anyhow::anyhow!("job failed: {}", reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_output_path_keeps_extension() {
        let out = resolve_output_path(Path::new("/media/clips/clip.mp4"), "loop_video");
        assert_eq!(out, PathBuf::from("/media/clips/loop_video.mp4"));
    }

    #[test]
    fn test_resolve_output_path_without_extension() {
        let out = resolve_output_path(Path::new("/media/clips/raw"), "loop_video");
        assert_eq!(out, PathBuf::from("/media/clips/loop_video"));
    }

    #[test]
    fn test_require_file_rejects_empty_and_missing() {
        assert!(matches!(
            require_file(Path::new("")),
            Err(WorkbenchError::MissingInput(_))
        ));
        assert!(matches!(
            require_file(Path::new("/definitely/not/here.wav")),
            Err(WorkbenchError::MissingInput(_))
        ));
    }
}
