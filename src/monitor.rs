//! # Progress Monitor Module
//!
//! Questo modulo consuma la coda di un job, estrae i marker di progresso dal
//! rumore diagnostico e pubblica percentuale/elapsed/ETA verso il sink di
//! presentazione.
//!
//! ## Responsabilità:
//! - Tick periodico (default 100ms) che drena TUTTO il backlog disponibile,
//!   non una riga sola, per evitare crescita illimitata della coda
//! - Parsing del marker `time=... bitrate=... speed=...` in un `ProgressEvent`
//! - Calcolo di percentuale, elapsed, remaining ed ETA
//! - Stop deterministico al primo evento terminale: nessun tick successivo
//!
//! ## Garanzia di ordinamento:
//! - La coda preserva l'ordine di arrivo e l'evento terminale è sempre
//!   l'ultimo elemento, quindi il monitor osserva ogni riga di progresso
//!   prima di osservare il completamento
//!
//! ## Casi degeneri:
//! - `percent == 0` (primo tick) o durata totale ignota: la divisione per
//!   zero dell'ETA viene evitata esplicitamente, si pubblica solo la
//!   percentuale
//! - Righe che non matchano nessun pattern: rumore, scartate in silenzio

use crate::runner::{JobEvent, JobHandle};
use crate::timecode;
use regex::Regex;
use std::sync::Arc;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Progress marker: `time=00:01:00.00 bitrate=128.0kbits/s speed=2.0x`
static PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"time=(\d+:\d+:\d+\.\d+) bitrate=(\d+\.\d+kbits/s) speed=(\d+\.\d+x)")
        .expect("invalid progress regex")
});

/// Structured progress extracted from exactly one diagnostic line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Position reached in the output, in whole seconds
    pub current_time_secs: u64,
    /// Bitrate label as reported, e.g. "128.0kbits/s"
    pub bitrate: String,
    /// Speed label as reported, e.g. "2.0x"
    pub speed: String,
}

/// Parse one diagnostic line for a progress marker. Non-matching lines are
/// diagnostic noise and return `None`.
pub fn parse_progress(line: &str) -> Option<ProgressEvent> {
    let caps = PROGRESS_RE.captures(line)?;
    let current_time_secs = timecode::parse_duration(&caps[1]).ok()?;
    Some(ProgressEvent {
        current_time_secs,
        bitrate: caps[2].to_string(),
        speed: caps[3].to_string(),
    })
}

/// Terminal state of a monitored job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

/// One update published to the presentation sink
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Completion percentage, 0-100
    pub percentage: u8,
    /// Seconds since the job started
    pub elapsed_secs: f64,
    /// Estimated seconds left; `None` while the estimate is undefined
    pub remaining_secs: Option<f64>,
    /// Estimated completion time in Unix epoch seconds
    pub eta_epoch: Option<f64>,
    /// Bitrate label from the progress line
    pub bitrate: String,
    /// Speed label from the progress line
    pub speed: String,
}

impl ProgressUpdate {
    /// Render the `elapsed / remaining / eta` status line shown next to the
    /// percentage bar.
    pub fn format_status(&self) -> String {
        let remaining = self
            .remaining_secs
            .map(|secs| timecode::format_elapsed(secs.max(0.0) as u64))
            .unwrap_or_else(|| "--:--:--".to_string());
        let eta = self
            .eta_epoch
            .map(timecode::format_epoch_clock)
            .unwrap_or_else(|| "--:--:--".to_string());

        format!(
            "elapsed: {}, remaining: {}, eta: {}",
            timecode::format_elapsed(self.elapsed_secs.max(0.0) as u64),
            remaining,
            eta
        )
    }
}

/// Presentation sink the monitor publishes into. Implemented by the console
/// layer; the core never knows what renders it.
pub trait ProgressSink: Send + Sync {
    /// A new progress estimate is available
    fn publish(&self, update: &ProgressUpdate);
    /// The job reached a terminal state; no further updates will follow
    fn finished(&self, outcome: &JobOutcome);
}

/// Compute one progress update from a parsed event.
///
/// `now_epoch` is the wall clock at observation time. When the computed
/// percentage is zero or the total duration is unknown, the ETA arithmetic
/// is skipped instead of dividing by zero.
pub fn compute_update(
    event: &ProgressEvent,
    total_duration_secs: f64,
    elapsed_secs: f64,
    now_epoch: f64,
) -> ProgressUpdate {
    let percent = if total_duration_secs > 0.0 {
        event.current_time_secs as f64 / total_duration_secs
    } else {
        0.0
    };

    let (remaining_secs, eta_epoch) = if percent > 0.0 {
        let eta_total = elapsed_secs / percent;
        let remaining = eta_total - elapsed_secs;
        (Some(remaining), Some(now_epoch + remaining))
    } else {
        (None, None)
    };

    ProgressUpdate {
        percentage: ((percent * 100.0).round() as i64).clamp(0, 100) as u8,
        elapsed_secs,
        remaining_secs,
        eta_epoch,
        bitrate: event.bitrate.clone(),
        speed: event.speed.clone(),
    }
}

/// Periodically drains a job's queue and drives the presentation sink
pub struct ProgressMonitor {
    interval: Duration,
}

impl ProgressMonitor {
    pub fn new(poll_interval_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(poll_interval_ms),
        }
    }

    /// Poll the job's queue until a terminal event arrives. Each tick drains
    /// the entire currently-available backlog, then yields the scheduling
    /// thread; the monitor never blocks on the queue.
    pub async fn run(&self, mut handle: JobHandle, sink: Arc<dyn ProgressSink>) -> JobOutcome {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            loop {
                match handle.events.try_recv() {
                    Ok(JobEvent::Line(line)) => {
                        if let Some(event) = parse_progress(&line) {
                            let elapsed = handle.started_at.elapsed().as_secs_f64();
                            let update = compute_update(
                                &event,
                                handle.total_duration_secs,
                                elapsed,
                                handle.start_epoch + elapsed,
                            );
                            debug!(
                                "Progress: {}% at {}s of {}s",
                                update.percentage,
                                event.current_time_secs,
                                handle.total_duration_secs
                            );
                            sink.publish(&update);
                        }
                        // Anything else on the diagnostic channel is noise
                    }
                    Ok(JobEvent::Completed) => {
                        info!("Job completed");
                        let outcome = JobOutcome::Completed;
                        sink.finished(&outcome);
                        return outcome;
                    }
                    Ok(JobEvent::Cancelled) => {
                        warn!("Job cancelled");
                        let outcome = JobOutcome::Cancelled;
                        sink.finished(&outcome);
                        return outcome;
                    }
                    Ok(JobEvent::Failed(reason)) => {
                        warn!("Job failed: {}", reason);
                        let outcome = JobOutcome::Failed(reason);
                        sink.finished(&outcome);
                        return outcome;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        // The producer must send a terminal event before
                        // dropping its sender; reaching this arm means it
                        // died without one.
                        let outcome =
                            JobOutcome::Failed("diagnostic stream closed unexpectedly".to_string());
                        sink.finished(&outcome);
                        return outcome;
                    }
                }
            }
        }
    }
}
