//! # Console Presentation Module
//!
//! Questo modulo implementa il sink di presentazione per la command line.
//!
//! ## Responsabilità:
//! - Progress bar percentuale con `indicatif` per feedback real-time
//! - Rendering della riga di stato `elapsed / remaining / eta`
//! - Conferma di sovrascrittura via stdin (y/n), bypassabile con `--yes`
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:42] [====================--------------------] 50% elapsed: 00:00:42, remaining: 00:00:42, eta: 14:25:10
//! ```

use crate::monitor::{JobOutcome, ProgressSink, ProgressUpdate};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Renders job progress as a percentage bar on the terminal
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::new(100);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );

        bar.set_message(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }
}

impl ProgressSink for ConsoleProgress {
    fn publish(&self, update: &ProgressUpdate) {
        self.bar.set_position(update.percentage as u64);
        self.bar.set_message(update.format_status());
    }

    fn finished(&self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Completed => self.bar.finish_with_message("done"),
            JobOutcome::Cancelled => self.bar.abandon_with_message("cancelled"),
            JobOutcome::Failed(reason) => {
                self.bar.abandon_with_message(format!("failed: {}", reason))
            }
        }
    }
}

/// Sink for jobs with no live progress to render (e.g. inspect)
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn publish(&self, _update: &ProgressUpdate) {}
    fn finished(&self, _outcome: &JobOutcome) {}
}

/// Asks the user before overwriting an existing output file
pub trait OverwriteGate {
    fn confirm_overwrite(&self, path: &Path) -> bool;
}

/// stdin-backed y/n prompt; `assume_yes` skips the question entirely
pub struct StdinGate {
    pub assume_yes: bool,
}

impl OverwriteGate for StdinGate {
    fn confirm_overwrite(&self, path: &Path) -> bool {
        if self.assume_yes {
            return true;
        }

        eprint!(
            "The file '{}' already exists. Overwrite? [y/N] ",
            path.display()
        );
        if std::io::stderr().flush().is_err() {
            return false;
        }

        // stdin has no async story worth having here; hand the blocking
        // read to the runtime instead of stalling a worker thread
        tokio::task::block_in_place(|| {
            let mut answer = String::new();
            match std::io::stdin().lock().read_line(&mut answer) {
                Ok(_) => parse_answer(&answer),
                Err(e) => {
                    warn!("Could not read overwrite confirmation: {}", e);
                    false
                }
            }
        })
    }
}

fn parse_answer(answer: &str) -> bool {
    matches!(answer.trim(), "y" | "Y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assume_yes_skips_prompt() {
        let gate = StdinGate { assume_yes: true };
        assert!(gate.confirm_overwrite(Path::new("/tmp/whatever.mp4")));
    }

    #[test]
    fn test_answer_parsing() {
        assert!(parse_answer("y\n"));
        assert!(parse_answer("Y\n"));
        assert!(parse_answer("yes\n"));
        assert!(!parse_answer("\n"));
        assert!(!parse_answer("n\n"));
        assert!(!parse_answer("yep\n"));
    }

    #[test]
    fn test_console_progress_accepts_updates() {
        let sink = ConsoleProgress::new("test");
        sink.publish(&ProgressUpdate {
            percentage: 42,
            elapsed_secs: 10.0,
            remaining_secs: Some(14.0),
            eta_epoch: None,
            bitrate: "128.0kbits/s".into(),
            speed: "1.0x".into(),
        });
        sink.finished(&JobOutcome::Completed);
    }
}
