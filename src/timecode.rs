//! # Timecode Module
//!
//! Questo modulo converte tra timestamp testuali `HH:MM:SS[.frac]` e secondi
//! numerici, e formatta elapsed/remaining/ETA come stringhe orologio.
//!
//! ## Responsabilità:
//! - `parse_duration()`: Parsa `H:MM:SS[.frac]` oppure secondi nudi ("125")
//! - `format_elapsed()`: Secondi → `HH:MM:SS` (ore oltre 99 ammesse)
//! - `format_epoch_clock()`: Epoch assoluto → orario locale `HH:MM:SS`
//!
//! ## Regole:
//! - I secondi frazionari vengono troncati, mai arrotondati
//! - Un formato non riconosciuto produce `WorkbenchError::Parse`; il
//!   chiamante logga e tratta il valore come assente, non crasha

use crate::error::WorkbenchError;
use chrono::{Local, TimeZone};

/// Parse a duration string into whole seconds.
///
/// Accepts `H:MM:SS` or `H:MM:SS.frac` (hours unbounded), or a bare
/// integer/float string meaning seconds directly. Fractional seconds are
/// truncated.
pub fn parse_duration(text: &str) -> Result<u64, WorkbenchError> {
    let text = text.trim();

    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() == 3 {
        let hours: Option<u64> = parts[0].parse().ok();
        let minutes: Option<u64> = parts[1].parse().ok();
        let seconds: Option<f64> = parts[2].parse().ok();

        if let (Some(h), Some(m), Some(s)) = (hours, minutes, seconds) {
            if s >= 0.0 {
                return Ok(h * 3600 + m * 60 + s as u64);
            }
        }
    }

    // Bare-seconds fallback: "125" or "125.5"
    if let Ok(secs) = text.parse::<f64>() {
        if secs >= 0.0 && secs.is_finite() {
            return Ok(secs as u64);
        }
    }

    Err(WorkbenchError::Parse(format!(
        "invalid duration '{}': expected HH:MM:SS, HH:MM:SS.sss, or seconds",
        text
    )))
}

/// Format a duration in seconds as `HH:MM:SS` (hours may exceed 99).
pub fn format_elapsed(duration_secs: u64) -> String {
    let hours = duration_secs / 3600;
    let minutes = (duration_secs % 3600) / 60;
    let seconds = duration_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Format an absolute point in time (Unix epoch seconds) as a local-timezone
/// clock string. Used only for ETA display, not durations.
pub fn format_epoch_clock(epoch_secs: f64) -> String {
    match Local.timestamp_opt(epoch_secs as i64, 0) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => {
            dt.format("%H:%M:%S").to_string()
        }
        chrono::LocalResult::None => "??:??:??".to_string(),
    }
}
