//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `WorkbenchError` enum per categorizzare tutti gli errori possibili
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.)
//! - `Parse`: Testo diagnostico o timecode che non matcha il pattern atteso
//! - `ProcessLaunch`: FFmpeg mancante o non eseguibile
//! - `MissingInput`: Campo richiesto assente nell'input del chiamante
//! - `InvalidOption`: Valore fuori dal set chiuso di opzioni ammesse
//!
//! ## Policy di propagazione:
//! - `Parse` viene sempre recuperato localmente (campo "Unknown"/None, log)
//! - `ProcessLaunch` viene catturato al boundary di lancio e loggato
//! - `MissingInput` e `InvalidOption` abortiscono l'operazione senza side effect

/// Custom error types for the media workbench
#[derive(thiserror::Error, Debug)]
pub enum WorkbenchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Failed to launch external process: {0}")]
    ProcessLaunch(String),

    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid option value: {0}")]
    InvalidOption(String),
}
