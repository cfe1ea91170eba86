//! # Media Workbench Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom per diverse operazioni
//! - `timecode`: Conversioni timestamp `HH:MM:SS` ⇄ secondi
//! - `probe`: Estrazione metadata via invocazione probe del tool esterno
//! - `runner`: Lancio processo esterno e drenaggio del canale diagnostico
//! - `monitor`: Poller che trasforma righe diagnostiche in progress/ETA
//! - `console`: Sink di presentazione CLI (progress bar, conferme)
//! - `jobs`: Dispatch chiuso dei job (inspect/loop/trim/combine)
//! - `platform`: Risoluzione cross-platform del comando ffmpeg
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use media_workbench::{Config, JobRequest, JobSession};
//!
//! let session = JobSession { config, sink, gate };
//! JobRequest::LoopMedia(request).run(&session).await?;
//! ```

pub mod config;
pub mod console;
pub mod error;
pub mod jobs;
pub mod monitor;
pub mod platform;
pub mod probe;
pub mod runner;
pub mod timecode;

pub use config::Config;
pub use error::WorkbenchError;
pub use jobs::{JobRequest, JobSession};
pub use monitor::{JobOutcome, ProgressMonitor, ProgressSink, ProgressUpdate};
pub use probe::{MediaProbe, StreamInfo};
pub use runner::{CancellationToken, JobEvent, JobHandle, ProcessRunner};
