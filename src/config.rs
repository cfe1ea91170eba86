//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di esecuzione
//! - Fornisce validazione robusta dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `poll_interval_ms`: Intervallo di polling del progress monitor (default: 100)
//! - `job_timeout_secs`: Deadline oltre la quale il job viene cancellato (default: None)
//! - `assume_yes`: Sovrascrive file esistenti senza chiedere conferma (default: false)
//! - `ffmpeg_path`: Path esplicito al binario ffmpeg (default: None = risolto dal PATH)
//!
//! ## Validazione:
//! - Controlla che poll_interval_ms sia > 0
//! - Controlla che job_timeout_secs, se presente, sia > 0
//! - Controlla che ffmpeg_path, se presente, esista

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for workbench jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Progress monitor poll interval in milliseconds
    pub poll_interval_ms: u64,
    /// Optional deadline in seconds after which a running job is cancelled
    pub job_timeout_secs: Option<u64>,
    /// Overwrite existing output files without asking
    pub assume_yes: bool,
    /// Explicit path to the ffmpeg binary (None = resolve from PATH)
    pub ffmpeg_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            job_timeout_secs: None,
            assume_yes: false,
            ffmpeg_path: None,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("Poll interval must be greater than 0"));
        }

        if let Some(timeout) = self.job_timeout_secs {
            if timeout == 0 {
                return Err(anyhow::anyhow!("Job timeout must be greater than 0"));
            }
        }

        if let Some(ref ffmpeg_path) = self.ffmpeg_path {
            if !ffmpeg_path.exists() {
                return Err(anyhow::anyhow!(
                    "ffmpeg path does not exist: {}",
                    ffmpeg_path.display()
                ));
            }
        }

        Ok(())
    }

    /// Load configuration from file
    pub async fn from_file(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Resolve the ffmpeg command to invoke
    pub fn ffmpeg_command(&self) -> String {
        match self.ffmpeg_path {
            Some(ref path) => path.to_string_lossy().to_string(),
            None => crate::platform::PlatformCommands::instance()
                .ffmpeg()
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        config.poll_interval_ms = 100;
        config.job_timeout_secs = Some(0);
        assert!(config.validate().is_err());

        config.job_timeout_secs = Some(600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.job_timeout_secs, None);
        assert!(!config.assume_yes);
        assert!(config.ffmpeg_path.is_none());
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let original_config = Config {
            poll_interval_ms: 250,
            job_timeout_secs: Some(1800),
            assume_yes: true,
            ffmpeg_path: None,
        };

        // Save config
        original_config.save_to_file(&config_path).await.unwrap();

        // Load config
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.poll_interval_ms, 250);
        assert_eq!(loaded_config.job_timeout_secs, Some(1800));
        assert!(loaded_config.assume_yes);
    }

    #[tokio::test]
    async fn test_config_missing_file_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nope.json");

        let loaded = Config::from_file(&config_path).await.unwrap();
        assert_eq!(loaded.poll_interval_ms, 100);
    }
}
