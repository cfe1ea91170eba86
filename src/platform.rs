//! # Platform-specific utilities
//!
//! Questo modulo centralizza la gestione cross-platform del comando ffmpeg
//! e il controllo della sua disponibilità sul sistema.

use std::sync::OnceLock;

/// Platform-specific command manager for the external transcoder
pub struct PlatformCommands {
    ffmpeg: &'static str,
    which_command: &'static str,
}

impl PlatformCommands {
    /// Get the singleton instance
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<PlatformCommands> = OnceLock::new();
        INSTANCE.get_or_init(Self::new)
    }

    fn new() -> Self {
        if cfg!(windows) {
            Self {
                ffmpeg: "ffmpeg.exe",
                which_command: "where",
            }
        } else {
            Self {
                ffmpeg: "ffmpeg",
                which_command: "which",
            }
        }
    }

    /// Get the platform-specific ffmpeg command name
    pub fn ffmpeg(&self) -> &'static str {
        self.ffmpeg
    }

    /// Check if ffmpeg is available on the system
    pub async fn is_ffmpeg_available(&self) -> bool {
        let result = tokio::process::Command::new(self.which_command)
            .arg(self.ffmpeg)
            .output()
            .await;

        match result {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_commands() {
        let platform = PlatformCommands::instance();
        assert!(!platform.ffmpeg().is_empty());
    }

    #[tokio::test]
    async fn test_ffmpeg_availability() {
        let platform = PlatformCommands::instance();
        // ffmpeg may not exist in minimal environments; just ensure the
        // check itself does not panic
        let _ = platform.is_ffmpeg_available().await;
    }
}
