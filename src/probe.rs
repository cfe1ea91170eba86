//! # Media Probe Module
//!
//! Questo modulo interroga il tool esterno in modalità metadata-only e
//! estrae le informazioni su container e stream audio dal testo diagnostico.
//!
//! ## Responsabilità:
//! - Invoca `ffmpeg -i <file>` e cattura il canale diagnostico (stderr)
//! - Estrae durata e bitrate complessivo dalla riga del container
//! - Estrae codec, sampling rate, canali, bit depth e bitrate dal primo
//!   stream audio
//! - Fail-soft: un pattern che non matcha produce campi `None`, mai un errore
//!
//! ## Contratto con il tool esterno:
//! - La self-description viene scritta su stderr prima di qualsiasi lavoro
//!   reale, indipendentemente dall'exit code
//! - L'invocazione probe-only esce con codice non-zero by design: l'exit
//!   code viene ignorato
//! - Il formato del testo non è garantito stabile tra versioni: ogni campo
//!   può risultare assente
//!
//! ## Esempio:
//! ```rust,ignore
//! let probe = MediaProbe::new(config);
//! let info = probe.stream_info(&path).await?;
//! if let Some(duration) = info.duration {
//!     println!("{}", timecode::format_elapsed(duration));
//! }
//! ```

use crate::config::Config;
use crate::error::WorkbenchError;
use crate::timecode;
use anyhow::Result;
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Container line: `Duration: 00:10:00.00, start: 0.000000, bitrate: 320 kb/s`
static FILE_INFO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duration: (\d+:\d+:\d+\.\d+), start: [\d.]+, bitrate: (\d+ kb/s)")
        .expect("invalid file info regex")
});

/// First audio stream line:
/// `Stream #0:0: Audio: aac (LC), 48000 Hz, stereo, fltp, 128 kb/s`
static AUDIO_STREAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Stream #\d+:\d+: Audio: (\w+)(?: \([^)]+\))?, (\d+ Hz), (stereo|mono|5\.1)(?:, (\w+))?(?:, (\d+ kb/s))?",
    )
    .expect("invalid audio stream regex")
});

/// Audio channel layouts the diagnostic text can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Mono,
    Stereo,
    Surround51,
}

impl FromStr for ChannelLayout {
    type Err = WorkbenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mono" => Ok(Self::Mono),
            "stereo" => Ok(Self::Stereo),
            "5.1" => Ok(Self::Surround51),
            other => Err(WorkbenchError::Parse(format!(
                "unknown channel layout '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mono => write!(f, "mono"),
            Self::Stereo => write!(f, "stereo"),
            Self::Surround51 => write!(f, "5.1"),
        }
    }
}

/// Metadata extracted from one probe invocation.
///
/// Every field may be `None`: the external tool's output format is not
/// guaranteed stable across versions, so an unmatched pattern degrades to an
/// absent value instead of an error.
#[derive(Debug, Clone, Default)]
pub struct StreamInfo {
    /// Container duration in whole seconds
    pub duration: Option<u64>,
    /// Overall container bitrate, e.g. "320 kb/s"
    pub overall_bitrate: Option<String>,
    /// Audio codec token, e.g. "aac" or "pcm_f32le"
    pub codec: Option<String>,
    /// Sampling rate, e.g. "48000 Hz"
    pub sampling_rate: Option<String>,
    /// Channel layout of the first audio stream
    pub channels: Option<ChannelLayout>,
    /// Sample format / bit depth token, e.g. "fltp" or "s32"
    pub bit_depth: Option<String>,
    /// Audio stream bitrate, e.g. "128 kb/s"
    pub bitrate: Option<String>,
}

impl StreamInfo {
    /// True when not even the container line matched
    pub fn is_empty(&self) -> bool {
        self.duration.is_none() && self.codec.is_none()
    }
}

/// Parse the captured diagnostic text into a [`StreamInfo`]. Pure function,
/// never fails: unmatched patterns map to `None` fields.
pub fn parse_stream_info(diagnostic: &str) -> StreamInfo {
    let mut info = StreamInfo::default();

    if let Some(caps) = FILE_INFO_RE.captures(diagnostic) {
        match timecode::parse_duration(&caps[1]) {
            Ok(secs) => info.duration = Some(secs),
            Err(e) => debug!("Unparsable container duration: {}", e),
        }
        info.overall_bitrate = Some(caps[2].to_string());
    } else {
        debug!("Container info line not found in diagnostic output");
    }

    if let Some(caps) = AUDIO_STREAM_RE.captures(diagnostic) {
        info.codec = Some(caps[1].to_string());
        info.sampling_rate = Some(caps[2].to_string());
        info.channels = caps[3].parse().ok();
        info.bit_depth = caps.get(4).map(|m| m.as_str().to_string());
        info.bitrate = caps.get(5).map(|m| m.as_str().to_string());
    } else {
        debug!("Audio stream information not found");
    }

    info
}

/// Probes media files through the external tool
pub struct MediaProbe {
    config: Config,
}

impl MediaProbe {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the external tool in metadata-query mode and extract stream info.
    ///
    /// Only a launch failure is an error; the probe invocation's nonzero
    /// exit code is ignored by design.
    pub async fn stream_info(&self, path: &Path) -> Result<StreamInfo> {
        let ffmpeg = self.config.ffmpeg_command();
        debug!("Probing {} with {}", path.display(), ffmpeg);

        let output = tokio::process::Command::new(&ffmpeg)
            .arg("-i")
            .arg(path)
            .output()
            .await
            .map_err(|e| WorkbenchError::ProcessLaunch(format!("{}: {}", ffmpeg, e)))?;

        let diagnostic = String::from_utf8_lossy(&output.stderr);
        let info = parse_stream_info(&diagnostic);

        if info.is_empty() {
            warn!("No recognizable metadata in probe output for {}", path.display());
        }

        Ok(info)
    }

    /// Probe plus filesystem facts, as ordered key/value pairs for display.
    pub async fn file_report(&self, path: &Path) -> Result<Vec<(String, String)>> {
        let info = self.stream_info(path).await?;
        let metadata = tokio::fs::metadata(path).await?;

        let unknown = || "Unknown".to_string();
        let mut report = vec![
            (
                "Duration".to_string(),
                info.duration.map(timecode::format_elapsed).unwrap_or_else(unknown),
            ),
            (
                "Overall Bitrate".to_string(),
                info.overall_bitrate.clone().unwrap_or_else(unknown),
            ),
        ];

        // Audio fields are only reported when the stream line matched
        if let Some(ref codec) = info.codec {
            report.push(("Codec".to_string(), codec.clone()));
            report.push((
                "Sampling Rate".to_string(),
                info.sampling_rate.clone().unwrap_or_else(unknown),
            ));
            report.push((
                "Channels".to_string(),
                info.channels.map(|c| c.to_string()).unwrap_or_else(unknown),
            ));
            if let Some(ref bit_depth) = info.bit_depth {
                report.push(("Bit Depth".to_string(), bit_depth.clone()));
            }
            if let Some(ref bitrate) = info.bitrate {
                report.push(("Bitrate".to_string(), bitrate.clone()));
            }
        }

        report.push((
            "File Name".to_string(),
            path.file_name().unwrap_or_default().to_string_lossy().to_string(),
        ));
        report.push(("File Size".to_string(), format!("{} bytes", metadata.len())));

        let modified = metadata
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH)
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        report.push(("Last Modified".to_string(), modified.to_string()));

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_DIAGNOSTIC: &str = "\
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'sample.mp4':
  Duration: 00:10:00.00, start: 0.000000, bitrate: 320 kb/s
  Stream #0:0: Audio: aac, 48000 Hz, stereo, fltp, 128 kb/s
";

    #[test]
    fn test_full_diagnostic() {
        let info = parse_stream_info(FULL_DIAGNOSTIC);
        assert_eq!(info.duration, Some(600));
        assert_eq!(info.overall_bitrate.as_deref(), Some("320 kb/s"));
        assert_eq!(info.codec.as_deref(), Some("aac"));
        assert_eq!(info.sampling_rate.as_deref(), Some("48000 Hz"));
        assert_eq!(info.channels, Some(ChannelLayout::Stereo));
        assert_eq!(info.bit_depth.as_deref(), Some("fltp"));
        assert_eq!(info.bitrate.as_deref(), Some("128 kb/s"));
    }

    #[test]
    fn test_codec_with_parenthesized_extra() {
        let text = "Stream #0:1: Audio: pcm_f32le (ipcm / 0x6D637069), 192000 Hz, 5.1, flt, 36864 kb/s";
        let info = parse_stream_info(text);
        assert_eq!(info.codec.as_deref(), Some("pcm_f32le"));
        assert_eq!(info.sampling_rate.as_deref(), Some("192000 Hz"));
        assert_eq!(info.channels, Some(ChannelLayout::Surround51));
        assert_eq!(info.bit_depth.as_deref(), Some("flt"));
        assert_eq!(info.bitrate.as_deref(), Some("36864 kb/s"));
    }

    #[test]
    fn test_optional_groups_absent() {
        let text = "Stream #0:0: Audio: flac, 96000 Hz, mono";
        let info = parse_stream_info(text);
        assert_eq!(info.codec.as_deref(), Some("flac"));
        assert_eq!(info.channels, Some(ChannelLayout::Mono));
        assert_eq!(info.bit_depth, None);
        assert_eq!(info.bitrate, None);
    }

    #[test]
    fn test_container_only() {
        let text = "Duration: 00:01:30.50, start: 0.000000, bitrate: 1411 kb/s";
        let info = parse_stream_info(text);
        assert_eq!(info.duration, Some(90));
        assert_eq!(info.overall_bitrate.as_deref(), Some("1411 kb/s"));
        // Audio fields stay absent, no error raised
        assert!(info.codec.is_none());
        assert!(info.channels.is_none());
    }

    #[test]
    fn test_garbage_input_is_empty_not_fatal() {
        let info = parse_stream_info("completely unrelated text");
        assert!(info.is_empty());
        assert!(info.duration.is_none());
        assert!(info.overall_bitrate.is_none());
    }

    #[test]
    fn test_channel_layout_round_trip() {
        for (text, layout) in [
            ("mono", ChannelLayout::Mono),
            ("stereo", ChannelLayout::Stereo),
            ("5.1", ChannelLayout::Surround51),
        ] {
            assert_eq!(text.parse::<ChannelLayout>().unwrap(), layout);
            assert_eq!(layout.to_string(), text);
        }
        assert!("quad".parse::<ChannelLayout>().is_err());
    }
}
