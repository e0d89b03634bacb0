pub mod engine;
pub mod reporter;
pub mod scanner;
pub mod sequence;
pub mod session;
pub mod track;
pub mod transport;

#[cfg(feature = "audio")]
pub mod player;

pub use engine::{EngineHandle, EngineState, PlaybackEngine};
pub use reporter::{PositionReporter, Progress, ReporterHandle};
pub use scanner::MusicScanner;
pub use sequence::TrackSequence;
pub use track::{Album, Track};
pub use transport::TransportController;

#[cfg(feature = "audio")]
pub use player::RodioEngine;

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub volume: f32, // 0.0 to 1.0
    pub poll_interval: Duration,   // session end-of-track polling
    pub report_interval: Duration, // position reporter sampling
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            volume: 1.0,
            poll_interval: Duration::from_millis(50),
            report_interval: Duration::from_millis(50),
        }
    }
}

impl From<&crate::config::Config> for AudioConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            volume: config.playback.volume.clamp(0.0, 1.0),
            poll_interval: Duration::from_millis(config.playback.poll_interval_ms.max(1)),
            report_interval: Duration::from_millis(config.playback.report_interval_ms.max(1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Ogg,
    Mp4,
    Flac,
    Unknown,
}

impl AudioFormat {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" => AudioFormat::Mp3,
            "ogg" => AudioFormat::Ogg,
            "m4a" => AudioFormat::Mp4,
            "flac" => AudioFormat::Flac,
            _ => AudioFormat::Unknown,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, AudioFormat::Unknown)
    }
}

/// Everything the display side hears from playback. Sent fire-and-forget
/// over an unbounded channel; a closed receiver is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    NowPlaying {
        session: u64,
        album: String,
        index: usize,
        label: String,
    },
    Progress(Progress),
    SessionEnded {
        session: u64,
        album: String,
    },
    Error(String),
}

pub type EventSender = tokio::sync::mpsc::UnboundedSender<PlayerEvent>;
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<PlayerEvent>;
