// alio Library - core modules for the commandline album player
// Playback control is independent of the terminal front end and of rodio

pub mod audio;   // sequencing, transport, sessions, scanning
pub mod config;  // settings and preferences
pub mod error;   // error types shared across modules
pub mod logging; // debug.log setup

#[cfg(feature = "tui")]
pub mod ui;      // terminal interface

// Export the stuff other modules actually use
pub use audio::{Album, MusicScanner, PlayerEvent, Track, TrackSequence, TransportController};
pub use config::Config;
pub use error::{EngineError, ScanError, SequenceError, TransportError};
