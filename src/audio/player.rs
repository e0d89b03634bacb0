use super::{AudioConfig, EngineState, PlaybackEngine};
use crate::error::EngineError;
use rodio::{Decoder, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// `PlaybackEngine` on top of a rodio sink.
///
/// The `OutputStream` itself is not `Send`, so it stays with whoever opened
/// it (the binary's main task) and only the handle lives here.
pub struct RodioEngine {
    stream_handle: OutputStreamHandle,
    sink: Option<Sink>,
    total: Option<Duration>,
    started: bool,
    stopped: bool,
    config: AudioConfig,
}

impl RodioEngine {
    pub fn new(stream_handle: OutputStreamHandle, config: AudioConfig) -> Self {
        Self {
            stream_handle,
            sink: None,
            total: None,
            started: false,
            stopped: false,
            config,
        }
    }

    fn release_sink(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SinkStatus {
    empty: bool,
    paused: bool,
}

// A loaded track sits in a paused sink until `play`, which reads as Idle.
// Explicit stop drops the sink and reads as Ended.
fn engine_state(sink: Option<SinkStatus>, started: bool, stopped: bool) -> EngineState {
    match sink {
        None if stopped => EngineState::Ended,
        None => EngineState::Idle,
        Some(sink) if sink.empty => EngineState::Ended,
        Some(sink) if sink.paused && started => EngineState::Paused,
        Some(sink) if sink.paused => EngineState::Idle,
        Some(_) => EngineState::Playing,
    }
}

impl PlaybackEngine for RodioEngine {
    fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        self.release_sink();
        self.total = None;
        self.started = false;
        self.stopped = false;

        let load_error = |reason: String| EngineError::Load {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| load_error(e.to_string()))?;
        // Decode audio file - M4A/AAC support comes in via Symphonia
        let source = Decoder::new(BufReader::new(file))
            .map_err(|e| load_error(format!("unsupported or corrupted file: {}", e)))?;
        let total = source.total_duration();

        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;
        sink.set_volume(self.config.volume);
        sink.pause();
        sink.append(source);

        self.sink = Some(sink);
        self.total = total;
        Ok(())
    }

    fn play(&mut self) -> Result<(), EngineError> {
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| EngineError::Playback("no track loaded".to_string()))?;
        sink.play();
        self.started = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), EngineError> {
        if let Some(sink) = self.sink.as_ref() {
            sink.pause();
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<(), EngineError> {
        if let Some(sink) = self.sink.as_ref() {
            sink.play();
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        self.release_sink();
        self.stopped = true;
        Ok(())
    }

    fn state(&self) -> Result<EngineState, EngineError> {
        let sink = self.sink.as_ref().map(|sink| SinkStatus {
            empty: sink.empty(),
            paused: sink.is_paused(),
        });
        Ok(engine_state(sink, self.started, self.stopped))
    }

    fn position(&self) -> Result<f32, EngineError> {
        let (Some(sink), Some(total)) = (self.sink.as_ref(), self.total) else {
            return Ok(0.0);
        };
        if total.is_zero() {
            return Ok(0.0);
        }
        let fraction = sink.get_pos().as_secs_f64() / total.as_secs_f64();
        Ok(fraction.clamp(0.0, 1.0) as f32)
    }

    fn duration(&self) -> Result<u64, EngineError> {
        Ok(self.total.map(|d| d.as_millis() as u64).unwrap_or(0))
    }
}

impl Drop for RodioEngine {
    fn drop(&mut self) {
        self.release_sink();
    }
}
