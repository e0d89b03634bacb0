use crate::error::EngineError;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// What the engine says it is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Idle,
    Playing,
    Paused,
    /// Natural end of the track, or an explicit stop.
    Ended,
    Error,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EngineState::Idle => "idle",
            EngineState::Playing => "playing",
            EngineState::Paused => "paused",
            EngineState::Ended => "ended",
            EngineState::Error => "error",
        };
        f.write_str(label)
    }
}

/// The media backend. Implementations do not need to be reentrant;
/// `EngineHandle` makes sure only one call is in flight at a time.
pub trait PlaybackEngine: Send {
    fn load(&mut self, path: &Path) -> Result<(), EngineError>;
    fn play(&mut self) -> Result<(), EngineError>;
    fn pause(&mut self) -> Result<(), EngineError>;
    fn resume(&mut self) -> Result<(), EngineError>;
    fn stop(&mut self) -> Result<(), EngineError>;
    fn state(&self) -> Result<EngineState, EngineError>;
    /// Elapsed fraction of the loaded track, 0.0 to 1.0.
    fn position(&self) -> Result<f32, EngineError>;
    /// Total length of the loaded track in milliseconds, 0 if unknown.
    fn duration(&self) -> Result<u64, EngineError>;
}

/// Shared, serialized access to the one engine instance.
///
/// Every method takes the lock for exactly one engine call and releases it
/// before returning, so no caller can hold it across an await point.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<Mutex<Box<dyn PlaybackEngine>>>,
}

impl EngineHandle {
    pub fn new<E: PlaybackEngine + 'static>(engine: E) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(engine))),
        }
    }

    fn with<T>(
        &self,
        f: impl FnOnce(&mut dyn PlaybackEngine) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut engine = self
            .inner
            .lock()
            .map_err(|_| EngineError::Unavailable("engine lock poisoned".to_string()))?;
        f(engine.as_mut())
    }

    pub fn load(&self, path: &Path) -> Result<(), EngineError> {
        self.with(|e| e.load(path))
    }

    pub fn play(&self) -> Result<(), EngineError> {
        self.with(|e| e.play())
    }

    pub fn pause(&self) -> Result<(), EngineError> {
        self.with(|e| e.pause())
    }

    pub fn resume(&self) -> Result<(), EngineError> {
        self.with(|e| e.resume())
    }

    pub fn stop(&self) -> Result<(), EngineError> {
        self.with(|e| e.stop())
    }

    pub fn state(&self) -> Result<EngineState, EngineError> {
        self.with(|e| e.state())
    }

    pub fn position(&self) -> Result<f32, EngineError> {
        self.with(|e| e.position())
    }

    pub fn duration(&self) -> Result<u64, EngineError> {
        self.with(|e| e.duration())
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle").finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Call, ScriptedEngine};
    use super::*;

    #[test]
    fn test_handle_forwards_calls() {
        let engine = ScriptedEngine::new();
        let handle = EngineHandle::new(engine.clone());

        handle.load(Path::new("/music/a.mp3")).unwrap();
        assert_eq!(handle.state().unwrap(), EngineState::Idle);
        handle.play().unwrap();
        assert_eq!(handle.state().unwrap(), EngineState::Playing);
        handle.stop().unwrap();
        assert_eq!(handle.state().unwrap(), EngineState::Ended);

        assert_eq!(
            engine.calls(),
            vec![Call::Load("/music/a.mp3".into()), Call::Play, Call::Stop]
        );
    }

    #[test]
    fn test_handle_surfaces_query_errors() {
        let engine = ScriptedEngine::new();
        engine.script().fail_queries = true;
        let handle = EngineHandle::new(engine);
        assert!(matches!(handle.state(), Err(EngineError::Query(_))));
    }
}
