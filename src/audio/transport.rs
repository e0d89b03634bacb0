// Transport controller - the single owner of the playback engine
// Serializes engine access and makes sure at most one session runs at a time

use super::session::{PlaybackSession, SessionHandle, SessionSignals, Skip};
use super::{AudioConfig, EngineHandle, EngineState, EventSender, TrackSequence};
use crate::error::TransportError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

pub struct TransportController {
    engine: EngineHandle,
    events: EventSender,
    poll_interval: Duration,
    // Held by `play`/`stop` while they swap sessions, so those two never interleave
    active: tokio::sync::Mutex<Option<SessionHandle>>,
    // One permit: the session slot. The running session owns it until it terminates.
    slot: Arc<Semaphore>,
    // Skip senders of the current session, reachable without awaiting
    signals: Mutex<Option<SessionSignals>>,
    next_id: AtomicU64,
}

impl TransportController {
    pub fn new(engine: EngineHandle, events: EventSender, config: &AudioConfig) -> Self {
        Self {
            engine,
            events,
            poll_interval: config.poll_interval,
            active: tokio::sync::Mutex::new(None),
            slot: Arc::new(Semaphore::new(1)),
            signals: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Start playing `sequence` at `start`. Any running session is terminated
    /// and joined first; the new one then runs in the background and this
    /// returns its id.
    pub async fn play(
        &self,
        sequence: Arc<TrackSequence>,
        start: usize,
    ) -> Result<u64, TransportError> {
        if sequence.is_empty() {
            return Err(TransportError::EmptySequence);
        }
        sequence.at(start)?;

        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            self.clear_signals();
            debug!("Terminating session {} before starting a new one", previous.id());
            previous.terminate().await;
        }

        let permit = self
            .slot
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TransportError::ShutDown)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = PlaybackSession::new(
            id,
            sequence,
            start,
            self.engine.clone(),
            self.events.clone(),
            self.poll_interval,
        );
        let (handle, signals) = session.spawn(permit);

        if let Ok(mut current) = self.signals.lock() {
            *current = Some(signals);
        }
        *active = Some(handle);
        Ok(id)
    }

    /// Pause when playing, resume when paused. Engine failures are only
    /// logged; the display keeps showing what is playing.
    pub fn toggle_pause(&self) -> Option<EngineState> {
        let result = match self.engine.state() {
            Ok(EngineState::Playing) => self.engine.pause().map(|_| EngineState::Paused),
            Ok(EngineState::Paused) => self.engine.resume().map(|_| EngineState::Playing),
            Ok(other) => {
                warn!("Pause ignored, engine is {}", other);
                return None;
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(state) => {
                debug!("Toggled pause, engine now {}", state);
                Some(state)
            }
            Err(e) => {
                error!("Pause err: {}", e);
                None
            }
        }
    }

    /// Terminate the running session, wait for it, and stop the engine.
    pub async fn stop(&self) {
        let mut active = self.active.lock().await;
        self.clear_signals();
        if let Some(session) = active.take() {
            let id = session.id();
            let outcome = session.terminate().await;
            info!("Stopped session {} ({:?})", id, outcome);
        }
        if let Err(e) = self.engine.stop() {
            error!("Stop err: {}", e);
        }
    }

    pub fn request_next(&self) -> bool {
        self.request(Skip::Next)
    }

    pub fn request_previous(&self) -> bool {
        self.request(Skip::Previous)
    }

    fn request(&self, skip: Skip) -> bool {
        match self.signals.lock() {
            Ok(signals) => match signals.as_ref() {
                Some(signals) => signals.request(skip),
                None => {
                    debug!("No session to receive {:?}", skip);
                    false
                }
            },
            Err(_) => false,
        }
    }

    /// Id of the running session, if one is still going.
    pub async fn active_session(&self) -> Option<u64> {
        let active = self.active.lock().await;
        active
            .as_ref()
            .filter(|session| !session.is_finished())
            .map(SessionHandle::id)
    }

    /// Stop playback for good. Later `play` calls fail with `ShutDown`.
    pub async fn shutdown(&self) {
        self.slot.close();
        self.stop().await;
    }

    fn clear_signals(&self) {
        if let Ok(mut signals) = self.signals.lock() {
            signals.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::engine::testing::{Call, ScriptedEngine};
    use crate::audio::PlayerEvent;
    use crate::error::SequenceError;
    use std::path::PathBuf;
    use tokio::sync::mpsc;

    fn album(title: &str) -> Arc<TrackSequence> {
        let mut seq = TrackSequence::new(title);
        for name in ["A", "B", "C"] {
            seq.push(name, format!("/music/{title}/{name}.mp3"));
        }
        Arc::new(seq)
    }

    fn path(title: &str, name: &str) -> PathBuf {
        PathBuf::from(format!("/music/{title}/{name}.mp3"))
    }

    fn controller() -> (TransportController, ScriptedEngine, mpsc::UnboundedReceiver<PlayerEvent>) {
        let engine = ScriptedEngine::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let config = AudioConfig {
            poll_interval: Duration::from_millis(5),
            ..AudioConfig::default()
        };
        let controller = TransportController::new(EngineHandle::new(engine.clone()), tx, &config);
        (controller, engine, rx)
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..400 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_play_rejects_bad_start() {
        let (controller, engine, _rx) = controller();
        assert_eq!(
            controller.play(album("x"), 3).await,
            Err(TransportError::Sequence(SequenceError::OutOfRange { index: 3, len: 3 }))
        );
        assert_eq!(
            controller.play(Arc::new(TrackSequence::new("empty")), 0).await,
            Err(TransportError::EmptySequence)
        );
        assert!(engine.calls().is_empty());
        assert_eq!(controller.active_session().await, None);
    }

    #[tokio::test]
    async fn test_album_plays_through_without_signals() {
        let (controller, engine, _rx) = controller();
        controller.play(album("abc"), 0).await.unwrap();

        for (i, name) in ["A", "B", "C"].iter().enumerate() {
            wait_until(|| engine.loads().len() == i + 1).await;
            assert_eq!(engine.loads()[i], path("abc", name));
            engine.finish_track();
        }

        wait_until(|| controller.slot.available_permits() == 1).await;
        assert_eq!(controller.active_session().await, None);
    }

    #[tokio::test]
    async fn test_second_play_replaces_first() {
        let (controller, engine, _rx) = controller();

        let (first, second) = tokio::join!(
            controller.play(album("one"), 0),
            controller.play(album("two"), 0)
        );
        let (first, second) = (first.unwrap(), second.unwrap());
        assert_ne!(first, second);

        wait_until(|| engine.loads().contains(&path("two", "A"))).await;
        assert_eq!(controller.active_session().await, Some(second));
        assert_eq!(controller.slot.available_permits(), 0);

        // Session one was cancelled before it ran, so it never reached the engine
        assert_eq!(
            &engine.calls()[..2],
            &[Call::Load(path("two", "A")), Call::Play]
        );

        controller.stop().await;
    }

    #[tokio::test]
    async fn test_replacing_a_running_session_stops_it_first() {
        let (controller, engine, _rx) = controller();
        let first = controller.play(album("one"), 0).await.unwrap();
        wait_until(|| engine.loads().len() == 1).await;

        let second = controller.play(album("two"), 0).await.unwrap();
        assert_ne!(first, second);
        wait_until(|| engine.loads().len() == 2).await;

        let calls = engine.calls();
        let second_load = calls
            .iter()
            .position(|c| *c == Call::Load(path("two", "A")))
            .unwrap();
        let stop = calls.iter().position(|c| *c == Call::Stop).unwrap();
        assert!(stop < second_load);
        assert!(calls[second_load..]
            .iter()
            .all(|c| !matches!(c, Call::Load(p) if p.starts_with("/music/one"))));

        controller.stop().await;
    }

    #[tokio::test]
    async fn test_skip_requests_reach_session() {
        let (controller, engine, _rx) = controller();
        assert!(!controller.request_next());

        controller.play(album("abc"), 0).await.unwrap();
        wait_until(|| engine.loads().len() == 1).await;

        assert!(controller.request_next());
        wait_until(|| engine.loads().len() == 2).await;
        assert!(controller.request_previous());
        wait_until(|| engine.loads().len() == 3).await;
        assert!(controller.request_previous());
        wait_until(|| engine.loads().len() == 4).await;

        assert_eq!(
            engine.loads(),
            vec![
                path("abc", "A"),
                path("abc", "B"),
                path("abc", "A"),
                path("abc", "A"),
            ]
        );
        controller.stop().await;
    }

    #[tokio::test]
    async fn test_toggle_pause_flips_state() {
        let (controller, engine, _rx) = controller();
        assert_eq!(controller.toggle_pause(), None);
        assert!(engine.calls().is_empty());

        controller.play(album("abc"), 0).await.unwrap();
        wait_until(|| engine.state_now() == EngineState::Playing).await;

        assert_eq!(controller.toggle_pause(), Some(EngineState::Paused));
        assert_eq!(controller.toggle_pause(), Some(EngineState::Playing));
        let calls = engine.calls();
        assert_eq!(&calls[calls.len() - 2..], &[Call::Pause, Call::Resume]);

        controller.stop().await;
    }

    #[tokio::test]
    async fn test_toggle_pause_swallows_engine_errors() {
        let (controller, engine, mut rx) = controller();
        engine.script().state = EngineState::Playing;
        engine.script().transient_failures = 1;

        // Logged only, nothing reaches the display
        assert_eq!(controller.toggle_pause(), None);
        assert!(rx.try_recv().is_err());

        assert_eq!(controller.toggle_pause(), Some(EngineState::Paused));
        engine.script().fail_queries = true;
        assert_eq!(controller.toggle_pause(), None);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stop_halts_session_and_engine() {
        let (controller, engine, _rx) = controller();
        controller.play(album("abc"), 1).await.unwrap();
        wait_until(|| engine.loads().len() == 1).await;

        controller.stop().await;
        assert_eq!(controller.active_session().await, None);
        assert_eq!(engine.state_now(), EngineState::Ended);
        assert_eq!(controller.slot.available_permits(), 1);
        assert!(!controller.request_next());

        // Idle controller takes a new album right away
        controller.play(album("abc"), 0).await.unwrap();
        wait_until(|| engine.loads().len() == 2).await;
        controller.stop().await;
    }

    #[tokio::test]
    async fn test_failed_session_leaves_controller_ready() {
        let (controller, engine, _rx) = controller();
        engine.script().fail_load = Some(path("bad", "A"));

        controller.play(album("bad"), 0).await.unwrap();
        wait_until(|| controller.slot.available_permits() == 1).await;
        assert_eq!(controller.active_session().await, None);

        controller.play(album("good"), 0).await.unwrap();
        wait_until(|| engine.loads().contains(&path("good", "A"))).await;
        assert!(controller.active_session().await.is_some());
        controller.stop().await;
    }

    #[tokio::test]
    async fn test_shutdown_refuses_new_sessions() {
        let (controller, _engine, _rx) = controller();
        controller.play(album("abc"), 0).await.unwrap();
        controller.shutdown().await;
        assert_eq!(
            controller.play(album("abc"), 0).await,
            Err(TransportError::ShutDown)
        );
    }
}
