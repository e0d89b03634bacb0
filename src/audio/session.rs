// Playback session - one run of "play this album from track N to the end"
// Lives in its own task, reacts to skip/terminate signals and to the engine
// reporting end of track.

use super::{EngineHandle, EngineState, EventSender, PlayerEvent, TrackSequence};
use crate::error::EngineError;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loading(usize),
    Playing(usize),
    AwaitingEnd(usize),
    Terminated,
}

/// Things that can happen while a track is playing.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    TrackEnded,
    Terminate,
    SkipNext,
    SkipPrevious,
    EngineFailed(EngineError),
}

/// How a session finished.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Ran past the last track.
    Exhausted,
    /// Told to stop.
    Terminated,
    Failed(EngineError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    Next,
    Previous,
}

/// Where a session sitting in `AwaitingEnd(index)` goes next.
///
/// Skipping forward on the last track is ignored and the track keeps playing
/// until it ends. Skipping back on the first track restarts it.
pub fn transition(sequence: &TrackSequence, index: usize, event: &SessionEvent) -> SessionState {
    match event {
        SessionEvent::TrackEnded => sequence
            .next(index)
            .map_or(SessionState::Terminated, SessionState::Loading),
        SessionEvent::SkipNext => sequence
            .next(index)
            .map_or(SessionState::AwaitingEnd(index), SessionState::Loading),
        SessionEvent::SkipPrevious => {
            SessionState::Loading(sequence.previous(index).unwrap_or(index))
        }
        SessionEvent::Terminate | SessionEvent::EngineFailed(_) => SessionState::Terminated,
    }
}

/// Sending half of the skip channels. Each direction holds at most one
/// pending request; anything beyond that is dropped, not queued.
#[derive(Debug, Clone)]
pub struct SessionSignals {
    id: u64,
    next: mpsc::Sender<()>,
    previous: mpsc::Sender<()>,
}

impl SessionSignals {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns whether the request was accepted.
    pub fn request(&self, skip: Skip) -> bool {
        let channel = match skip {
            Skip::Next => &self.next,
            Skip::Previous => &self.previous,
        };
        match channel.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                debug!("Session {}: {:?} already pending, dropping request", self.id, skip);
                false
            }
            Err(TrySendError::Closed(())) => {
                debug!("Session {} already finished, ignoring {:?}", self.id, skip);
                false
            }
        }
    }
}

struct SessionControl {
    terminate: watch::Receiver<bool>,
    next: mpsc::Receiver<()>,
    previous: mpsc::Receiver<()>,
}

/// The controller's grip on a running session.
pub struct SessionHandle {
    id: u64,
    terminate: watch::Sender<bool>,
    task: JoinHandle<SessionOutcome>,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Ask the session to stop and wait until it has. The session notices
    /// within one poll interval.
    pub async fn terminate(self) -> Option<SessionOutcome> {
        // Err only means the session already dropped its receiver
        let _ = self.terminate.send(true);
        self.join().await
    }

    pub async fn join(self) -> Option<SessionOutcome> {
        match self.task.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!("Session {} task failed: {}", self.id, e);
                None
            }
        }
    }
}

pub struct PlaybackSession {
    id: u64,
    sequence: Arc<TrackSequence>,
    start: usize,
    engine: EngineHandle,
    events: EventSender,
    poll_interval: Duration,
}

impl PlaybackSession {
    pub fn new(
        id: u64,
        sequence: Arc<TrackSequence>,
        start: usize,
        engine: EngineHandle,
        events: EventSender,
        poll_interval: Duration,
    ) -> Self {
        Self {
            id,
            sequence,
            start,
            engine,
            events,
            poll_interval,
        }
    }

    /// Start the session task. `slot` is the one-session-at-a-time token;
    /// it is given back when the session terminates.
    pub fn spawn(self, slot: OwnedSemaphorePermit) -> (SessionHandle, SessionSignals) {
        let (terminate_tx, terminate_rx) = watch::channel(false);
        let (next_tx, next_rx) = mpsc::channel(1);
        let (previous_tx, previous_rx) = mpsc::channel(1);

        let id = self.id;
        let control = SessionControl {
            terminate: terminate_rx,
            next: next_rx,
            previous: previous_rx,
        };
        let task = tokio::spawn(async move {
            let _slot = slot;
            self.run(control).await
        });

        let handle = SessionHandle {
            id,
            terminate: terminate_tx,
            task,
        };
        let signals = SessionSignals {
            id,
            next: next_tx,
            previous: previous_tx,
        };
        (handle, signals)
    }

    async fn run(self, mut control: SessionControl) -> SessionOutcome {
        info!(
            "Session {}: playing '{}' from track {}/{}",
            self.id,
            self.sequence.title(),
            self.start,
            self.sequence.len()
        );

        let mut state = SessionState::Loading(self.start);
        let mut touched_engine = false;
        let outcome = loop {
            state = match state {
                SessionState::Loading(index) => {
                    if terminate_requested(&control.terminate) {
                        debug!("Session {}: terminated before loading track {}", self.id, index);
                        if touched_engine {
                            if let Err(e) = self.engine.stop() {
                                error!("Session {}: stop failed: {}", self.id, e);
                            }
                        }
                        break SessionOutcome::Terminated;
                    }
                    touched_engine = true;
                    match blocking(|| self.start_track(index)) {
                        Ok(()) => SessionState::Playing(index),
                        Err(e) => {
                            error!("Session {}: cannot start track {}: {}", self.id, index, e);
                            break SessionOutcome::Failed(e);
                        }
                    }
                }
                SessionState::Playing(index) => {
                    self.publish(index);
                    SessionState::AwaitingEnd(index)
                }
                SessionState::AwaitingEnd(index) => {
                    let event = self.wait_for_event(index, &mut control).await;
                    let next = transition(&self.sequence, index, &event);
                    debug!("Session {}: {:?} on track {} -> {:?}", self.id, event, index, next);
                    if next == SessionState::Terminated {
                        break match event {
                            SessionEvent::TrackEnded => SessionOutcome::Exhausted,
                            SessionEvent::EngineFailed(e) => {
                                error!("Session {}: engine failed: {}", self.id, e);
                                SessionOutcome::Failed(e)
                            }
                            _ => {
                                if let Err(e) = self.engine.stop() {
                                    error!("Session {}: stop failed: {}", self.id, e);
                                }
                                SessionOutcome::Terminated
                            }
                        };
                    }
                    next
                }
                SessionState::Terminated => break SessionOutcome::Terminated,
            };
        };

        if let SessionOutcome::Failed(e) = &outcome {
            let _ = self.events.send(PlayerEvent::Error(e.to_string()));
        }
        let _ = self.events.send(PlayerEvent::SessionEnded {
            session: self.id,
            album: self.sequence.title().to_string(),
        });
        info!("Session {}: finished ({:?})", self.id, outcome);
        outcome
    }

    fn start_track(&self, index: usize) -> Result<(), EngineError> {
        let track = self
            .sequence
            .at(index)
            .map_err(|e| EngineError::Playback(e.to_string()))?;
        debug!("Session {}: loading {}", self.id, track.path().display());
        self.engine.load(track.path())?;
        self.engine.play()
    }

    async fn wait_for_event(&self, index: usize, control: &mut SessionControl) -> SessionEvent {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                // Err means the controller is gone, which is just as final
                _ = control.terminate.changed() => return SessionEvent::Terminate,
                Some(()) = control.next.recv() => return SessionEvent::SkipNext,
                Some(()) = control.previous.recv() => return SessionEvent::SkipPrevious,
                _ = ticker.tick() => match self.engine.state() {
                    Ok(EngineState::Ended) => return SessionEvent::TrackEnded,
                    Ok(EngineState::Error) => {
                        return SessionEvent::EngineFailed(EngineError::Playback(
                            "engine reported an error state".to_string(),
                        ))
                    }
                    Ok(_) => self.publish(index),
                    Err(e) => return SessionEvent::EngineFailed(e),
                },
            }
        }
    }

    fn publish(&self, index: usize) {
        if let Some(label) = self.sequence.status(index) {
            let _ = self.events.send(PlayerEvent::NowPlaying {
                session: self.id,
                album: self.sequence.title().to_string(),
                index,
                label,
            });
        }
    }
}

// Also true once the controller dropped its end
fn terminate_requested(terminate: &watch::Receiver<bool>) -> bool {
    *terminate.borrow() || terminate.has_changed().is_err()
}

// Loading opens and probes the file; keep that off the worker's other tasks
// when the runtime can spare a thread.
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::current().runtime_flavor() {
        RuntimeFlavor::MultiThread => tokio::task::block_in_place(f),
        _ => f(),
    }
}
