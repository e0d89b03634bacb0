// Position reporter - samples the engine on its own clock and republishes
// elapsed/total for the status bar and progress gauge

use super::{EngineHandle, EngineState, EventSender, PlayerEvent};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Full scale of the progress gauge.
pub const PROGRESS_RESOLUTION: u16 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub elapsed_ms: u64,
    pub total_ms: u64,
    /// "HH:MM:SS - HH:MM:SS"
    pub status: String,
    /// 0..=PROGRESS_RESOLUTION
    pub ratio: u16,
}

impl Progress {
    pub fn new(position: f32, length_ms: u64) -> Self {
        let position = if position.is_finite() {
            position.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let elapsed_ms = (length_ms as f64 * position as f64) as u64;
        Self {
            elapsed_ms,
            total_ms: length_ms,
            status: format!("{} - {}", clock(elapsed_ms), clock(length_ms)),
            ratio: (position * PROGRESS_RESOLUTION as f32) as u16,
        }
    }
}

/// Format an elapsed fraction of a track as "<elapsed> - <total>".
pub fn timestamp(position: f32, length_ms: u64) -> String {
    Progress::new(position, length_ms).status
}

fn clock(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

pub struct PositionReporter {
    engine: EngineHandle,
    events: EventSender,
    interval: Duration,
}

impl PositionReporter {
    pub fn new(engine: EngineHandle, events: EventSender, interval: Duration) -> Self {
        Self {
            engine,
            events,
            interval,
        }
    }

    /// One tick. Each query takes the engine lock on its own; any failure
    /// just skips this tick.
    pub fn sample(&self) -> Option<Progress> {
        match self.engine.state() {
            Ok(EngineState::Playing) => {}
            Ok(_) => return None,
            Err(e) => {
                debug!("Reporter skipped tick, state query failed: {}", e);
                return None;
            }
        }

        let length = match self.engine.duration() {
            Ok(length) => length,
            Err(e) => {
                debug!("Reporter skipped tick, duration query failed: {}", e);
                return None;
            }
        };

        let position = match self.engine.position() {
            Ok(position) => position,
            Err(e) => {
                debug!("Reporter skipped tick, position query failed: {}", e);
                return None;
            }
        };

        Some(Progress::new(position, length))
    }

    pub fn spawn(self) -> ReporterHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        ReporterHandle { shutdown, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Some(progress) = self.sample() {
                        if self.events.send(PlayerEvent::Progress(progress)).is_err() {
                            debug!("Display closed, position reporter exiting");
                            break;
                        }
                    }
                }
            }
        }
    }
}

pub struct ReporterHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReporterHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::engine::testing::ScriptedEngine;
    use tokio::sync::mpsc;

    #[test]
    fn test_timestamp() {
        assert_eq!(timestamp(0.11881344, 121078), "00:00:14 - 00:02:01");
        assert_eq!(timestamp(0.22867697, 53107), "00:00:12 - 00:00:53");
    }

    #[test]
    fn test_timestamp_hours() {
        assert_eq!(timestamp(0.5, 2 * 3_600_000), "01:00:00 - 02:00:00");
    }

    #[test]
    fn test_progress_ratio_scaled() {
        assert_eq!(Progress::new(0.11881344, 121078).ratio, 118);
        assert_eq!(Progress::new(1.5, 1000).ratio, PROGRESS_RESOLUTION);
        assert_eq!(Progress::new(f32::NAN, 1000).ratio, 0);
    }

    fn reporter(engine: &ScriptedEngine) -> (PositionReporter, mpsc::UnboundedReceiver<PlayerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = PositionReporter::new(
            EngineHandle::new(engine.clone()),
            tx,
            Duration::from_millis(5),
        );
        (reporter, rx)
    }

    #[test]
    fn test_sample_only_while_playing() {
        let engine = ScriptedEngine::new();
        {
            let mut s = engine.script();
            s.position = 0.11881344;
            s.duration_ms = 121078;
            s.state = EngineState::Paused;
        }
        let (reporter, _rx) = reporter(&engine);
        assert_eq!(reporter.sample(), None);

        engine.script().state = EngineState::Playing;
        let progress = reporter.sample().unwrap();
        assert_eq!(progress.status, "00:00:14 - 00:02:01");
        assert_eq!(progress.total_ms, 121078);
    }

    #[test]
    fn test_transient_failure_skips_tick() {
        let engine = ScriptedEngine::new();
        {
            let mut s = engine.script();
            s.state = EngineState::Playing;
            s.duration_ms = 60_000;
            s.transient_failures = 2;
        }
        let (reporter, _rx) = reporter(&engine);
        assert_eq!(reporter.sample(), None);
        assert_eq!(reporter.sample(), None);
        assert!(reporter.sample().is_some());
    }

    #[tokio::test]
    async fn test_spawned_reporter_publishes_and_shuts_down() {
        let engine = ScriptedEngine::new();
        {
            let mut s = engine.script();
            s.state = EngineState::Playing;
            s.position = 0.5;
            s.duration_ms = 10_000;
        }
        let (reporter, mut rx) = reporter(&engine);
        let handle = reporter.spawn();

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            PlayerEvent::Progress(p) => {
                assert_eq!(p.status, "00:00:05 - 00:00:10");
                assert_eq!(p.ratio, 500);
            }
            other => panic!("unexpected event {:?}", other),
        }

        tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
            .await
            .unwrap();
    }
}
