use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Quit,
    Render,

    // Album selection
    Up,
    Down,
    PageUp,
    PageDown,
    FocusPlaying,

    // Playback
    Play,
    TogglePause,
    Next,
    Previous,
    Stop,
}

pub struct EventHandler {
    event_sender: mpsc::UnboundedSender<AppEvent>,
    event_receiver: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();

        Self {
            event_sender,
            event_receiver,
        }
    }

    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.event_receiver.recv().await
    }

    /// Read the terminal on a blocking thread and forward keys as `AppEvent`s.
    /// The reader exits once this handler is dropped.
    pub fn spawn_terminal_reader(&self) -> JoinHandle<()> {
        let sender = self.event_sender.clone();
        tokio::task::spawn_blocking(move || {
            while !sender.is_closed() {
                match event::poll(Duration::from_millis(50)) {
                    Ok(false) => continue,
                    Ok(true) => {}
                    Err(e) => {
                        error!("Terminal poll failed: {}", e);
                        break;
                    }
                }

                let app_event = match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => key_to_app_event(key),
                    Ok(Event::Resize(_, _)) => Some(AppEvent::Render),
                    Ok(_) => None,
                    Err(e) => {
                        error!("Terminal read failed: {}", e);
                        break;
                    }
                };
                if let Some(app_event) = app_event {
                    let _ = sender.send(app_event);
                }
            }
        })
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Emacs keys with some Vim bonuses.
pub fn key_to_app_event(key: KeyEvent) -> Option<AppEvent> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    match key.code {
        KeyCode::Char('c') if ctrl => Some(AppEvent::Quit),
        KeyCode::Char('n') if ctrl => Some(AppEvent::Down),
        KeyCode::Char('p') if ctrl => Some(AppEvent::Up),
        KeyCode::Char('v') if ctrl => Some(AppEvent::PageDown),
        KeyCode::Char('v') if alt => Some(AppEvent::PageUp),
        KeyCode::Char('l') if ctrl => Some(AppEvent::FocusPlaying),
        KeyCode::Char('f') if ctrl => Some(AppEvent::Next),
        KeyCode::Char('b') if ctrl => Some(AppEvent::Previous),
        _ if ctrl || alt => None,

        // Quit
        KeyCode::Char('q') | KeyCode::Esc => Some(AppEvent::Quit),

        // Navigation
        KeyCode::Up | KeyCode::Char('k') => Some(AppEvent::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(AppEvent::Down),
        KeyCode::PageUp => Some(AppEvent::PageUp),
        KeyCode::PageDown => Some(AppEvent::PageDown),

        // Playback controls
        KeyCode::Enter | KeyCode::Tab => Some(AppEvent::Play),
        KeyCode::Char('p') | KeyCode::Char(' ') => Some(AppEvent::TogglePause),
        KeyCode::Right | KeyCode::Char('l') => Some(AppEvent::Next),
        KeyCode::Left | KeyCode::Char('h') => Some(AppEvent::Previous),
        KeyCode::Char('s') => Some(AppEvent::Stop),

        _ => None,
    }
}
