use super::events::{AppEvent, EventHandler};
use super::view::{render, LibraryView, Theme};
use super::TerminalManager;
use crate::audio::{Album, EventReceiver, ReporterHandle, TrackSequence, TransportController};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct App {
    terminal: TerminalManager,
    event_handler: EventHandler,
    player_events: EventReceiver,
    transport: TransportController,
    reporter: Option<ReporterHandle>,
    view: LibraryView,
    theme: Theme,
    tick_rate: Duration,
}

impl App {
    pub fn new(
        albums: Vec<Album>,
        transport: TransportController,
        player_events: EventReceiver,
        reporter: ReporterHandle,
        theme: Theme,
        tick_rate: Duration,
    ) -> Result<Self> {
        let terminal = TerminalManager::new()?;

        Ok(Self {
            terminal,
            event_handler: EventHandler::new(),
            player_events,
            transport,
            reporter: Some(reporter),
            view: LibraryView::new(albums),
            theme,
            tick_rate,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        let _reader = self.event_handler.spawn_terminal_reader();
        let mut ticker = tokio::time::interval(self.tick_rate);

        let result = loop {
            let theme = self.theme;
            let view = &mut self.view;
            if let Err(e) = self.terminal.draw(|f| render(f, view, &theme)) {
                break Err(e);
            }

            tokio::select! {
                Some(event) = self.event_handler.next_event() => {
                    if !self.handle_event(event).await {
                        break Ok(());
                    }
                }
                Some(event) = self.player_events.recv() => {
                    self.view.apply(event);
                    // Drain whatever else piled up before redrawing
                    while let Ok(event) = self.player_events.try_recv() {
                        self.view.apply(event);
                    }
                }
                _ = ticker.tick() => {}
            }
        };

        info!("Shutting down playback");
        self.transport.shutdown().await;
        if let Some(reporter) = self.reporter.take() {
            reporter.shutdown().await;
        }
        result
    }

    /// Returns false once the user asked to quit.
    async fn handle_event(&mut self, event: AppEvent) -> bool {
        debug!("Key event {:?}", event);
        match event {
            AppEvent::Quit => return false,
            AppEvent::Render => {}
            AppEvent::Up => self.view.move_by(-1),
            AppEvent::Down => self.view.move_by(1),
            AppEvent::PageUp => self.view.page_up(),
            AppEvent::PageDown => self.view.page_down(),
            AppEvent::FocusPlaying => self.view.focus_playing(),
            AppEvent::Play => self.play_selected().await,
            AppEvent::TogglePause => {
                self.transport.toggle_pause();
            }
            AppEvent::Next => {
                self.transport.request_next();
            }
            AppEvent::Previous => {
                self.transport.request_previous();
            }
            AppEvent::Stop => {
                self.transport.stop().await;
                self.view.stop_playing();
            }
        }
        true
    }

    async fn play_selected(&mut self) {
        let Some(album) = self.view.selected_album() else {
            return;
        };
        let sequence = Arc::new(TrackSequence::from_album(album));
        info!("Play album '{}'", sequence.title());

        match self.transport.play(sequence, 0).await {
            Ok(session) => self.view.start_playing(session),
            Err(e) => {
                warn!("Cannot play album: {}", e);
                self.view.show_message(e.to_string());
            }
        }
    }
}
