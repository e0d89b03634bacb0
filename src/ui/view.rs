use crate::audio::reporter::PROGRESS_RESOLUTION;
use crate::audio::{Album, PlayerEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph},
    Frame,
};

pub const HELP_HINT: &str = "run: alio -h for help";

/// Screen state: the library listing plus whatever playback last reported.
#[derive(Debug, Default)]
pub struct LibraryView {
    albums: Vec<Album>,
    selected: usize,
    playing: Option<Playing>,
    status: String,
    progress: u16,
    message: Option<String>,
    page: usize,
    albums_state: ListState,
    songs_state: ListState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Playing {
    session: u64,
    album: usize,
    track: Option<usize>,
    label: String,
}

impl LibraryView {
    pub fn new(albums: Vec<Album>) -> Self {
        Self {
            albums,
            page: 10,
            ..Self::default()
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_album(&self) -> Option<&Album> {
        self.albums.get(self.selected)
    }

    pub fn move_by(&mut self, delta: isize) {
        if self.albums.is_empty() {
            return;
        }
        let last = self.albums.len() - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(last);
    }

    pub fn page_down(&mut self) {
        self.move_by((self.page / 2).max(1) as isize);
    }

    pub fn page_up(&mut self) {
        self.move_by(-((self.page / 2).max(1) as isize));
    }

    /// Jump the cursor to the album that is playing.
    pub fn focus_playing(&mut self) {
        if let Some(playing) = &self.playing {
            self.selected = playing.album;
        }
    }

    /// A session was started for the selected album.
    pub fn start_playing(&mut self, session: u64) {
        self.playing = Some(Playing {
            session,
            album: self.selected,
            track: None,
            label: String::new(),
        });
        self.message = None;
        self.reset_progress();
    }

    pub fn stop_playing(&mut self) {
        self.playing = None;
        self.reset_progress();
    }

    pub fn show_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    /// Song highlighted in the song list, only while looking at the playing album.
    pub fn highlighted_song(&self) -> Option<usize> {
        self.playing
            .as_ref()
            .filter(|p| p.album == self.selected)
            .and_then(|p| p.track)
    }

    pub fn now_playing(&self) -> Option<&str> {
        self.playing
            .as_ref()
            .map(|p| p.label.as_str())
            .filter(|label| !label.is_empty())
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn progress(&self) -> u16 {
        self.progress
    }

    pub fn apply(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::NowPlaying {
                session,
                index,
                label,
                ..
            } => {
                if let Some(playing) = self.playing.as_mut().filter(|p| p.session == session) {
                    playing.track = Some(index);
                    playing.label = label;
                }
            }
            PlayerEvent::Progress(progress) => {
                if self.playing.is_some() {
                    self.status = progress.status;
                    self.progress = progress.ratio.min(PROGRESS_RESOLUTION);
                }
            }
            PlayerEvent::SessionEnded { session, .. } => {
                if self.playing.as_ref().map(|p| p.session) == Some(session) {
                    self.stop_playing();
                }
            }
            PlayerEvent::Error(message) => self.show_message(message),
        }
    }

    fn reset_progress(&mut self) {
        self.status.clear();
        self.progress = 0;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub color: bool,
}

impl Theme {
    fn album(&self) -> Style {
        if self.color {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        }
    }

    fn album_selected(&self) -> Style {
        if self.color {
            Style::default().bg(Color::Cyan).fg(Color::White)
        } else {
            Style::default().add_modifier(Modifier::REVERSED)
        }
    }

    fn song(&self) -> Style {
        if self.color {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        }
    }

    fn song_selected(&self) -> Style {
        if self.color {
            Style::default().bg(Color::Green).fg(Color::White)
        } else {
            Style::default().add_modifier(Modifier::REVERSED)
        }
    }

    fn label(&self) -> Style {
        if self.color {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        }
    }
}

pub fn render(f: &mut Frame, view: &mut LibraryView, theme: &Theme) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1), Constraint::Length(1)])
        .split(f.area());
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);

    // Borders eat two rows
    view.page = panes[0].height.saturating_sub(2) as usize;

    render_albums(f, panes[0], view, theme);
    render_songs(f, panes[1], view, theme);

    let ratio = f64::from(view.progress) / f64::from(PROGRESS_RESOLUTION);
    let gauge = Gauge::default()
        .gauge_style(theme.song())
        .ratio(ratio.clamp(0.0, 1.0))
        .label("");
    f.render_widget(gauge, rows[1]);

    render_status(f, rows[2], view, theme);
}

fn render_albums(f: &mut Frame, area: Rect, view: &mut LibraryView, theme: &Theme) {
    let items: Vec<ListItem> = view
        .albums
        .iter()
        .map(|album| ListItem::new(album.title.clone()).style(theme.album()))
        .collect();
    let list = List::new(items)
        .block(block("Albums", theme))
        .highlight_style(theme.album_selected());

    view.albums_state
        .select((!view.albums.is_empty()).then_some(view.selected));
    f.render_stateful_widget(list, area, &mut view.albums_state);
}

fn render_songs(f: &mut Frame, area: Rect, view: &mut LibraryView, theme: &Theme) {
    let items: Vec<ListItem> = view
        .selected_album()
        .map(|album| {
            album
                .songs
                .iter()
                .map(|song| ListItem::new(song.clone()).style(theme.song()))
                .collect()
        })
        .unwrap_or_default();
    let list = List::new(items)
        .block(block("Songs", theme))
        .highlight_style(theme.song_selected());

    let highlighted = view.highlighted_song();
    view.songs_state.select(highlighted);
    f.render_stateful_widget(list, area, &mut view.songs_state);
}

fn render_status(f: &mut Frame, area: Rect, view: &LibraryView, theme: &Theme) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(HELP_HINT.len() as u16)])
        .split(area);

    let mut spans = Vec::new();
    if let Some(message) = &view.message {
        spans.push(Span::styled(message.clone(), theme.label()));
    } else if let Some(label) = view.now_playing() {
        spans.push(Span::styled(label.to_string(), theme.label()));
        if !view.status.is_empty() {
            spans.push(Span::raw(format!("  {}", view.status)));
        }
    } else {
        spans.push(Span::raw(format!("{} albums", view.albums.len())));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), columns[0]);
    f.render_widget(Paragraph::new(HELP_HINT), columns[1]);
}

fn block<'a>(title: &'a str, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::TOP)
        .title(Span::styled(title, theme.label()))
}
