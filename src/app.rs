//! Application state and the main event loop.
use crate::builtin_themes;
use crate::config::Config;
use crate::library::{self, Library, Song};
use crate::logging::LogBuffer;
use crate::now_playing::NowPlaying;
use crate::player::{PlayerEvent, PlayerHandle};
use crate::player_bar::{BarEvent, BarSubscription};
use crate::progress::ProgressState;
use crate::tui::{self, Theme};
use color_eyre::Result;
use crossbeam::channel::Receiver;
use log::warn;
use ratatui::{
    DefaultTerminal,
    crossterm::event::{Event, KeyCode, KeyEventKind, poll, read},
    style::Style,
    widgets::ListState,
};
use ratatui_explorer::{FileExplorer, Theme as ExplorerTheme};
use std::collections::VecDeque;
use std::time::Duration;

/// Height of the now-playing bar strip, borders included.
pub const BAR_HEIGHT: u16 = 3;
const SEEK_STEP: f32 = 5.;
const VOLUME_STEP: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Library,
    Browser,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsRow {
    RescanLibrary,
    MusicFolder,
    Theme,
    About,
}

impl SettingsRow {
    pub fn label(&self) -> &'static str {
        match self {
            SettingsRow::RescanLibrary => "Rescan library",
            SettingsRow::MusicFolder => "Music folder",
            SettingsRow::Theme => "Theme",
            SettingsRow::About => "About",
        }
    }
}

pub const SETTINGS_GROUPS: &[(&str, &[SettingsRow])] = &[
    (
        "Library",
        &[SettingsRow::RescanLibrary, SettingsRow::MusicFolder],
    ),
    ("Appearance", &[SettingsRow::Theme]),
    ("About", &[SettingsRow::About]),
];

fn settings_row_at(index: usize) -> Option<SettingsRow> {
    SETTINGS_GROUPS
        .iter()
        .flat_map(|(_, rows)| rows.iter().copied())
        .nth(index)
}

fn settings_row_count() -> usize {
    SETTINGS_GROUPS.iter().map(|(_, rows)| rows.len()).sum()
}

pub struct App {
    pub config: Config,
    pub theme: Theme,
    pub library: Library,
    pub player: PlayerHandle,
    events_rx: Receiver<PlayerEvent>,
    pub now_playing: NowPlaying,
    pub screen: Screen,

    // library tab
    pub library_list: ListState,
    pub search: Option<String>,
    pub filter: String,
    pub library_bottom_inset: u16,
    library_bar_events: BarSubscription,

    // settings tab
    pub settings_cursor: usize,
    pub settings_bottom_inset: u16,
    settings_bar_events: BarSubscription,

    // browser tab
    pub explorer: FileExplorer,

    // overlays
    pub player_screen: Option<ProgressState>,
    pub alerts: VecDeque<String>,
    pub show_logs: bool,
    pub log_buffer: LogBuffer,

    pub shuffle: bool,
    pub repeat: bool,
    pub volume: f32,
    should_quit: bool,
}

impl App {
    pub fn new(
        config: Config,
        library: Library,
        player: PlayerHandle,
        events_rx: Receiver<PlayerEvent>,
        log_buffer: LogBuffer,
    ) -> Result<Self> {
        let theme = builtin_themes::by_name(&config.theme);
        let explorer_theme = ExplorerTheme::default()
            .add_default_title()
            .with_item_style(Style::default().fg(theme.foreground));
        let explorer = FileExplorer::with_theme(explorer_theme)?;

        let mut now_playing = NowPlaying::new();
        let library_bar_events = now_playing.bar_mut().subscribe();
        let settings_bar_events = now_playing.bar_mut().subscribe();

        let mut library_list = ListState::default();
        if !library.songs().is_empty() {
            library_list.select(Some(0));
        }

        let volume = config.volume.clamp(0., 1.);
        Ok(Self {
            config,
            theme,
            library,
            player,
            events_rx,
            now_playing,
            screen: Screen::Library,
            library_list,
            search: None,
            filter: String::new(),
            library_bottom_inset: 0,
            library_bar_events,
            settings_cursor: 0,
            settings_bottom_inset: 0,
            settings_bar_events,
            explorer,
            player_screen: None,
            alerts: VecDeque::new(),
            show_logs: false,
            log_buffer,
            shuffle: false,
            repeat: false,
            volume,
            should_quit: false,
        })
    }

    /// Indices into the library's song list currently shown, honoring the
    /// live search query over the committed filter.
    pub fn visible_songs(&self) -> Vec<usize> {
        let query = self.search.as_deref().unwrap_or(&self.filter);
        self.library.filtered(query)
    }

    pub fn settings_value(&self, row: SettingsRow) -> String {
        match row {
            SettingsRow::RescanLibrary => format!("{} songs", self.library.songs().len()),
            SettingsRow::MusicFolder => self.library.music_dir().display().to_string(),
            SettingsRow::Theme => self.config.theme.clone(),
            SettingsRow::About => format!("v{}", env!("CARGO_PKG_VERSION")),
        }
    }

    fn main_loop(&mut self, mut terminal: DefaultTerminal) -> Result<()> {
        loop {
            self.drain_player_events();
            self.drain_bar_events();
            terminal.draw(|frame| tui::draw(frame, self))?;

            if poll(Duration::from_millis(33))? {
                let event = read()?;
                self.handle_event(event)?;
            }
            if self.should_quit {
                if let Err(err) = self.config.save() {
                    warn!("cannot save config: {err}");
                }
                return Ok(());
            }
        }
    }

    /// Routes player events into the observer and, when the player screen
    /// is open, into its progress state.
    fn drain_player_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match &event {
                PlayerEvent::Tick { current_time } => {
                    if let Some(progress) = &mut self.player_screen {
                        let duration = self
                            .now_playing
                            .snapshot()
                            .map(|snapshot| snapshot.duration)
                            .unwrap_or(0.);
                        progress.tick(*current_time, duration);
                    }
                }
                PlayerEvent::SongLoaded(snapshot) => {
                    if let Some(progress) = &mut self.player_screen {
                        progress.tick(0., snapshot.duration);
                    }
                }
                _ => {}
            }
            self.now_playing.handle_event(event);
        }

        for notice in self.now_playing.take_notices() {
            self.alerts.push_back(notice);
        }
        if self.now_playing.take_close_detail() {
            // an abandoned drag is discarded, not committed
            self.player_screen = None;
        }
    }

    // screens pad their scroll regions by the bar height while it's shown
    fn drain_bar_events(&mut self) {
        while let Ok(event) = self.library_bar_events.events.try_recv() {
            self.library_bottom_inset = match event {
                BarEvent::Appeared => BAR_HEIGHT,
                BarEvent::Disappeared => 0,
            };
        }
        while let Ok(event) = self.settings_bar_events.events.try_recv() {
            self.settings_bottom_inset = match event {
                BarEvent::Appeared => BAR_HEIGHT,
                BarEvent::Disappeared => 0,
            };
        }
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        let mut consumed = false;
        if let Event::Key(key) = &event {
            if key.kind == KeyEventKind::Press {
                consumed = self.handle_key(key.code);
            }
        }
        // whatever the app didn't take goes to the file browser
        if !consumed && self.screen == Screen::Browser && self.no_overlay() {
            self.explorer.handle(&event)?;
        }
        Ok(())
    }

    fn no_overlay(&self) -> bool {
        self.player_screen.is_none()
            && self.alerts.is_empty()
            && !self.show_logs
            && self.search.is_none()
    }

    /// Returns true when the key was consumed.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        // overlays swallow input, topmost first
        if !self.alerts.is_empty() {
            if matches!(code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.alerts.pop_front();
            }
            return true;
        }
        if self.show_logs {
            if matches!(code, KeyCode::Char('l') | KeyCode::Esc | KeyCode::Char('q')) {
                self.show_logs = false;
            }
            return true;
        }
        if self.player_screen.is_some() {
            self.player_screen_key(code);
            return true;
        }
        if self.search.is_some() {
            self.search_key(code);
            return true;
        }

        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('1') => self.screen = Screen::Library,
            KeyCode::Char('2') => self.screen = Screen::Browser,
            KeyCode::Char('3') => self.screen = Screen::Settings,
            KeyCode::Char('l') => self.show_logs = true,
            KeyCode::Char(' ') => self.player.toggle_play_pause(),
            KeyCode::Char('n') => self.player.next(),
            KeyCode::Char('b') => self.player.previous(),
            KeyCode::Char('x') => self.player.stop(),
            KeyCode::Char('s') => self.toggle_shuffle(),
            KeyCode::Char('r') => self.toggle_repeat(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.volume_by(VOLUME_STEP),
            KeyCode::Char('-') => self.volume_by(-VOLUME_STEP),
            KeyCode::Char('p') => self.open_player_screen(),
            _ => return self.screen_key(code),
        }
        true
    }

    fn screen_key(&mut self, code: KeyCode) -> bool {
        match self.screen {
            Screen::Library => match code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.move_selection(-1);
                    true
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.move_selection(1);
                    true
                }
                KeyCode::Enter => {
                    self.play_selected();
                    true
                }
                KeyCode::Char('/') => {
                    self.search = Some(String::new());
                    true
                }
                _ => false,
            },
            Screen::Browser => match code {
                // only a file selection is ours; directories belong to
                // the explorer's own navigation
                KeyCode::Enter if self.explorer.current().is_file() => {
                    self.play_browsed();
                    true
                }
                _ => false,
            },
            Screen::Settings => match code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.settings_cursor = self.settings_cursor.saturating_sub(1);
                    true
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.settings_cursor =
                        (self.settings_cursor + 1).min(settings_row_count() - 1);
                    true
                }
                KeyCode::Enter => {
                    self.settings_activate();
                    true
                }
                _ => false,
            },
        }
    }

    fn search_key(&mut self, code: KeyCode) {
        let Some(query) = &mut self.search else {
            return;
        };
        match code {
            KeyCode::Esc => self.search = None,
            KeyCode::Enter => {
                self.filter = self.search.take().unwrap_or_default();
            }
            KeyCode::Backspace => {
                query.pop();
            }
            KeyCode::Char(c) => query.push(c),
            _ => {}
        }
        self.reset_selection();
    }

    fn player_screen_key(&mut self, code: KeyCode) {
        let Some(progress) = &mut self.player_screen else {
            return;
        };
        match code {
            KeyCode::Left | KeyCode::Right => {
                if !progress.is_dragging() {
                    progress.begin_drag();
                }
                let step = if code == KeyCode::Left {
                    -SEEK_STEP
                } else {
                    SEEK_STEP
                };
                progress.update_drag(progress.current_time() + step);
            }
            KeyCode::Enter => {
                if progress.is_dragging() {
                    let time = progress.end_drag();
                    self.player.seek(time);
                }
            }
            KeyCode::Esc => {
                if progress.is_dragging() {
                    progress.cancel_drag();
                } else {
                    self.player_screen = None;
                }
            }
            // closing mid-drag discards the dragged value
            KeyCode::Char('q') | KeyCode::Char('p') => self.player_screen = None,
            KeyCode::Char(' ') => self.player.toggle_play_pause(),
            KeyCode::Char('n') => self.player.next(),
            KeyCode::Char('b') => self.player.previous(),
            KeyCode::Char('x') => self.player.stop(),
            KeyCode::Char('s') => self.toggle_shuffle(),
            KeyCode::Char('r') => self.toggle_repeat(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.volume_by(VOLUME_STEP),
            KeyCode::Char('-') => self.volume_by(-VOLUME_STEP),
            _ => {}
        }
    }

    /// Opens the player screen. Requires a loaded song; the key is ignored
    /// otherwise.
    fn open_player_screen(&mut self) {
        let Some(snapshot) = self.now_playing.snapshot() else {
            return;
        };
        let mut progress = ProgressState::new();
        progress.tick(snapshot.current_time, snapshot.duration);
        self.player_screen = Some(progress);
    }

    fn play_selected(&mut self) {
        let indices = self.visible_songs();
        let Some(selected) = self.library_list.selected() else {
            return;
        };
        if selected >= indices.len() {
            return;
        }
        // the visible list becomes the queue, starting at the selection
        let songs: Vec<Song> = indices
            .iter()
            .map(|&index| self.library.songs()[index].clone())
            .collect();
        self.player.play_queue(songs, selected);
    }

    fn play_browsed(&mut self) {
        let file = self.explorer.current();
        let path = file.path().clone();
        let name = file.name().to_string();
        if !library::is_audio_file(&path) {
            self.alerts.push_back(format!("Not an audio file: {name}"));
            return;
        }
        match library::probe_song(&path) {
            Ok(song) => self.player.play_queue(vec![song], 0),
            Err(err) => {
                warn!("cannot open {}: {err}", path.display());
                self.alerts.push_back(format!("Cannot play \"{name}\""));
            }
        }
    }

    fn settings_activate(&mut self) {
        let Some(row) = settings_row_at(self.settings_cursor) else {
            return;
        };
        match row {
            SettingsRow::RescanLibrary => {
                let count = self.library.scan();
                self.reset_selection();
                self.alerts.push_back(format!("Library rescanned: {count} songs"));
            }
            SettingsRow::MusicFolder => {
                self.alerts.push_back(format!(
                    "Music folder: {}",
                    self.library.music_dir().display()
                ));
            }
            SettingsRow::Theme => self.cycle_theme(),
            SettingsRow::About => {
                self.alerts
                    .push_back(format!("quaver v{}", env!("CARGO_PKG_VERSION")));
            }
        }
    }

    fn cycle_theme(&mut self) {
        let names = builtin_themes::THEME_NAMES;
        let index = names
            .iter()
            .position(|name| *name == self.config.theme)
            .unwrap_or(0);
        let next = names[(index + 1) % names.len()];
        self.config.theme = next.to_string();
        self.theme = builtin_themes::by_name(next);
        if let Err(err) = self.config.save() {
            warn!("cannot save config: {err}");
        }
    }

    fn toggle_shuffle(&mut self) {
        self.shuffle = !self.shuffle;
        self.player.set_shuffle(self.shuffle);
    }

    fn toggle_repeat(&mut self) {
        self.repeat = !self.repeat;
        self.player.set_repeat(self.repeat);
    }

    fn volume_by(&mut self, delta: f32) {
        self.volume = (self.volume + delta).clamp(0., 1.);
        self.config.volume = self.volume;
        self.player.set_volume(self.volume);
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.visible_songs().len();
        if len == 0 {
            self.library_list.select(None);
            return;
        }
        let current = self.library_list.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1) as usize;
        self.library_list.select(Some(next));
    }

    fn reset_selection(&mut self) {
        let len = self.visible_songs().len();
        self.library_list
            .select(if len == 0 { None } else { Some(0) });
    }
}

pub fn run(mut app: App) -> Result<()> {
    let terminal = ratatui::init();
    let result = app.main_loop(terminal);
    ratatui::restore();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{PlaybackSnapshot, PlayerCommand};
    use crossbeam::channel::unbounded;
    use std::path::PathBuf;

    struct Harness {
        app: App,
        events_tx: crossbeam::channel::Sender<PlayerEvent>,
        commands_rx: Receiver<PlayerCommand>,
    }

    fn harness() -> Harness {
        let (commands_tx, commands_rx) = unbounded();
        let (events_tx, events_rx) = unbounded();
        let app = App::new(
            Config::default(),
            Library::new(PathBuf::from("/nonexistent")),
            PlayerHandle::new(commands_tx),
            events_rx,
            crate::logging::LogBuffer::default(),
        )
        .unwrap();
        Harness {
            app,
            events_tx,
            commands_rx,
        }
    }

    fn snapshot() -> PlaybackSnapshot {
        PlaybackSnapshot {
            song: Some(PathBuf::from("/music/a.flac")),
            title: "a".to_string(),
            artist: None,
            album: None,
            artwork: None,
            is_playing: true,
            current_time: 0.,
            duration: 200.,
        }
    }

    fn start_playing(h: &mut Harness) {
        h.events_tx
            .send(PlayerEvent::SongLoaded(snapshot()))
            .unwrap();
        h.events_tx.send(PlayerEvent::Started).unwrap();
        h.app.drain_player_events();
        h.app.drain_bar_events();
    }

    #[test]
    fn bar_appearance_pads_the_screens() {
        let mut h = harness();
        assert_eq!(h.app.library_bottom_inset, 0);
        start_playing(&mut h);
        assert_eq!(h.app.library_bottom_inset, BAR_HEIGHT);
        assert_eq!(h.app.settings_bottom_inset, BAR_HEIGHT);
        h.events_tx.send(PlayerEvent::Stopped).unwrap();
        h.app.drain_player_events();
        h.app.drain_bar_events();
        assert_eq!(h.app.library_bottom_inset, 0);
        assert_eq!(h.app.settings_bottom_inset, 0);
    }

    #[test]
    fn player_screen_needs_a_loaded_song() {
        let mut h = harness();
        h.app.handle_key(KeyCode::Char('p'));
        assert!(h.app.player_screen.is_none());
        start_playing(&mut h);
        h.app.handle_key(KeyCode::Char('p'));
        assert!(h.app.player_screen.is_some());
    }

    #[test]
    fn scrub_commits_on_enter() {
        let mut h = harness();
        start_playing(&mut h);
        h.events_tx
            .send(PlayerEvent::Tick { current_time: 50. })
            .unwrap();
        h.app.drain_player_events();
        h.app.handle_key(KeyCode::Char('p'));
        h.app.handle_key(KeyCode::Right);
        h.app.handle_key(KeyCode::Right);
        h.app.handle_key(KeyCode::Enter);
        let commands: Vec<_> = h.commands_rx.try_iter().collect();
        assert!(
            commands
                .iter()
                .any(|command| matches!(command, PlayerCommand::Seek(time) if *time == 60.))
        );
        assert!(!h.app.player_screen.as_ref().unwrap().is_dragging());
    }

    #[test]
    fn closing_mid_drag_discards_the_drag() {
        let mut h = harness();
        start_playing(&mut h);
        h.app.handle_key(KeyCode::Char('p'));
        h.app.handle_key(KeyCode::Right);
        h.app.handle_key(KeyCode::Char('q'));
        assert!(h.app.player_screen.is_none());
        let commands: Vec<_> = h.commands_rx.try_iter().collect();
        assert!(
            !commands
                .iter()
                .any(|command| matches!(command, PlayerCommand::Seek(_)))
        );
    }

    #[test]
    fn stop_closes_the_player_screen() {
        let mut h = harness();
        start_playing(&mut h);
        h.app.handle_key(KeyCode::Char('p'));
        h.events_tx.send(PlayerEvent::Stopped).unwrap();
        h.app.drain_player_events();
        assert!(h.app.player_screen.is_none());
    }

    #[test]
    fn failure_becomes_a_blocking_alert() {
        let mut h = harness();
        h.events_tx
            .send(PlayerEvent::Failed {
                title: "broken".to_string(),
            })
            .unwrap();
        h.app.drain_player_events();
        assert_eq!(h.app.alerts.front().unwrap(), "Cannot play \"broken\"");
        // any other key is swallowed, enter dismisses
        h.app.handle_key(KeyCode::Char('n'));
        assert_eq!(h.app.alerts.len(), 1);
        h.app.handle_key(KeyCode::Enter);
        assert!(h.app.alerts.is_empty());
    }

    #[test]
    fn ticks_reach_an_open_player_screen() {
        let mut h = harness();
        start_playing(&mut h);
        h.app.handle_key(KeyCode::Char('p'));
        h.events_tx
            .send(PlayerEvent::Tick { current_time: 12.5 })
            .unwrap();
        h.app.drain_player_events();
        let progress = h.app.player_screen.as_ref().unwrap();
        assert_eq!(progress.current_time(), 12.5);
        assert_eq!(progress.duration(), 200.);
    }
}
