//! Reacts to player events: keeps the playback state machine, drives the
//! bar coordinator and the bar's displayed contents.
use crate::player::{PlaybackSnapshot, PlayerEvent};
use crate::player_bar::BarCoordinator;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Paused,
    Playing,
}

/// What the now-playing bar shows. Re-derived from the latest snapshot on
/// every transition, never patched incrementally.
#[derive(Debug, Clone, PartialEq)]
pub struct BarDisplay {
    pub title: String,
    pub artwork: Option<PathBuf>,
    pub show_pause: bool,
}

pub struct NowPlaying {
    state: PlaybackState,
    snapshot: Option<PlaybackSnapshot>,
    bar: BarCoordinator,
    display: Option<BarDisplay>,
    close_detail: bool,
    notices: Vec<String>,
}

impl NowPlaying {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Stopped,
            snapshot: None,
            bar: BarCoordinator::new(),
            display: None,
            close_detail: false,
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn snapshot(&self) -> Option<&PlaybackSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn display(&self) -> Option<&BarDisplay> {
        self.display.as_ref()
    }

    pub fn bar(&self) -> &BarCoordinator {
        &self.bar
    }

    pub fn bar_mut(&mut self) -> &mut BarCoordinator {
        &mut self.bar
    }

    /// True once after a stop: the player screen, if open, must close.
    pub fn take_close_detail(&mut self) -> bool {
        std::mem::take(&mut self.close_detail)
    }

    /// Drains pending user-facing failure notices.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    pub fn handle_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::SongLoaded(snapshot) => {
                self.snapshot = Some(snapshot);
                self.refresh_display();
            }
            PlayerEvent::Started => {
                // resume/start means nothing until a song was loaded
                if self.snapshot.is_none() {
                    return;
                }
                self.state = PlaybackState::Playing;
                self.bar.show();
                self.refresh_display();
            }
            PlayerEvent::Paused => {
                if self.snapshot.is_none() {
                    return;
                }
                self.state = PlaybackState::Paused;
                // bar stays visible, only the glyph changes
                self.refresh_display();
            }
            PlayerEvent::Stopped => {
                self.state = PlaybackState::Stopped;
                self.snapshot = None;
                self.bar.hide();
                self.close_detail = true;
                self.refresh_display();
            }
            PlayerEvent::Tick { current_time } => {
                if let Some(snapshot) = &mut self.snapshot {
                    snapshot.current_time = current_time;
                }
            }
            PlayerEvent::Failed { title } => {
                // a side-channel notice, not a transition
                self.notices.push(format!("Cannot play \"{title}\""));
            }
        }
    }

    fn refresh_display(&mut self) {
        let playing = self.state == PlaybackState::Playing;
        self.display = self.snapshot.as_ref().map(|snapshot| BarDisplay {
            title: snapshot.title.clone(),
            artwork: snapshot.artwork.clone(),
            show_pause: playing,
        });
    }
}

impl Default for NowPlaying {
    fn default() -> Self {
        Self::new()
    }
}
