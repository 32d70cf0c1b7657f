//! Playback service. Owns the rodio sink on its own thread and reports
//! everything observable through `PlayerEvent`s.
use crate::library::Song;
use color_eyre::Result;
use crossbeam::channel::{Receiver, Sender};
use log::{info, warn};
use rand::seq::SliceRandom;
use rodio::Decoder;
use std::fs::File;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// How often position ticks are emitted while playing.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Commands sent from the UI to the player thread.
#[derive(Debug, Clone)]
pub enum PlayerCommand {
    PlayQueue(Vec<Song>, usize),
    TogglePlayPause,
    Stop,
    Next,
    Previous,
    Seek(f32),
    SetShuffle(bool),
    SetRepeat(bool),
    SetVolume(f32),
}

/// Point-in-time readout of playback state, immutable per emission.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub song: Option<PathBuf>,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork: Option<PathBuf>,
    pub is_playing: bool,
    pub current_time: f32,
    pub duration: f32,
}

impl PlaybackSnapshot {
    /// The "artist - album" line for the player screen.
    pub fn artist_line(&self) -> String {
        match (&self.artist, &self.album) {
            (Some(artist), Some(album)) => format!("{artist} - {album}"),
            (Some(artist), None) => artist.clone(),
            (None, Some(album)) => album.clone(),
            (None, None) => "Unknown Album".to_string(),
        }
    }
}

/// Signals emitted by the player thread.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    SongLoaded(PlaybackSnapshot),
    Started,
    Paused,
    Stopped,
    Tick { current_time: f32 },
    Failed { title: String },
}

/// Cloneable handle for sending commands to the player thread.
#[derive(Clone)]
pub struct PlayerHandle {
    command_tx: Sender<PlayerCommand>,
}

impl PlayerHandle {
    pub fn new(command_tx: Sender<PlayerCommand>) -> Self {
        Self { command_tx }
    }

    pub fn play_queue(&self, songs: Vec<Song>, start: usize) {
        let _ = self.command_tx.send(PlayerCommand::PlayQueue(songs, start));
    }

    pub fn toggle_play_pause(&self) {
        let _ = self.command_tx.send(PlayerCommand::TogglePlayPause);
    }

    pub fn stop(&self) {
        let _ = self.command_tx.send(PlayerCommand::Stop);
    }

    pub fn next(&self) {
        let _ = self.command_tx.send(PlayerCommand::Next);
    }

    pub fn previous(&self) {
        let _ = self.command_tx.send(PlayerCommand::Previous);
    }

    pub fn seek(&self, time: f32) {
        let _ = self.command_tx.send(PlayerCommand::Seek(time));
    }

    pub fn set_shuffle(&self, on: bool) {
        let _ = self.command_tx.send(PlayerCommand::SetShuffle(on));
    }

    pub fn set_repeat(&self, on: bool) {
        let _ = self.command_tx.send(PlayerCommand::SetRepeat(on));
    }

    pub fn set_volume(&self, volume: f32) {
        let _ = self.command_tx.send(PlayerCommand::SetVolume(volume));
    }
}

/// Play order over a list of songs. Kept separate from the sink so the
/// shuffle/advance rules are testable without an audio device.
struct PlayQueue {
    songs: Vec<Song>,
    order: Vec<usize>,
    position: usize,
    shuffle: bool,
}

impl PlayQueue {
    fn new() -> Self {
        Self {
            songs: Vec::new(),
            order: Vec::new(),
            position: 0,
            shuffle: false,
        }
    }

    fn set(&mut self, songs: Vec<Song>, start: usize) {
        self.songs = songs;
        self.order = (0..self.songs.len()).collect();
        self.position = start.min(self.songs.len().saturating_sub(1));
        if self.shuffle {
            self.reshuffle();
        }
    }

    fn clear(&mut self) {
        self.songs.clear();
        self.order.clear();
        self.position = 0;
    }

    fn current(&self) -> Option<Song> {
        self.order
            .get(self.position)
            .map(|&index| self.songs[index].clone())
    }

    /// Steps to the next entry, or None once the queue is exhausted.
    fn advance(&mut self) -> Option<Song> {
        if self.position + 1 >= self.order.len() {
            return None;
        }
        self.position += 1;
        self.current()
    }

    /// Steps forward, wrapping around at the end of the queue.
    fn advance_wrapping(&mut self) -> Option<Song> {
        if self.order.is_empty() {
            return None;
        }
        self.position = (self.position + 1) % self.order.len();
        self.current()
    }

    /// Steps backward, wrapping around at the start of the queue.
    fn retreat_wrapping(&mut self) -> Option<Song> {
        if self.order.is_empty() {
            return None;
        }
        self.position = (self.position + self.order.len() - 1) % self.order.len();
        self.current()
    }

    fn set_shuffle(&mut self, on: bool) {
        self.shuffle = on;
        if self.order.is_empty() {
            return;
        }
        if on {
            self.reshuffle();
        } else {
            // restore scan order, keeping the current song current
            let current = self.order[self.position];
            self.order = (0..self.songs.len()).collect();
            self.position = current;
        }
    }

    // current song stays first, the rest is shuffled after it
    fn reshuffle(&mut self) {
        let current = self.order[self.position];
        let mut rest: Vec<usize> = (0..self.songs.len()).filter(|&i| i != current).collect();
        rest.shuffle(&mut rand::thread_rng());
        self.order = std::iter::once(current).chain(rest).collect();
        self.position = 0;
    }
}

/// The playback thread. Decodes with rodio, reports through `events_tx`.
pub struct AudioPlayer {
    _stream_handle: rodio::OutputStream,
    sink: rodio::Sink,
    events_tx: Sender<PlayerEvent>,
    queue: PlayQueue,
    current: Option<Song>,
    playing: bool,
    repeat: bool,
}

impl AudioPlayer {
    pub fn new(events_tx: Sender<PlayerEvent>) -> Result<Self> {
        let _stream_handle = rodio::OutputStreamBuilder::open_default_stream()?;
        let sink = rodio::Sink::connect_new(_stream_handle.mixer());
        Ok(Self {
            _stream_handle,
            sink,
            events_tx,
            queue: PlayQueue::new(),
            current: None,
            playing: false,
            repeat: false,
        })
    }

    pub fn run(&mut self, command_rx: Receiver<PlayerCommand>) {
        info!("player thread started");
        let mut last_tick = Instant::now();
        'running: loop {
            loop {
                match command_rx.try_recv() {
                    Ok(command) => self.handle_command(command),
                    Err(crossbeam::channel::TryRecvError::Empty) => break,
                    Err(crossbeam::channel::TryRecvError::Disconnected) => break 'running,
                }
            }

            // end of track: replay on repeat, otherwise advance
            if self.playing && self.sink.empty() {
                self.finished_track();
            }

            if self.playing && last_tick.elapsed() >= TICK_INTERVAL {
                last_tick = Instant::now();
                let _ = self.events_tx.send(PlayerEvent::Tick {
                    current_time: self.sink.get_pos().as_secs_f32(),
                });
            }

            std::thread::sleep(Duration::from_millis(10));
        }
        info!("player thread stopped");
    }

    fn handle_command(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::PlayQueue(songs, start) => {
                self.queue.set(songs, start);
                if let Some(song) = self.queue.current() {
                    self.load_and_play(song);
                }
            }
            PlayerCommand::TogglePlayPause => self.toggle(),
            PlayerCommand::Stop => self.stop(),
            PlayerCommand::Next => {
                if let Some(song) = self.queue.advance_wrapping() {
                    self.load_and_play(song);
                }
            }
            PlayerCommand::Previous => self.previous(),
            PlayerCommand::Seek(time) => self.seek(time),
            PlayerCommand::SetShuffle(on) => self.queue.set_shuffle(on),
            PlayerCommand::SetRepeat(on) => self.repeat = on,
            PlayerCommand::SetVolume(volume) => self.sink.set_volume(volume.clamp(0., 1.5)),
        }
    }

    /// Decodes before touching the sink, so a failed song leaves whatever
    /// was playing untouched.
    fn load_and_play(&mut self, song: Song) {
        let source = match Self::open_source(&song.path) {
            Ok(source) => source,
            Err(err) => {
                warn!("cannot play {}: {err}", song.path.display());
                let _ = self.events_tx.send(PlayerEvent::Failed {
                    title: song.title.clone(),
                });
                return;
            }
        };

        self.sink.stop();
        self.sink.clear();
        self.sink.append(source);
        self.sink.play();
        self.playing = true;

        info!("playing {}", song.path.display());
        let snapshot = self.snapshot_of(&song);
        self.current = Some(song);
        let _ = self.events_tx.send(PlayerEvent::SongLoaded(snapshot));
        let _ = self.events_tx.send(PlayerEvent::Started);
    }

    fn open_source(path: &std::path::Path) -> Result<Decoder<std::io::BufReader<File>>> {
        let file = File::open(path)?;
        Ok(Decoder::try_from(file)?)
    }

    fn snapshot_of(&self, song: &Song) -> PlaybackSnapshot {
        PlaybackSnapshot {
            song: Some(song.path.clone()),
            title: song.title.clone(),
            artist: song.artist.clone(),
            album: song.album.clone(),
            artwork: song.artwork.clone(),
            is_playing: true,
            current_time: 0.,
            duration: song.duration,
        }
    }

    fn toggle(&mut self) {
        if self.current.is_none() {
            return;
        }
        if self.playing {
            self.sink.pause();
            self.playing = false;
            let _ = self.events_tx.send(PlayerEvent::Paused);
        } else {
            self.sink.play();
            self.playing = true;
            let _ = self.events_tx.send(PlayerEvent::Started);
        }
    }

    fn stop(&mut self) {
        self.sink.stop();
        self.sink.clear();
        self.queue.clear();
        self.current = None;
        self.playing = false;
        let _ = self.events_tx.send(PlayerEvent::Stopped);
    }

    fn previous(&mut self) {
        // a few seconds in, "previous" means restart the current song
        if self.sink.get_pos() > Duration::from_secs(3) {
            if let Some(song) = self.queue.current() {
                self.load_and_play(song);
            }
            return;
        }
        if let Some(song) = self.queue.retreat_wrapping() {
            self.load_and_play(song);
        }
    }

    fn seek(&mut self, time: f32) {
        let Some(current) = &self.current else {
            return;
        };
        let time = time.clamp(0., current.duration.max(0.));
        match self.sink.try_seek(Duration::from_secs_f32(time)) {
            Ok(()) => {
                let _ = self.events_tx.send(PlayerEvent::Tick { current_time: time });
            }
            Err(err) => warn!("seek failed: {err:?}"),
        }
    }

    fn finished_track(&mut self) {
        if self.repeat {
            if let Some(song) = self.queue.current() {
                self.load_and_play(song);
            }
            return;
        }
        match self.queue.advance() {
            Some(song) => self.load_and_play(song),
            None => self.stop(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(name: &str) -> Song {
        Song {
            path: PathBuf::from(format!("/music/{name}.flac")),
            title: name.to_string(),
            artist: None,
            album: None,
            duration: 100.,
            artwork: None,
        }
    }

    fn queue_of(names: &[&str]) -> PlayQueue {
        let mut queue = PlayQueue::new();
        queue.set(names.iter().map(|name| song(name)).collect(), 0);
        queue
    }

    #[test]
    fn advance_stops_at_the_end() {
        let mut queue = queue_of(&["a", "b"]);
        assert_eq!(queue.advance().unwrap().title, "b");
        assert!(queue.advance().is_none());
        // position untouched, current still valid
        assert_eq!(queue.current().unwrap().title, "b");
    }

    #[test]
    fn wrapping_walks_the_whole_queue() {
        let mut queue = queue_of(&["a", "b", "c"]);
        assert_eq!(queue.advance_wrapping().unwrap().title, "b");
        assert_eq!(queue.advance_wrapping().unwrap().title, "c");
        assert_eq!(queue.advance_wrapping().unwrap().title, "a");
        assert_eq!(queue.retreat_wrapping().unwrap().title, "c");
    }

    #[test]
    fn empty_queue_has_nothing_to_play() {
        let mut queue = PlayQueue::new();
        assert!(queue.current().is_none());
        assert!(queue.advance_wrapping().is_none());
        assert!(queue.retreat_wrapping().is_none());
    }

    #[test]
    fn shuffle_keeps_current_and_covers_everything() {
        let mut queue = queue_of(&["a", "b", "c", "d", "e"]);
        queue.advance_wrapping();
        queue.set_shuffle(true);
        assert_eq!(queue.current().unwrap().title, "b");
        let mut seen = vec![queue.current().unwrap().title];
        while let Some(song) = queue.advance() {
            seen.push(song.title);
        }
        seen.sort();
        assert_eq!(seen, ["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn unshuffle_restores_scan_order() {
        let mut queue = queue_of(&["a", "b", "c", "d"]);
        queue.advance_wrapping();
        queue.set_shuffle(true);
        queue.set_shuffle(false);
        assert_eq!(queue.current().unwrap().title, "b");
        assert_eq!(queue.advance().unwrap().title, "c");
    }

    #[test]
    fn start_index_is_clamped() {
        let mut queue = PlayQueue::new();
        queue.set(vec![song("a"), song("b")], 10);
        assert_eq!(queue.current().unwrap().title, "b");
    }
}
