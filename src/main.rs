mod app;
mod builtin_themes;
mod config;
mod library;
mod logging;
mod now_playing;
mod player;
mod player_bar;
mod progress;
mod timefmt;
mod tui;

use crate::app::App;
use crate::config::Config;
use crate::library::Library;
use crate::player::{AudioPlayer, PlayerCommand, PlayerEvent, PlayerHandle};
use color_eyre::Result;
use crossbeam::channel::unbounded;
use log::error;
use std::thread;

fn main() -> Result<()> {
    color_eyre::install()?;
    let log_buffer = logging::init();

    let config = Config::load();
    let mut library = Library::new(config.music_dir.clone());
    library.scan();

    // commands flow to the player thread, events flow back
    let (command_tx, command_rx) = unbounded::<PlayerCommand>();
    let (events_tx, events_rx) = unbounded::<PlayerEvent>();

    // the audio stream isn't Send, so the player is built on its own thread
    thread::spawn(move || {
        let mut player = match AudioPlayer::new(events_tx) {
            Ok(player) => player,
            Err(err) => {
                error!("audio output unavailable: {err}");
                return;
            }
        };
        player.run(command_rx);
    });

    let handle = PlayerHandle::new(command_tx);
    handle.set_volume(config.volume);

    let app = App::new(config, library, handle, events_rx, log_buffer)?;
    app::run(app)
}
