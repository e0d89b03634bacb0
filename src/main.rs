// alio - commandline album player
// Scans a music folder into albums and plays them through, one album at a time

use alio::audio::{
    AudioConfig, EngineHandle, MusicScanner, PositionReporter, RodioEngine, TransportController,
};
use alio::config::Config;
use alio::error::ScanError;
use alio::logging;
use alio::ui::{App, Theme};
use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

const BANNER: &str = r"
     _   _
     /\ | | (_)
    /  \| |  _  ___
   / /\ \ | | |/ _ \
  / ____ \| | | (_)
 /_/    \_\ |_|\___/

Commandline Album Player!

Keybinding (Emacs with some Vim bonuses):

Quit:         Ctrl-c | q | Esc

Move down:    Ctrl-n | j | Down
Move up:      Ctrl-p | k | Up
Page down:    Ctrl-v
Page up:      Alt-v

Focus cursor: Ctrl-l
Pause:        p | Space
Stop:         s
Play album:   Enter | Tab
Next:         Right | Ctrl-f | l
Previous:     Left  | Ctrl-b | h

looks for a Music/ directory
    or use --dir to designate directory name";

#[derive(Parser)]
#[command(name = "alio")]
#[command(about = "Commandline album player", before_help = BANNER)]
struct Args {
    /// Music collection directory (defaults to the config value, `Music`)
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Log messages in debug.log
    #[arg(long)]
    debug: bool,

    /// Don't use color highlighting
    #[arg(long)]
    nocolor: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = logging::init(args.debug, &std::env::current_dir()?)?;

    // Load config - falls back to defaults if missing
    let config = Config::load()?;
    let music_dir = args.dir.clone().unwrap_or_else(|| config.music_directory.clone());
    info!(
        "Flags: debug: {} | dir: {} | nocolor: {}",
        args.debug,
        music_dir.display(),
        args.nocolor
    );

    let albums = match MusicScanner::new().collect_albums(&music_dir) {
        Ok(albums) if !albums.is_empty() => albums,
        Ok(_) | Err(ScanError::NotADirectory(_)) => {
            let reason = ScanError::NoAlbums(music_dir.clone());
            debug!("{}", reason);
            println!("{}\n", reason);
            Args::command().print_help()?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    // rodio logs to stderr; the TUI owns the terminal, so silence it unless debugging
    if !args.debug {
        redirect_stderr_to_null()?;
    }

    let audio_config = AudioConfig::from(&config);
    let (_stream, stream_handle) = rodio::OutputStream::try_default()
        .context("No audio output device. Is a sound server running?")?;
    let engine = EngineHandle::new(RodioEngine::new(stream_handle, audio_config.clone()));

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let reporter =
        PositionReporter::new(engine.clone(), event_tx.clone(), audio_config.report_interval)
            .spawn();
    let transport = TransportController::new(engine, event_tx, &audio_config);

    let theme = Theme {
        color: config.ui.color && !args.nocolor,
    };
    let app = App::new(
        albums,
        transport,
        event_rx,
        reporter,
        theme,
        Duration::from_millis(config.ui.tick_rate_ms.max(1)),
    )?;
    app.run().await?;

    info!("Ending Program");
    println!("Adios from Alio Music Player!");
    Ok(())
}

fn redirect_stderr_to_null() -> Result<()> {
    unsafe {
        let null_fd = libc::open(
            b"/dev/null\0".as_ptr() as *const libc::c_char,
            libc::O_WRONLY,
        );
        if null_fd == -1 {
            return Err(anyhow::anyhow!("Failed to open /dev/null"));
        }

        if libc::dup2(null_fd, libc::STDERR_FILENO) == -1 {
            libc::close(null_fd);
            return Err(anyhow::anyhow!("Failed to redirect stderr"));
        }

        libc::close(null_fd);
    }

    Ok(())
}
