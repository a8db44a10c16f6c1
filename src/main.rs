//! Application entry point: console voice control for a video player.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the [`tokio`] runtime.
//! 4. Build the transcriber, both speech sources and the key-value store.
//! 5. Build the [`SessionController`] and spawn the [`CommandLoop`] against a
//!    console player.
//! 6. Read control commands from stdin until `q` or end of input.
//!
//! The optional first argument is the media URI to "load"; without it the
//! player reports no media and every command is refused.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use voice_player::{
    app::CommandLoop,
    commands::{ActionId, PlaybackSpeed},
    config::{AppConfig, AppPaths},
    dispatch::{feedback_for, PlayerControls, PlayerError},
    session::{Collaborators, SessionController, SessionState},
    source::{ContinuousSource, CpalMicrophone, HttpTranscriber, UploadSource},
    store::open_store,
};

// ---------------------------------------------------------------------------
// ConsolePlayer
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct PlayerState {
    uri: Option<String>,
    position: f64,
    volume: f32,
    speed: PlaybackSpeed,
    playing: bool,
    fullscreen: bool,
    favorite: bool,
    bookmarks: Vec<f64>,
}

/// Stand-in player that keeps its state in memory and prints every call.
struct ConsolePlayer {
    state: Mutex<PlayerState>,
}

impl ConsolePlayer {
    fn new(uri: Option<String>) -> Self {
        Self {
            state: Mutex::new(PlayerState {
                uri,
                position: 0.0,
                volume: 1.0,
                speed: PlaybackSpeed::Normal,
                playing: false,
                fullscreen: false,
                favorite: false,
                bookmarks: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, PlayerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PlayerControls for ConsolePlayer {
    fn uri(&self) -> Option<String> {
        self.state().uri.clone()
    }

    fn volume(&self) -> f32 {
        self.state().volume
    }

    fn has_player(&self) -> bool {
        true
    }

    fn play(&self) -> Result<(), PlayerError> {
        self.state().playing = true;
        println!("▶ playing");
        Ok(())
    }

    fn pause(&self) -> Result<(), PlayerError> {
        self.state().playing = false;
        println!("⏸ paused");
        Ok(())
    }

    fn stop(&self) -> Result<(), PlayerError> {
        let mut s = self.state();
        s.playing = false;
        s.position = 0.0;
        println!("⏹ stopped");
        Ok(())
    }

    fn seek(&self, delta_secs: f64) -> Result<(), PlayerError> {
        let mut s = self.state();
        s.position = (s.position + delta_secs).max(0.0);
        println!("⇆ position {:.0}s", s.position);
        Ok(())
    }

    fn set_volume(&self, volume: f32) -> Result<(), PlayerError> {
        self.state().volume = volume;
        println!("🔊 volume {:.0}%", volume * 100.0);
        Ok(())
    }

    fn set_speed(&self, speed: PlaybackSpeed) -> Result<(), PlayerError> {
        self.state().speed = speed;
        println!("⏩ speed {}x", speed.rate());
        Ok(())
    }

    fn toggle_fullscreen(&self) -> Result<(), PlayerError> {
        let mut s = self.state();
        s.fullscreen = !s.fullscreen;
        println!("⛶ fullscreen {}", if s.fullscreen { "on" } else { "off" });
        Ok(())
    }

    fn add_bookmark(&self) -> Result<(), PlayerError> {
        let mut s = self.state();
        let at = s.position;
        s.bookmarks.push(at);
        println!("🔖 bookmark at {at:.0}s ({} total)", s.bookmarks.len());
        Ok(())
    }

    fn toggle_favorite(&self) -> Result<(), PlayerError> {
        let mut s = self.state();
        s.favorite = !s.favorite;
        println!("★ favorite {}", if s.favorite { "on" } else { "off" });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

const HELP: &str = "commands: p = toggle listening, r = toggle recording, \
s <action> <phrase> = save custom phrase, l = list custom phrases, q = quit; \
anything else is treated as a spoken command";

fn describe(state: &SessionState) -> String {
    let mut line = format!("[{}]", state.status.label());
    if state.is_persistent_mode {
        line.push_str(" persistent");
    }
    if state.is_listening {
        line.push_str(" listening");
    }
    if state.is_recording {
        line.push_str(" recording");
    }
    if state.is_processing {
        line.push_str(" processing");
    }
    if let Some(t) = &state.last_command {
        line.push_str(&format!(" heard {:?}", t.text));
    }
    if let Some(e) = &state.error {
        line.push_str(&format!(" error: {e}"));
    }
    line
}

async fn handle_line(
    line: &str,
    controller: &SessionController,
    player: &ConsolePlayer,
) -> bool {
    let line = line.trim();
    match line {
        "" => {}
        "q" => return false,
        "h" | "?" => println!("{HELP}"),
        "p" => {
            if let Err(e) = controller.toggle_persistent_mode().await {
                println!("✗ {e}");
            }
        }
        "r" => {
            if let Err(e) = controller.toggle_recording().await {
                println!("✗ {e}");
            }
        }
        "l" => {
            let overrides = controller.custom_commands();
            if overrides.is_empty() {
                println!("no custom phrases");
            }
            for (action, phrase) in overrides.iter() {
                println!("{action}: {phrase:?}");
            }
        }
        _ if line.starts_with("s ") => {
            let mut parts = line[2..].trim().splitn(2, ' ');
            let action = parts.next().unwrap_or("");
            let phrase = parts.next().unwrap_or("");
            match action.parse::<ActionId>() {
                Ok(action) => match controller.save_custom_command(action, phrase) {
                    Ok(()) => println!("✓ saved"),
                    Err(e) => println!("✗ {e}"),
                },
                Err(e) => println!("✗ {e}"),
            }
        }
        text => {
            let ok = controller.process_voice_command(text, player);
            println!("{}", if ok { "✓ done" } else { "✗ not handled" });
        }
    }
    true
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("voice-player starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    let paths = AppPaths::new();

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(async move {
        // 4. Collaborators
        let transcriber = Arc::new(HttpTranscriber::from_config(&config.transcription));
        let controller = SessionController::new(
            config.voice.clone(),
            Collaborators {
                persistent: Arc::new(ContinuousSource::new(
                    config.audio.clone(),
                    transcriber.clone(),
                )),
                one_shot: Arc::new(UploadSource::new(config.audio.clone(), transcriber)),
                microphone: Arc::new(CpalMicrophone),
                store: open_store(&paths.store_file),
                feedback: feedback_for(config.voice.platform, config.voice.haptics),
            },
        );

        // 5. Player + command loop
        let player = Arc::new(ConsolePlayer::new(std::env::args().nth(1)));
        CommandLoop::new(
            controller.clone(),
            player.clone(),
            config.voice.display_window(),
        )
        .spawn();

        let mut states = controller.subscribe();
        tokio::spawn(async move {
            while states.changed().await.is_ok() {
                let line = describe(&states.borrow_and_update());
                log::info!("{line}");
            }
        });

        // 6. Prompt
        println!("{HELP}");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
            if !handle_line(&line, &controller, &player).await {
                break;
            }
        }

        controller.stop().await;
        log::info!("voice-player shutting down");
        Ok::<(), anyhow::Error>(())
    })
}
