//! Serpent Siege - headless runner
//!
//! Plays levels with a simple autopilot on a manual clock and logs the
//! outcome. Rendering lives elsewhere; this binary exercises the core.
//!
//! # Usage
//!
//! ```bash
//! # Three levels from seed 42, nothing persisted
//! serpent-siege
//!
//! # Ten levels, progress kept under ./save, custom level table
//! serpent-siege --seed 7 --levels 10 --data-dir save --level-table levels.json
//! ```

use std::path::{Path, PathBuf};

use clap::Parser;
use glam::Vec2;

use serpent_siege::persistence::{JsonFileStore, MemoryStore, ProgressSink};
use serpent_siege::platform::{Clock, InputIntent, ManualClock};
use serpent_siege::sim::snapshot::LatestFrame;
use serpent_siege::sim::{GameEvent, GamePhase, LevelOverrides, World};
use serpent_siege::telemetry::LogTelemetry;
use serpent_siege::{Game, Settings};

#[derive(Parser)]
#[command(name = "serpent-siege")]
#[command(about = "Headless Serpent Siege runner driven by an autopilot")]
#[command(version)]
struct Cli {
    /// World RNG seed
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Number of level attempts to play
    #[arg(short, long, default_value_t = 3)]
    levels: u32,

    /// Directory for progress and session files (in-memory when omitted)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Settings JSON file
    #[arg(long, env = "SERPENT_SIEGE_SETTINGS")]
    settings: Option<PathBuf>,

    /// Level override table (JSON keyed by level number)
    #[arg(long, env = "SERPENT_SIEGE_LEVELS")]
    level_table: Option<PathBuf>,
}

/// Read a file or exit with a message naming it
fn read_or_exit(path: &Path, what: &str) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("FATAL: cannot read {what} file {}: {e}", path.display());
        std::process::exit(1);
    })
}

/// Host frame length fed to the scheduler
const FRAME_MS: f64 = 1000.0 / 60.0;
/// Give up on a level after this many frames
const MAX_FRAMES_PER_LEVEL: u32 = 60 * 60 * 3;

/// Autopilot: dodge hostiles, then chase stars, then food
fn autopilot(world: &World) -> InputIntent {
    let head = world.player.head();

    let nearest = |points: &mut dyn Iterator<Item = Vec2>| {
        points.min_by(|a, b| a.distance_squared(head).total_cmp(&b.distance_squared(head)))
    };

    let threat = nearest(
        &mut world
            .enemies
            .iter()
            .map(|e| e.body.head())
            .chain(world.resentful.iter().map(|r| r.body.head()))
            .chain(world.saws.iter().map(|s| s.pos)),
    );
    let goal = nearest(&mut world.stars.iter().filter(|s| s.alive).map(|s| s.pos))
        .or_else(|| nearest(&mut world.foods.iter().filter(|f| f.alive).map(|f| f.pos)));

    let mut offset = goal.map_or(Vec2::ZERO, |g| g - head);
    if let Some(t) = threat.filter(|t| t.distance(head) < 120.0) {
        offset = (head - t) * 3.0;
    }

    // Steer back toward the middle when close to the edge
    let center = world.bounds.center();
    if world.bounds.in_border(head, 120.0) {
        offset = center - head;
    }

    let fire = world
        .enemies
        .iter()
        .any(|e| e.body.head().distance(head) < 400.0);
    InputIntent::from_pointer(offset, 200.0).with_fire(fire)
}

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::init();
    log::info!("Serpent Siege (headless) starting...");

    let cli = Cli::parse();

    let settings = cli
        .settings
        .as_deref()
        .map(|path| Settings::from_json(&read_or_exit(path, "settings")))
        .unwrap_or_default();
    let overrides = cli
        .level_table
        .as_deref()
        .map(|path| LevelOverrides::from_json_or_default(&read_or_exit(path, "level table")))
        .unwrap_or_default();

    let (progress, store): (_, Box<dyn ProgressSink>) = match cli.data_dir {
        Some(dir) => {
            let store = JsonFileStore::new(dir);
            (store.load_progress(), Box::new(store))
        }
        None => (Default::default(), Box::new(MemoryStore::new())),
    };

    let mut game = Game::new(cli.seed, progress, settings, store, Box::new(LogTelemetry))
        .with_overrides(overrides);
    let clock = ManualClock::new(0.0);
    let mut screen = LatestFrame::default();

    for _ in 0..cli.levels {
        if let Err(e) = game.begin_level(clock.now_ms()) {
            log::warn!("Cannot start level: {e}");
            break;
        }

        let mut frames = 0;
        let mut kills = 0;
        while frames < MAX_FRAMES_PER_LEVEL && !game.phase().is_safe() {
            clock.advance(FRAME_MS);
            let input = autopilot(game.world());
            for event in game.frame(clock.now_ms(), &input) {
                if matches!(event, GameEvent::EnemyKilled { by_player: true, .. }) {
                    kills += 1;
                }
            }
            game.render(&mut screen);
            frames += 1;
        }

        let world = game.world();
        println!(
            "level {:>2}: {:?} after {:.1}s, {} stars, {} xp, {} kills, {} fps",
            world.params.level,
            game.phase(),
            frames as f64 * FRAME_MS / 1000.0,
            world.player.session_stars,
            world.player.session_xp,
            kills,
            game.fps(),
        );

        match game.phase() {
            // Died: the next round retries the same level
            GamePhase::LevelComplete | GamePhase::GameOver => {}
            GamePhase::GameComplete => {
                println!("Campaign complete!");
                break;
            }
            _ => {
                log::info!("Level timed out");
                break;
            }
        }
    }

    let progress = game.progress();
    println!(
        "lifetime: level {}, {} xp, {} stars ({} frames drawn)",
        progress.level, progress.lifetime_xp, progress.lifetime_stars, screen.presented
    );
}
