//! Headless runner: plays one autopilot game against the configured
//! question source and reports the result.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use tuna_quiz::clock::ClockEvent;
use tuna_quiz::demo::Autopilot;
use tuna_quiz::leaderboard::{Leaderboard, LocalLeaderboard};
use tuna_quiz::services::{HttpServices, load_bank, next_unlocked_folder};
use tuna_quiz::sim::GameSession;
use tuna_quiz::{
    CorrectnessOracle, LeaderboardSink, LocalOracle, QuestionBank, RemoteOracle, Settings,
    SimulationClock, TrustMode,
};

const DEFAULT_SETTINGS_FILE: &str = "tuna-quiz.json";
/// Give up on a run that never ends
const MAX_RUN: Duration = Duration::from_secs(300);
const AUTOPILOT_MISTAKE_RATE: f32 = 0.1;

fn main() -> Result<()> {
    env_logger::init();
    log::info!("Tuna Quiz (headless) starting...");

    let settings_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
    let mut settings = Settings::load(&settings_path)
        .with_context(|| format!("reading settings from {}", settings_path.display()))?;
    settings.apply_env();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;

    let seed = settings.seed.unwrap_or_else(rand::random);
    log::info!("Seed {}", seed);

    let services = settings
        .server_url
        .as_ref()
        .map(|url| HttpServices::new(url.clone(), runtime.handle().clone()).map(Arc::new))
        .transpose()
        .context("building HTTP client")?;

    let bank = match &services {
        Some(services) => runtime.block_on(load_bank(services.as_ref(), &settings.folder)),
        None => QuestionBank::builtin(),
    };

    let mut config = settings.session_config();
    // The server only knows its own folders
    let remote_ok = services.is_some() && bank.folder == settings.folder;
    if config.trust_mode == TrustMode::Remote && !remote_ok {
        log::warn!("Remote checking unavailable for '{}', checking locally", bank.folder);
        config.trust_mode = TrustMode::Local;
    }
    if config.trust_mode == TrustMode::Local && !bank.has_answers() && remote_ok {
        log::warn!("Bank '{}' has no answer key, checking remotely", bank.folder);
        config.trust_mode = TrustMode::Remote;
    }

    let oracle: Box<dyn CorrectnessOracle> = match (&services, config.trust_mode) {
        (Some(services), TrustMode::Remote) => Box::new(RemoteOracle::new(
            services.clone(),
            runtime.handle().clone(),
        )),
        _ => Box::new(LocalOracle),
    };
    log::info!("Answers checked {:?}", oracle.mode());

    let local_board = match &settings.leaderboard_file {
        Some(path) => Leaderboard::load(path)
            .with_context(|| format!("reading leaderboard from {}", path.display()))?,
        None => Leaderboard::new(),
    };
    let local_sink = Arc::new(LocalLeaderboard::new(local_board));
    let sink: Arc<dyn LeaderboardSink> = match &services {
        Some(services) => services.clone() as Arc<dyn LeaderboardSink>,
        None => local_sink.clone() as Arc<dyn LeaderboardSink>,
    };

    let session = GameSession::new(config, bank, seed);
    let mut clock = SimulationClock::new(session, oracle).with_leaderboard(sink, settings.player_name.clone());
    let mut pilot = Autopilot::new(seed ^ 0x5eed, AUTOPILOT_MISTAKE_RATE);

    let epoch = Instant::now();
    let now_ms = || epoch.elapsed().as_millis() as u64;
    clock.start(now_ms());

    let mut eligible = false;
    let result = loop {
        let now = now_ms();
        if let Some(dir) = pilot.next_direction(clock.session()) {
            clock.direction_input(dir, now);
        }
        let mut finished = None;
        for event in clock.pump_logic(now) {
            match event {
                ClockEvent::Correct { level } => log::info!("Level {}", level),
                ClockEvent::NextLevelEligible => eligible = true,
                ClockEvent::GameOver(cause) => log::info!("Game over: {:?}", cause),
                ClockEvent::Restartable { level, elapsed_ms } => finished = Some((level, elapsed_ms)),
                _ => {}
            }
        }
        clock.render_frame(now);
        if let Some(result) = finished {
            break Some(result);
        }
        if epoch.elapsed() > MAX_RUN {
            break None;
        }
        std::thread::sleep(Duration::from_millis(clock.logic_interval_ms()));
    };

    match result {
        Some((level, elapsed_ms)) => println!(
            "{} reached level {} in {:.2}s",
            settings.player_name,
            level,
            elapsed_ms as f64 / 1000.0
        ),
        None => println!("Run still going after {}s, stopping", MAX_RUN.as_secs()),
    }

    if eligible && !settings.practice_mode {
        if let Some(services) = &services {
            match runtime.block_on(next_unlocked_folder(services.as_ref(), &settings.folder)) {
                Ok(Some(next)) => println!("Unlocked {}", next),
                Ok(None) => println!("No further level after {}", settings.folder),
                Err(err) => log::warn!("Level unlock check failed: {}", err),
            }
        }
    }

    if let Some(path) = &settings.leaderboard_file {
        local_sink
            .snapshot()
            .save(path)
            .with_context(|| format!("writing leaderboard to {}", path.display()))?;
    }

    // Let fire-and-forget submissions finish
    runtime.shutdown_timeout(Duration::from_secs(2));
    Ok(())
}
