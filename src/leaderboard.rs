//! Leaderboard ranking and the sink finished runs are reported to
//!
//! One entry per player name; a new result replaces the old one. Ranking is by
//! level reached (descending), ties broken by run time (ascending).

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Maximum number of entries to keep
pub const MAX_LEADERBOARD_ENTRIES: usize = 10;

/// A finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub level: u32,
    /// Run time in seconds, two decimals
    pub time: f64,
    pub folder: String,
}

impl LeaderboardEntry {
    pub fn new(name: impl Into<String>, level: u32, elapsed_ms: u64, folder: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level,
            time: (elapsed_ms as f64 / 10.0).round() / 100.0,
            folder: folder.into(),
        }
    }

    fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .level
            .cmp(&self.level)
            .then(self.time.total_cmp(&other.time))
    }
}

/// Receives the final result of every ranked run
pub trait LeaderboardSink {
    fn submit(&self, entry: &LeaderboardEntry);
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the player's entry.
    /// Returns the rank achieved (1-indexed) or None if it fell off the table.
    pub fn record(&mut self, entry: LeaderboardEntry) -> Option<usize> {
        let name = entry.name.clone();
        self.entries.retain(|e| e.name != name);
        self.entries.push(entry);
        self.entries.sort_by(LeaderboardEntry::rank_cmp);
        self.entries.truncate(MAX_LEADERBOARD_ENTRIES);
        self.rank_of(&name)
    }

    pub fn rank_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name).map(|i| i + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top(&self) -> Option<&LeaderboardEntry> {
        self.entries.first()
    }

    /// Load from a JSON file; a missing file is an empty board
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No leaderboard at {}, starting fresh", path.display());
            return Ok(Self::new());
        }
        let json = std::fs::read_to_string(path)?;
        let board: Leaderboard = serde_json::from_str(&json)?;
        log::info!("Loaded {} leaderboard entries", board.entries.len());
        Ok(board)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Leaderboard saved ({} entries)", self.entries.len());
        Ok(())
    }
}

/// In-process sink, used by the headless binary and tests
#[derive(Debug, Default)]
pub struct LocalLeaderboard {
    board: Mutex<Leaderboard>,
}

impl LocalLeaderboard {
    pub fn new(board: Leaderboard) -> Self {
        Self {
            board: Mutex::new(board),
        }
    }

    pub fn snapshot(&self) -> Leaderboard {
        match self.board.lock() {
            Ok(board) => board.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LeaderboardSink for LocalLeaderboard {
    fn submit(&self, entry: &LeaderboardEntry) {
        let mut board = match self.board.lock() {
            Ok(board) => board,
            Err(poisoned) => poisoned.into_inner(),
        };
        match board.record(entry.clone()) {
            Some(rank) => log::info!("{} ranked #{} at level {}", entry.name, rank, entry.level),
            None => log::info!("{} did not make the leaderboard", entry.name),
        }
    }
}
