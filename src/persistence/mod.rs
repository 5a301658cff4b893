//! Progress and session persistence
//!
//! Features:
//! - Versioned JSON progress record
//! - Append-only JSON-lines session log
//! - Fire-and-forget sink: failures are logged, never surfaced to the game
//! - Corrupt or missing progress falls back to a fresh start

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::sim::progression::{Progress, UpgradeLevels};

/// Bump when the record layout changes
pub const PROGRESS_VERSION: u32 = 1;

/// Lifetime progress as written to storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub version: u32,
    pub upgrades: UpgradeLevels,
    pub level: u32,
    pub lifetime_xp: u64,
    pub lifetime_stars: u64,
    #[serde(default)]
    pub upgrade_floor: u8,
    #[serde(default)]
    pub rebirths: u32,
}

impl From<&Progress> for ProgressRecord {
    fn from(progress: &Progress) -> Self {
        Self {
            version: PROGRESS_VERSION,
            upgrades: progress.upgrades,
            level: progress.level,
            lifetime_xp: progress.lifetime_xp,
            lifetime_stars: progress.lifetime_stars,
            upgrade_floor: progress.upgrade_floor,
            rebirths: progress.rebirths,
        }
    }
}

impl ProgressRecord {
    /// Rebuild progress, clamping anything out of range
    pub fn into_progress(self) -> Progress {
        let mut upgrades = UpgradeLevels::default();
        for kind in crate::sim::UpgradeKind::ALL {
            let floor = self.upgrade_floor.min(kind.max_level());
            upgrades.set(kind, self.upgrades.get(kind).max(floor));
        }
        Progress {
            level: self.level.clamp(1, crate::consts::MAX_LEVEL),
            lifetime_xp: self.lifetime_xp,
            lifetime_stars: self.lifetime_stars,
            upgrades,
            upgrade_floor: self.upgrade_floor,
            rebirths: self.rebirths,
        }
    }
}

/// One finished level attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub score: u64,
    pub level_reached: u32,
    /// XP banked (zero when the attempt ended in death)
    pub xp_earned: u64,
    pub duration_seconds: f64,
    pub cleared: bool,
}

/// Where progress and sessions go
pub trait ProgressSink {
    fn save_progress(&mut self, record: &ProgressRecord);
    fn save_session(&mut self, record: &SessionRecord);
}

/// Keeps every call in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub progress: Vec<ProgressRecord>,
    pub sessions: Vec<SessionRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_progress(&self) -> Option<&ProgressRecord> {
        self.progress.last()
    }
}

impl ProgressSink for MemoryStore {
    fn save_progress(&mut self, record: &ProgressRecord) {
        self.progress.push(record.clone());
    }

    fn save_session(&mut self, record: &SessionRecord) {
        self.sessions.push(record.clone());
    }
}

/// `progress.json` plus `sessions.jsonl` in one directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    const PROGRESS_FILE: &'static str = "progress.json";
    const SESSIONS_FILE: &'static str = "sessions.jsonl";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn progress_path(&self) -> PathBuf {
        self.dir.join(Self::PROGRESS_FILE)
    }

    fn sessions_path(&self) -> PathBuf {
        self.dir.join(Self::SESSIONS_FILE)
    }

    /// Write through a temp file so a crash never leaves half a record
    pub fn try_save_progress(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(record)?;
        let tmp = self.progress_path().with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, self.progress_path())?;
        Ok(())
    }

    pub fn try_append_session(&self, record: &SessionRecord) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.sessions_path())?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    pub fn try_load_progress(&self) -> Result<ProgressRecord, StoreError> {
        let json = fs::read_to_string(self.progress_path())?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Stored progress, or a fresh start if missing or unreadable
    pub fn load_progress(&self) -> Progress {
        match self.try_load_progress() {
            Ok(record) => {
                log::info!("Loaded progress (level {}, {} xp)", record.level, record.lifetime_xp);
                record.into_progress()
            }
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No saved progress, starting fresh");
                Progress::default()
            }
            Err(e) => {
                log::warn!("Saved progress unreadable ({e}), starting fresh");
                Progress::default()
            }
        }
    }

    /// Every session logged so far; unreadable lines are skipped
    pub fn load_sessions(&self) -> Vec<SessionRecord> {
        let Ok(text) = fs::read_to_string(self.sessions_path()) else {
            return Vec::new();
        };
        text.lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect()
    }
}

impl ProgressSink for JsonFileStore {
    fn save_progress(&mut self, record: &ProgressRecord) {
        match self.try_save_progress(record) {
            Ok(()) => log::debug!("Progress saved to {}", self.progress_path().display()),
            Err(e) => log::warn!("Failed to save progress: {e}"),
        }
    }

    fn save_session(&mut self, record: &SessionRecord) {
        if let Err(e) = self.try_append_session(record) {
            log::warn!("Failed to record session: {e}");
        }
    }
}
