//! Trajectory recorder implementation

use crate::error::{Result, TrajectoryError};
use crate::trajectory::{EntryType, TrajectoryEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};

/// Records orchestration trajectories for debugging and analysis.
///
/// Shared by every call of one orchestrator; entries of concurrent calls are
/// told apart by their `query_id`.
#[derive(Debug)]
pub struct TrajectoryRecorder {
    id: String,
    entries: RwLock<Vec<TrajectoryEntry>>,
    file_path: Option<PathBuf>,
    auto_save: bool,
    /// Held from snapshot to write so the newest snapshot always lands last
    save_lock: Mutex<()>,
}

/// Complete trajectory data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    /// Metadata about the trajectory
    pub metadata: TrajectoryMetadata,

    /// All trajectory entries
    pub entries: Vec<TrajectoryEntry>,
}

/// Metadata for a trajectory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryMetadata {
    /// Unique identifier for this trajectory
    pub id: String,

    /// When the first entry was recorded
    pub started_at: DateTime<Utc>,

    /// When the last entry was recorded
    pub completed_at: Option<DateTime<Utc>>,

    /// Version of the trajectory format
    pub version: String,

    /// Number of orchestration calls recorded
    pub queries: usize,

    /// Number of calls that completed successfully
    pub succeeded: usize,

    /// Total number of entries
    pub total_entries: usize,

    /// Wall time between first and last entry in milliseconds
    pub duration_ms: Option<u64>,
}

impl TrajectoryRecorder {
    /// Create a new in-memory trajectory recorder
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            entries: RwLock::new(Vec::new()),
            file_path: None,
            auto_save: false,
            save_lock: Mutex::new(()),
        }
    }

    /// Create a trajectory recorder that saves to a file after every entry
    pub fn with_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            file_path: Some(path.as_ref().to_path_buf()),
            auto_save: true,
            ..Self::new()
        }
    }

    /// Record a trajectory entry
    pub async fn record(&self, entry: TrajectoryEntry) -> Result<()> {
        {
            let mut entries = self.entries.write().await;
            entries.push(entry);
        }

        if self.auto_save {
            self.save().await?;
        }

        Ok(())
    }

    /// Get all recorded entries
    pub async fn get_entries(&self) -> Vec<TrajectoryEntry> {
        self.entries.read().await.clone()
    }

    /// Entries of one orchestration call
    pub async fn entries_for(&self, query_id: &str) -> Vec<TrajectoryEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|entry| entry.query_id == query_id)
            .cloned()
            .collect()
    }

    /// Get the number of recorded entries
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Save the trajectory to the configured file
    pub async fn save(&self) -> Result<()> {
        let path = self
            .file_path
            .as_ref()
            .ok_or(TrajectoryError::NoOutputFile)?;
        self.save_to(path).await
    }

    /// Save the trajectory to the given file
    pub async fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let _guard = self.save_lock.lock().await;
        let trajectory = self.build_trajectory().await;
        let json = serde_json::to_string_pretty(&trajectory).map_err(|e| {
            TrajectoryError::RecordingFailed {
                message: format!("Failed to serialize trajectory: {}", e),
            }
        })?;

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        fs::write(path, json).await?;
        Ok(())
    }

    /// Load a trajectory from file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Trajectory> {
        let path = path.as_ref();
        let load_failed = || TrajectoryError::LoadFailed {
            path: path.to_string_lossy().to_string(),
        };

        let content = fs::read_to_string(path).await.map_err(|_| load_failed())?;
        let trajectory = serde_json::from_str(&content).map_err(|_| load_failed())?;
        Ok(trajectory)
    }

    /// Build a complete trajectory from recorded entries
    async fn build_trajectory(&self) -> Trajectory {
        let entries = self.entries.read().await.clone();

        let started_at = entries
            .first()
            .map(|e| e.timestamp)
            .unwrap_or_else(Utc::now);
        let completed_at = entries.last().map(|e| e.timestamp);
        let duration_ms = completed_at.map(|end| (end - started_at).num_milliseconds().max(0) as u64);

        let mut queries = 0;
        let mut succeeded = 0;
        for entry in &entries {
            match &entry.entry_type {
                EntryType::QueryStart { .. } => queries += 1,
                EntryType::QueryComplete { success: true, .. } => succeeded += 1,
                _ => {}
            }
        }

        let metadata = TrajectoryMetadata {
            id: self.id.clone(),
            started_at,
            completed_at,
            version: "1.0".to_string(),
            queries,
            succeeded,
            total_entries: entries.len(),
            duration_ms,
        };

        Trajectory { metadata, entries }
    }

    /// Clear all recorded entries
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Get the file path if set
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }
}

impl Default for TrajectoryRecorder {
    fn default() -> Self {
        Self::new()
    }
}
