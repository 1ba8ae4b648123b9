//! Durable set of processed row indices.
//!
//! - The file holds a JSON array of row indices, fully rewritten on each save
//! - Saves go to a temp file that is renamed over the target
//! - The previous file is copied to a `.backup` sibling before each save
//! - A missing file means a fresh start; an unreadable one is an error

use crate::models::{AnkisyncError, Result};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Checkpoint manager for persisting and loading processed rows.
#[derive(Debug)]
pub struct CheckpointManager {
    /// Path to main checkpoint file
    path: PathBuf,
    /// Path to backup file
    backup_path: PathBuf,
    /// Path to temp file used for atomic writes
    temp_path: PathBuf,
    /// Rows known to be done
    processed: BTreeSet<usize>,
}

impl CheckpointManager {
    /// Create a checkpoint manager for `path`. Nothing is read yet.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .map_err(|e| AnkisyncError::storage("creating checkpoint dir", e))?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            backup_path: sibling(path, "backup"),
            temp_path: sibling(path, "tmp"),
            processed: BTreeSet::new(),
        })
    }

    /// Check if a checkpoint file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the processed set from disk, replacing the in-memory copy.
    pub fn load(&mut self) -> Result<&BTreeSet<usize>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No checkpoint yet, starting fresh");
                self.processed.clear();
                return Ok(&self.processed);
            }
            Err(e) => return Err(AnkisyncError::storage("reading checkpoint", e)),
        };

        let rows: Vec<usize> =
            serde_json::from_str(&content).map_err(|e| AnkisyncError::CorruptCheckpoint {
                path: self.path.clone(),
                source: e,
            })?;

        self.processed = rows.into_iter().collect();
        info!(
            path = %self.path.display(),
            processed = self.processed.len(),
            "Loaded checkpoint"
        );
        Ok(&self.processed)
    }

    /// Save the processed set to disk (atomic write).
    pub fn save(&self) -> Result<()> {
        // Backup existing checkpoint
        if self.path.exists() {
            fs::copy(&self.path, &self.backup_path)
                .map_err(|e| AnkisyncError::storage("backing up checkpoint", e))?;
        }

        // Write to temp file
        {
            let file = File::create(&self.temp_path)
                .map_err(|e| AnkisyncError::storage("creating temp checkpoint", e))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, &self.processed).map_err(|e| {
                AnkisyncError::Internal(format!("Serializing checkpoint: {e}"))
            })?;
            writer
                .flush()
                .map_err(|e| AnkisyncError::storage("flushing temp checkpoint", e))?;
            writer
                .get_ref()
                .sync_all()
                .map_err(|e| AnkisyncError::storage("syncing temp checkpoint", e))?;
        }

        // Atomic rename
        fs::rename(&self.temp_path, &self.path)
            .map_err(|e| AnkisyncError::storage("renaming checkpoint", e))?;

        debug!(processed = self.processed.len(), "Checkpoint saved");
        Ok(())
    }

    /// Record `row_index` as done and persist immediately.
    pub fn mark_processed(&mut self, row_index: usize) -> Result<()> {
        self.processed.insert(row_index);
        self.save()
    }

    /// Check whether `row_index` is already done.
    pub fn contains(&self, row_index: usize) -> bool {
        self.processed.contains(&row_index)
    }

    /// Rows known to be done.
    pub fn processed(&self) -> &BTreeSet<usize> {
        &self.processed
    }

    /// Get checkpoint file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "checkpoint".to_string());
    path.with_file_name(format!("{file_name}.{suffix}"))
}
