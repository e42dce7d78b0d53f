//! Backup management for the merchant map. A copy is taken before destructive edits.

use crate::error::{ErrorType, IntoResult, Res};
use crate::{utils, Config, Result};
use anyhow::Context;
use chrono::Local;
use std::path::PathBuf;
use tracing::debug;

/// Prefix for merchant map backup files.
pub const MERCHANT_MAP: &str = "merchant_map";

const EXTENSION: &str = "csv";

/// Manages backup file creation and rotation.
///
/// The `Backup` struct is immutable and owns copies of the paths and settings it needs.
/// Create a new instance via `Config::backup()` or `Backup::new()`.
#[derive(Debug, Clone)]
pub struct Backup {
    backups_dir: PathBuf,
    backup_copies: u32,
    merchant_map_path: PathBuf,
}

impl Backup {
    /// Creates a new `Backup` instance from a `Config`.
    pub fn new(config: &Config) -> Self {
        Self {
            backups_dir: config.backups().to_path_buf(),
            backup_copies: config.backup_copies(),
            merchant_map_path: config.merchant_map_path(),
        }
    }

    /// Copies the merchant map into the backups directory as `merchant_map.YYYY-MM-DD-NNN.csv`
    /// and rotates old copies, keeping only `backup_copies` files.
    ///
    /// Returns the path to the created backup file, or `None` if there is no merchant map yet.
    pub async fn copy_merchant_map(&self) -> Result<Option<PathBuf>> {
        if !self.merchant_map_path.is_file() {
            return Ok(None);
        }
        self.copy_inner()
            .await
            .map(Some)
            .pub_result(ErrorType::Storage)
    }

    async fn copy_inner(&self) -> Res<PathBuf> {
        let date = today();
        let seq = self.next_sequence_number(&date).await?;
        let path = self
            .backups_dir
            .join(format!("{MERCHANT_MAP}.{date}-{seq:03}.{EXTENSION}"));

        utils::copy(&self.merchant_map_path, &path).await?;
        debug!("Backed up the merchant map to {}", path.display());

        self.rotate().await?;
        Ok(path)
    }

    /// Scans the backups directory for existing files from `date` and returns the next sequence
    /// number.
    async fn next_sequence_number(&self, date: &str) -> Res<u32> {
        let mut max_seq: u32 = 0;
        for name in self.backup_names().await? {
            if let Some(seq) = parse_sequence_number(&name, date) {
                max_seq = max_seq.max(seq);
            }
        }
        Ok(max_seq + 1)
    }

    /// Deletes the oldest backups beyond `backup_copies`.
    async fn rotate(&self) -> Res<()> {
        let mut files = self.backup_names().await?;
        // The name format sorts by date, then sequence number.
        files.sort();

        let to_delete = files.len().saturating_sub(self.backup_copies as usize);
        for name in files.into_iter().take(to_delete) {
            utils::remove(&self.backups_dir.join(name)).await?;
        }
        Ok(())
    }

    async fn backup_names(&self) -> Res<Vec<String>> {
        let mut names = Vec::new();
        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if is_backup_file(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }
}

/// Returns today's date in YYYY-MM-DD format.
fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Parses the sequence number from a backup filename taken on `date`.
fn parse_sequence_number(filename: &str, date: &str) -> Option<u32> {
    filename
        .strip_prefix(&format!("{MERCHANT_MAP}.{date}-"))?
        .strip_suffix(&format!(".{EXTENSION}"))?
        .parse()
        .ok()
}

fn is_backup_file(filename: &str) -> bool {
    filename.starts_with(&format!("{MERCHANT_MAP}."))
        && filename.ends_with(&format!(".{EXTENSION}"))
}
