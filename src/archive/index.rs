//! Archive storage and lookup
//!
//! Filename contract, relied on by the calendar review screen:
//! - permanent recordings are `<yyyy-MM-dd>.<extension>` in the archive
//!   root, keyed by the user's local date
//! - in-progress recordings are `recording_<uuid>.<extension>`

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use uuid::Uuid;

/// Date format used for permanent recording names
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Prefix of in-progress temporary recordings
const TEMP_PREFIX: &str = "recording_";

/// Store of finished recordings in an application-private directory.
pub struct VideoArchive {
    root: PathBuf,
    extension: String,
}

impl VideoArchive {
    /// Open an archive rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        Self::with_extension(root, "mp4")
    }

    /// Open an archive with a non-default container extension (no dot).
    pub fn with_extension(root: impl Into<PathBuf>, extension: impl Into<String>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            extension: extension.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The permanent slot for `date`, whether or not a recording exists.
    pub fn slot(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join(format!("{}.{}", date.format(DATE_FORMAT), self.extension))
    }

    /// Resolve `date` to its stored recording.
    ///
    /// Checked against the filesystem on every call; absence is `None`,
    /// never an error.
    pub fn resolve(&self, date: NaiveDate) -> Option<PathBuf> {
        let slot = self.slot(date);
        slot.exists().then_some(slot)
    }

    /// A fresh unique target for an in-progress recording.
    pub fn temp_target(&self) -> PathBuf {
        self.root
            .join(format!("{TEMP_PREFIX}{}.{}", Uuid::new_v4(), self.extension))
    }

    /// Relocate a finished temporary recording into the slot for `date`.
    ///
    /// A prior recording for that date is overwritten; one recording per
    /// date is the product rule.
    pub fn store(&self, date: NaiveDate, temp: &Path) -> io::Result<PathBuf> {
        let slot = self.slot(date);
        if slot.exists() {
            tracing::debug!("Replacing existing recording for {}", date);
            fs::remove_file(&slot)?;
        }
        fs::rename(temp, &slot)?;

        tracing::info!("Stored recording for {} at {}", date, slot.display());
        Ok(slot)
    }

    /// Remove a temporary target, ignoring one that was never created.
    pub fn discard(&self, temp: &Path) {
        if let Err(e) = fs::remove_file(temp) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("Failed to discard {}: {}", temp.display(), e);
            }
        }
    }

    /// All dates with a stored recording, sorted ascending.
    pub fn recorded_dates(&self) -> io::Result<Vec<NaiveDate>> {
        let mut dates = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(date) = NaiveDate::parse_from_str(stem, DATE_FORMAT) {
                dates.push(date);
            }
        }
        dates.sort();
        Ok(dates)
    }
}
