use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

pub const AUDIT_LOG_MAX_BYTES_ENV: &str = "KMCP_AUDIT_LOG_MAX_BYTES";
pub const AUDIT_LOG_MAX_BACKUPS_ENV: &str = "KMCP_AUDIT_LOG_MAX_BACKUPS";
const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_MAX_BACKUPS: usize = 4;

/// Size threshold for the live file and how many `<file>.N` backups survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationLimits {
    pub max_bytes: u64,
    pub max_backups: usize,
}

impl Default for RotationLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            max_backups: DEFAULT_MAX_BACKUPS,
        }
    }
}

impl RotationLimits {
    /// Reads `KMCP_AUDIT_LOG_MAX_BYTES` / `KMCP_AUDIT_LOG_MAX_BACKUPS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparsable or zero values keep the default for that field.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            max_bytes: positive(lookup(AUDIT_LOG_MAX_BYTES_ENV)).unwrap_or(defaults.max_bytes),
            max_backups: positive(lookup(AUDIT_LOG_MAX_BACKUPS_ENV))
                .unwrap_or(defaults.max_backups),
        }
    }
}

fn positive<T>(raw: Option<String>) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    raw.and_then(|raw| raw.trim().parse::<T>().ok())
        .filter(|value| value > &T::default())
}

#[derive(Debug)]
struct LiveFile {
    file: File,
    len: u64,
}

/// Append-only NDJSON file that rolls over into `<file>.1 ..= <file>.N`.
///
/// The handle stays open between appends and the byte count is tracked in
/// memory, so writers outside this process are not accounted for.
#[derive(Debug)]
pub struct RotatingNdjsonLog {
    path: PathBuf,
    limits: RotationLimits,
    live: Mutex<Option<LiveFile>>,
}

impl RotatingNdjsonLog {
    pub fn new(path: impl Into<PathBuf>, limits: RotationLimits) -> Self {
        Self {
            path: path.into(),
            limits,
            live: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    /// Serializes `record` as one line. A line that would push a non-empty
    /// file past `max_bytes` goes to a fresh file after rotation.
    pub fn append<T: Serialize>(&self, record: &T) -> Result<()> {
        let mut line = serde_json::to_vec(record).context("failed to encode log record")?;
        line.push(b'\n');
        let incoming = u64::try_from(line.len()).unwrap_or(u64::MAX);

        let mut live = self
            .live
            .lock()
            .map_err(|_| anyhow!("log writer for {} is poisoned", self.path.display()))?;
        if live
            .as_ref()
            .is_some_and(|current| self.would_overflow(current, incoming))
        {
            *live = None;
            self.shift_backups()?;
        }
        if live.is_none() {
            *live = Some(self.open_live()?);
        }
        let Some(current) = live.as_mut() else {
            return Err(anyhow!("log writer for {} is not open", self.path.display()));
        };

        current
            .file
            .write_all(&line)
            .and_then(|()| current.file.flush())
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        current.len += incoming;
        Ok(())
    }

    fn would_overflow(&self, current: &LiveFile, incoming: u64) -> bool {
        current.len > 0 && current.len.saturating_add(incoming) > self.limits.max_bytes
    }

    fn open_live(&self) -> Result<LiveFile> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("failed to stat {}", self.path.display()))?
            .len();
        Ok(LiveFile { file, len })
    }

    /// Drops the oldest backup, renumbers the rest upward, then moves the
    /// live file to `.1`.
    fn shift_backups(&self) -> Result<()> {
        let keep = self.limits.max_backups.max(1);
        let oldest = self.backup_path(keep);
        if oldest.exists() {
            std::fs::remove_file(&oldest)
                .with_context(|| format!("failed to drop {}", oldest.display()))?;
        }
        for index in (1..keep).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                let to = self.backup_path(index + 1);
                std::fs::rename(&from, &to).with_context(|| {
                    format!("failed to move {} to {}", from.display(), to.display())
                })?;
            }
        }
        if self.path.exists() {
            let first = self.backup_path(1);
            std::fs::rename(&self.path, &first).with_context(|| {
                format!("failed to move {} to {}", self.path.display(), first.display())
            })?;
        }
        Ok(())
    }
}
