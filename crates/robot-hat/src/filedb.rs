//! Tiny `name = value` file store for calibration data.
//!
//! Lines starting with `#` are comments and are kept as they are when the
//! file is rewritten.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{HatError, Result};

/// A key/value file on disk.
#[derive(Debug, Clone)]
pub struct FileDb {
    path: PathBuf,
}

impl FileDb {
    /// Open `path`, creating it (and its parent directories) if missing.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let db = FileDb { path: path.into() };
        if !db.path.exists() {
            if let Some(parent) = db.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| db.io_error(e))?;
            }
            fs::write(&db.path, "# robot-hat config file\n").map_err(|e| db.io_error(e))?;
            debug!(path = ?db.path, "created file db");
        }
        Ok(db)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value stored under `name`, or `default` if there is none.
    pub fn get(&self, name: &str, default: &str) -> Result<String> {
        let contents = self.read()?;
        Ok(contents
            .lines()
            .filter_map(parse_line)
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
            .unwrap_or_else(|| default.to_string()))
    }

    /// Store `value` under `name`, replacing an existing entry.
    pub fn set(&self, name: &str, value: impl std::fmt::Display) -> Result<()> {
        let contents = self.read()?;
        let entry = format!("{name} = {value}");
        let mut replaced = false;
        let mut lines: Vec<String> = contents
            .lines()
            .map(|line| match parse_line(line) {
                Some((key, _)) if key == name && !replaced => {
                    replaced = true;
                    entry.clone()
                }
                _ => line.to_string(),
            })
            .collect();
        if !replaced {
            lines.push(entry);
        }
        let mut out = lines.join("\n");
        out.push('\n');
        fs::write(&self.path, out).map_err(|e| self.io_error(e))
    }

    fn read(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| self.io_error(e))
    }

    fn io_error(&self, source: std::io::Error) -> HatError {
        HatError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    Some((key.trim(), value.trim()))
}
