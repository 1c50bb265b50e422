//! Cyclic access to prerecorded frame logs.
//!
//! A log is a flat file of consecutive 58-byte records. The source replays it
//! endlessly: once fewer than a full record remains ahead of the cursor, the
//! cursor rewinds to the start, mirroring a device's continuous telemetry.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::frame::FRAME_LEN;

/// Frame log access errors.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The named log does not exist in the catalog directory.
    #[error("frame log not found: {0}")]
    NotFound(String),

    /// The log holds no complete record and can never produce a frame.
    #[error("frame log '{name}' is too short ({len} bytes, need at least {FRAME_LEN})")]
    TooShort {
        /// Log name as selected.
        name: String,
        /// Actual byte length of the log.
        len: usize,
    },

    /// The log could not be read from disk.
    #[error("failed to read frame log '{name}'")]
    Io {
        /// Log name as selected.
        name: String,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },
}

/// Directory of selectable `.bin` frame logs.
#[derive(Debug, Clone)]
pub struct LogCatalog {
    dir: PathBuf,
}

impl LogCatalog {
    /// Create a catalog over `dir`. The directory is only touched on access.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Catalog directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File names of all `.bin` logs in the catalog, sorted by name.
    pub fn entries(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "bin") {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Select the log named `name` and load it for replay.
    pub fn open(&self, name: &str) -> Result<FrameSource, SourceError> {
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(SourceError::NotFound(name.to_string()));
        }
        let data = fs::read(&path).map_err(|source| SourceError::Io {
            name: name.to_string(),
            source,
        })?;
        FrameSource::from_bytes(name, data)
    }
}

/// A selected frame log with a wrapping read cursor.
#[derive(Debug)]
pub struct FrameSource {
    name: String,
    data: Vec<u8>,
    cursor: usize,
}

impl FrameSource {
    /// Build a source over in-memory log bytes. The log must hold at least
    /// one complete record; a trailing partial record is tolerated and
    /// skipped by the wrap rule.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Result<Self, SourceError> {
        let name = name.into();
        if data.len() < FRAME_LEN {
            return Err(SourceError::TooShort {
                name,
                len: data.len(),
            });
        }
        Ok(Self {
            name,
            data,
            cursor: 0,
        })
    }

    /// Name of the selected log.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of complete records in the log.
    pub fn record_count(&self) -> usize {
        self.data.len() / FRAME_LEN
    }

    /// Read the next record, wrapping to the start of the log when fewer
    /// than a full record remains. Always returns exactly one frame.
    pub fn next_frame(&mut self) -> [u8; FRAME_LEN] {
        if self.cursor + FRAME_LEN > self.data.len() {
            self.cursor = 0;
        }
        let mut record = [0u8; FRAME_LEN];
        record.copy_from_slice(&self.data[self.cursor..self.cursor + FRAME_LEN]);
        self.cursor += FRAME_LEN;
        record
    }
}
