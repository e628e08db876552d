//! Emission writers
//!
//! The engine never touches the filesystem itself: every emission is handed
//! to a [`Writer`]. Writers are shared across parallel backend runs, so they
//! must be `Sync`.

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use super::Emission;
use crate::error::Result;

/// Sink for emissions
pub trait Writer: Send + Sync {
    fn write(&self, emission: &Emission) -> Result<()>;
}

/// Writes emissions below a root directory
#[derive(Debug, Clone)]
pub struct FsWriter {
    root: PathBuf,
}

impl FsWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

impl Writer for FsWriter {
    fn write(&self, emission: &Emission) -> Result<()> {
        let dir = self.root.join(&emission.directory);
        fs::create_dir_all(&dir)?;
        let path = dir.join(&emission.filename);
        fs::write(&path, &emission.content)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// Keeps emissions in memory, in arrival order
#[derive(Debug, Default)]
pub struct MemoryWriter {
    emissions: Mutex<Vec<Emission>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far
    pub fn emissions(&self) -> Vec<Emission> {
        self.emissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.emissions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Writer for MemoryWriter {
    fn write(&self, emission: &Emission) -> Result<()> {
        self.emissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(emission.clone());
        Ok(())
    }
}
