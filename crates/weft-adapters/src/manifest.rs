//! Shared plumbing for TOML manifests: discovery and read errors.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use weft_core::error::WeftError;

/// Failure to locate, read or interpret a manifest file.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest path not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to walk '{}': {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid entry in '{}': {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

impl From<ManifestError> for WeftError {
    fn from(e: ManifestError) -> Self {
        WeftError::Configuration {
            message: e.to_string(),
        }
    }
}

/// Every `*.toml` file under `root`, sorted by path. A file root is returned
/// as is.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>, ManifestError> {
    if !root.exists() {
        return Err(ManifestError::NotFound {
            path: root.to_path_buf(),
        });
    }
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|source| ManifestError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "toml") {
            files.push(path.to_path_buf());
        }
    }
    debug!(root = %root.display(), count = files.len(), "Manifests discovered");
    Ok(files)
}

/// Read and deserialize one manifest.
pub fn read<T: DeserializeOwned>(path: &Path) -> Result<T, ManifestError> {
    let raw = fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
