//! On-disk cache of raw POWER responses, one JSON file per request.

use crate::power::error::FetchError;
use crate::power::request::PointRequest;
use crate::power::response::PowerResponse;
use log::{debug, warn};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, request: &PointRequest) -> PathBuf {
        self.dir.join(request.cache_key())
    }

    /// Returns the cached response for `request`, if one exists and parses.
    ///
    /// Entries never expire. An unreadable or corrupt file counts as a miss.
    pub fn load(&self, request: &PointRequest) -> Option<PowerResponse> {
        let path = self.path_for(request);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Cache miss for {:?}: {}", path, e);
                return None;
            }
        };
        match serde_json::from_slice::<PowerResponse>(&bytes) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!("Ignoring corrupt cache file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Writes the raw response body for `request`.
    pub fn store(&self, request: &PointRequest, body: &str) -> Result<PathBuf, FetchError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| FetchError::CacheDirCreation(self.dir.clone(), e))?;
        let path = self.path_for(request);
        std::fs::write(&path, body).map_err(|e| FetchError::CacheWrite(path.clone(), e))?;
        Ok(path)
    }
}
