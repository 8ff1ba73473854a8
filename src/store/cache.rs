//! File cache for raw API responses.
//!
//! Entries never expire: the same key always maps to the same file, and a
//! file once written is returned as-is for the life of the cache directory.

use std::{
    fs,
    path::{Path, PathBuf},
};

use base64::{Engine as _, engine::general_purpose};
use serde::de::DeserializeOwned;
use sha1::{Digest, Sha1};

use crate::{
    http::client::RequestError,
    model::{self, ScrapeError},
};

/// Identifies one request: ticker, expiry and every other query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    ticker: String,
    expiry: String,
    params: Vec<(String, String)>,
}

impl CacheKey {
    pub fn new(ticker: &str, expiry: &str, params: &[(&str, &str)]) -> Self {
        let mut params: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        params.sort();
        Self {
            ticker: ticker.to_uppercase(),
            expiry: expiry.to_string(),
            params,
        }
    }

    /// e.g. `AMD_2025-07-11_Xk3v0cQ9aB2z.json`
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.json",
            sanitize(&self.ticker),
            sanitize(&self.expiry),
            self.digest()
        )
    }

    fn digest(&self) -> String {
        let canonical = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let hash = Sha1::digest(canonical.as_bytes());
        general_purpose::URL_SAFE_NO_PAD.encode(&hash[..9])
    }
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Returns the cached response for `key`, or calls `fetch`, stores its
    /// raw body and returns it parsed. Storing is best effort.
    pub fn get_or_fetch<T, F>(&self, key: &CacheKey, fetch: F) -> model::Result<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> Result<Vec<u8>, RequestError>,
    {
        let path = self.path_for(key);
        if path.exists() {
            log::info!("Cache HIT {}", path.display());
            let bytes = fs::read(&path).map_err(|e| ScrapeError::cache_read(&path, e))?;
            return serde_json::from_slice(&bytes).map_err(|e| ScrapeError::cache_read(&path, e));
        }

        log::info!("Cache MISS {}", path.display());
        let bytes = fetch()?;
        let value = serde_json::from_slice(&bytes).map_err(|e| {
            ScrapeError::SchemaError(format!("response for {}: {}", key.file_name(), e))
        })?;
        self.store(&path, &bytes);
        Ok(value)
    }

    fn store(&self, path: &Path, bytes: &[u8]) {
        if let Err(err) = fs::create_dir_all(&self.dir) {
            log::warn!("could not create cache dir {}: {}", self.dir.display(), err);
            return;
        }
        match fs::write(path, bytes) {
            Ok(_) => log::debug!("cached {} bytes at {}", bytes.len(), path.display()),
            Err(err) => log::warn!("could not write cache file {}: {}", path.display(), err),
        }
    }
}
