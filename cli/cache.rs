//! On-disk cache of rendered pages, keyed by a hash of the repository
//! identifier and the options the page was rendered with. Entries expire after
//! a TTL and the least recently used ones are evicted beyond a fixed capacity.

use chrono::{DateTime, TimeDelta, Utc};
use log;
use rendergit_core::{AppError, Config, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    pub name: String,
    pub commit: String,
    pub stored_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheMetadata {
    #[serde(default)]
    repos: BTreeMap<String, CacheEntry>,
}

#[derive(Debug, Clone)]
pub struct RenderCache {
    dir: PathBuf,
    ttl: TimeDelta,
    capacity: usize,
    /// Digest of the render-affecting configuration, mixed into every key.
    options: String,
}

impl RenderCache {
    pub fn new(dir: PathBuf, ttl: Duration, capacity: usize) -> Result<Self> {
        let ttl = TimeDelta::from_std(ttl)
            .map_err(|e| AppError::Cache(format!("Cache ttl out of range: {}", e)))?;
        Ok(Self {
            dir,
            ttl,
            capacity,
            options: String::new(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.get_cache_dir()?,
            config.get_cache_ttl()?,
            config.cache.capacity,
        )?
        .with_options(&options_fingerprint(config)?))
    }

    pub fn with_options(mut self, options: &str) -> Self {
        self.options = options.to_string();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key_for(&self, identifier: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(identifier.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.options.as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    fn page_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.html", key))
    }

    /// Cached page for `identifier`, unless missing or expired. A hit
    /// refreshes the entry's last-access time.
    pub fn get(&self, identifier: &str) -> Result<Option<String>> {
        self.get_at(identifier, Utc::now())
    }

    fn get_at(&self, identifier: &str, now: DateTime<Utc>) -> Result<Option<String>> {
        let key = self.key_for(identifier);
        let mut metadata = self.load_metadata();
        let Some(entry) = metadata.repos.get_mut(&key) else {
            log::debug!("Cache miss for {}", identifier);
            return Ok(None);
        };
        if now - entry.stored_at >= self.ttl {
            log::debug!("Cache entry for {} expired at {}", identifier, entry.stored_at + self.ttl);
            return Ok(None);
        }
        let path = self.page_path(&key);
        let html = match fs::read_to_string(&path) {
            Ok(html) => html,
            Err(e) => {
                log::warn!("Cached page missing for {}: {}", identifier, e);
                return Ok(None);
            }
        };
        entry.last_accessed = now;
        self.save_metadata(&metadata)?;
        log::info!("Cache hit for {}", identifier);
        Ok(Some(html))
    }

    pub fn put(&self, identifier: &str, commit: Option<&str>, html: &str) -> Result<PathBuf> {
        self.put_at(identifier, commit, html, Utc::now())
    }

    fn put_at(
        &self,
        identifier: &str,
        commit: Option<&str>,
        html: &str,
        now: DateTime<Utc>,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| AppError::DirCreation {
            path: self.dir.clone(),
            source: e,
        })?;
        let key = self.key_for(identifier);
        let path = self.page_path(&key);
        fs::write(&path, html).map_err(|e| AppError::FileWrite {
            path: path.clone(),
            source: e,
        })?;

        let mut metadata = self.load_metadata();
        metadata.repos.insert(
            key,
            CacheEntry {
                url: identifier.to_string(),
                name: identifier
                    .trim_end_matches('/')
                    .rsplit('/')
                    .next()
                    .unwrap_or(identifier)
                    .to_string(),
                commit: commit.map_or_else(|| "unknown".to_string(), |c| c.chars().take(8).collect()),
                stored_at: now,
                last_accessed: now,
            },
        );
        self.prune_metadata(&mut metadata, now);
        self.save_metadata(&metadata)?;
        log::info!("Cached page for {} at {}", identifier, path.display());
        Ok(path)
    }

    /// Entries, most recently used first.
    pub fn entries(&self) -> Vec<(String, CacheEntry)> {
        let mut entries: Vec<(String, CacheEntry)> = self.load_metadata().repos.into_iter().collect();
        entries.sort_by(|a, b| b.1.last_accessed.cmp(&a.1.last_accessed));
        entries
    }

    pub fn is_expired(&self, entry: &CacheEntry) -> bool {
        Utc::now() - entry.stored_at >= self.ttl
    }

    /// Removes expired entries and evicts beyond capacity; returns how many went.
    pub fn prune(&self) -> Result<usize> {
        let mut metadata = self.load_metadata();
        let removed = self.prune_metadata(&mut metadata, Utc::now());
        self.save_metadata(&metadata)?;
        Ok(removed)
    }

    pub fn clear(&self) -> Result<usize> {
        let mut metadata = self.load_metadata();
        let keys: Vec<String> = metadata.repos.keys().cloned().collect();
        for key in &keys {
            self.remove_page(key);
        }
        metadata.repos.clear();
        self.save_metadata(&metadata)?;
        Ok(keys.len())
    }

    fn prune_metadata(&self, metadata: &mut CacheMetadata, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = metadata
            .repos
            .iter()
            .filter(|(_, entry)| now - entry.stored_at >= self.ttl)
            .map(|(key, _)| key.clone())
            .collect();
        let mut removed = expired.len();
        for key in expired {
            metadata.repos.remove(&key);
            self.remove_page(&key);
        }

        if metadata.repos.len() > self.capacity {
            let mut by_access: Vec<(String, DateTime<Utc>)> = metadata
                .repos
                .iter()
                .map(|(key, entry)| (key.clone(), entry.last_accessed))
                .collect();
            by_access.sort_by(|a, b| a.1.cmp(&b.1));
            let excess = metadata.repos.len() - self.capacity;
            for (key, _) in by_access.into_iter().take(excess) {
                metadata.repos.remove(&key);
                self.remove_page(&key);
                removed += 1;
            }
        }
        if removed > 0 {
            log::debug!("Pruned {} cache entries.", removed);
        }
        removed
    }

    fn remove_page(&self, key: &str) {
        let path = self.page_path(key);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to remove cached page {}: {}", path.display(), e);
            }
        }
    }

    fn load_metadata(&self) -> CacheMetadata {
        let path = self.dir.join(METADATA_FILE);
        let Ok(content) = fs::read_to_string(&path) else {
            return CacheMetadata::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable cache metadata {}: {}", path.display(), e);
            CacheMetadata::default()
        })
    }

    fn save_metadata(&self, metadata: &CacheMetadata) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| AppError::DirCreation {
            path: self.dir.clone(),
            source: e,
        })?;
        let path = self.dir.join(METADATA_FILE);
        let content = serde_json::to_string_pretty(metadata)?;
        fs::write(&path, content).map_err(|e| AppError::FileWrite { path, source: e })
    }
}

/// Digest of the settings that change a rendered page. Cache location, TTL and
/// export format are left out.
pub fn options_fingerprint(config: &Config) -> Result<String> {
    let options = serde_json::to_string(&(&config.general, &config.tree, &config.render))?;
    Ok(blake3::hash(options.as_bytes()).to_hex().to_string())
}
