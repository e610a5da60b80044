//! Client configuration stored as TOML
//!
//! Every section falls back to its defaults, so a config file written by an
//! older version (or a partial hand-written one) still loads.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_RANDOM_BATCH_SIZE: usize = 25;
pub const DEFAULT_RANDOM_MIN_HIT_RATIO: f64 = 0.3;

static WRITE_LOCK: Mutex<()> = Mutex::new(());

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browse: BrowseConfig,
    pub albums_page: AlbumsPageConfig,
    pub artists_page: ArtistsPageConfig,
    pub image_cache: ImageCacheConfig,
    pub logging: LoggingConfig,
}

/// Tuning for the paging iterators
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseConfig {
    /// Items requested per round-trip by the sequential iterators
    pub page_size: usize,
    /// Items requested per round-trip by the random album iterator
    pub random_batch_size: usize,
    /// Fraction of never-seen albums in a random batch below which the
    /// random iterator switches to a deterministic sweep
    pub random_min_hit_ratio: f64,
    pub retry: RetryPolicy,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            random_batch_size: DEFAULT_RANDOM_BATCH_SIZE,
            random_min_hit_ratio: DEFAULT_RANDOM_MIN_HIT_RATIO,
            retry: RetryPolicy::default(),
        }
    }
}

/// How often a failed page fetch is repeated before it counts as the end of
/// the listing. Only transient server errors are retried.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: 250,
            max_backoff_ms: 4_000,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_retries(max_retries: u32, initial_backoff: Duration) -> Self {
        let initial_backoff_ms = initial_backoff.as_millis() as u64;
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms: initial_backoff_ms.max(Self::default().max_backoff_ms),
        }
    }

    /// Delay before retry number `attempt` (0-based), doubling each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlbumsPageConfig {
    pub sort_order: String,
}

impl Default for AlbumsPageConfig {
    fn default() -> Self {
        Self {
            sort_order: "Recently Added".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtistsPageConfig {
    pub sort_order: String,
}

impl Default for ArtistsPageConfig {
    fn default() -> Self {
        Self {
            sort_order: "Name (A-Z)".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageCacheConfig {
    pub max_size_mb: usize,
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self { max_size_mb: 50 }
    }
}

impl ImageCacheConfig {
    pub fn max_size_bytes(&self) -> usize {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: String,
    pub file_prefix: String,
    /// Used when `RUST_LOG` is not set
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: ".logs".to_string(),
            file_prefix: "supersonic-rs".to_string(),
            default_filter: "supersonic_rs=debug,warn".to_string(),
        }
    }
}

impl Config {
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Writes the config to `path`. Returns without writing if another write
    /// is already in progress.
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let Some(_guard) = try_acquire(&WRITE_LOCK) else {
            tracing::debug!("Config write already in progress, skipping");
            return Ok(());
        };

        let path = path.as_ref();
        let content = toml::to_string(self).context("serializing config")?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)
            .with_context(|| format!("writing config file {}", path.display()))?;
        Ok(())
    }
}

/// Non-blocking lock that survives a writer panicking mid-write.
fn try_acquire(lock: &Mutex<()>) -> Option<MutexGuard<'_, ()>> {
    match lock.try_lock() {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(e)) => Some(e.into_inner()),
        Err(TryLockError::WouldBlock) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_lock_recovers_from_poisoning() {
        let lock = Mutex::new(());
        let _ = std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = lock.lock().unwrap();
                panic!("writer failed");
            })
            .join()
        });
        assert!(lock.is_poisoned());

        let guard = try_acquire(&lock);
        assert!(guard.is_some());
        assert!(try_acquire(&lock).is_none());
        drop(guard);
        assert!(try_acquire(&lock).is_some());
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[browse]\npage_size = 50\n\n[albums_page]\nsort_order = \"Random\"\n",
        )
        .unwrap();

        let config = Config::read_file(&path).unwrap();
        assert_eq!(config.browse.page_size, 50);
        assert_eq!(config.browse.random_batch_size, DEFAULT_RANDOM_BATCH_SIZE);
        assert_eq!(config.albums_page.sort_order, "Random");
        assert_eq!(config.artists_page.sort_order, "Name (A-Z)");
        assert_eq!(config.browse.retry, RetryPolicy::none());
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.browse.retry = RetryPolicy::with_retries(3, Duration::from_millis(100));
        config.image_cache.max_size_mb = 10;
        config.write_file(&path).unwrap();

        assert_eq!(Config::read_file(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::read_file(dir.path().join("nope.toml")).is_err());
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_backoff_ms: 100,
            max_backoff_ms: 1_000,
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
        assert_eq!(policy.backoff(4), Duration::from_millis(1_000));
        assert_eq!(policy.backoff(70), Duration::from_millis(1_000));
    }
}
