use std::path::{Path, PathBuf};

use chatsync_cache::{MessageCache, SqliteStorage};
use directories::ProjectDirs;

const CACHE_DB_FILENAME: &str = "cache.sqlite3";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not resolve user data directory")]
    MissingUserDataDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache error: {0}")]
    Cache(#[from] chatsync_cache::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Where chatsync keeps its local state on this machine.
#[derive(Debug, Clone)]
pub struct AppDirs {
    data: PathBuf,
}

impl AppDirs {
    /// The platform's per-user data directory for chatsync.
    pub fn resolve() -> Result<Self> {
        let dirs = ProjectDirs::from("dev", "chatsync", "chatsync").ok_or(Error::MissingUserDataDir)?;
        Ok(Self::at(dirs.data_local_dir()))
    }

    /// Use `data` instead of the platform directory.
    pub fn at(data: impl AsRef<Path>) -> Self {
        Self {
            data: data.as_ref().to_path_buf(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data
    }

    pub fn cache_db_path(&self) -> PathBuf {
        self.data.join(CACHE_DB_FILENAME)
    }

    /// The message cache backed by the cache database, created on first use.
    pub fn open_message_cache(&self) -> Result<MessageCache> {
        std::fs::create_dir_all(&self.data)?;
        let path = self.cache_db_path();
        tracing::debug!(path = %path.display(), "opening message cache");
        Ok(MessageCache::new(SqliteStorage::open(&path)?))
    }
}

/// Shorthand for `AppDirs::resolve()?.open_message_cache()`.
pub fn open_message_cache() -> Result<MessageCache> {
    AppDirs::resolve()?.open_message_cache()
}
