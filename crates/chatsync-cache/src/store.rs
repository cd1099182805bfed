use crate::error::Result;

/// A durable key-value seam under the message cache.
///
/// Writes are last-write-wins with no coordination between writers; a
/// stricter scheme (e.g. a version token per key) can be layered behind this
/// trait without touching the engine.
pub trait CacheStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}
