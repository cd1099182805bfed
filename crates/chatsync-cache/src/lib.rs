pub mod error;
pub mod memory;
pub mod messages;
pub mod sqlite;
pub mod store;

pub use error::{Error, Result};
pub use memory::MemoryStorage;
pub use messages::MessageCache;
pub use sqlite::SqliteStorage;
pub use store::CacheStorage;
