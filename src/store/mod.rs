pub mod memory;
pub mod models;
pub mod repository;
pub mod sqlite;

pub use memory::MemoryStore;
pub use models::{BatchUpdate, Field, FieldPath, FieldUpdates, Partition, UserRecord};
pub use repository::UserStore;
pub use sqlite::SqliteStore;
