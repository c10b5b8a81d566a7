//! Database layer
//!
//! MongoDB client, document schemas and the store traits the service layer
//! is written against.

pub mod memory;
pub mod mongo;
pub mod schemas;
pub mod store;

pub use memory::MemoryStore;
pub use mongo::{IntoIndexes, MongoClient, MongoCollection, MutMetadata};
pub use store::{LevelStore, MongoStore, Store, UserStore};
