//! Database schemas for Promitto

mod connection_level;
mod metadata;
mod user;

pub use connection_level::LEVEL_COLLECTION;
pub use metadata::Metadata;
pub use user::{ConnectionStatus, UserDoc, USER_COLLECTION};
