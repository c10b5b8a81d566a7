//! Services for Promitto
//!
//! Orchestration between the HTTP layer, the level engine and storage.

pub mod level;

pub use level::{LevelService, DEFAULT_SAVE_RETRIES};
