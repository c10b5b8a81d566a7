//! Shared types for Promitto

mod error;

pub use error::{PromittoError, Result};
