//! Promitto - connection levels for connected pairs
//!
//! Two people who accept each other's connection request share a level.
//! Chatting daily builds a streak, four daily rituals pay out when both
//! partners complete them, and levels unlock features. Breaking the
//! connection deletes everything.
//!
//! ## Modules
//!
//! - **level**: the pure leveling engine (curve, unlocks, streaks, rituals)
//! - **services**: load, mutate and save with optimistic concurrency
//! - **db**: MongoDB and in-memory stores
//! - **routes** / **server**: the JSON HTTP API

pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod level;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{PromittoError, Result};
