//! HTTP server for Promitto

mod http;

pub use http::{run, AppState};
