//! steamroll library
//!
//! Steam Web API client, TTL file cache, and the playtime-ceiling selector,
//! exposed for the binary and for integration tests.

pub mod app;
pub mod cache;
pub mod cli;
pub mod data;
pub mod library;
pub mod logging;
pub mod selector;
pub mod ui;
