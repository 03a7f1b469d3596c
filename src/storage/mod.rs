//! Storage Layer
//!
//! Handles data persistence: the SQLite planning-record store and JSON config.

pub mod config;
pub mod database;

pub use config::*;
pub use database::*;
