//! Data Models
//!
//! Contains all data structures used throughout the application.

pub mod evaluation;
pub mod plan;
pub mod record;
pub mod settings;
pub mod workflow;

pub use evaluation::*;
pub use plan::*;
pub use record::*;
pub use settings::*;
pub use workflow::*;
