//! Extraction
//!
//! Isolates and repairs the structured payload embedded in model text.

pub mod extractor;
pub mod fences;
pub mod repair;
pub mod scanner;

pub use extractor::{extract_plan, ExtractionOutcome, ExtractionSource};
pub use fences::{find_fenced_blocks, FencedBlock};
