//! Plan Pilot Project Detection
//!
//! Figures out what kind of project a plan is about to touch:
//!
//! - `models` - Project types, build tools / package managers, detection results
//! - `detector` - Marker-file and lockfile based detection
//!
//! The executor uses this to synthesize install commands for the right package
//! manager; the validator uses the build tool vocabulary to catch tasks whose
//! command runs a different tool than their description names.

pub mod detector;
pub mod models;

pub use detector::{detect_project_type, ProjectDetector};
pub use models::{BuildTool, ProjectDetectionResult, ProjectMetadata, ProjectType};
