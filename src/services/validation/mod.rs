//! Validation
//!
//! Semantic checks run between extraction and compilation.

pub mod validator;

pub use validator::{
    is_placeholder, ExistenceOracle, IssueKind, PlanValidator, ProjectTreeOracle, ValidationIssue,
    ValidationReport,
};
