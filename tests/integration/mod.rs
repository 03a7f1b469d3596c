//! Integration Tests Module
//!
//! End-to-end tests for the plan pipeline, one file per component, driven by
//! scripted collaborators.

// Shared fakes
mod support;

// Payload extraction and repair
mod extraction_test;

// Plan validation
mod validator_test;

// Compilation and execution of workflows
mod workflow_test;

// Clarification loop
mod clarification_test;

// Feedback loop
mod iteration_test;

// Whole-pipeline scenarios
mod scenarios_test;

// Planning-record store
mod records_test;
