//! Integration tests for lecture-lens
//!
//! Tests are organized by component:
//! - lecture_api_test: HTTP snapshot client against a mock server
//! - cli_test: Argument parsing and command exit codes
//! - ui_test: Full-screen rendering into a TestBackend
//! - e2e_test: Channel events and key presses driven through `App`

// Note: Each test file is a separate integration test crate
// Tests are run individually by cargo, not via mod.rs
