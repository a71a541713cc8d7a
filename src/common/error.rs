//! Error types for the conformance harness
//!
//! One taxonomy for the whole run: fixture resolution, wire transport,
//! message navigation, and semantic assertions. Scenario failures are
//! reported from these, never from a panic.

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the conformance harness
#[derive(Error, Debug)]
pub enum Error {
    // === Fixture Errors ===
    #[error("No fixture for scenario step '{id}' (looked for {path})")]
    FixtureNotFound { id: String, path: String },

    #[error("Parse error: {0}")]
    Parse(String),

    // === Transport Errors ===
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("No response within {0} seconds")]
    Timeout(u64),

    #[error("Framing error: {0}")]
    Framing(String),

    // === Navigation Errors ===
    #[error("Path not found: {0}")]
    PathNotFound(String),

    // === Assertion Errors ===
    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("{failed} of {total} scenario(s) failed")]
    SuiteFailed { failed: usize, total: usize },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create an assertion failure carrying expected vs. actual
    pub fn assertion(what: &str, expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        Self::Assertion(format!("{what}: expected {expected}, got {actual}"))
    }

    /// True for navigation misses, which callers probe for deliberately
    /// when asserting that a group repetition is absent
    pub fn is_path_not_found(&self) -> bool {
        matches!(self, Error::PathNotFound(_))
    }
}
