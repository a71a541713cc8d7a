//! Client Registry conformance harness
//!
//! This library validates an external Client Registry (a Master
//! Patient Index reachable over HL7v2/MLLP) against the OHIE-CR
//! interoperability scenarios: identifier-domain enforcement,
//! malformed-data rejection, and demographic query semantics.

pub mod assertions;
pub mod commands;
pub mod common;
pub mod fixtures;
pub mod hl7;
pub mod mllp;
pub mod mock;
pub mod scenario;
pub mod suite;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use hl7::{navigate, Message, Segment};
