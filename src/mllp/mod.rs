//! MLLP transport: framing codec and the client used against the
//! registry under test

pub mod client;
pub mod codec;

pub use client::MllpClient;
