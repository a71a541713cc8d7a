//! HL7v2 message model, ER7 codec, and structural navigation

pub mod domain;
pub mod message;
pub mod path;

pub use domain::{Domain, DomainTable};
pub use message::{Field, Message, Node, Segment};
pub use path::navigate;
