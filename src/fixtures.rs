//! Fixture repository
//!
//! Canonical message templates live one per scenario step under the
//! fixture directory, named `<SCENARIO>-<STEP>.hl7` (e.g.
//! `OHIE-CR-02-20.hl7`). Loading is read-only and idempotent.

use std::path::{Path, PathBuf};

use crate::common::{Error, Result};
use crate::hl7::Message;

/// Resolves scenario-step identifiers to parsed messages
#[derive(Debug, Clone)]
pub struct FixtureRepository {
    root: PathBuf,
}

impl FixtureRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load and parse the fixture for one scenario step
    pub fn load(&self, step_id: &str) -> Result<Message> {
        let path = self.root.join(format!("{step_id}.hl7"));
        let text = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FixtureNotFound {
                    id: step_id.to_string(),
                    path: path.display().to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;

        Message::parse(&text).map_err(|e| match e {
            Error::Parse(detail) => Error::Parse(format!("fixture {step_id}: {detail}")),
            other => other,
        })
    }
}
