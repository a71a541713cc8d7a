//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::hl7::domain::{Domain, DomainTable};

use super::{Error, Result};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "cr-harness.toml";

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// System under test
    #[serde(default)]
    pub target: TargetConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Fixture repository settings
    #[serde(default)]
    pub fixtures: FixturesConfig,

    /// Assigning-authority domains known to the harness, in addition to
    /// the built-in OHIE test domains
    #[serde(default)]
    pub domains: Vec<DomainEntry>,
}

/// Target registry configuration
#[derive(Debug, Deserialize)]
pub struct TargetConfig {
    /// host:port of the registry's MLLP listener
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:2100".to_string()
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// Timeout for establishing the connection
    #[serde(default = "default_connect")]
    pub connect_secs: u64,

    /// Timeout for receiving one framed response
    #[serde(default = "default_response")]
    pub response_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_secs: default_connect(),
            response_secs: default_response(),
        }
    }
}

fn default_connect() -> u64 {
    5
}
fn default_response() -> u64 {
    30
}

/// Fixture repository configuration
#[derive(Debug, Deserialize)]
pub struct FixturesConfig {
    /// Directory holding one `.hl7` template per scenario step
    #[serde(default = "default_fixture_dir")]
    pub dir: PathBuf,
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self {
            dir: default_fixture_dir(),
        }
    }
}

fn default_fixture_dir() -> PathBuf {
    PathBuf::from("fixtures")
}

/// An extra assigning-authority domain declared in the config file
#[derive(Debug, Deserialize)]
pub struct DomainEntry {
    pub namespace: String,
    pub universal_id: String,
}

impl Config {
    /// Load configuration from an explicit path, or from
    /// `cr-harness.toml` in the working directory when present
    ///
    /// Returns default configuration if no file exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(Error::Config(format!(
                        "config file not found: {}",
                        p.display()
                    )));
                }
                p.to_path_buf()
            }
            None => {
                let p = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !p.exists() {
                    return Ok(Self::default());
                }
                p
            }
        };

        let content = std::fs::read_to_string(&path)?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// The domain table: built-in OHIE test domains plus config extras
    pub fn domain_table(&self) -> DomainTable {
        let mut table = DomainTable::default();
        for entry in &self.domains {
            table.push(Domain::new(&entry.namespace, &entry.universal_id));
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.target.address, "127.0.0.1:2100");
        assert_eq!(config.timeouts.connect_secs, 5);
        assert_eq!(config.timeouts.response_secs, 30);
        assert_eq!(config.fixtures.dir, PathBuf::from("fixtures"));
    }

    #[test]
    fn test_parse_config() {
        let config: Config = toml::from_str(
            r#"
[target]
address = "registry.example.org:2575"

[timeouts]
response_secs = 10

[[domains]]
namespace = "LOCAL"
universal_id = "2.16.840.1.113883.3.72.5.9.100"
"#,
        )
        .unwrap();

        assert_eq!(config.target.address, "registry.example.org:2575");
        assert_eq!(config.timeouts.response_secs, 10);
        // unset values keep their defaults
        assert_eq!(config.timeouts.connect_secs, 5);
        assert_eq!(config.domains.len(), 1);
        assert_eq!(config.domains[0].namespace, "LOCAL");
    }
}
