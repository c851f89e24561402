//! Client settings.
//!
//! Defaults can be overridden from `STABWIRE_*` environment variables:
//! `STABWIRE_ADDRESS`, `STABWIRE_TIMEOUT`, `STABWIRE_KIND`,
//! `STABWIRE_DELIMITER`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use stabwire_circuit::DEFAULT_DELIMITER;
use stabwire_proto::KIND_CHP_STATE;

/// Where to connect and how to talk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server address (e.g., "127.0.0.1:9610")
    #[serde(default = "default_address")]
    pub address: String,

    /// Reply timeout in seconds; 0 waits forever
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// State representation requested from `create_system`
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Code point of the line delimiter used for circuit text
    #[serde(default = "default_delimiter")]
    pub delimiter: u32,
}

fn default_address() -> String {
    "127.0.0.1:9610".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_kind() -> String {
    KIND_CHP_STATE.to_string()
}

fn default_delimiter() -> u32 {
    DEFAULT_DELIMITER
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            timeout_seconds: default_timeout(),
            kind: default_kind(),
            delimiter: default_delimiter(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::default().merge_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; unparsable values are ignored.
    pub fn merge_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("STABWIRE_ADDRESS") {
            self.address = v;
        }
        if let Some(val) = lookup("STABWIRE_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.timeout_seconds = val;
        }
        if let Some(v) = lookup("STABWIRE_KIND") {
            self.kind = v;
        }
        if let Some(val) = lookup("STABWIRE_DELIMITER").and_then(|v| v.parse().ok()) {
            self.delimiter = val;
        }
        self
    }

    /// Reply timeout, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }
}
