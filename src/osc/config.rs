//! The `osc:` section of the session config.

use serde::{Deserialize, Serialize};

/// Port the OSC bridge forwards controller traffic to.
pub const DEFAULT_LISTEN_PORT: u16 = 9129;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscConfig {
    /// UDP port to listen on.
    #[serde(default = "default_port")]
    pub listen_port: u16,
    /// Where to send control values back to (`host:port`). None = no feedback.
    #[serde(default)]
    pub feedback: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            listen_port: default_port(),
            feedback: None,
        }
    }
}
