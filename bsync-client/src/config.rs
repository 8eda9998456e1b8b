//! Client configuration
//!
//! Loaded from an optional TOML file; every key has a compiled default.
//!
//! ```toml
//! server_url = "http://127.0.0.1:8700"
//! preview_timeout_ms = 3000
//!
//! [touch]
//! delay_ms = 250
//! tolerance = 5.0
//!
//! [mouse]
//! distance = 0.0
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Touch drags activate after holding still for `delay_ms`
///
/// Moving further than `tolerance` before the delay elapses means the gesture
/// was a scroll or a tap, and the pending drag is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchActivation {
    pub delay_ms: u64,
    pub tolerance: f64,
}

impl TouchActivation {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for TouchActivation {
    fn default() -> Self {
        Self {
            delay_ms: 250,
            tolerance: 5.0,
        }
    }
}

/// Mouse drags activate once the pointer has moved `distance` (0 = on press)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MouseActivation {
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub touch: TouchActivation,
    pub mouse: MouseActivation,
    /// How long an optimistic preview waits for its broadcast
    pub preview_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8700".to_string(),
            touch: TouchActivation::default(),
            mouse: MouseActivation::default(),
            preview_timeout_ms: 3000,
        }
    }
}

impl ClientConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(bsync_common::Error::from)?;
        let config = toml::from_str(&content).map_err(bsync_common::Error::from)?;
        Ok(config)
    }

    pub fn preview_timeout(&self) -> Duration {
        Duration::from_millis(self.preview_timeout_ms)
    }
}
