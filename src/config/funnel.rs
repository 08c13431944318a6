// src/config/funnel.rs
use serde::{Deserialize, Serialize};

use crate::matching::DisplayDefaults;

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `host:port` the HTTP service listens on.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunnelConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub display: DisplayDefaults,
}

impl FunnelConfig {
    /// Replace blank values with defaults so a half-filled file still works.
    pub fn sanitized(mut self) -> Self {
        if self.server.bind.trim().is_empty() {
            self.server.bind = default_bind();
        }
        let defaults = DisplayDefaults::default();
        let d = &mut self.display;
        if d.placeholder_image.trim().is_empty() {
            d.placeholder_image = defaults.placeholder_image;
        }
        if d.placeholder_vendor.trim().is_empty() {
            d.placeholder_vendor = defaults.placeholder_vendor;
        }
        if d.product_title_prefix.trim().is_empty() {
            d.product_title_prefix = defaults.product_title_prefix;
        }
        self
    }
}
