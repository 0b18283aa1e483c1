// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Viewer configuration loaded from JSON or environment variables.

use crate::error::{Result, ViewerError};
use ifc_lite_model::Appearance;
use serde::{Deserialize, Serialize};

/// Viewer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Worker script handed to the engine at initialization.
    pub worker_script_path: String,
    /// WASM asset handed to the engine at initialization.
    pub wasm_asset_path: String,
    /// Number of engine worker threads.
    pub worker_threads: usize,
    /// Appearance of the selection highlight.
    pub highlight: Appearance,
    /// Validation reports progress every `progress_step` elements.
    pub progress_step: usize,
    /// Keep extracted property bundles for the lifetime of the live model.
    pub cache_properties: bool,
    /// Centering offsets beyond this distance (model units) are logged as georeferenced.
    pub large_coordinate_threshold: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            worker_script_path: "web-ifc-mt.worker.js".into(),
            wasm_asset_path: "web-ifc.wasm".into(),
            worker_threads: num_cpus::get(),
            highlight: Appearance::default(),
            progress_step: 10,
            cache_properties: true,
            large_coordinate_threshold: 10_000.0,
        }
    }
}

impl ViewerConfig {
    /// Load configuration from environment variables.
    ///
    /// Absent or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            worker_script_path: std::env::var("IFC_WORKER_SCRIPT")
                .unwrap_or(defaults.worker_script_path),
            wasm_asset_path: std::env::var("IFC_WASM_PATH").unwrap_or(defaults.wasm_asset_path),
            worker_threads: std::env::var("IFC_WORKER_THREADS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.worker_threads),
            progress_step: std::env::var("IFC_PROGRESS_STEP")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.progress_step),
            cache_properties: std::env::var("IFC_CACHE_PROPERTIES")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.cache_properties),
            ..defaults
        }
    }

    /// Parse a JSON configuration; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ViewerError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the viewer cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.progress_step == 0 {
            return Err(ViewerError::config("progress_step must be at least 1"));
        }
        if self.worker_threads == 0 {
            return Err(ViewerError::config("worker_threads must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.highlight.opacity) {
            return Err(ViewerError::config(format!(
                "highlight opacity {} outside [0, 1]",
                self.highlight.opacity
            )));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
