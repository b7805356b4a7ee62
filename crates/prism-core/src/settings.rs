// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Renderer construction settings.

use crate::renderer::api::{BackendKind, ContextOptions, TextureFormat};
use serde::{Deserialize, Serialize};

/// Settings shared by every backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Options for immediate-mode context acquisition.
    pub context: ContextOptions,
    /// The clear color applied on initialization.
    pub clear_color: [f32; 4],
    /// Whether 4x multisampling is enabled right after initialization.
    pub msaa: bool,
    /// The format of the lazily allocated depth attachment.
    pub depth_format: TextureFormat,
    /// Backend fallback order used by backend selection.
    pub backend_preference: Vec<BackendKind>,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            context: ContextOptions::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            msaa: false,
            depth_format: TextureFormat::Depth24PlusStencil8,
            backend_preference: BackendKind::FALLBACK_ORDER.to_vec(),
        }
    }
}

impl RendererSettings {
    /// Parses settings from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the settings to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_prefer_the_encoder_backend() {
        let settings = RendererSettings::default();
        assert_eq!(settings.backend_preference[0], BackendKind::Encoder);
        assert_eq!(settings.clear_color, [0.0, 0.0, 0.0, 1.0]);
        assert!(!settings.msaa);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings = RendererSettings::from_json_str(
            r#"{ "msaa": true, "backend_preference": ["immediate"], "context": { "stencil": true } }"#,
        )
        .expect("valid settings");
        assert!(settings.msaa);
        assert_eq!(settings.backend_preference, vec![BackendKind::Immediate]);
        assert!(settings.context.stencil);
        assert!(settings.context.depth);
        assert_eq!(settings.depth_format, TextureFormat::Depth24PlusStencil8);
    }

    #[test]
    fn json_round_trip_preserves_settings() {
        let mut settings = RendererSettings::default();
        settings.clear_color = [0.1, 0.2, 0.3, 1.0];
        let json = settings.to_json_string().expect("serializable");
        assert_eq!(RendererSettings::from_json_str(&json).expect("parse"), settings);
    }
}
