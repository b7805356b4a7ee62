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

//! One-time `env_logger` setup.

use std::sync::Once;

/// Logger configuration.
///
/// `filter` follows the `env_logger` filter syntax, e.g. `"info"` or
/// `"prism_infra=debug,wgpu=warn"`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Explicit filter. Falls back to `RUST_LOG`, then to `info`.
    pub filter: Option<String>,
    /// ANSI coloring behavior.
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
        if let Some(filter) = config.filter {
            builder.parse_filters(&filter);
        }
        // wgpu_hal is very chatty at info level.
        builder
            .filter_module("wgpu_hal", log::LevelFilter::Error)
            .write_style(config.write_style);

        if builder.try_init().is_err() {
            log::debug!("A global logger was already installed; keeping it.");
            return;
        }
        log::debug!("Logging initialized.");
    });
}
