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

//! Human-readable failure markup for hosts that display renderer failures.

use crate::renderer::api::BackendKind;
use crate::renderer::RenderError;

/// Escapes text for inclusion in HTML element content.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Markup describing an initialization or runtime error.
pub fn error_markup(error: &RenderError) -> String {
    format!(
        "<div class=\"prism-error\">\n  <h2>Rendering failed</h2>\n  <pre>{}</pre>\n</div>\n",
        escape(&error.to_string())
    )
}

/// Markup explaining that a backend is unavailable on this platform.
pub fn unsupported_markup(backend: BackendKind) -> String {
    format!(
        "<div class=\"prism-unsupported\">\n  <h2>{} rendering is not supported</h2>\n  <p>This platform did not grant a {} context. Try a different device or browser.</p>\n</div>\n",
        escape(backend.name()),
        escape(backend.name())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::ResourceKind;

    #[test]
    fn error_text_is_escaped() {
        let err = RenderError::not_found(ResourceKind::Buffer, "<script>");
        let markup = error_markup(&err);
        assert!(markup.contains("&lt;script&gt;"));
        assert!(!markup.contains("<script>"));
    }

    #[test]
    fn unsupported_names_the_backend() {
        let markup = unsupported_markup(BackendKind::Encoder);
        assert!(markup.contains("encoder rendering is not supported"));
    }
}
