//! Embedded static resources.
//!
//! # Module Structure
//!
//! - `template` - Template types for typed variable injection and page placeholders
//! - `serve` - Dev server assets (livereload.js)
//!
//! # Usage
//!
//! ```ignore
//! use embed::serve::{LIVERELOAD_JS, LivereloadVars};
//!
//! let js = LIVERELOAD_JS.render(&LivereloadVars { ws_port: 9528, ..Default::default() });
//! ```

mod template;

pub use template::{Template, TemplateVars, render_placeholders};

pub mod serve {
    use super::{Template, TemplateVars};

    /// Variables for livereload.js.
    #[derive(Debug, Clone, Copy)]
    pub struct LivereloadVars {
        pub ws_port: u16,
        pub reconnect_ms: u64,
        pub heartbeat_ms: u64,
    }

    impl Default for LivereloadVars {
        fn default() -> Self {
            Self {
                ws_port: 9528,
                reconnect_ms: 1000,
                heartbeat_ms: 55_000,
            }
        }
    }

    impl TemplateVars for LivereloadVars {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__INPACK_WS_PORT__", &self.ws_port.to_string())
                .replace("__INPACK_RECONNECT_MS__", &self.reconnect_ms.to_string())
                .replace("__INPACK_HEARTBEAT_MS__", &self.heartbeat_ms.to_string())
        }
    }

    /// Live reload client, minified by build.rs.
    pub const LIVERELOAD_JS: Template<LivereloadVars> =
        Template::new(include_str!(concat!(env!("OUT_DIR"), "/livereload.min.js")));

    /// Render the client wrapped in an inline `<script>` tag.
    pub fn livereload_tag(vars: &LivereloadVars) -> String {
        format!("<script>{}</script>", LIVERELOAD_JS.render(vars))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_livereload_placeholders_replaced() {
            let js = LIVERELOAD_JS.render(&LivereloadVars {
                ws_port: 4001,
                reconnect_ms: 250,
                heartbeat_ms: 1000,
            });
            assert!(!js.contains("__INPACK_"));
            assert!(js.contains("4001"));
        }

        #[test]
        fn test_livereload_tag_wraps_script() {
            let tag = livereload_tag(&LivereloadVars::default());
            assert!(tag.starts_with("<script>"));
            assert!(tag.ends_with("</script>"));
        }
    }
}
