//! Process-wide engine settings.
//!
//! The original design kept the cache-enabled and debug flags in global
//! mutable statics. Here they are an explicit [`Settings`] value owned by the
//! [`Engine`](crate::Engine) and threaded through every render, so tests can
//! construct isolated engines instead of resetting globals.

/// Engine-level configuration shared by every template in the arena.
/// Serializable so deployments can load it from a config file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Master switch for the file cache. When off, no cache file is ever
    /// read or written, regardless of per-template cache flags.
    pub cache_enabled: bool,

    /// When on, unresolvable tags render a visible `(not found)` placeholder
    /// and unknown post-filters render `(undefined function)` instead of
    /// degrading to empty output.
    pub debug: bool,

    /// String prepended to the template file stem to form the cache file
    /// name. Deployment-level, not per-template.
    pub cache_prepend: String,

    /// String appended to the template file stem to form the cache file
    /// name.
    pub cache_append: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            debug: false,
            cache_prepend: "~".to_string(),
            cache_append: ".html".to_string(),
        }
    }
}

impl Settings {
    /// Creates the default settings: caching on, debug off, `~stem.html`
    /// cache naming.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Placeholder rendered for empty resolutions when debug is on.
pub(crate) const NOT_FOUND_PLACEHOLDER: &str = "(not found)";

/// Placeholder substituted for unknown post-filter names when debug is on.
pub(crate) const UNDEFINED_FUNCTION_PLACEHOLDER: &str = "(undefined function)";
