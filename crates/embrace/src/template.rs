//! The template aggregate.
//!
//! A [`Template`] bundles one source (a file path or an inline string) with
//! its scanning configuration, caching policy, variable and callable pools,
//! and an optional parent link. Templates live in the engine's arena and
//! refer to each other by index, so an include chain is a chain of plain
//! `TemplateId`s with no ownership cycles.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::context::{Binding, Callable};
use crate::engine::TemplateId;
use crate::error::Error;
use crate::value::Value;

/// Appended to extension-less include targets before path resolution.
pub(crate) const TEMPLATE_EXTENSION: &str = ".tpl";

/// Default time-to-live for cache artifacts, in seconds.
pub(crate) const DEFAULT_CACHE_LIFE: u64 = 86_400;

const DEFAULT_OPEN: &str = "[[";
const DEFAULT_CLOSE: &str = "]]";
const DEFAULT_ARG_SEPARATOR: &str = ":";
const DEFAULT_ATTR_SEPARATOR: &str = ".";

/// One template: source, scan configuration, cache policy, and bindings.
///
/// Constructed through the engine (`load` / `add_inline`) and addressed by
/// [`TemplateId`] afterwards.
pub struct Template {
    pub(crate) file: Option<PathBuf>,
    pub(crate) source: Option<String>,
    pub(crate) open: String,
    pub(crate) close: String,
    pub(crate) arg_sep: String,
    pub(crate) attr_sep: String,
    pub(crate) parent: Option<TemplateId>,
    pub(crate) cache: bool,
    pub(crate) cache_life: u64,
    pub(crate) cache_dir: Option<PathBuf>,
    // Memoized result of the cache-directory walk; reset when the explicit
    // directory changes.
    pub(crate) resolved_cache_dir: Option<PathBuf>,
    pub(crate) compiled: Option<String>,
    pub(crate) values: HashMap<String, Value>,
    pub(crate) callables: HashMap<String, Callable>,
}

impl Template {
    fn empty() -> Self {
        Self {
            file: None,
            source: None,
            open: DEFAULT_OPEN.to_string(),
            close: DEFAULT_CLOSE.to_string(),
            arg_sep: DEFAULT_ARG_SEPARATOR.to_string(),
            attr_sep: DEFAULT_ATTR_SEPARATOR.to_string(),
            parent: None,
            cache: true,
            cache_life: DEFAULT_CACHE_LIFE,
            cache_dir: None,
            resolved_cache_dir: None,
            compiled: None,
            values: HashMap::new(),
            callables: HashMap::new(),
        }
    }

    pub(crate) fn from_file(path: PathBuf) -> Self {
        Self {
            file: Some(path),
            ..Self::empty()
        }
    }

    pub(crate) fn from_source(source: String) -> Self {
        Self {
            source: Some(source),
            ..Self::empty()
        }
    }

    /// The source file, if this template was loaded from one.
    pub fn file(&self) -> Option<&PathBuf> {
        self.file.as_ref()
    }

    /// The enclosing template, when this one was pulled in by an include or
    /// assigned as a nested value.
    pub fn parent(&self) -> Option<TemplateId> {
        self.parent
    }

    /// Current delimiter pair.
    pub fn delimiters(&self) -> (&str, &str) {
        (&self.open, &self.close)
    }

    /// Replaces the delimiter pair. Surrounding whitespace is trimmed; an
    /// empty delimiter would make every document one giant tag, so it is
    /// rejected.
    pub fn set_delimiters(&mut self, open: &str, close: &str) -> Result<(), Error> {
        let open = open.trim();
        let close = close.trim();
        if open.is_empty() || close.is_empty() {
            return Err(Error::InvalidDelimiterConfig(format!(
                "{:?} / {:?}",
                open, close
            )));
        }
        self.open = open.to_string();
        self.close = close.to_string();
        Ok(())
    }

    /// Replaces the argument separator (default `:`).
    pub fn set_arg_separator(&mut self, sep: &str) -> Result<(), Error> {
        let sep = sep.trim();
        if sep.is_empty() {
            return Err(Error::InvalidDelimiterConfig(
                "empty argument separator".to_string(),
            ));
        }
        self.arg_sep = sep.to_string();
        Ok(())
    }

    /// Replaces the attribute-path separator (default `.`).
    pub fn set_attr_separator(&mut self, sep: &str) -> Result<(), Error> {
        let sep = sep.trim();
        if sep.is_empty() {
            return Err(Error::InvalidDelimiterConfig(
                "empty attribute separator".to_string(),
            ));
        }
        self.attr_sep = sep.to_string();
        Ok(())
    }

    /// Sets the cache time-to-live in seconds.
    pub fn set_cache_life(&mut self, seconds: u64) {
        self.cache_life = seconds;
    }

    /// Overrides the cache directory (default: the template file's own
    /// directory, inherited from an ancestor when unset).
    pub fn set_cache_dir(&mut self, dir: impl Into<PathBuf>) {
        self.cache_dir = Some(dir.into());
        self.resolved_cache_dir = None;
    }

    /// Whether this template participates in caching.
    pub fn cache_enabled(&self) -> bool {
        self.cache
    }

    /// Looks a name up in this template's own pools.
    pub(crate) fn binding(&self, name: &str) -> Binding {
        if let Some(value) = self.values.get(name) {
            return Binding::Value(value.clone());
        }
        if let Some(callable) = self.callables.get(name) {
            return Binding::Callable(callable.clone());
        }
        Binding::NotFound
    }

    /// Binds a value, displacing any callable of the same name. A name is
    /// bound to a value or a callable, never both.
    pub(crate) fn set_value(&mut self, name: String, value: Value) {
        self.callables.remove(&name);
        self.values.insert(name, value);
    }

    pub(crate) fn set_callable(&mut self, name: String, callable: Callable) {
        self.values.remove(&name);
        self.callables.insert(name, callable);
    }

    pub(crate) fn unset(&mut self, name: &str) {
        self.values.remove(name);
        self.callables.remove(name);
    }
}
