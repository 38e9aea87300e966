//! The engine: template arena and public operations.
//!
//! An [`Engine`] owns every [`Template`] in a flat arena and hands out
//! [`TemplateId`] indices. All cross-template structure (includes, nested
//! template values, parent delegation) is expressed as indices into the
//! arena, which keeps the object graph acyclic from an ownership point of
//! view even when include graphs are cyclic — cycles are then caught by the
//! recursion guard instead of leaking memory.
//!
//! The engine also carries the two injected capabilities: a [`FileStore`]
//! for template and cache I/O and a [`ScriptRunner`] for `script`
//! directives.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::context::{Callable, Context};
use crate::error::Error;
use crate::fs::{FileStore, OsFileStore};
use crate::script::{NoScriptRunner, ScriptRunner};
use crate::settings::Settings;
use crate::template::Template;
use crate::value::Value;

/// Index of a template in the engine's arena.
pub type TemplateId = usize;

/// Compile/include nesting ceiling. A cyclic include burns one level per
/// hop and hits this instead of overflowing the stack.
pub(crate) const MAX_DEPTH: usize = 64;

/// Template compiler front door.
///
/// ```rust
/// use embrace::Engine;
///
/// let mut engine = Engine::new();
/// let page = engine.add_inline("Hi [[name]]!");
/// engine.set_var(page, "name", "Ana");
/// assert_eq!(engine.render(page, false).unwrap(), "Hi Ana!");
/// ```
pub struct Engine {
    pub(crate) templates: Vec<Template>,
    pub(crate) files: Box<dyn FileStore>,
    pub(crate) scripts: Box<dyn ScriptRunner>,
    pub(crate) settings: Settings,
    depth: usize,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Engine over the real filesystem, with no script runner.
    pub fn new() -> Self {
        Self::with_store(OsFileStore)
    }

    /// Engine over an injected file store. Tests typically pass a
    /// [`MemStore`](crate::MemStore) handle here.
    pub fn with_store(store: impl FileStore + 'static) -> Self {
        Self {
            templates: Vec::new(),
            files: Box::new(store),
            scripts: Box::new(NoScriptRunner),
            settings: Settings::default(),
            depth: 0,
        }
    }

    /// Installs the runner invoked for `script` directives.
    pub fn set_script_runner(&mut self, runner: impl ScriptRunner + 'static) {
        self.scripts = Box::new(runner);
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Global cache switch. Per-template policy still applies when enabled.
    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.settings.cache_enabled = enabled;
    }

    /// Debug mode substitutes visible placeholders for unresolvable tags
    /// instead of rendering them empty.
    pub fn set_debug(&mut self, debug: bool) {
        self.settings.debug = debug;
    }

    /// Loads a template from a file. The file must exist and be readable;
    /// its content is read lazily at render time.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<TemplateId, Error> {
        let path = path.as_ref();
        if !self.files.exists(path) {
            return Err(Error::TemplateNotFound(path.to_path_buf()));
        }
        if !self.files.is_readable(path) {
            return Err(Error::TemplateUnreadable(path.to_path_buf()));
        }
        debug!(path = %path.display(), "template loaded");
        self.templates.push(Template::from_file(path.to_path_buf()));
        Ok(self.templates.len() - 1)
    }

    /// Registers an in-memory template. Inline templates render like file
    /// templates but never participate in whole-template caching (there is
    /// no stem to derive a cache file name from).
    pub fn add_inline(&mut self, source: impl Into<String>) -> TemplateId {
        self.templates.push(Template::from_source(source.into()));
        self.templates.len() - 1
    }

    /// Borrows a template. Ids are only ever produced by this engine, so an
    /// out-of-range id is a caller bug and panics.
    pub fn template(&self, id: TemplateId) -> &Template {
        &self.templates[id]
    }

    pub fn template_mut(&mut self, id: TemplateId) -> &mut Template {
        &mut self.templates[id]
    }

    /// Binds a value. Assigning a nested template reparents it under the
    /// owning template so its tags can delegate upward.
    pub fn set_var(&mut self, id: TemplateId, name: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        if let Value::Template(child) = value {
            self.templates[child].parent = Some(id);
        }
        self.templates[id].set_value(name.into(), value);
    }

    /// Binds a callable under a name, displacing any value of that name.
    pub fn set_callable(
        &mut self,
        id: TemplateId,
        name: impl Into<String>,
        callable: impl Fn(&str, &str) -> String + 'static,
    ) {
        self.templates[id].set_callable(name.into(), std::rc::Rc::new(callable));
    }

    /// Removes a binding of either kind.
    pub fn unset_var(&mut self, id: TemplateId, name: &str) {
        self.templates[id].unset(name);
    }

    /// Reads a bound value back.
    pub fn var(&self, id: TemplateId, name: &str) -> Option<Value> {
        self.templates[id].values.get(name).cloned()
    }

    /// Whether a name is bound, to a value or a callable.
    pub fn has_var(&self, id: TemplateId, name: &str) -> bool {
        let t = &self.templates[id];
        t.values.contains_key(name) || t.callables.contains_key(name)
    }

    /// Per-template cache switch. Disabling propagates up the parent chain:
    /// a fragment that must stay fresh poisons every enclosing cache that
    /// would otherwise freeze it.
    pub fn set_cache(&mut self, id: TemplateId, enabled: bool) {
        self.templates[id].cache = enabled;
        if !enabled {
            let mut cursor = self.templates[id].parent;
            while let Some(ancestor) = cursor {
                self.templates[ancestor].cache = false;
                cursor = self.templates[ancestor].parent;
            }
        }
    }

    /// Nearest callable of the given name, walking the parent chain from the
    /// given template to the root.
    pub(crate) fn find_callable(&self, id: TemplateId, name: &str) -> Option<Callable> {
        let mut cursor = Some(id);
        while let Some(t) = cursor {
            if let Some(callable) = self.templates[t].callables.get(name) {
                return Some(callable.clone());
            }
            cursor = self.templates[t].parent;
        }
        None
    }

    /// Renders a template to its final text.
    ///
    /// Serves the memoized output when available (unless `renew`), then a
    /// fresh-enough cache file, and compiles from source as the last
    /// resort. A successful compile of a cacheable file template writes its
    /// cache skeleton back through the file store.
    pub fn render(&mut self, id: TemplateId, renew: bool) -> Result<String, Error> {
        {
            let t = self.template(id);
            if t.file.is_none() && t.source.is_none() {
                return Err(Error::NoTemplateToRender);
            }
            if !renew {
                if let Some(compiled) = &t.compiled {
                    return Ok(compiled.clone());
                }
            }
        }

        if self.settings.cache_enabled && !renew {
            if let Some(skeleton) = self.cache_try_load(id)? {
                let output = self.compile_document(id, &skeleton, &Context::root(id), false)?.0;
                self.templates[id].compiled = Some(output.clone());
                return Ok(output);
            }
        }

        let content = self.template_content(id)?;
        let want_skeleton =
            self.settings.cache_enabled && self.template(id).file.is_some();
        let (output, skeleton) =
            self.compile_document(id, &content, &Context::root(id), want_skeleton)?;
        self.templates[id].compiled = Some(output.clone());

        // Checked after compiling: an include with caching disabled poisons
        // this flag during compilation. Empty output is never cached.
        if !output.is_empty() && self.settings.cache_enabled && self.template(id).cache {
            if let Some(skeleton) = skeleton {
                self.cache_save(id, &skeleton)?;
            }
        }
        Ok(output)
    }

    /// Raw template source, read through the file store for file templates.
    pub(crate) fn template_content(&self, id: TemplateId) -> Result<String, Error> {
        let t = self.template(id);
        if let Some(path) = &t.file {
            return self
                .files
                .read(path)
                .map_err(|_| Error::TemplateUnreadable(path.clone()));
        }
        if let Some(source) = &t.source {
            return Ok(source.clone());
        }
        Err(Error::NoTemplateToRender)
    }

    pub(crate) fn enter(&mut self) -> Result<(), Error> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::RecursionLimit(MAX_DEPTH));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }

    pub(crate) fn resolve_include_path(&self, id: TemplateId, target: &str) -> PathBuf {
        let mut path = PathBuf::from(target);
        if let Some(dir) = self
            .template(id)
            .file
            .as_ref()
            .and_then(|f| f.parent())
        {
            // join() keeps absolute targets absolute
            path = dir.join(target);
        }
        let named = path
            .file_name()
            .map(|n| n.to_string_lossy().contains('.'))
            .unwrap_or(false);
        if !named {
            path = PathBuf::from(format!(
                "{}{}",
                path.display(),
                crate::template::TEMPLATE_EXTENSION
            ));
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemStore;

    #[test]
    fn load_requires_existing_readable_file() {
        let store = MemStore::new();
        store.insert("/tpl/locked.tpl", "x");
        store.deny_read("/tpl/locked.tpl");
        let mut engine = Engine::with_store(store);

        assert!(matches!(
            engine.load("/tpl/missing.tpl"),
            Err(Error::TemplateNotFound(_))
        ));
        assert!(matches!(
            engine.load("/tpl/locked.tpl"),
            Err(Error::TemplateUnreadable(_))
        ));
    }

    #[test]
    fn render_without_source_fails() {
        let mut engine = Engine::new();
        engine.templates.push(Template::from_source(String::new()));
        engine.templates[0].source = None;
        assert!(matches!(
            engine.render(0, false),
            Err(Error::NoTemplateToRender)
        ));
    }

    #[test]
    fn memoized_output_served_until_renew() {
        let mut engine = Engine::new();
        let id = engine.add_inline("Hi [[name]]!");
        engine.set_var(id, "name", "Ana");
        assert_eq!(engine.render(id, false).unwrap(), "Hi Ana!");

        engine.set_var(id, "name", "Bo");
        assert_eq!(engine.render(id, false).unwrap(), "Hi Ana!");
        assert_eq!(engine.render(id, true).unwrap(), "Hi Bo!");
    }

    #[test]
    fn cache_disable_poisons_ancestors() {
        let mut engine = Engine::new();
        let a = engine.add_inline("");
        let b = engine.add_inline("");
        let c = engine.add_inline("");
        engine.templates[b].parent = Some(a);
        engine.templates[c].parent = Some(b);

        engine.set_cache(c, false);
        assert!(!engine.template(a).cache_enabled());
        assert!(!engine.template(b).cache_enabled());
        assert!(!engine.template(c).cache_enabled());

        // re-enabling is local
        engine.set_cache(c, true);
        assert!(engine.template(c).cache_enabled());
        assert!(!engine.template(a).cache_enabled());
    }

    #[test]
    fn nested_template_value_is_reparented() {
        let mut engine = Engine::new();
        let outer = engine.add_inline("[[body]]");
        let inner = engine.add_inline("content");
        engine.set_var(outer, "body", Value::template(inner));
        assert_eq!(engine.template(inner).parent(), Some(outer));
    }

    #[test]
    fn callables_found_through_parent_chain() {
        let mut engine = Engine::new();
        let parent = engine.add_inline("");
        let child = engine.add_inline("");
        engine.templates[child].parent = Some(parent);
        engine.set_callable(parent, "upper", |inner, _| inner.to_uppercase());

        assert!(engine.find_callable(child, "upper").is_some());
        assert!(engine.find_callable(child, "missing").is_none());
    }

    #[test]
    fn include_path_resolution() {
        let mut engine = Engine::new();
        let id = engine.add_inline("");
        engine.templates[id].file = Some(PathBuf::from("/site/pages/home.tpl"));

        assert_eq!(
            engine.resolve_include_path(id, "header"),
            PathBuf::from("/site/pages/header.tpl")
        );
        assert_eq!(
            engine.resolve_include_path(id, "footer.html"),
            PathBuf::from("/site/pages/footer.html")
        );
        assert_eq!(
            engine.resolve_include_path(id, "/abs/nav"),
            PathBuf::from("/abs/nav.tpl")
        );
    }
}
