//! Time-based file caching.
//!
//! A file template's render is cached as a "skeleton": the original document
//! with most tags expanded, but cache-sensitive tags (`include`) left in
//! literal form so every cache read re-resolves them. The cache file sits
//! next to the source template (`~stem.html` by default) unless an ancestor
//! redirects it; freshness is modification time plus TTL, nothing else.
//!
//! The `cache` directive caches a fragment of a document under its own file
//! and replaces itself in the skeleton with a synthesized `include` pointing
//! at that file, so the fragment ages independently of the page.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::context::Context;
use crate::engine::{Engine, TemplateId};
use crate::error::Error;
use crate::resolve::normalize_text;
use crate::scan::Tag;

/// Deterministic name for an unnamed cache fragment.
fn fragment_hash(content: &str) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

impl Engine {
    /// Effective cache directory: the nearest explicitly-set directory
    /// walking up the parent chain, else the template file's own directory.
    /// Memoized per template once resolved.
    pub(crate) fn cache_dir_for(&mut self, id: TemplateId) -> Option<PathBuf> {
        if let Some(dir) = &self.template(id).resolved_cache_dir {
            return Some(dir.clone());
        }
        let mut explicit = None;
        let mut cursor = Some(id);
        while let Some(t) = cursor {
            if let Some(dir) = &self.template(t).cache_dir {
                explicit = Some(dir.clone());
                break;
            }
            cursor = self.template(t).parent;
        }
        let dir = explicit.or_else(|| {
            self.template(id)
                .file
                .as_ref()
                .and_then(|f| f.parent())
                .map(PathBuf::from)
        });
        if let Some(dir) = &dir {
            self.templates[id].resolved_cache_dir = Some(dir.clone());
        }
        dir
    }

    /// Cache file path for a whole template: `<prepend><stem><append>` in
    /// the effective cache directory. `None` for in-memory templates.
    pub(crate) fn cache_path(&mut self, id: TemplateId) -> Option<PathBuf> {
        let stem = self
            .template(id)
            .file
            .as_ref()?
            .file_stem()?
            .to_string_lossy()
            .to_string();
        let dir = self.cache_dir_for(id)?;
        Some(dir.join(format!(
            "{}{}{}",
            self.settings.cache_prepend, stem, self.settings.cache_append
        )))
    }

    /// Whether a path names a cache artifact this engine produced: file
    /// name carries the configured prepend and append. Artifact includes
    /// are served verbatim instead of being compiled as templates, so a
    /// skeleton read never stacks a cache file on top of another one.
    pub(crate) fn is_cache_artifact(&self, path: &std::path::Path) -> bool {
        let prepend = &self.settings.cache_prepend;
        let append = &self.settings.cache_append;
        if prepend.is_empty() && append.is_empty() {
            return false;
        }
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|name| {
                name.len() > prepend.len() + append.len()
                    && name.starts_with(prepend.as_str())
                    && name.ends_with(append.as_str())
            })
            .unwrap_or(false)
    }

    /// Loads a fresh cache skeleton, if one exists.
    ///
    /// A missing file is a silent miss. An expired file is deleted and
    /// treated as a miss. A present-but-unreadable file is an error.
    pub(crate) fn cache_try_load(&mut self, id: TemplateId) -> Result<Option<String>, Error> {
        if !self.template(id).cache {
            return Ok(None);
        }
        let Some(path) = self.cache_path(id) else {
            return Ok(None);
        };
        if !self.files.exists(&path) {
            return Ok(None);
        }
        if !self.files.is_readable(&path) {
            return Err(Error::CacheFileUnreadable(path));
        }
        let mtime = self.files.mtime(&path)?;
        let ttl = Duration::from_secs(self.template(id).cache_life);
        if mtime + ttl < SystemTime::now() {
            debug!(path = %path.display(), "cache expired");
            self.files.remove(&path)?;
            return Ok(None);
        }
        debug!(path = %path.display(), "cache hit");
        let skeleton = self
            .files
            .read(&path)
            .map_err(|_| Error::CacheFileUnreadable(path))?;
        Ok(Some(skeleton))
    }

    /// Writes a template's cache skeleton. Skipped when the effective cache
    /// flag is off, the template is in-memory, or the skeleton is empty; a
    /// non-writable target directory is fatal.
    pub(crate) fn cache_save(&mut self, id: TemplateId, skeleton: &str) -> Result<bool, Error> {
        if !self.template(id).cache || skeleton.is_empty() {
            return Ok(false);
        }
        let Some(path) = self.cache_path(id) else {
            return Ok(false);
        };
        let dir = path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        if !self.files.is_writable(&dir) {
            return Err(Error::CacheDirectoryNotWritable(dir));
        }
        self.files.write(&path, skeleton)?;
        debug!(path = %path.display(), "cache written");
        Ok(true)
    }

    /// The `cache` directive: renders its inner content now, persists it
    /// under its own cache file, and leaves a synthesized `include` in the
    /// skeleton so cached pages re-read the fragment until its TTL lapses.
    pub(crate) fn resolve_cache_fragment(
        &mut self,
        tpl: TemplateId,
        tag: &mut Tag,
        ctx: &Context,
    ) -> Result<(), Error> {
        let rendered = match tag.inner.as_deref().filter(|s| !s.is_empty()) {
            Some(body) => normalize_text(&self.compile_document(tpl, body, ctx, false)?.0),
            None => String::new(),
        };
        tag.render = rendered;
        tag.cache = tag.render.clone();

        if tag.render.is_empty() || !self.settings.cache_enabled || !self.template(tpl).cache {
            return Ok(());
        }
        let Some(dir) = self.cache_dir_for(tpl) else {
            return Ok(());
        };

        let name = tag
            .args
            .first()
            .filter(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| fragment_hash(tag.inner.as_deref().unwrap_or("")));
        let ttl = tag
            .args
            .get(1)
            .and_then(|a| a.parse::<u64>().ok())
            .unwrap_or(self.template(tpl).cache_life);
        let path = dir.join(format!(
            "{}{}{}",
            self.settings.cache_prepend, name, self.settings.cache_append
        ));
        if !self.files.is_writable(&dir) {
            return Err(Error::CacheDirectoryNotWritable(dir));
        }
        self.files.write(&path, &tag.render)?;
        debug!(path = %path.display(), "fragment cached");

        let (open, close, arg_sep) = {
            let t = self.template(tpl);
            (t.open.clone(), t.close.clone(), t.arg_sep.clone())
        };
        tag.cache = format!(
            "{open}include{arg_sep}{}{arg_sep}{ttl}{close}",
            path.display()
        );
        Ok(())
    }
}
