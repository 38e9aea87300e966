//! Document compilation.
//!
//! The compiler drives the scanner over a document, resolves each tag, and
//! splices the replacement text into two output buffers built from the same
//! original: the rendered document and the cache skeleton. Both buffers use
//! the scanner's original-document offsets, corrected by an independent
//! running delta per buffer, because the two replacement channels diverge in
//! length per tag (an `include` expands fully in the render buffer but keeps
//! its literal form in the skeleton).
//!
//! Non-empty replacement text is recursively compiled, so a tag's resolved
//! output may itself contain tags (an included file, a conditional body).
//! The `literal` directive opts out by carrying its content in a separate
//! slot that is substituted only after the recursion check.

use crate::context::Context;
use crate::engine::{Engine, TemplateId};
use crate::error::Error;
use crate::scan::TagScanner;
use crate::settings::UNDEFINED_FUNCTION_PLACEHOLDER;

/// Dual-buffer splice-and-shift over one original document.
///
/// Spans must be spliced in original scan order; each splice shifts the
/// buffer's running delta by the length difference it introduced.
pub(crate) struct Splicer {
    render: String,
    render_delta: isize,
    skeleton: Option<String>,
    cache_delta: isize,
}

impl Splicer {
    pub(crate) fn new(original: &str, want_skeleton: bool) -> Self {
        Self {
            render: original.to_string(),
            render_delta: 0,
            skeleton: want_skeleton.then(|| original.to_string()),
            cache_delta: 0,
        }
    }

    /// Replaces `length` bytes at original-document `offset` with `render`
    /// in the render buffer and `cache` in the skeleton buffer.
    pub(crate) fn splice(&mut self, offset: usize, length: usize, render: &str, cache: &str) {
        let start = (offset as isize + self.render_delta) as usize;
        self.render.replace_range(start..start + length, render);
        self.render_delta += render.len() as isize - length as isize;

        if let Some(skeleton) = &mut self.skeleton {
            let start = (offset as isize + self.cache_delta) as usize;
            skeleton.replace_range(start..start + length, cache);
            self.cache_delta += cache.len() as isize - length as isize;
        }
    }

    pub(crate) fn finish(self) -> (String, Option<String>) {
        (self.render, self.skeleton)
    }
}

impl Engine {
    /// Compiles one document against a context, producing the rendered text
    /// and, when requested, the cache skeleton.
    pub(crate) fn compile_document(
        &mut self,
        tpl: TemplateId,
        doc: &str,
        ctx: &Context,
        want_skeleton: bool,
    ) -> Result<(String, Option<String>), Error> {
        self.enter()?;
        let result = self.compile_inner(tpl, doc, ctx, want_skeleton);
        self.leave();
        result
    }

    fn compile_inner(
        &mut self,
        tpl: TemplateId,
        doc: &str,
        ctx: &Context,
        want_skeleton: bool,
    ) -> Result<(String, Option<String>), Error> {
        let (open, close, arg_sep) = {
            let t = self.template(tpl);
            (t.open.clone(), t.close.clone(), t.arg_sep.clone())
        };
        let mut scanner = TagScanner::new(doc, &open, &close, &arg_sep);
        let mut splicer = Splicer::new(doc, want_skeleton);

        while let Some(mut tag) = scanner.next_tag()? {
            self.resolve_tag(tpl, &mut tag, ctx)?;
            let mut replace = std::mem::take(&mut tag.render);

            // Post-filter pipeline: arguments of non-directive tags name
            // callables the render text is piped through, in order.
            if !tag.is_directive() {
                for arg in &tag.args {
                    if arg == "no-loop" {
                        continue;
                    }
                    if let Some(filter) = self.find_callable(ctx.template, arg) {
                        replace = filter(&replace, &tag.name);
                    } else if self.settings.debug {
                        replace = UNDEFINED_FUNCTION_PLACEHOLDER.to_string();
                    }
                }
            }

            if !replace.is_empty() {
                replace = self.compile_document(tpl, &replace, ctx, false)?.0;
            } else if let Some(literal) = &tag.literal {
                replace = literal.clone();
            }

            splicer.splice(tag.offset, tag.length, &replace, &tag.cache);
        }
        Ok(splicer.finish())
    }
}
