//! Resolution context.
//!
//! A tag resolves against a [`Context`]: the owning template's variable and
//! callable pools, optionally overlaid with loop frames. Each container
//! iteration pushes an ephemeral frame exposing exactly four implicit
//! bindings (`index`, `name`, `value`, `last`); every other name falls
//! through to the template pools. Frames live for one iteration's sub-render
//! and are discarded with the cloned context.

use std::rc::Rc;

use serde_json::Value as Json;

use crate::engine::{Engine, TemplateId};
use crate::value::Value;

/// An invocable bound in a template's callable pool.
///
/// Called as `(inner_content, raw_tag_name)` for `#` tags; post-filters
/// receive `(current_text, raw_tag_name)`.
pub type Callable = Rc<dyn Fn(&str, &str) -> String>;

/// Tagged result of a name lookup. A name is bound to a value or a callable,
/// never both.
pub enum Binding {
    Value(Value),
    Callable(Callable),
    NotFound,
}

/// One loop iteration's implicit bindings.
#[derive(Debug, Clone)]
pub(crate) struct LoopFrame {
    pub(crate) index: u64,
    pub(crate) name: Json,
    pub(crate) value: Json,
    pub(crate) last: bool,
}

/// The chain a tag resolves against: a template plus zero or more loop
/// frames. Cheap to clone; cloning is how loop children are made.
#[derive(Debug, Clone)]
pub struct Context {
    pub(crate) template: TemplateId,
    frames: Vec<LoopFrame>,
}

impl Context {
    /// Context of a template outside any loop.
    pub fn root(template: TemplateId) -> Self {
        Self {
            template,
            frames: Vec::new(),
        }
    }

    /// Child context for one loop iteration. Shadows only the four implicit
    /// names; innermost frame wins for nested loops.
    pub(crate) fn with_frame(&self, frame: LoopFrame) -> Self {
        let mut child = self.clone();
        child.frames.push(frame);
        child
    }

    /// Looks a name up: loop frames innermost-first for the implicit
    /// bindings, then the template's pools.
    pub fn lookup(&self, engine: &Engine, name: &str) -> Binding {
        for frame in self.frames.iter().rev() {
            let bound = match name {
                "index" => Some(Json::from(frame.index)),
                "name" => Some(frame.name.clone()),
                "value" => Some(frame.value.clone()),
                "last" => Some(Json::from(if frame.last { 1u64 } else { 0u64 })),
                _ => None,
            };
            if let Some(json) = bound {
                return Binding::Value(Value::Data(json));
            }
        }
        engine.template(self.template).binding(name)
    }
}
