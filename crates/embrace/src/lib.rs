//! A recursive, tag-based template compiler with time-based file caching.
//!
//! Documents are plain text with delimiter-bounded tags (`[[name]]` by
//! default). A tag substitutes a bound value, iterates a container, tests a
//! condition, calls a registered function, includes another template file,
//! or caches a fragment. Rendered file templates persist a "cache skeleton"
//! next to their source: a document with everything expanded except
//! cache-sensitive tags, re-resolved on every cache read until the TTL
//! lapses.
//!
//! # Quick start
//!
//! ```rust
//! use embrace::Engine;
//!
//! let mut engine = Engine::new();
//! let page = engine.add_inline("Hi [[name]]!");
//! engine.set_var(page, "name", "Ana");
//! assert_eq!(engine.render(page, false).unwrap(), "Hi Ana!");
//! ```
//!
//! Containers iterate their inner content with implicit loop bindings:
//!
//! ```rust
//! use embrace::Engine;
//! use serde_json::json;
//!
//! let mut engine = Engine::new();
//! let list = engine.add_inline("[[items]]- [[value]][[/items]]");
//! engine.set_var(list, "items", json!(["x", "y"]));
//! assert_eq!(engine.render(list, false).unwrap(), "- x- y");
//! ```
//!
//! # Tag forms
//!
//! | Form | Meaning |
//! |------|---------|
//! | `[[name]]` / `[[$name]]` | variable substitution, dotted attribute paths allowed |
//! | `[[items]]...[[/items]]` | container iteration (`index`, `name`, `value`, `last` bound per entry) |
//! | `[[n > 5]]big[[/n]]` | inline comparison, symbolic or word operators |
//! | `[[!user]]...[[/user]]` / `[[!!user]]...` | emptiness / non-emptiness conditional |
//! | `[[#fn]]...[[/fn]]` | registered callable invocation |
//! | `[[include:path]]` | sub-template inclusion |
//! | `[[cache:name:ttl]]...[[/cache]]` | independently cached fragment |
//! | `[[script]]...[[/script]]` | injected [`ScriptRunner`] execution |
//! | `[[literal]]...[[/literal]]` | verbatim pass-through, no tag scanning |
//!
//! Extra arguments on non-directive tags name callables the rendered text
//! is piped through, in order: `[[title:upper:trim]]`.

mod cache;
mod compile;
mod context;
mod engine;
mod error;
mod fs;
mod resolve;
mod scan;
mod script;
mod settings;
mod template;
mod value;

pub use context::{Binding, Callable, Context};
pub use engine::{Engine, TemplateId};
pub use error::Error;
pub use fs::{FileStore, MemStore, OsFileStore};
pub use scan::{CompareOp, Comparison, Tag, TagScanner};
pub use script::{NoScriptRunner, ScriptRunner};
pub use settings::Settings;
pub use template::Template;
pub use value::Value;
