//! Tag resolution.
//!
//! Given one scanned [`Tag`](crate::Tag) and a [`Context`], resolution
//! decides what the tag means and fills its `render` and `cache` channels.
//! Dispatch order: parent delegation, reserved directive names, then sigil
//! dispatch on the first character of the name (`#` call, `!` conditional,
//! anything else a variable).
//!
//! Resolution returns through an output normalizer: deferred nested
//! templates are rendered lazily, leading newlines and trailing whitespace
//! are trimmed.

use serde_json::Value as Json;

use crate::context::{Binding, Context, LoopFrame};
use crate::engine::{Engine, TemplateId};
use crate::error::Error;
use crate::scan::{CompareOp, Comparison, Tag};
use crate::settings::NOT_FOUND_PLACEHOLDER;
use crate::value::{is_json_empty, numeric, Value};

/// Intermediate resolution result, before normalization.
pub(crate) enum Resolved {
    /// Plain data, formatted by the normalizer.
    Json(Json),
    /// Already-rendered text.
    Text(String),
    /// A nested template, rendered lazily by the normalizer.
    Template(TemplateId),
}

impl Resolved {
    fn empty() -> Self {
        Resolved::Text(String::new())
    }

    fn is_empty(&self) -> bool {
        match self {
            Resolved::Json(json) => is_json_empty(json),
            Resolved::Text(text) => text.is_empty(),
            Resolved::Template(_) => false,
        }
    }
}

/// A comparison operand after scalar coercion.
enum Operand {
    Num(f64),
    Text(String),
}

impl Operand {
    fn coerce(text: &str) -> Self {
        match numeric(text) {
            Some(n) => Operand::Num(n),
            None => Operand::Text(text.to_string()),
        }
    }
}

fn compare(op: CompareOp, lhs: &Operand, rhs: &Operand) -> bool {
    match (lhs, rhs) {
        (Operand::Num(a), Operand::Num(b)) => match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Gt => a > b,
            CompareOp::Lt => a < b,
            CompareOp::Ge => a >= b,
            CompareOp::Le => a <= b,
        },
        (Operand::Text(a), Operand::Text(b)) => match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Gt => a > b,
            CompareOp::Lt => a < b,
            CompareOp::Ge => a >= b,
            CompareOp::Le => a <= b,
        },
        // Mixed number/text: only inequality can hold.
        _ => matches!(op, CompareOp::Ne),
    }
}

/// Leading newlines and trailing whitespace never survive resolution.
pub(crate) fn normalize_text(text: &str) -> String {
    text.trim_start_matches(['\n', '\r']).trim_end().to_string()
}

impl Engine {
    /// Resolves a tag in place, filling its `render` and `cache` channels.
    pub(crate) fn resolve_tag(
        &mut self,
        tpl: TemplateId,
        tag: &mut Tag,
        ctx: &Context,
    ) -> Result<(), Error> {
        match tag.name_lower().as_str() {
            "literal" => {
                // Verbatim on both channels; the compiler substitutes the
                // literal slot after skipping recursion.
                let inner = tag.inner.clone().unwrap_or_default();
                tag.render = String::new();
                tag.cache = inner.clone();
                tag.literal = Some(inner);
            }
            "cache" => self.resolve_cache_fragment(tpl, tag, ctx)?,
            _ => {
                tag.render = self.analyse(tpl, tag, ctx)?;
                // An include stays unexpanded in the skeleton so the cached
                // page re-includes on every read.
                tag.cache = if tag.name_lower() == "include" {
                    tag.raw.clone()
                } else {
                    tag.render.clone()
                };
            }
        }
        Ok(())
    }

    /// Core dispatch: parent delegation, reserved names, sigils. Returns the
    /// normalized replacement text.
    pub(crate) fn analyse(
        &mut self,
        tpl: TemplateId,
        tag: &Tag,
        ctx: &Context,
    ) -> Result<String, Error> {
        self.enter()?;
        let result = self.analyse_inner(tpl, tag, ctx);
        self.leave();
        result
    }

    fn analyse_inner(
        &mut self,
        tpl: TemplateId,
        tag: &Tag,
        ctx: &Context,
    ) -> Result<String, Error> {
        // Parent context shadows child: a non-empty result from an enclosing
        // template wins outright.
        if let Some(parent) = self.template(tpl).parent {
            let inherited = self.analyse(parent, tag, &Context::root(parent))?;
            if !inherited.is_empty() {
                return Ok(inherited);
            }
        }

        let resolved = match tag.name_lower().as_str() {
            "include" => Resolved::Text(self.resolve_include(tpl, tag)?),
            "script" => match tag.inner.as_deref().filter(|s| !s.is_empty()) {
                Some(source) => Resolved::Text(self.scripts.run(source)?),
                None => Resolved::empty(),
            },
            _ => match tag.sigil() {
                Some('#') => self.resolve_call(tag, ctx),
                Some('!') => self.resolve_conditional(tpl, tag, ctx)?,
                Some(_) => self.resolve_variable(tpl, tag, ctx)?,
                None => Resolved::empty(),
            },
        };
        self.normalize(resolved)
    }

    /// Final step of every resolution: render deferred templates, format
    /// data, trim.
    fn normalize(&mut self, resolved: Resolved) -> Result<String, Error> {
        let text = match resolved {
            Resolved::Template(id) => self.render(id, false)?,
            Resolved::Json(json) => crate::value::format_json(&json),
            Resolved::Text(text) => text,
        };
        Ok(normalize_text(&text))
    }

    fn placeholder_or_empty(&self) -> Resolved {
        if self.settings.debug {
            Resolved::Text(NOT_FOUND_PLACEHOLDER.to_string())
        } else {
            Resolved::empty()
        }
    }

    /// Variable tags: optional `$` sigil, attribute-path hops, projection,
    /// optional comparison clause.
    fn resolve_variable(
        &mut self,
        tpl: TemplateId,
        tag: &Tag,
        ctx: &Context,
    ) -> Result<Resolved, Error> {
        let name = tag.name.strip_prefix('$').unwrap_or(&tag.name);
        let attr_sep = self.template(tpl).attr_sep.clone();
        let mut parts = name.split(attr_sep.as_str());
        let head = parts.next().unwrap_or_default().to_string();
        let hops: Vec<String> = parts.map(str::to_string).collect();

        let mut value = match ctx.lookup(self, &head) {
            Binding::Value(v) => v,
            // Callable names need the `#` sigil; bare they are unbound.
            Binding::Callable(_) | Binding::NotFound => return Ok(self.placeholder_or_empty()),
        };

        // Attribute hops: an empty value before the final hop is a failed
        // lookup; only the final hop's value surfaces.
        let total = hops.len();
        for (i, hop) in hops.iter().enumerate() {
            value = self.attr_hop(&value, hop);
            if value.is_empty() && i + 1 < total {
                return Ok(self.placeholder_or_empty());
            }
        }

        if let Some(cmp) = &tag.compare {
            return self.apply_comparison(value, cmp, tag);
        }
        self.project(tpl, value, tag, ctx)
    }

    /// One attribute-path hop into a container, nested template, or (dead
    /// end) scalar.
    fn attr_hop(&self, value: &Value, key: &str) -> Value {
        match value {
            Value::Data(Json::Object(map)) => {
                Value::Data(map.get(key).cloned().unwrap_or(Json::Null))
            }
            Value::Data(Json::Array(items)) => Value::Data(
                key.parse::<usize>()
                    .ok()
                    .and_then(|i| items.get(i))
                    .cloned()
                    .unwrap_or(Json::Null),
            ),
            Value::Template(id) => self
                .template(*id)
                .values
                .get(key)
                .cloned()
                .unwrap_or(Value::Data(Json::Null)),
            Value::Data(_) => Value::Data(Json::Null),
        }
    }

    /// Projects a resolved value through the tag's shape: loop containers
    /// with inner content, defer nested templates, surface scalars.
    ///
    /// A bound falsy scalar (`0`, `false`, `""`) still surfaces its formatted
    /// form; the emptiness rule applies to absent bindings (null), empty
    /// containers, and the conditional/iteration paths, never to a scalar
    /// that is actually bound.
    fn project(
        &mut self,
        tpl: TemplateId,
        value: Value,
        tag: &Tag,
        ctx: &Context,
    ) -> Result<Resolved, Error> {
        let inner = tag.inner.as_deref().filter(|s| !s.is_empty());

        match value {
            Value::Data(json @ (Json::Array(_) | Json::Object(_))) => {
                if is_json_empty(&json) {
                    return Ok(self.placeholder_or_empty());
                }
                let Some(inner) = inner else {
                    // A bare container has no textual form.
                    return Ok(Resolved::empty());
                };
                if tag.args.iter().any(|a| a == "no-loop") {
                    // Truth test only: the compiler re-compiles this text
                    // against the unchanged context.
                    return Ok(Resolved::Text(inner.to_string()));
                }
                let entries = Value::Data(json).entries();
                let total = entries.len();
                let mut output = String::new();
                for (i, (name, value)) in entries.into_iter().enumerate() {
                    let child = ctx.with_frame(LoopFrame {
                        index: i as u64,
                        name,
                        value,
                        last: i + 1 == total,
                    });
                    output.push_str(&self.compile_document(tpl, inner, &child, false)?.0);
                }
                Ok(Resolved::Text(output))
            }
            Value::Template(child) => {
                self.templates[child].parent = Some(tpl);
                match inner {
                    // Inner content renders against the nested template's
                    // own bindings.
                    Some(inner) => Ok(Resolved::Text(
                        self.compile_document(child, inner, &Context::root(child), false)?.0,
                    )),
                    None => Ok(Resolved::Template(child)),
                }
            }
            // Null marks an absent binding, not a bound scalar.
            Value::Data(Json::Null) => Ok(self.placeholder_or_empty()),
            // Scalars surface directly; inner content is ignored.
            Value::Data(json) => Ok(Resolved::Json(json)),
        }
    }

    /// Inline comparison clause. Both operands must be scalar;
    /// numeric-looking strings are coerced before comparing.
    fn apply_comparison(
        &mut self,
        value: Value,
        cmp: &Comparison,
        tag: &Tag,
    ) -> Result<Resolved, Error> {
        let lhs = match &value {
            Value::Template(_) => {
                return Err(Error::IncomparableValue("a nested template".to_string()))
            }
            Value::Data(Json::Array(_)) | Value::Data(Json::Object(_)) => {
                return Err(Error::IncomparableValue("a container value".to_string()))
            }
            Value::Data(Json::Number(n)) => Operand::Num(n.as_f64().unwrap_or(0.0)),
            Value::Data(json) => Operand::coerce(&crate::value::format_json(json)),
        };
        let rhs = Operand::coerce(&cmp.rhs);

        if !compare(cmp.op, &lhs, &rhs) {
            return Ok(Resolved::empty());
        }
        match tag.inner.as_deref().filter(|s| !s.is_empty()) {
            // Branch body; nested tags inside it are re-compiled by the
            // caller's splice recursion.
            Some(inner) => Ok(Resolved::Text(inner.to_string())),
            None => match value {
                Value::Data(json) => Ok(Resolved::Json(json)),
                Value::Template(_) => unreachable!("rejected above"),
            },
        }
    }

    /// `#name` call tags: nearest callable up the parent chain, invoked with
    /// the inner content. Unknown callables render empty.
    fn resolve_call(&mut self, tag: &Tag, ctx: &Context) -> Resolved {
        let name = tag.name.trim_start_matches('#');
        match self.find_callable(ctx.template, name) {
            Some(callable) => Resolved::Text(callable(
                tag.inner.as_deref().unwrap_or(""),
                &tag.name,
            )),
            None => Resolved::empty(),
        }
    }

    /// `!name` / `!!name` conditional tags: probe the stripped name and emit
    /// the inner content when the probe is empty (`!`) or non-empty (`!!`).
    fn resolve_conditional(
        &mut self,
        tpl: TemplateId,
        tag: &Tag,
        ctx: &Context,
    ) -> Result<Resolved, Error> {
        let Some(inner) = tag.inner.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(Resolved::empty());
        };

        let mut probe = tag.clone();
        probe.name = probe.name[1..].to_string();
        let inverse = probe.name.starts_with('!');
        if inverse {
            probe.name = probe.name[1..].to_string();
        }
        probe.inner = None;

        // The probe must not leak placeholders into the test.
        let saved_debug = self.settings.debug;
        self.settings.debug = false;
        let probed = self.analyse(tpl, &probe, ctx);
        self.settings.debug = saved_debug;
        let probed = probed?;

        // The truth test uses the emptiness rule: a probe surfacing numeric
        // zero counts as empty even though the splice shows "0".
        let condition = !probed.is_empty() && numeric(&probed) != Some(0.0);
        let emit = condition == inverse;
        if emit {
            Ok(Resolved::Text(inner.to_string()))
        } else {
            Ok(Resolved::empty())
        }
    }

    /// `include` directive: resolve the target relative to the including
    /// template's directory, load it as a child, apply the tag's cache
    /// policy, and render it.
    fn resolve_include(&mut self, tpl: TemplateId, tag: &Tag) -> Result<String, Error> {
        let target = tag
            .args
            .first()
            .filter(|s| !s.is_empty())
            .ok_or(Error::IncludeArgumentMissing)?
            .clone();
        let path = self.resolve_include_path(tpl, &target);
        let canonical = self
            .files
            .canonicalize(&path)
            .map_err(|_| Error::InvalidIncludePath(path.clone()))?;

        // A cache artifact is already rendered output; splice its content
        // as-is. Its staleness is bounded by the including skeleton's TTL.
        if self.is_cache_artifact(&canonical) {
            tracing::debug!(path = %canonical.display(), "artifact include");
            return self
                .files
                .read(&canonical)
                .map_err(|_| Error::TemplateUnreadable(canonical));
        }

        let child = self.load(&canonical)?;
        self.templates[child].parent = Some(tpl);

        if tag.args.iter().any(|a| a == "no-cache") {
            self.set_cache(child, false);
        } else {
            match tag.args.get(1).and_then(|a| a.parse::<u64>().ok()) {
                Some(0) => self.set_cache(child, false),
                Some(ttl) => self.templates[child].cache_life = ttl,
                // TTL inherited from the including template.
                None => self.templates[child].cache_life = self.template(tpl).cache_life,
            }
        }
        tracing::debug!(path = %canonical.display(), "include");
        self.render(child, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemStore;
    use serde_json::json;

    fn engine_with(source: &str) -> (Engine, TemplateId) {
        let mut engine = Engine::with_store(MemStore::new());
        let id = engine.add_inline(source);
        (engine, id)
    }

    mod variables {
        use super::*;

        #[test]
        fn scalar_substitution() {
            let (mut e, id) = engine_with("Hi [[name]]!");
            e.set_var(id, "name", "Ana");
            assert_eq!(e.render(id, false).unwrap(), "Hi Ana!");
        }

        #[test]
        fn explicit_sigil_is_equivalent() {
            let (mut e, id) = engine_with("Hi [[$name]]!");
            e.set_var(id, "name", "Ana");
            assert_eq!(e.render(id, false).unwrap(), "Hi Ana!");
        }

        #[test]
        fn unknown_renders_empty() {
            let (mut e, id) = engine_with("a[[nope]]b");
            assert_eq!(e.render(id, false).unwrap(), "ab");
        }

        #[test]
        fn unknown_renders_placeholder_in_debug() {
            let (mut e, id) = engine_with("a [[nope]] b");
            e.set_debug(true);
            assert_eq!(e.render(id, false).unwrap(), "a (not found) b");
        }

        #[test]
        fn attribute_path_into_mapping() {
            let (mut e, id) = engine_with("[[user.name]]");
            e.set_var(id, "user", json!({"name": "Ana", "age": 30}));
            assert_eq!(e.render(id, false).unwrap(), "Ana");
        }

        #[test]
        fn attribute_path_into_sequence_by_index() {
            let (mut e, id) = engine_with("[[items.1]]");
            e.set_var(id, "items", json!(["a", "b", "c"]));
            assert_eq!(e.render(id, false).unwrap(), "b");
        }

        #[test]
        fn missing_intermediate_hop_fails() {
            let (mut e, id) = engine_with("x[[user.address.city]]y");
            e.set_var(id, "user", json!({"name": "Ana"}));
            assert_eq!(e.render(id, false).unwrap(), "xy");
        }

        #[test]
        fn scalar_with_inner_content_ignores_inner() {
            let (mut e, id) = engine_with("[[name]]ignored[[/name]]");
            e.set_var(id, "name", "Ana");
            assert_eq!(e.render(id, false).unwrap(), "Ana");
        }

        #[test]
        fn bound_falsy_scalars_surface_themselves() {
            let (mut e, id) = engine_with("n=[[n]]");
            e.set_var(id, "n", 0i64);
            assert_eq!(e.render(id, false).unwrap(), "n=0");

            let (mut e, id) = engine_with("f=[[f]]");
            e.set_var(id, "f", false);
            assert_eq!(e.render(id, false).unwrap(), "f=false");

            let (mut e, id) = engine_with("s=[[s]].");
            e.set_var(id, "s", "");
            assert_eq!(e.render(id, false).unwrap(), "s=.");
        }

        #[test]
        fn bound_zero_is_not_a_debug_placeholder() {
            let (mut e, id) = engine_with("n=[[n]]");
            e.set_debug(true);
            e.set_var(id, "n", 0i64);
            assert_eq!(e.render(id, false).unwrap(), "n=0");
        }

        #[test]
        fn null_binding_is_treated_as_absent() {
            let (mut e, id) = engine_with("a[[gap]]b");
            e.set_var(id, "gap", serde_json::Value::Null);
            assert_eq!(e.render(id, false).unwrap(), "ab");
        }
    }

    mod loops {
        use super::*;

        #[test]
        fn sequence_iteration_concatenates() {
            let (mut e, id) = engine_with("[[items]]- [[value]][[/items]]");
            e.set_var(id, "items", json!(["x", "y"]));
            assert_eq!(e.render(id, false).unwrap(), "- x- y");
        }

        #[test]
        fn implicit_bindings_in_loop() {
            let (mut e, id) = engine_with("[[items]][[index]]:[[name]]=[[value]];[[/items]]");
            e.set_var(id, "items", json!({"a": 1, "b": 2}));
            assert_eq!(e.render(id, false).unwrap(), "0:a=1;1:b=2;");
        }

        #[test]
        fn last_marks_final_element() {
            let (mut e, id) = engine_with("[[items]][[value]][[last]];[[/items]]");
            e.set_var(id, "items", json!(["a", "b"]));
            assert_eq!(e.render(id, false).unwrap(), "a0;b1;");
        }

        #[test]
        fn no_loop_renders_once() {
            let (mut e, id) = engine_with("[[items:no-loop]]has items[[/items]]");
            e.set_var(id, "items", json!(["x", "y"]));
            assert_eq!(e.render(id, false).unwrap(), "has items");
        }

        #[test]
        fn empty_container_renders_empty() {
            let (mut e, id) = engine_with("a[[items]]- [[value]][[/items]]b");
            e.set_var(id, "items", json!([]));
            assert_eq!(e.render(id, false).unwrap(), "ab");
        }

        #[test]
        fn nested_loops_shadow_innermost() {
            let (mut e, id) = engine_with(
                "[[rows]][[cols]][[value]][[/cols]];[[/rows]]",
            );
            e.set_var(id, "rows", json!([1, 2]));
            e.set_var(id, "cols", json!(["a", "b"]));
            assert_eq!(e.render(id, false).unwrap(), "ab;ab;");
        }
    }

    mod comparisons {
        use super::*;

        #[test]
        fn numeric_pass_emits_inner() {
            let (mut e, id) = engine_with("[[n > 5]]big[[/n]]");
            e.set_var(id, "n", 7i64);
            assert_eq!(e.render(id, false).unwrap(), "big");
        }

        #[test]
        fn numeric_fail_emits_empty() {
            let (mut e, id) = engine_with("x[[n > 5]]big[[/n]]y");
            e.set_var(id, "n", 3i64);
            assert_eq!(e.render(id, false).unwrap(), "xy");
        }

        #[test]
        fn self_closing_pass_emits_value() {
            let (mut e, id) = engine_with("[[n ge 5]]");
            e.set_var(id, "n", 5i64);
            assert_eq!(e.render(id, false).unwrap(), "5");
        }

        #[test]
        fn string_equality() {
            let (mut e, id) = engine_with("[[role === admin]]yes[[/role]]");
            e.set_var(id, "role", "admin");
            assert_eq!(e.render(id, false).unwrap(), "yes");
        }

        #[test]
        fn numeric_string_coerced() {
            let (mut e, id) = engine_with("[[n > 5]]big[[/n]]");
            e.set_var(id, "n", "10");
            // string "10" compares numerically, not lexically
            assert_eq!(e.render(id, false).unwrap(), "big");
        }

        #[test]
        fn template_operand_is_fatal() {
            let (mut e, id) = engine_with("[[sub === x]]");
            let sub = e.add_inline("s");
            e.set_var(id, "sub", Value::template(sub));
            assert!(matches!(
                e.render(id, false),
                Err(Error::IncomparableValue(_))
            ));
        }

        #[test]
        fn unbound_comparison_is_not_evaluated() {
            let (mut e, id) = engine_with("x[[ghost > 5]]big[[/ghost]]y");
            assert_eq!(e.render(id, false).unwrap(), "xy");
        }
    }

    mod conditionals {
        use super::*;

        #[test]
        fn bang_emits_when_absent() {
            let (mut e, id) = engine_with("[[!user]]anonymous[[/user]]");
            assert_eq!(e.render(id, false).unwrap(), "anonymous");

            let (mut e, id) = engine_with("[[!user]]anonymous[[/user]]");
            e.set_var(id, "user", "Ana");
            assert_eq!(e.render(id, false).unwrap(), "");
        }

        #[test]
        fn double_bang_emits_when_present() {
            let (mut e, id) = engine_with("[[!!user]]logged in[[/user]]");
            e.set_var(id, "user", "Ana");
            assert_eq!(e.render(id, false).unwrap(), "logged in");

            let (mut e, id) = engine_with("[[!!user]]logged in[[/user]]");
            assert_eq!(e.render(id, false).unwrap(), "");
        }

        #[test]
        fn conditional_body_recompiles() {
            let (mut e, id) = engine_with("[[!!user]]Hi [[user]][[/user]]");
            e.set_var(id, "user", "Ana");
            assert_eq!(e.render(id, false).unwrap(), "Hi Ana");
        }

        #[test]
        fn zero_probe_counts_as_empty() {
            // the splice channel shows a bound 0, but the truth test
            // follows the emptiness rule
            let (mut e, id) = engine_with("[[!n]]none[[/n]]");
            e.set_var(id, "n", 0i64);
            assert_eq!(e.render(id, false).unwrap(), "none");

            let (mut e, id) = engine_with("[[!!n]]some[[/n]]");
            e.set_var(id, "n", 0i64);
            assert_eq!(e.render(id, false).unwrap(), "");
        }

        #[test]
        fn probe_ignores_debug_placeholders() {
            let (mut e, id) = engine_with("[[!ghost]]fallback[[/ghost]]");
            e.set_debug(true);
            assert_eq!(e.render(id, false).unwrap(), "fallback");
        }
    }

    mod calls {
        use super::*;

        #[test]
        fn callable_receives_inner_and_name() {
            let (mut e, id) = engine_with("[[#shout]]hey[[/shout]]");
            e.set_callable(id, "shout", |inner, _| inner.to_uppercase());
            assert_eq!(e.render(id, false).unwrap(), "HEY");
        }

        #[test]
        fn unknown_call_renders_empty() {
            let (mut e, id) = engine_with("a[[#nope]]x[[/nope]]b");
            assert_eq!(e.render(id, false).unwrap(), "ab");
        }
    }

    mod nested_templates {
        use super::*;

        #[test]
        fn deferred_render() {
            let (mut e, outer) = engine_with("<[[body]]>");
            let inner = e.add_inline("Hi [[name]]");
            e.set_var(inner, "name", "Ana");
            e.set_var(outer, "body", Value::template(inner));
            assert_eq!(e.render(outer, false).unwrap(), "<Hi Ana>");
        }

        #[test]
        fn inner_content_renders_against_nested_bindings() {
            let (mut e, outer) = engine_with("[[user]][[name]][[/user]]");
            let user = e.add_inline("");
            e.set_var(user, "name", "Ana");
            e.set_var(outer, "user", Value::template(user));
            assert_eq!(e.render(outer, false).unwrap(), "Ana");
        }

        #[test]
        fn parent_bindings_shadow_child() {
            let (mut e, outer) = engine_with("<[[body]]>");
            let inner = e.add_inline("Hi [[name]]");
            e.set_var(inner, "name", "child");
            e.set_var(outer, "body", Value::template(inner));
            e.set_var(outer, "name", "parent");
            assert_eq!(e.render(outer, false).unwrap(), "<Hi parent>");
        }

        #[test]
        fn attribute_hop_into_nested_template() {
            let (mut e, outer) = engine_with("[[user.name]]");
            let user = e.add_inline("");
            e.set_var(user, "name", "Ana");
            e.set_var(outer, "user", Value::template(user));
            assert_eq!(e.render(outer, false).unwrap(), "Ana");
        }
    }

    mod directives {
        use super::*;

        #[test]
        fn literal_passes_through_verbatim() {
            let (mut e, id) = engine_with("a[[literal]][[name]][[/literal]]b");
            e.set_var(id, "name", "Ana");
            assert_eq!(e.render(id, false).unwrap(), "a[[name]]b");
        }

        #[test]
        fn script_runs_through_runner() {
            let (mut e, id) = engine_with("[[script]]1+1[[/script]]");
            e.set_script_runner(|source: &str| Ok(format!("ran:{}", source)));
            assert_eq!(e.render(id, false).unwrap(), "ran:1+1");
        }

        #[test]
        fn empty_script_is_empty() {
            let (mut e, id) = engine_with("a[[script]][[/script]]b");
            // no runner installed; an empty body must not reach it
            assert_eq!(e.render(id, false).unwrap(), "ab");
        }

        #[test]
        fn script_failure_propagates() {
            let (mut e, id) = engine_with("[[script]]boom[[/script]]");
            assert!(matches!(e.render(id, false), Err(Error::Script(_))));
        }

        #[test]
        fn include_without_target_is_fatal() {
            let store = MemStore::new();
            store.insert("/site/page.tpl", "[[include]]");
            let mut e = Engine::with_store(store);
            let id = e.load("/site/page.tpl").unwrap();
            assert!(matches!(
                e.render(id, false),
                Err(Error::IncludeArgumentMissing)
            ));
        }

        #[test]
        fn include_missing_target_is_fatal() {
            let store = MemStore::new();
            store.insert("/site/page.tpl", "[[include:ghost]]");
            let mut e = Engine::with_store(store);
            let id = e.load("/site/page.tpl").unwrap();
            assert!(matches!(
                e.render(id, false),
                Err(Error::InvalidIncludePath(_))
            ));
        }

        #[test]
        fn include_renders_child_with_delegation() {
            let store = MemStore::new();
            store.insert("/site/page.tpl", "<[[include:header]]>");
            store.insert("/site/header.tpl", "Hello [[name]]");
            let mut e = Engine::with_store(store);
            e.set_cache_enabled(false);
            let id = e.load("/site/page.tpl").unwrap();
            e.set_var(id, "name", "Ana");
            assert_eq!(e.render(id, false).unwrap(), "<Hello Ana>");
        }
    }

    mod recursion {
        use super::*;

        #[test]
        fn cyclic_includes_hit_depth_limit() {
            let store = MemStore::new();
            store.insert("/a.tpl", "[[include:/b.tpl]]");
            store.insert("/b.tpl", "[[include:/a.tpl]]");
            let mut e = Engine::with_store(store);
            e.set_cache_enabled(false);
            let id = e.load("/a.tpl").unwrap();
            assert!(matches!(e.render(id, false), Err(Error::RecursionLimit(_))));
        }
    }
}
