//! Tag scanning.
//!
//! [`TagScanner`] walks a document left to right, locating delimiter-bounded
//! tags and producing one [`Tag`] record per match. Everything between
//! matches is a literal span and is left untouched; the compiler only ever
//! splices over the recorded tag spans.
//!
//! A tag head is the text strictly between the open and close delimiters.
//! The head splits on the argument separator into the tag name and its
//! arguments, and the name may carry one comparison infix (`[[n > 5]]`).
//! After the head, the scanner looks for a matching close tag
//! (`[[/name]]`, sigils stripped); when present, the text between head and
//! close tag becomes the inner content and the recorded span covers the
//! whole construct.
//!
//! An open delimiter with no close delimiter after it terminates the scan:
//! the malformed trailing tag is dropped, not an error.

use crate::error::Error;

/// Sigil characters stripped from a tag name before close-tag matching.
const SIGILS: [char; 3] = ['$', '#', '!'];

/// Binary comparison operators usable inside a tag head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `===` / `eq`
    Eq,
    /// `!==` / `ne`
    Ne,
    /// `>` / `gt`
    Gt,
    /// `<` / `lt`
    Lt,
    /// `>=` / `ge`
    Ge,
    /// `<=` / `le`
    Le,
}

/// Comparison infixes recognized inside a tag head, checked in table order
/// (not leftmost-in-string). The surrounding spaces are part of the match.
pub(crate) const COMPARISON_INFIXES: [(&str, CompareOp); 12] = [
    (" === ", CompareOp::Eq),
    (" eq ", CompareOp::Eq),
    (" !== ", CompareOp::Ne),
    (" ne ", CompareOp::Ne),
    (" > ", CompareOp::Gt),
    (" gt ", CompareOp::Gt),
    (" < ", CompareOp::Lt),
    (" lt ", CompareOp::Lt),
    (" >= ", CompareOp::Ge),
    (" ge ", CompareOp::Ge),
    (" <= ", CompareOp::Le),
    (" le ", CompareOp::Le),
];

/// An inline comparison clause: `name <op> rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub op: CompareOp,
    /// Right-hand operand, trimmed, uninterpreted until resolution.
    pub rhs: String,
}

/// One matched tag, ephemeral per compile.
///
/// `offset`/`length` describe the entire matched span, close tag included,
/// in bytes relative to the original document. `render` and `cache` are
/// filled in by the resolver before splicing.
#[derive(Debug, Clone)]
pub struct Tag {
    /// Byte offset of the span in the original document.
    pub offset: usize,
    /// Byte length of the span.
    pub length: usize,
    /// Tag name, sigil-prefixed, comparison clause split off.
    pub name: String,
    /// Arguments after the name, in head order.
    pub args: Vec<String>,
    /// Content between the head and the matching close tag; `None` for a
    /// self-closing tag.
    pub inner: Option<String>,
    /// Inline comparison clause, if any.
    pub compare: Option<Comparison>,
    /// Full matched span text.
    pub raw: String,
    /// Replacement text for the rendered output.
    pub render: String,
    /// Replacement text for the cache skeleton. Defaults to `render`;
    /// overridden for cache-sensitive directives.
    pub cache: String,
    /// Verbatim content substituted when `render` is empty, used by the
    /// `literal` directive to bypass recursion.
    pub literal: Option<String>,
}

impl Tag {
    /// Tag name normalized for reserved-name dispatch.
    pub fn name_lower(&self) -> String {
        self.name.to_lowercase()
    }

    /// True for reserved directives whose arguments are operands (paths,
    /// names, TTLs) rather than post-filter names.
    pub fn is_directive(&self) -> bool {
        matches!(
            self.name_lower().as_str(),
            "include" | "cache" | "script" | "literal"
        )
    }

    /// Leading sigil character, if the name is non-empty.
    pub fn sigil(&self) -> Option<char> {
        self.name.chars().next()
    }
}

/// Removes every sigil character from a tag name, as close-tag matching
/// requires.
fn strip_sigils(name: &str) -> String {
    name.chars().filter(|c| !SIGILS.contains(c)).collect()
}

/// Splits a tag head on the first comparison infix found in table order.
///
/// Returns the cleaned name and the clause, or an error when the infix is
/// present but does not split the head into exactly two pieces.
fn split_comparison(name: &str) -> Result<(String, Option<Comparison>), Error> {
    for (infix, op) in COMPARISON_INFIXES {
        if !name.contains(infix) {
            continue;
        }
        let pieces: Vec<&str> = name.split(infix).collect();
        if pieces.len() != 2 {
            return Err(Error::MalformedComparisonTag(name.to_string()));
        }
        return Ok((
            pieces[0].trim().to_string(),
            Some(Comparison {
                op,
                rhs: pieces[1].trim().to_string(),
            }),
        ));
    }
    Ok((name.to_string(), None))
}

/// Linear scanner producing [`Tag`] records in document order.
///
/// Scanning resumes after each matched span, and offsets stay relative to
/// the original document start across restarts.
pub struct TagScanner<'a> {
    doc: &'a str,
    open: &'a str,
    close: &'a str,
    arg_sep: &'a str,
    pos: usize,
}

impl<'a> TagScanner<'a> {
    pub fn new(doc: &'a str, open: &'a str, close: &'a str, arg_sep: &'a str) -> Self {
        Self {
            doc,
            open,
            close,
            arg_sep,
            pos: 0,
        }
    }

    /// Advances to the next tag. `Ok(None)` once no further well-formed tag
    /// exists; a dangling open delimiter ends the scan silently.
    pub fn next_tag(&mut self) -> Result<Option<Tag>, Error> {
        if self.pos >= self.doc.len() {
            return Ok(None);
        }

        let init = match self.doc[self.pos..].find(self.open) {
            Some(rel) => self.pos + rel,
            None => return Ok(None),
        };
        let head_end = match self.doc[init..].find(self.close) {
            Some(rel) => init + rel,
            None => return Ok(None),
        };

        let head = &self.doc[init + self.open.len()..head_end];
        let mut pieces = head.split(self.arg_sep);
        let raw_name = pieces.next().unwrap_or_default();
        let args: Vec<String> = pieces.map(str::to_string).collect();
        let (name, compare) = split_comparison(raw_name)?;

        let mut span_end = head_end + self.close.len();
        let mut inner = None;

        // A close tag only needs the "open + / + name" prefix; the span then
        // extends to the next close delimiter after it.
        let close_pattern = format!("{}/{}", self.open, strip_sigils(&name));
        if let Some(rel) = self.doc[span_end..].find(&close_pattern) {
            let close_init = span_end + rel;
            if let Some(rel_end) = self.doc[close_init..].find(self.close) {
                inner = Some(self.doc[span_end..close_init].trim_end().to_string());
                span_end = close_init + rel_end + self.close.len();
            }
        }

        let raw = self.doc[init..span_end].to_string();
        self.pos = span_end;

        Ok(Some(Tag {
            offset: init,
            length: span_end - init,
            name,
            args,
            inner,
            compare,
            raw,
            render: String::new(),
            cache: String::new(),
            literal: None,
        }))
    }

    /// Collects every remaining tag. Handy for tests; the compiler drives
    /// [`next_tag`](Self::next_tag) directly so it can resolve while
    /// scanning.
    pub fn collect_tags(mut self) -> Result<Vec<Tag>, Error> {
        let mut tags = Vec::new();
        while let Some(tag) = self.next_tag()? {
            tags.push(tag);
        }
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(doc: &str) -> Vec<Tag> {
        TagScanner::new(doc, "[[", "]]", ":").collect_tags().unwrap()
    }

    mod basic {
        use super::*;

        #[test]
        fn no_tags() {
            assert!(scan("plain text, no tags").is_empty());
        }

        #[test]
        fn single_self_closing_tag() {
            let tags = scan("Hi [[name]]!");
            assert_eq!(tags.len(), 1);
            let tag = &tags[0];
            assert_eq!(tag.name, "name");
            assert_eq!(tag.offset, 3);
            assert_eq!(tag.length, "[[name]]".len());
            assert_eq!(tag.raw, "[[name]]");
            assert!(tag.inner.is_none());
            assert!(tag.args.is_empty());
        }

        #[test]
        fn arguments_split_in_order() {
            let tags = scan("[[title:upper:trim]]");
            assert_eq!(tags[0].name, "title");
            assert_eq!(tags[0].args, vec!["upper", "trim"]);
        }

        #[test]
        fn offsets_accumulate_across_matches() {
            let tags = scan("a[[x]]bb[[y]]c");
            assert_eq!(tags.len(), 2);
            assert_eq!(tags[0].offset, 1);
            assert_eq!(tags[1].offset, 8);
        }

        #[test]
        fn custom_delimiters() {
            let tags = TagScanner::new("Hi {{name}}!", "{{", "}}", ":")
                .collect_tags()
                .unwrap();
            assert_eq!(tags[0].name, "name");
            assert_eq!(tags[0].raw, "{{name}}");
        }
    }

    mod close_tags {
        use super::*;

        #[test]
        fn inner_content_captured() {
            let tags = scan("[[items]]- x[[/items]]");
            assert_eq!(tags.len(), 1);
            assert_eq!(tags[0].inner.as_deref(), Some("- x"));
            assert_eq!(tags[0].length, "[[items]]- x[[/items]]".len());
        }

        #[test]
        fn inner_trailing_whitespace_trimmed() {
            let tags = scan("[[block]]text\n\n[[/block]]");
            assert_eq!(tags[0].inner.as_deref(), Some("text"));
        }

        #[test]
        fn nested_tags_stay_in_inner() {
            let tags = scan("[[items]][[value]][[/items]]");
            assert_eq!(tags.len(), 1);
            assert_eq!(tags[0].inner.as_deref(), Some("[[value]]"));
        }

        #[test]
        fn sigils_stripped_for_close_match() {
            let tags = scan("[[!flag]]shown[[/flag]]");
            assert_eq!(tags[0].name, "!flag");
            assert_eq!(tags[0].inner.as_deref(), Some("shown"));

            let tags = scan("[[$user]]x[[/user]]");
            assert_eq!(tags[0].inner.as_deref(), Some("x"));
        }

        #[test]
        fn unmatched_close_name_means_self_closing() {
            let tags = scan("[[a]]text[[/b]]");
            // [[a]] self-closes; [[/b]] is scanned as its own (inert) tag.
            assert_eq!(tags.len(), 2);
            assert!(tags[0].inner.is_none());
            assert_eq!(tags[1].name, "/b");
        }

        #[test]
        fn close_tag_without_close_delimiter_ignored() {
            let tags = scan("[[a]]text[[/a");
            assert_eq!(tags.len(), 1);
            assert!(tags[0].inner.is_none());
        }
    }

    mod comparisons {
        use super::*;

        #[test]
        fn symbolic_and_word_forms() {
            let cases = [
                ("[[n === 5]]", CompareOp::Eq),
                ("[[n eq 5]]", CompareOp::Eq),
                ("[[n !== 5]]", CompareOp::Ne),
                ("[[n ne 5]]", CompareOp::Ne),
                ("[[n > 5]]", CompareOp::Gt),
                ("[[n gt 5]]", CompareOp::Gt),
                ("[[n < 5]]", CompareOp::Lt),
                ("[[n lt 5]]", CompareOp::Lt),
                ("[[n >= 5]]", CompareOp::Ge),
                ("[[n ge 5]]", CompareOp::Ge),
                ("[[n <= 5]]", CompareOp::Le),
                ("[[n le 5]]", CompareOp::Le),
            ];
            for (doc, op) in cases {
                let tags = scan(doc);
                let cmp = tags[0].compare.as_ref().expect(doc);
                assert_eq!(cmp.op, op, "{}", doc);
                assert_eq!(cmp.rhs, "5");
                assert_eq!(tags[0].name, "n");
            }
        }

        #[test]
        fn operands_are_trimmed() {
            let tags = scan("[[  count   >   10  ]]");
            assert_eq!(tags[0].name, "count");
            assert_eq!(tags[0].compare.as_ref().unwrap().rhs, "10");
        }

        #[test]
        fn comparison_with_inner_content() {
            let tags = scan("[[n > 5]]big[[/n]]");
            assert_eq!(tags[0].name, "n");
            assert_eq!(tags[0].inner.as_deref(), Some("big"));
        }

        #[test]
        fn three_operands_is_fatal() {
            let err = TagScanner::new("[[a > b > c]]", "[[", "]]", ":")
                .collect_tags()
                .unwrap_err();
            assert!(matches!(err, Error::MalformedComparisonTag(_)));
        }

        #[test]
        fn ge_not_shadowed_by_gt() {
            // " > " must not match inside " >= ".
            let tags = scan("[[n >= 5]]");
            assert_eq!(tags[0].compare.as_ref().unwrap().op, CompareOp::Ge);
        }
    }

    mod malformed {
        use super::*;

        #[test]
        fn dangling_open_delimiter_drops_rest() {
            let tags = scan("before [[broken");
            assert!(tags.is_empty());
        }

        #[test]
        fn dangling_open_after_valid_tag() {
            let tags = scan("[[ok]] then [[broken");
            assert_eq!(tags.len(), 1);
            assert_eq!(tags[0].name, "ok");
        }

        #[test]
        fn empty_head() {
            let tags = scan("x[[]]y");
            assert_eq!(tags.len(), 1);
            assert_eq!(tags[0].name, "");
        }
    }
}
