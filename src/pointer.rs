//! Tracks the current position within the document tree during a parse walk.
//!
//! Every recursive descent pushes the raw data path of the location it is
//! about to read and pops it on the way out, so that at any moment the stack
//! renders the JSON-API `source.pointer` for the value under inspection.
//! One entry is stored per push (possibly empty, for a "whole subtree" data
//! path), which keeps the push/pop balance mechanical; empty entries are
//! skipped when rendering.

use smallvec::SmallVec;

/// Collapse a raw property-path expression into pointer segments.
///
/// The literal delimiters `.`, `[` and `]` all become `/`; runs of
/// delimiters collapse into one and leading/trailing delimiters are
/// trimmed. `"relationships.store.data"` becomes
/// `"relationships/store/data"`, `"[0]"` becomes `"0"`.
pub(crate) fn normalize_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '.' | '[' | ']') {
            if !out.ends_with('/') {
                out.push('/');
            }
        } else {
            out.push(ch);
        }
    }
    out.trim_matches('/').to_owned()
}

/// Stack of pointer segments mirroring the parser's recursion.
///
/// The stack depth equals the current recursion depth into the document,
/// which is also what the parser measures against its depth limit.
#[derive(Debug, Default)]
pub struct PointerStack {
    segments: SmallVec<[String; 8]>,
}

impl PointerStack {
    pub fn new() -> Self {
        Self {
            segments: SmallVec::new(),
        }
    }

    /// Normalize `raw` and push it. Must be paired with exactly one
    /// [`pop`](Self::pop), on every exit path.
    pub fn push(&mut self, raw: &str) {
        self.segments.push(normalize_segment(raw));
    }

    /// Remove the most recently pushed segment.
    pub fn pop(&mut self) {
        self.segments.pop();
    }

    /// Number of pushes currently outstanding.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Drop all segments (start of a fresh document parse).
    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Render the JSON-API pointer for the current position: `"/"` followed
    /// by the non-empty segments in descent order.
    pub fn current(&self) -> String {
        let mut out = String::from("/");
        for seg in self.segments.iter().filter(|s| !s.is_empty()) {
            if out.len() > 1 {
                out.push('/');
            }
            out.push_str(seg);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dots_and_brackets() {
        assert_eq!(normalize_segment("attributes.name"), "attributes/name");
        assert_eq!(normalize_segment("[0]"), "0");
        assert_eq!(normalize_segment("items[2].name"), "items/2/name");
        assert_eq!(normalize_segment("..a..b.."), "a/b");
        assert_eq!(normalize_segment(""), "");
    }

    #[test]
    fn renders_root_for_empty_stack() {
        let stack = PointerStack::new();
        assert_eq!(stack.current(), "/");
    }

    #[test]
    fn renders_segments_in_descent_order() {
        let mut stack = PointerStack::new();
        stack.push("data");
        stack.push("attributes.address");
        stack.push("zip");
        assert_eq!(stack.current(), "/data/attributes/address/zip");
    }

    #[test]
    fn empty_pushes_keep_balance_but_do_not_render() {
        let mut stack = PointerStack::new();
        stack.push("");
        stack.push("attributes.name");
        assert_eq!(stack.current(), "/attributes/name");
        assert_eq!(stack.depth(), 2);
        stack.pop();
        stack.pop();
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.current(), "/");
    }

    #[test]
    fn pop_restores_previous_pointer() {
        let mut stack = PointerStack::new();
        stack.push("data");
        stack.push("[3]");
        assert_eq!(stack.current(), "/data/3");
        stack.pop();
        assert_eq!(stack.current(), "/data");
    }

    #[test]
    fn clear_resets_for_next_document() {
        let mut stack = PointerStack::new();
        stack.push("data");
        stack.clear();
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.current(), "/");
    }
}
