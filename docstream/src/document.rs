//! Incremental markdown assembly.
//!
//! [`DocumentAccumulator`] is the single owner of the document string and
//! of fence-parity bookkeeping. Chunk content is appended verbatim; the
//! attribution footer closes any fence a truncated chunk left open, so the
//! footer never renders inside a dangling code block.

/// Triple-backtick code fence delimiter.
pub const FENCE: &str = "```";

/// Stateful reducer that assembles the document from stream events.
#[derive(Debug, Clone, Default)]
pub struct DocumentAccumulator {
    doc: String,
}

impl DocumentAccumulator {
    /// Create an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self { doc: String::new() }
    }

    /// Append a chunk fragment verbatim.
    pub fn append_chunk(&mut self, content: &str) {
        self.doc.push_str(content);
    }

    /// Append the attribution footer, closing an open fence first.
    pub fn append_attribution(&mut self, content: &str) {
        if self.has_open_fence() {
            self.doc.push_str(FENCE);
            self.doc.push('\n');
        }
        self.doc.push_str(content);
    }

    /// Whether the document currently ends inside an unterminated fence.
    #[must_use]
    pub fn has_open_fence(&self) -> bool {
        self.doc.matches(FENCE).count() % 2 == 1
    }

    /// The document assembled so far.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.doc
    }

    /// An owned copy of the document assembled so far.
    #[must_use]
    pub fn snapshot(&self) -> String {
        self.doc.clone()
    }

    /// Length of the document in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.doc.len()
    }

    /// Whether nothing has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }

    /// Consume the accumulator, returning the document.
    #[must_use]
    pub fn into_string(self) -> String {
        self.doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_append_in_order() {
        let mut acc = DocumentAccumulator::new();
        acc.append_chunk("# fib\n");
        acc.append_chunk("Computes Fibonacci numbers.\n");

        assert_eq!(acc.as_str(), "# fib\nComputes Fibonacci numbers.\n");
        assert_eq!(acc.len(), 34);
    }

    #[test]
    fn test_attribution_closes_open_fence() {
        let mut acc = DocumentAccumulator::new();
        acc.append_chunk("# Usage\n```js\nconst x = 1;\n");
        assert!(acc.has_open_fence());

        acc.append_attribution("\n---\nGenerated by docstream\n");

        assert_eq!(
            acc.as_str(),
            "# Usage\n```js\nconst x = 1;\n```\n\n---\nGenerated by docstream\n"
        );
        assert!(!acc.has_open_fence());
    }

    #[test]
    fn test_attribution_leaves_balanced_document_alone() {
        let mut acc = DocumentAccumulator::new();
        acc.append_chunk("```js\nconst x = 1;\n```\nafter\n");
        assert!(!acc.has_open_fence());

        acc.append_attribution("footer");

        assert_eq!(acc.as_str(), "```js\nconst x = 1;\n```\nafter\nfooter");
    }

    #[test]
    fn test_fence_split_across_chunks_still_counts() {
        let mut acc = DocumentAccumulator::new();
        acc.append_chunk("``");
        assert!(!acc.has_open_fence());
        acc.append_chunk("`python\nprint(1)\n");

        assert!(acc.has_open_fence());
    }

    #[test]
    fn test_parity_over_multiple_fences() {
        let mut acc = DocumentAccumulator::new();
        acc.append_chunk("```a\n1\n```\n```b\n2\n```\n");
        assert!(!acc.has_open_fence());

        acc.append_chunk("```c\n3\n");
        assert!(acc.has_open_fence());

        acc.append_attribution("footer");
        assert!(acc.as_str().ends_with("3\n```\nfooter"));
    }

    #[test]
    fn test_empty_accumulator() {
        let mut acc = DocumentAccumulator::new();
        assert!(acc.is_empty());
        assert!(!acc.has_open_fence());

        acc.append_attribution("footer only");
        assert_eq!(acc.as_str(), "footer only");
    }

    #[test]
    fn test_snapshot_matches_final_document() {
        let mut acc = DocumentAccumulator::new();
        acc.append_chunk("body");
        let snap = acc.snapshot();

        assert_eq!(snap, acc.into_string());
    }
}
