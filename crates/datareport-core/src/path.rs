//! # Tree Paths
//!
//! A `TreePath` names a position inside a value tree for diagnostics. It is
//! a persistent singly linked list: `child()` returns a new path that shares
//! every existing segment with its parent, and no path is ever modified
//! after construction. Repeated or concurrent validation runs therefore can
//! never observe each other's paths.
//!
//! Paths render with `:` between segments, starting from the root segment
//! `/`:
//!
//! ```
//! use datareport_core::TreePath;
//!
//! let path = TreePath::root().child("servers").child("0");
//! assert_eq!(path.to_string(), "/:servers:0");
//! ```

use std::fmt;
use std::sync::Arc;

/// Segment of the root path.
pub const ROOT_SEGMENT: &str = "/";

#[derive(Debug)]
struct Segment {
    text: String,
    parent: Option<Arc<Segment>>,
    depth: usize,
}

/// Immutable, append-only path of string segments.
#[derive(Debug, Clone)]
pub struct TreePath {
    tail: Arc<Segment>,
}

impl TreePath {
    /// The root path `["/"]`.
    pub fn root() -> Self {
        Self {
            tail: Arc::new(Segment {
                text: ROOT_SEGMENT.to_string(),
                parent: None,
                depth: 1,
            }),
        }
    }

    /// Return a new path extended by `segment`. `self` is left untouched.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        Self {
            tail: Arc::new(Segment {
                text: segment.into(),
                parent: Some(Arc::clone(&self.tail)),
                depth: self.tail.depth + 1,
            }),
        }
    }

    /// Number of segments, including the root segment.
    pub fn depth(&self) -> usize {
        self.tail.depth
    }

    /// True for a path with no segment beyond the root.
    pub fn is_root(&self) -> bool {
        self.tail.parent.is_none()
    }

    /// The last segment.
    pub fn last(&self) -> &str {
        &self.tail.text
    }

    /// All segments, root first.
    pub fn segments(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.tail.depth);
        let mut cursor = Some(&self.tail);
        while let Some(segment) = cursor {
            out.push(segment.text.as_str());
            cursor = segment.parent.as_ref();
        }
        out.reverse();
        out
    }
}

impl Default for TreePath {
    fn default() -> Self {
        Self::root()
    }
}

impl PartialEq for TreePath {
    fn eq(&self, other: &Self) -> bool {
        self.depth() == other.depth() && self.segments() == other.segments()
    }
}

impl Eq for TreePath {}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments().join(":"))
    }
}
