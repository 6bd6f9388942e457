//! Positional document model.
//!
//! Every node is addressed by its `pre` value, its position in document order. Tree
//! navigation is arithmetic over the stored subtree sizes:
//!
//! - the descendants of `pre` occupy `[pre + 1, pre + size)`;
//! - the attributes of an element occupy `[pre + 1, pre + att_size)`;
//! - its children (and their subtrees) occupy `[pre + att_size, pre + size)`.
//!
//! `att_size` counts the node itself, so it is `1` for every non-element node.

use crate::index::ValueIndex;

pub mod mem;

pub use mem::{AttrSpec, MemData, NodeSpec, attr, comment, doc, elem, pi, text};

/// Document-order position of a node.
pub type Pre = usize;

/// Integer id of a name in the document's name dictionary.
pub type NameId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// Read access to a positionally encoded document.
///
/// All methods taking a `pre` value expect it to be within `0..self.len()`; the
/// accompanying `kind` must be the value returned by [`Data::kind`] for that node.
pub trait Data {
    /// Number of nodes, which equals the size of the document node.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind(&self, pre: Pre) -> NodeKind;

    fn size(&self, pre: Pre, kind: NodeKind) -> usize;

    fn att_size(&self, pre: Pre, kind: NodeKind) -> usize;

    fn parent(&self, pre: Pre, kind: NodeKind) -> Option<Pre>;

    /// Name of an element or attribute, or the target of a processing instruction.
    fn name(&self, pre: Pre, kind: NodeKind) -> Option<NameId>;

    /// Look up a name in the dictionary; `None` means it never occurs in the document.
    fn name_id(&self, name: &str) -> Option<NameId>;

    fn name_of(&self, id: NameId) -> &str;

    /// Raw content of text, comment and attribute nodes. Processing instructions store
    /// `"target content"`. Elements and the document node have no value.
    fn value(&self, pre: Pre, kind: NodeKind) -> &str;

    /// XPath string value of a node.
    fn string_value(&self, pre: Pre) -> String {
        let kind = self.kind(pre);
        match kind {
            NodeKind::Document | NodeKind::Element => {
                let end = pre + self.size(pre, kind);
                let mut p = pre + self.att_size(pre, kind);
                let mut out = String::new();
                while p < end {
                    let k = self.kind(p);
                    if k == NodeKind::Text {
                        out.push_str(self.value(p, k));
                    }
                    p += self.att_size(p, k);
                }
                out
            }
            NodeKind::ProcessingInstruction => {
                let raw = self.value(pre, kind);
                match raw.split_once(char::is_whitespace) {
                    Some((_, content)) => content.trim_start().to_string(),
                    None => String::new(),
                }
            }
            _ => self.value(pre, kind).to_string(),
        }
    }

    /// `true` if every element with this name has exactly one child and that child is a
    /// text node. Such elements have the same string value as their text child.
    fn is_leaf(&self, _name: NameId) -> bool {
        false
    }

    /// Monotonic version, bumped on every update of the document.
    fn version(&self) -> u64 {
        0
    }

    /// Value index over this document, if one is available.
    fn index(&self) -> Option<&dyn ValueIndex> {
        None
    }
}
