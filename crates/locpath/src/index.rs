//! Value index interface used by the path compiler.

use crate::data::NameId;
use crate::nodes::NodeSet;
use compact_str::CompactString;
use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Text,
    Attribute,
}

/// An equality lookup against a literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexQuery {
    /// Text nodes whose content equals `value`.
    Text { value: CompactString },
    /// Attribute nodes named `name` whose value equals `value`.
    Attribute { name: NameId, value: CompactString },
}

impl IndexQuery {
    pub fn kind(&self) -> IndexKind {
        match self {
            IndexQuery::Text { .. } => IndexKind::Text,
            IndexQuery::Attribute { .. } => IndexKind::Attribute,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            IndexQuery::Text { value } | IndexQuery::Attribute { value, .. } => value,
        }
    }
}

impl fmt::Display for IndexQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexQuery::Text { value } => write!(f, "text-index(\"{value}\")"),
            IndexQuery::Attribute { name, value } => {
                write!(f, "attribute-index(#{name}, \"{value}\")")
            }
        }
    }
}

pub trait ValueIndex {
    fn supports(&self, kind: IndexKind) -> bool;

    /// Upper bound of the number of hits. `0` guarantees that [`ValueIndex::lookup`]
    /// returns nothing.
    fn estimate(&self, query: &IndexQuery) -> u64;

    /// Exact hits in document order: text nodes for [`IndexQuery::Text`], attribute
    /// nodes for [`IndexQuery::Attribute`].
    fn lookup(&self, query: &IndexQuery) -> NodeSet;
}
