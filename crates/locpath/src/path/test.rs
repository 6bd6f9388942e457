use crate::data::{Data, NameId, NodeKind, Pre};
use compact_str::CompactString;
use core::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum NameTest {
    /// `*`
    Any,
    /// Not yet resolved against a document.
    Unresolved(CompactString),
    Id(NameId, CompactString),
    /// The name does not occur in the document; the test never matches.
    Unknown(CompactString),
}

impl NameTest {
    pub fn local(&self) -> Option<&str> {
        match self {
            NameTest::Any => None,
            NameTest::Unresolved(n) | NameTest::Id(_, n) | NameTest::Unknown(n) => Some(n),
        }
    }
}

/// Principal node kind of a name test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    Element,
    Attribute,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Test {
    Name { name: NameTest, kind: Principal },
    Text,
    Comment,
    /// Processing instruction, optionally restricted to a target.
    Pi(Option<CompactString>),
    Node,
}

impl Test {
    pub fn element(name: &str) -> Test {
        Test::Name {
            name: NameTest::Unresolved(CompactString::from(name)),
            kind: Principal::Element,
        }
    }

    pub fn attribute(name: &str) -> Test {
        Test::Name {
            name: NameTest::Unresolved(CompactString::from(name)),
            kind: Principal::Attribute,
        }
    }

    /// Resolve names against the document dictionary.
    pub fn compile(&self, data: &dyn Data) -> Test {
        match self {
            Test::Name {
                name: NameTest::Unresolved(n) | NameTest::Id(_, n) | NameTest::Unknown(n),
                kind,
            } => {
                let name = match data.name_id(n) {
                    Some(id) => NameTest::Id(id, n.clone()),
                    None => NameTest::Unknown(n.clone()),
                };
                Test::Name { name, kind: *kind }
            }
            other => other.clone(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(
            self,
            Test::Name {
                name: NameTest::Unknown(_),
                ..
            }
        )
    }

    /// Element name id when this is a resolved element name test.
    pub fn element_id(&self) -> Option<NameId> {
        match self {
            Test::Name {
                name: NameTest::Id(id, _),
                kind: Principal::Element,
            } => Some(*id),
            _ => None,
        }
    }

    pub fn eval(&self, data: &dyn Data, pre: Pre, kind: NodeKind) -> bool {
        match self {
            Test::Node => true,
            Test::Text => kind == NodeKind::Text,
            Test::Comment => kind == NodeKind::Comment,
            Test::Pi(target) => {
                kind == NodeKind::ProcessingInstruction
                    && target.as_ref().is_none_or(|t| {
                        let v = data.value(pre, kind);
                        v.strip_prefix(t.as_str())
                            .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
                    })
            }
            Test::Name { name, kind: principal } => {
                let wanted = match principal {
                    Principal::Element => NodeKind::Element,
                    Principal::Attribute => NodeKind::Attribute,
                };
                if kind != wanted {
                    return false;
                }
                match name {
                    NameTest::Any => true,
                    NameTest::Id(id, _) => data.name(pre, kind) == Some(*id),
                    NameTest::Unknown(_) => false,
                    NameTest::Unresolved(n) => data
                        .name(pre, kind)
                        .is_some_and(|id| data.name_of(id) == n.as_str()),
                }
            }
        }
    }
}

impl fmt::Display for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Test::Name { name, .. } => f.write_str(name.local().unwrap_or("*")),
            Test::Text => f.write_str("text()"),
            Test::Comment => f.write_str("comment()"),
            Test::Pi(None) => f.write_str("processing-instruction()"),
            Test::Pi(Some(t)) => write!(f, "processing-instruction('{t}')"),
            Test::Node => f.write_str("node()"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MemData, doc, elem, pi};

    #[test]
    fn pi_target_needs_a_word_boundary() {
        // 0 doc, 1 r, 2 <?xml-stylesheet a?>, 3 <?xml?>
        let d = MemData::build(
            doc().child(elem("r").child(pi("xml-stylesheet", "a")).child(pi("xml", ""))),
        );
        let kind = NodeKind::ProcessingInstruction;
        let xml = Test::Pi(Some("xml".into()));
        assert!(!xml.eval(&d, 2, kind));
        assert!(xml.eval(&d, 3, kind));
        assert!(Test::Pi(Some("xml-stylesheet".into())).eval(&d, 2, kind));
        assert!(Test::Pi(None).eval(&d, 2, kind));
    }

    #[test]
    fn names_resolve_once() {
        let d = MemData::build(doc().child(elem("r")));
        assert_eq!(Test::element("r").compile(&d).element_id(), d.name_id("r"));
        assert!(Test::element("missing").compile(&d).is_unknown());
        assert!(!Test::element("missing").compile(&d).eval(&d, 1, NodeKind::Element));
    }
}
