use crate::data::{Data, NodeKind, Pre};
use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Ancestor,
    AncestorOrSelf,
    Attribute,
    Child,
    Descendant,
    DescendantOrSelf,
    Following,
    FollowingSibling,
    Namespace,
    Parent,
    Preceding,
    PrecedingSibling,
    SelfAxis,
}

impl Axis {
    pub const ALL: [Axis; 13] = [
        Axis::Ancestor,
        Axis::AncestorOrSelf,
        Axis::Attribute,
        Axis::Child,
        Axis::Descendant,
        Axis::DescendantOrSelf,
        Axis::Following,
        Axis::FollowingSibling,
        Axis::Namespace,
        Axis::Parent,
        Axis::Preceding,
        Axis::PrecedingSibling,
        Axis::SelfAxis,
    ];

    /// Axis that leads back from a result node to its origin.
    ///
    /// `attribute` inverts to `parent`, while `parent` inverts to `child`; the horizontal
    /// axes and `namespace` have no inverse.
    pub fn invert(self) -> Option<Axis> {
        match self {
            Axis::Ancestor => Some(Axis::Descendant),
            Axis::AncestorOrSelf => Some(Axis::DescendantOrSelf),
            Axis::Attribute => Some(Axis::Parent),
            Axis::Child => Some(Axis::Parent),
            Axis::Descendant => Some(Axis::Ancestor),
            Axis::DescendantOrSelf => Some(Axis::AncestorOrSelf),
            Axis::Parent => Some(Axis::Child),
            Axis::SelfAxis => Some(Axis::SelfAxis),
            Axis::Following
            | Axis::FollowingSibling
            | Axis::Namespace
            | Axis::Preceding
            | Axis::PrecedingSibling => None,
        }
    }

    pub fn is_downward(self) -> bool {
        matches!(
            self,
            Axis::Child
                | Axis::Attribute
                | Axis::Descendant
                | Axis::DescendantOrSelf
                | Axis::SelfAxis
        )
    }

    /// Reverse axes count positions from the origin outward.
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Ancestor
                | Axis::AncestorOrSelf
                | Axis::Parent
                | Axis::Preceding
                | Axis::PrecedingSibling
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::Ancestor => "ancestor",
            Axis::AncestorOrSelf => "ancestor-or-self",
            Axis::Attribute => "attribute",
            Axis::Child => "child",
            Axis::Descendant => "descendant",
            Axis::DescendantOrSelf => "descendant-or-self",
            Axis::Following => "following",
            Axis::FollowingSibling => "following-sibling",
            Axis::Namespace => "namespace",
            Axis::Parent => "parent",
            Axis::Preceding => "preceding",
            Axis::PrecedingSibling => "preceding-sibling",
            Axis::SelfAxis => "self",
        }
    }

    pub fn from_name(name: &str) -> Option<Axis> {
        Axis::ALL.iter().copied().find(|a| a.name() == name)
    }

    /// Nodes reachable from `pre` along this axis, in axis order.
    pub fn iter(self, data: &dyn Data, pre: Pre) -> AxisIter<'_> {
        AxisIter::new(data, self, pre)
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy)]
enum Jump {
    One,
    Size,
    AttSize,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Done,
    Once(Pre),
    Forward { next: Pre, end: Pre, jump: Jump },
    Ancestors { next: Option<Pre> },
    /// `cursor` is one past the next candidate.
    Preceding { cursor: Pre, tracked: Option<Pre> },
    PrecedingSibling { cursor: Pre, parent: Pre },
}

/// Iterator over one axis of one origin node, yielding `(pre, kind)` pairs.
///
/// Forward axes yield in document order, reverse axes nearest-first.
pub struct AxisIter<'d> {
    data: &'d dyn Data,
    state: State,
}

impl<'d> AxisIter<'d> {
    pub fn new(data: &'d dyn Data, axis: Axis, pre: Pre) -> Self {
        let kind = data.kind(pre);
        let size = data.size(pre, kind);
        let state = match axis {
            Axis::SelfAxis => State::Once(pre),
            Axis::Namespace => State::Done,
            Axis::Parent => data.parent(pre, kind).map_or(State::Done, State::Once),
            Axis::Ancestor => State::Ancestors {
                next: data.parent(pre, kind),
            },
            Axis::AncestorOrSelf => State::Ancestors { next: Some(pre) },
            Axis::Child => State::Forward {
                next: pre + data.att_size(pre, kind),
                end: pre + size,
                jump: Jump::Size,
            },
            Axis::Attribute => State::Forward {
                next: pre + 1,
                end: pre + data.att_size(pre, kind),
                jump: Jump::One,
            },
            Axis::Descendant => State::Forward {
                next: pre + data.att_size(pre, kind),
                end: pre + size,
                jump: Jump::AttSize,
            },
            Axis::DescendantOrSelf => State::Forward {
                next: pre,
                end: pre + size,
                jump: Jump::AttSize,
            },
            Axis::Following => {
                // attributes continue after the owner's attribute block
                let next = match (kind, data.parent(pre, kind)) {
                    (NodeKind::Attribute, Some(par)) => {
                        par + data.att_size(par, data.kind(par))
                    }
                    _ => pre + size,
                };
                State::Forward {
                    next,
                    end: data.len(),
                    jump: Jump::AttSize,
                }
            }
            Axis::FollowingSibling => match data.parent(pre, kind) {
                Some(par) if kind != NodeKind::Attribute => State::Forward {
                    next: pre + size,
                    end: par + data.size(par, data.kind(par)),
                    jump: Jump::Size,
                },
                _ => State::Done,
            },
            Axis::Preceding => State::Preceding {
                cursor: pre,
                tracked: data.parent(pre, kind),
            },
            Axis::PrecedingSibling => match data.parent(pre, kind) {
                Some(parent) if kind != NodeKind::Attribute => State::PrecedingSibling {
                    cursor: pre,
                    parent,
                },
                _ => State::Done,
            },
        };
        Self { data, state }
    }
}

impl Iterator for AxisIter<'_> {
    type Item = (Pre, NodeKind);

    fn next(&mut self) -> Option<Self::Item> {
        let data = self.data;
        match self.state {
            State::Done => None,
            State::Once(p) => {
                self.state = State::Done;
                Some((p, data.kind(p)))
            }
            State::Forward { next, end, jump } => {
                if next >= end {
                    self.state = State::Done;
                    return None;
                }
                let kind = data.kind(next);
                let step = match jump {
                    Jump::One => 1,
                    Jump::Size => data.size(next, kind),
                    Jump::AttSize => data.att_size(next, kind),
                };
                self.state = State::Forward {
                    next: next + step,
                    end,
                    jump,
                };
                Some((next, kind))
            }
            State::Ancestors { next } => {
                let Some(p) = next else {
                    self.state = State::Done;
                    return None;
                };
                let kind = data.kind(p);
                self.state = State::Ancestors {
                    next: data.parent(p, kind),
                };
                Some((p, kind))
            }
            State::Preceding {
                mut cursor,
                mut tracked,
            } => {
                while cursor > 0 {
                    let p = cursor - 1;
                    cursor = p;
                    let kind = data.kind(p);
                    if Some(p) == tracked {
                        tracked = data.parent(p, kind);
                        continue;
                    }
                    if kind == NodeKind::Attribute {
                        continue;
                    }
                    self.state = State::Preceding { cursor, tracked };
                    return Some((p, kind));
                }
                self.state = State::Done;
                None
            }
            State::PrecedingSibling { mut cursor, parent } => {
                while cursor > parent + 1 {
                    let p = cursor - 1;
                    cursor = p;
                    let kind = data.kind(p);
                    if kind != NodeKind::Attribute && data.parent(p, kind) == Some(parent) {
                        self.state = State::PrecedingSibling { cursor, parent };
                        return Some((p, kind));
                    }
                }
                self.state = State::Done;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MemData, attr, doc, elem, text};

    // 0 doc, 1 r, 2 @id, 3 a, 4 "x", 5 b, 6 @k, 7 c, 8 d
    fn sample() -> MemData {
        MemData::build(
            doc().child(
                elem("r")
                    .attr(attr("id", "1"))
                    .child(elem("a").child(text("x")))
                    .child(elem("b").attr(attr("k", "v")).child(elem("c")))
                    .child(elem("d")),
            ),
        )
    }

    fn collect(data: &MemData, axis: Axis, pre: Pre) -> Vec<Pre> {
        axis.iter(data, pre).map(|(p, _)| p).collect()
    }

    #[test]
    fn forward_axes() {
        let d = sample();
        assert_eq!(collect(&d, Axis::Child, 1), vec![3, 5, 8]);
        assert_eq!(collect(&d, Axis::Attribute, 5), vec![6]);
        assert_eq!(collect(&d, Axis::Descendant, 1), vec![3, 4, 5, 7, 8]);
        assert_eq!(collect(&d, Axis::DescendantOrSelf, 5), vec![5, 7]);
        assert_eq!(collect(&d, Axis::Following, 3), vec![5, 7, 8]);
        assert_eq!(collect(&d, Axis::Following, 6), vec![7, 8]);
        assert_eq!(collect(&d, Axis::FollowingSibling, 3), vec![5, 8]);
        assert!(collect(&d, Axis::FollowingSibling, 2).is_empty());
        assert!(collect(&d, Axis::FollowingSibling, 0).is_empty());
    }

    #[test]
    fn reverse_axes_are_nearest_first() {
        let d = sample();
        assert_eq!(collect(&d, Axis::Ancestor, 7), vec![5, 1, 0]);
        assert_eq!(collect(&d, Axis::AncestorOrSelf, 7), vec![7, 5, 1, 0]);
        assert_eq!(collect(&d, Axis::Parent, 6), vec![5]);
        assert_eq!(collect(&d, Axis::Preceding, 8), vec![7, 5, 4, 3]);
        assert_eq!(collect(&d, Axis::Preceding, 7), vec![4, 3]);
        assert_eq!(collect(&d, Axis::PrecedingSibling, 8), vec![5, 3]);
        assert!(collect(&d, Axis::PrecedingSibling, 6).is_empty());
        assert!(collect(&d, Axis::Namespace, 1).is_empty());
    }

    #[test]
    fn inversion_table() {
        for axis in Axis::ALL {
            if let Some(inv) = axis.invert() {
                if axis != Axis::Attribute {
                    assert_eq!(inv.invert(), Some(axis), "{axis}");
                }
            }
        }
        assert_eq!(Axis::Attribute.invert(), Some(Axis::Parent));
        assert_eq!(Axis::Parent.invert(), Some(Axis::Child));
        assert_eq!(Axis::from_name("preceding-sibling"), Some(Axis::PrecedingSibling));
        assert_eq!(Axis::from_name("sideways"), None);
    }
}
