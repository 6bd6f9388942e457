use locpath::data::{Data, MemData, NodeKind, Pre};
use locpath::path::Axis;
use rstest::{fixture, rstest};

#[fixture]
fn tree() -> MemData {
    MemData::from_xml(
        r#"<lib id="l">
             <shelf n="1"><book id="a"><t>A</t></book><book id="b"/><!--x--></shelf>
             <shelf n="2"><book id="c"><t>C</t><t>D</t></book></shelf>
             <?end now?>
           </lib>"#,
    )
    .unwrap()
}

fn ancestors(d: &MemData, pre: Pre) -> Vec<Pre> {
    let mut out = Vec::new();
    let mut cur = d.parent(pre, d.kind(pre));
    while let Some(p) = cur {
        out.push(p);
        cur = d.parent(p, d.kind(p));
    }
    out
}

fn is_attr(d: &MemData, pre: Pre) -> bool {
    d.kind(pre) == NodeKind::Attribute
}

/// Axis membership from parent links only.
fn reference(d: &MemData, axis: Axis, x: Pre) -> Vec<Pre> {
    let parent = |p: Pre| d.parent(p, d.kind(p));
    (0..d.len())
        .filter(|&y| match axis {
            Axis::SelfAxis => y == x,
            Axis::Parent => parent(x) == Some(y),
            Axis::Child => parent(y) == Some(x) && !is_attr(d, y),
            Axis::Attribute => parent(y) == Some(x) && is_attr(d, y),
            Axis::Ancestor => ancestors(d, x).contains(&y),
            Axis::AncestorOrSelf => y == x || ancestors(d, x).contains(&y),
            Axis::Descendant => !is_attr(d, y) && ancestors(d, y).contains(&x),
            Axis::DescendantOrSelf => y == x || (!is_attr(d, y) && ancestors(d, y).contains(&x)),
            Axis::Following => y > x && !is_attr(d, y) && !ancestors(d, y).contains(&x),
            Axis::Preceding => y < x && !is_attr(d, y) && !ancestors(d, x).contains(&y),
            Axis::FollowingSibling => {
                y > x && !is_attr(d, x) && !is_attr(d, y) && parent(x).is_some() && parent(y) == parent(x)
            }
            Axis::PrecedingSibling => {
                y < x && !is_attr(d, x) && !is_attr(d, y) && parent(x).is_some() && parent(y) == parent(x)
            }
            Axis::Namespace => false,
        })
        .collect()
}

#[rstest]
fn axes_match_parent_link_definitions(
    tree: MemData,
    #[values(
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
        Axis::SelfAxis
    )]
    axis: Axis,
) {
    for x in 0..tree.len() {
        let got: Vec<Pre> = axis.iter(&tree, x).map(|(p, _)| p).collect();
        let mut sorted = got.clone();
        if axis.is_reverse() {
            assert!(got.windows(2).all(|w| w[0] > w[1]), "{axis} from {x} not nearest-first: {got:?}");
            sorted.reverse();
        } else {
            assert!(got.windows(2).all(|w| w[0] < w[1]), "{axis} from {x} not in document order: {got:?}");
        }
        assert_eq!(sorted, reference(&tree, axis, x), "{axis} from {x}");
        for (p, k) in axis.iter(&tree, x) {
            assert_eq!(k, tree.kind(p));
        }
    }
}

#[rstest]
fn inverse_axes_lead_back(tree: MemData) {
    for axis in Axis::ALL {
        let Some(inv) = axis.invert() else { continue };
        if axis == Axis::Attribute {
            continue;
        }
        for x in (0..tree.len()).filter(|&p| !is_attr(&tree, p)) {
            for y in axis.iter(&tree, x).map(|(p, _)| p) {
                if is_attr(&tree, y) {
                    continue;
                }
                assert!(
                    inv.iter(&tree, y).any(|(p, _)| p == x),
                    "{y} reached by {axis} from {x}, but {inv} does not lead back"
                );
            }
        }
    }
}

#[rstest]
fn attribute_inverts_to_parent(tree: MemData) {
    for x in 0..tree.len() {
        for (a, k) in Axis::Attribute.iter(&tree, x) {
            assert_eq!(k, NodeKind::Attribute);
            let back: Vec<_> = Axis::Parent.iter(&tree, a).map(|(p, _)| p).collect();
            assert_eq!(back, vec![x]);
            assert!(Axis::Child.iter(&tree, x).all(|(p, _)| p != a));
        }
    }
}

#[rstest]
fn horizontal_axes_have_no_inverse() {
    for axis in [
        Axis::Following,
        Axis::FollowingSibling,
        Axis::Preceding,
        Axis::PrecedingSibling,
        Axis::Namespace,
    ] {
        assert_eq!(axis.invert(), None);
        assert!(!axis.is_downward());
    }
}
