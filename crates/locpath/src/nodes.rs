//! Node sets and their builder.

use crate::data::Pre;
use core::fmt;
use smallvec::SmallVec;
use std::sync::Arc;

/// Immutable, ascending, duplicate-free sequence of `pre` values.
///
/// Clones share the underlying slice.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct NodeSet {
    pres: Arc<[Pre]>,
}

impl NodeSet {
    pub fn empty() -> Self {
        Self {
            pres: Arc::from(Vec::new()),
        }
    }

    pub fn single(pre: Pre) -> Self {
        Self {
            pres: Arc::from(vec![pre]),
        }
    }

    /// Wrap values that are already ascending and distinct.
    pub(crate) fn from_sorted(pres: Vec<Pre>) -> Self {
        debug_assert!(pres.windows(2).all(|w| w[0] < w[1]));
        Self {
            pres: Arc::from(pres),
        }
    }

    pub fn len(&self) -> usize {
        self.pres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pres.is_empty()
    }

    pub fn as_slice(&self) -> &[Pre] {
        &self.pres
    }

    pub fn iter(&self) -> impl Iterator<Item = Pre> + '_ {
        self.pres.iter().copied()
    }

    pub fn first(&self) -> Option<Pre> {
        self.pres.first().copied()
    }

    pub fn contains(&self, pre: Pre) -> bool {
        self.pres.binary_search(&pre).is_ok()
    }

    pub fn union(&self, other: &NodeSet) -> NodeSet {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        let (a, b) = (self.as_slice(), other.as_slice());
        let mut out = Vec::with_capacity(a.len() + b.len());
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                core::cmp::Ordering::Less => {
                    out.push(a[i]);
                    i += 1;
                }
                core::cmp::Ordering::Greater => {
                    out.push(b[j]);
                    j += 1;
                }
                core::cmp::Ordering::Equal => {
                    out.push(a[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        out.extend_from_slice(&a[i..]);
        out.extend_from_slice(&b[j..]);
        NodeSet::from_sorted(out)
    }

    pub fn intersect(&self, other: &NodeSet) -> NodeSet {
        let (a, b) = (self.as_slice(), other.as_slice());
        let mut out = Vec::with_capacity(a.len().min(b.len()));
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                core::cmp::Ordering::Less => i += 1,
                core::cmp::Ordering::Greater => j += 1,
                core::cmp::Ordering::Equal => {
                    out.push(a[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        NodeSet::from_sorted(out)
    }

    /// `true` if both sets share at least one node.
    pub fn intersects(&self, other: &NodeSet) -> bool {
        let (a, b) = (self.as_slice(), other.as_slice());
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                core::cmp::Ordering::Less => i += 1,
                core::cmp::Ordering::Greater => j += 1,
                core::cmp::Ordering::Equal => return true,
            }
        }
        false
    }
}

impl Default for NodeSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for NodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.pres.iter()).finish()
    }
}

impl FromIterator<Pre> for NodeSet {
    fn from_iter<T: IntoIterator<Item = Pre>>(iter: T) -> Self {
        let mut nb = NodeBuilder::new();
        nb.extend(iter);
        nb.finish()
    }
}

impl From<&[Pre]> for NodeSet {
    fn from(pres: &[Pre]) -> Self {
        pres.iter().copied().collect()
    }
}

impl<'a> IntoIterator for &'a NodeSet {
    type Item = Pre;
    type IntoIter = core::iter::Copied<core::slice::Iter<'a, Pre>>;

    fn into_iter(self) -> Self::IntoIter {
        self.pres.iter().copied()
    }
}

/// Growable accumulator of `pre` values. Appends may arrive in any order; ordering and
/// duplicate removal happen once in [`NodeBuilder::finish`].
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    pres: SmallVec<[Pre; 16]>,
    sorted: bool,
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self {
            pres: SmallVec::new(),
            sorted: true,
        }
    }

    pub fn push(&mut self, pre: Pre) {
        if let Some(&last) = self.pres.last() {
            if pre <= last {
                self.sorted = false;
            }
        }
        self.pres.push(pre);
    }

    pub fn len(&self) -> usize {
        self.pres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pres.is_empty()
    }

    /// Values in insertion order.
    pub fn as_slice(&self) -> &[Pre] {
        &self.pres
    }

    pub fn clear(&mut self) {
        self.pres.clear();
        self.sorted = true;
    }

    pub fn finish(mut self) -> NodeSet {
        if !self.sorted {
            self.pres.sort_unstable();
            self.pres.dedup();
        }
        NodeSet::from_sorted(self.pres.into_vec())
    }
}

impl Default for NodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Extend<Pre> for NodeBuilder {
    fn extend<T: IntoIterator<Item = Pre>>(&mut self, iter: T) {
        for pre in iter {
            self.push(pre);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sorts_and_dedups_only_when_needed() {
        let mut nb = NodeBuilder::new();
        nb.extend([4, 2, 4, 9, 1]);
        assert_eq!(nb.finish().as_slice(), &[1, 2, 4, 9]);

        let mut nb = NodeBuilder::new();
        nb.extend([1, 3, 5]);
        assert!(nb.sorted);
        assert_eq!(nb.finish().as_slice(), &[1, 3, 5]);
    }

    #[test]
    fn set_algebra() {
        let a: NodeSet = [1usize, 3, 5, 7].as_slice().into();
        let b: NodeSet = [2usize, 3, 7, 8].as_slice().into();
        assert_eq!(a.union(&b).as_slice(), &[1, 2, 3, 5, 7, 8]);
        assert_eq!(a.intersect(&b).as_slice(), &[3, 7]);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&NodeSet::single(4)));
        assert!(a.contains(5));
        assert!(!a.contains(4));
    }
}
