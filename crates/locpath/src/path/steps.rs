use crate::context::{CompileContext, EvalContext};
use crate::error::Error;
use crate::nodes::NodeSet;
use crate::path::{Axis, Step, Test};
use core::fmt;
use tracing::debug;

/// Ordered list of steps evaluated left to right.
#[derive(Debug, Clone, Default)]
pub struct Steps(Vec<Step>);

impl Steps {
    pub fn new(steps: Vec<Step>) -> Self {
        Self(steps)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Step] {
        &self.0
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Step> {
        self.0.iter()
    }

    pub(crate) fn push(&mut self, step: Step) {
        self.0.push(step);
    }

    /// Compile every step. Returns `false` if some step can never match.
    pub fn compile(&mut self, ctx: &CompileContext<'_>) -> Result<bool, Error> {
        for step in &mut self.0 {
            if !step.compile(ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Drop predicate-free `self::node()` steps unless one is all that is left.
    pub fn merge_self(&mut self) {
        let before = self.0.len();
        let mut i = 0;
        while i < self.0.len() && self.0.len() > 1 {
            if self.0[i].is_self_node() {
                self.0.remove(i);
            } else {
                i += 1;
            }
        }
        if self.0.len() != before {
            debug!(removed = before - self.0.len(), "merged self steps");
        }
    }

    /// Fold `descendant-or-self::node()/child::T` into `descendant::T` when the child step
    /// does not depend on positions.
    pub fn merge_descendant(&mut self) {
        let mut i = 0;
        while i + 1 < self.0.len() {
            let first = &self.0[i];
            let next = &self.0[i + 1];
            let mergeable = first.axis == Axis::DescendantOrSelf
                && first.test == Test::Node
                && first.preds.is_empty()
                && next.axis == Axis::Child
                && !next.uses_position();
            if mergeable {
                let next = self.0.remove(i + 1);
                self.0[i] = Step::new(Axis::Descendant, next.test, next.preds);
                debug!(step = %self.0[i], "merged descendant step");
            }
            i += 1;
        }
    }

    /// `true` if a test names something absent from the document or a predicate can never
    /// hold; the path then selects nothing.
    pub fn empty_path(&self) -> bool {
        self.0
            .iter()
            .any(|s| s.test.is_unknown() || s.preds.iter().any(|p| p.pos_pred() == -1))
    }

    pub fn eval(&self, ctx: &EvalContext<'_>, input: &NodeSet) -> Result<NodeSet, Error> {
        let mut cur = input.clone();
        for step in &self.0 {
            cur = step.eval(ctx, &cur)?;
            ctx.check_stop()?;
            if cur.is_empty() {
                break;
            }
        }
        Ok(cur)
    }
}

impl<'a> IntoIterator for &'a Steps {
    type Item = &'a Step;
    type IntoIter = core::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Steps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, s) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{s}")?;
        }
        Ok(())
    }
}
