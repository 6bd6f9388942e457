use crate::context::{CompileContext, EvalContext};
use crate::error::Error;
use crate::nodes::{NodeBuilder, NodeSet};
use crate::path::{Axis, Pred, PredPos, Test};
use core::fmt;
use smallvec::SmallVec;
use tracing::trace;

/// How a step applies its predicates while scanning an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// No predicates.
    Simple,
    /// A single position range; scanning stops once it is left.
    PosPred(PredPos),
    /// Predicates evaluated while scanning, each with its own position counter.
    Early,
    /// Some predicate needs `last()`: candidates are collected before filtering.
    General,
}

impl Strategy {
    fn classify(preds: &[Pred]) -> Strategy {
        match preds {
            [] => Strategy::Simple,
            [Pred::Pos(p)] => Strategy::PosPred(*p),
            _ if preds.iter().any(Pred::uses_size) => Strategy::General,
            _ => Strategy::Early,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Step {
    pub axis: Axis,
    pub test: Test,
    pub preds: Vec<Pred>,
    strategy: Strategy,
}

impl Step {
    /// The strategy is chosen from the predicates as given and chosen again by `compile`.
    pub fn new(axis: Axis, test: Test, preds: Vec<Pred>) -> Self {
        let strategy = Strategy::classify(&preds);
        Self {
            axis,
            test,
            preds,
            strategy,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// `self::node()` without predicates.
    pub fn is_self_node(&self) -> bool {
        self.axis == Axis::SelfAxis && self.test == Test::Node && self.preds.is_empty()
    }

    /// Resolve the node test and compile the predicates. Returns `false` if a predicate
    /// can never hold.
    pub fn compile(&mut self, ctx: &CompileContext<'_>) -> Result<bool, Error> {
        let data = ctx.data()?;
        self.test = self.test.compile(data);
        let leaf = self.test.element_id().is_some_and(|id| data.is_leaf(id));
        let pctx = ctx.with_leaf(leaf);
        self.preds = std::mem::take(&mut self.preds)
            .into_iter()
            .map(|p| p.compile(&pctx))
            .collect::<Result<_, _>>()?;
        if self.preds.iter().any(|p| p.pos_pred() == -1) {
            return Ok(false);
        }
        self.strategy = Strategy::classify(&self.preds);
        trace!(step = %self, strategy = ?self.strategy, "compiled step");
        Ok(true)
    }

    pub fn uses_position(&self) -> bool {
        self.preds.iter().any(Pred::uses_position)
    }

    /// Exact position selected by the only predicate, `-1` if the step can never match,
    /// `0` otherwise.
    pub fn pos_pred(&self) -> i32 {
        match self.preds.as_slice() {
            [p] => p.pos_pred(),
            preds if preds.iter().any(|p| p.pos_pred() == -1) => -1,
            _ => 0,
        }
    }

    pub fn eval(&self, ctx: &EvalContext<'_>, input: &NodeSet) -> Result<NodeSet, Error> {
        let data = ctx.data();
        let mut out = NodeBuilder::new();
        match self.strategy {
            Strategy::Simple => {
                for pre in input {
                    for (p, k) in self.axis.iter(data, pre) {
                        if self.test.eval(data, p, k) {
                            out.push(p);
                        }
                    }
                }
            }
            Strategy::PosPred(range) => {
                for pre in input {
                    let mut pos = 0;
                    for (p, k) in self.axis.iter(data, pre) {
                        if !self.test.eval(data, p, k) {
                            continue;
                        }
                        pos += 1;
                        let (hit, more) = range.eval(pos);
                        if hit {
                            out.push(p);
                        }
                        if !more {
                            break;
                        }
                    }
                }
            }
            Strategy::Early => {
                let mut counters: SmallVec<[usize; 4]> = SmallVec::new();
                for pre in input {
                    counters.clear();
                    counters.resize(self.preds.len(), 0);
                    for (p, k) in self.axis.iter(data, pre) {
                        if !self.test.eval(data, p, k) {
                            continue;
                        }
                        let mut keep = true;
                        let mut stop = false;
                        for (pred, pos) in self.preds.iter().zip(counters.iter_mut()) {
                            *pos += 1;
                            let (hit, more) = pred.eval(ctx, p, *pos, 0)?;
                            stop |= !more;
                            if !hit {
                                keep = false;
                                break;
                            }
                        }
                        if keep {
                            out.push(p);
                        }
                        if stop {
                            break;
                        }
                    }
                }
            }
            Strategy::General => {
                let mut cands = Vec::new();
                for pre in input {
                    cands.clear();
                    cands.extend(
                        self.axis
                            .iter(data, pre)
                            .filter(|&(p, k)| self.test.eval(data, p, k))
                            .map(|(p, _)| p),
                    );
                    for pred in &self.preds {
                        let size = cands.len();
                        let mut kept = Vec::with_capacity(size);
                        for (i, &p) in cands.iter().enumerate() {
                            if pred.eval(ctx, p, i + 1, size)?.0 {
                                kept.push(p);
                            }
                        }
                        cands = kept;
                    }
                    out.extend(cands.iter().copied());
                }
            }
        }
        Ok(out.finish())
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.axis, self.test)?;
        for p in &self.preds {
            write!(f, "{p}")?;
        }
        Ok(())
    }
}
