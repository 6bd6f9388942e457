//! Compiled location paths and the index rewrite.
//!
//! A path whose prefix contains an equality predicate answerable by the value index is
//! evaluated bottom-up: the index hits are mapped to their owners, and the inverted
//! prefix checks that each owner is reachable from the path's starting point.
//!
//! For `//item[@id='x']/name` the plan looks up attribute nodes `id="x"`, keeps their
//! parents named `item`, and evaluates `child::name` from there.

use core::cell::RefCell;
use core::fmt;

use tracing::{debug, trace};

use crate::context::{CompileContext, EvalContext};
use crate::data::Data;
use crate::error::Error;
use crate::index::{IndexQuery, ValueIndex};
use crate::nodes::{NodeBuilder, NodeSet};
use crate::path::{Axis, Pred, Step, Steps, Test};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    Absolute,
    Relative,
}

/// Identity and version of the document a memoized result was computed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    doc: usize,
    version: u64,
}

impl Stamp {
    fn of(data: &dyn Data) -> Stamp {
        Stamp {
            doc: core::ptr::from_ref(data).cast::<()>().addr(),
            version: data.version(),
        }
    }
}

#[derive(Debug, Clone)]
enum Plan {
    Traverse,
    Empty,
    /// Proven empty by a zero index estimate on the stamped document.
    EmptyAt(Stamp),
    Index(Box<IndexPlan>),
}

#[derive(Debug, Clone)]
struct IndexPlan {
    query: IndexQuery,
    /// Hits of the last lookup and the document they were taken from.
    hits: RefCell<(Stamp, NodeSet)>,
    /// Test of the step the lookup replaces.
    test: Test,
    /// Remaining predicates of that step.
    filters: Vec<Pred>,
    /// Inverted prefix, leading from a candidate back towards the start of the path.
    inv: Steps,
    /// Whether the inverted prefix must reach the binding.
    index_match: bool,
    rest: Steps,
}

#[derive(Debug, Clone)]
pub struct LocPath {
    root: Root,
    steps: Steps,
    plan: Plan,
    cache_enabled: bool,
    cache: RefCell<Option<(Stamp, NodeSet)>>,
}

impl LocPath {
    pub fn new(root: Root, steps: Vec<Step>) -> Self {
        Self {
            root,
            steps: Steps::new(steps),
            plan: Plan::Traverse,
            cache_enabled: false,
            cache: RefCell::new(None),
        }
    }

    pub fn root(&self) -> Root {
        self.root
    }

    pub fn steps(&self) -> &Steps {
        &self.steps
    }

    /// The step of a relative single-step path.
    pub fn single_step(&self) -> Option<&Step> {
        match (self.root, self.steps.as_slice()) {
            (Root::Relative, [s]) => Some(s),
            _ => None,
        }
    }

    /// `true` if compilation proved that the path selects nothing.
    pub fn is_empty_plan(&self) -> bool {
        matches!(self.plan, Plan::Empty | Plan::EmptyAt(_))
    }

    /// The index lookup replacing traversal, if one was chosen.
    pub fn index_query(&self) -> Option<&IndexQuery> {
        match &self.plan {
            Plan::Index(p) => Some(&p.query),
            _ => None,
        }
    }

    pub fn compile(mut self, ctx: &CompileContext<'_>) -> Result<LocPath, Error> {
        let data = ctx.data()?;
        if ctx.leaf && self.single_step().is_some_and(Step::is_self_node) {
            self.steps = Steps::new(vec![Step::new(Axis::Child, Test::Text, Vec::new())]);
            trace!("leaf operand rewritten to child::text()");
        }
        let ctx = ctx.with_leaf(false);
        if !self.steps.compile(&ctx)? || self.steps.empty_path() {
            debug!(path = %self, "path selects nothing");
            self.plan = Plan::Empty;
            return Ok(self);
        }
        self.steps.merge_self();
        self.steps.merge_descendant();
        self.cache_enabled = self.root == Root::Absolute && ctx.options.cache_absolute;
        if ctx.options.use_index {
            if let Some(index) = data.index() {
                self.plan = self.plan_index(data, index, ctx.options.selectivity_ceiling);
            }
        }
        Ok(self)
    }

    /// Pick the most selective indexable step and build its rewrite.
    fn plan_index(&self, data: &dyn Data, index: &dyn ValueIndex, ceiling: u64) -> Plan {
        let mut best: Option<(u64, usize, usize, IndexQuery)> = None;
        for (k, step) in self.steps.iter().enumerate() {
            if !step.axis.is_downward() || step.uses_position() {
                break;
            }
            let mut min: Option<(u64, usize, IndexQuery)> = None;
            for (i, pred) in step.preds.iter().enumerate() {
                let Some(q) = pred.index_query() else { continue };
                if !index.supports(q.kind()) {
                    continue;
                }
                let est = index.estimate(&q);
                trace!(step = k, query = %q, estimate = est, "index candidate");
                if min.as_ref().is_none_or(|(m, _, _)| est < *m) {
                    min = Some((est, i, q));
                }
            }
            let Some((est, i, q)) = min else { continue };
            if est == 0 {
                debug!(path = %self, query = %q, "index proves path empty");
                return Plan::EmptyAt(Stamp::of(data));
            }
            if self.root == Root::Relative && est > ceiling {
                debug!(step = k, estimate = est, ceiling, "index candidate above ceiling");
                continue;
            }
            if self.invert(k).is_none() {
                debug!(step = k, "prefix not invertible");
                continue;
            }
            if best.as_ref().is_none_or(|(b, ..)| est <= *b) {
                best = Some((est, k, i, q));
            }
        }
        let Some((est, k, i, query)) = best else {
            return Plan::Traverse;
        };
        let Some((inv, index_match)) = self.invert(k) else {
            return Plan::Traverse;
        };
        let step = &self.steps.as_slice()[k];
        let filters = step
            .preds
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, p)| p.clone())
            .collect();
        let rest = Steps::new(self.steps.as_slice()[k + 1..].to_vec());
        let hits = index.lookup(&query);
        debug!(path = %self, step = k, query = %query, estimate = est, hits = hits.len(), "using index");
        Plan::Index(Box::new(IndexPlan {
            query,
            hits: RefCell::new((Stamp::of(data), hits)),
            test: step.test.clone(),
            filters,
            inv,
            index_match,
            rest,
        }))
    }

    /// Inverted prefix `0..=k`: step `j` contributes `invert(axis_j)` with the test and
    /// predicates of step `j - 1`.
    fn invert(&self, k: usize) -> Option<(Steps, bool)> {
        let steps = self.steps.as_slice();
        let mut inv = Steps::default();
        let mut index_match = false;
        for j in (0..=k).rev() {
            let axis = steps[j].axis.invert()?;
            if j > 0 {
                let prev = &steps[j - 1];
                inv.push(Step::new(axis, prev.test.clone(), prev.preds.clone()));
            } else if self.root == Root::Relative || matches!(axis, Axis::Parent | Axis::SelfAxis) {
                inv.push(Step::new(axis, Test::Node, Vec::new()));
                index_match = true;
            }
        }
        Some((inv, index_match))
    }

    pub fn eval(&self, ctx: &EvalContext<'_>, input: &NodeSet) -> Result<NodeSet, Error> {
        let data = ctx.data();
        let stamp = Stamp::of(data);
        match self.plan {
            Plan::Empty => return Ok(NodeSet::empty()),
            Plan::EmptyAt(s) if s == stamp => return Ok(NodeSet::empty()),
            _ => {}
        }
        if self.cache_enabled {
            if let Some((s, hit)) = self.cache.borrow().as_ref() {
                if *s == stamp {
                    trace!(path = %self, "cached result");
                    return Ok(hit.clone());
                }
            }
        }
        let start = match self.root {
            Root::Absolute if data.is_empty() => return Ok(NodeSet::empty()),
            Root::Absolute => NodeSet::single(0),
            Root::Relative => input.clone(),
        };
        let result = match &self.plan {
            Plan::Index(plan) if data.index().is_some() => plan.eval(ctx, &start, stamp)?,
            _ => self.steps.eval(ctx, &start)?,
        };
        if self.cache_enabled {
            *self.cache.borrow_mut() = Some((stamp, result.clone()));
        }
        Ok(result)
    }
}

impl IndexPlan {
    fn eval(&self, ctx: &EvalContext<'_>, binding: &NodeSet, stamp: Stamp) -> Result<NodeSet, Error> {
        let data = ctx.data();
        let hits = {
            let mut cached = self.hits.borrow_mut();
            if cached.0 != stamp {
                if let Some(index) = data.index() {
                    *cached = (stamp, index.lookup(&self.query));
                }
            }
            cached.1.clone()
        };
        let mut owners = NodeBuilder::new();
        for hit in &hits {
            if let Some(p) = data.parent(hit, data.kind(hit)) {
                if self.test.eval(data, p, data.kind(p)) {
                    owners.push(p);
                }
            }
        }
        let owners = owners.finish();
        let mut out = NodeBuilder::new();
        for c in &owners {
            let single = NodeSet::single(c);
            if !self.index_match && !self.inv.is_empty() && self.inv.eval(ctx, &single)?.is_empty() {
                continue;
            }
            let mut keep = true;
            for f in &self.filters {
                if !f.eval(ctx, c, 1, 1)?.0 {
                    keep = false;
                    break;
                }
            }
            if !keep {
                continue;
            }
            if self.index_match && !self.inv.eval(ctx, &single)?.intersects(binding) {
                continue;
            }
            out.push(c);
        }
        ctx.check_stop()?;
        let owners = out.finish();
        if owners.is_empty() {
            return Ok(owners);
        }
        self.rest.eval(ctx, &owners)
    }
}

impl fmt::Display for LocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.root == Root::Absolute {
            f.write_str("/")?;
        }
        write!(f, "{}", self.steps)
    }
}
