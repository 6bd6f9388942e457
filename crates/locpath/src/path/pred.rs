//! Step predicates and their positional specialization.

use crate::context::{CompileContext, EvalContext};
use crate::data::Pre;
use crate::error::Error;
use crate::expr::{CmpOp, Expr, Focus, Func, Value};
use crate::index::IndexQuery;
use crate::path::{Axis, NameTest, Principal, Test};
use compact_str::CompactString;
use core::fmt;

/// Closed 1-based position range. `max == usize::MAX` means unbounded; `min > max`
/// can never match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredPos {
    pub min: usize,
    pub max: usize,
}

impl PredPos {
    pub const IMPOSSIBLE: PredPos = PredPos { min: 1, max: 0 };

    pub fn new(min: usize, max: usize) -> Self {
        Self { min: min.max(1), max }
    }

    pub fn exact(n: f64) -> Self {
        if n.fract() != 0.0 || n < 1.0 {
            return Self::IMPOSSIBLE;
        }
        let n = to_pos(n);
        Self::new(n, n)
    }

    /// Range matching `position() op n`.
    pub fn from_cmp(op: CmpOp, n: f64) -> Option<Self> {
        if n.is_nan() {
            return Some(Self::IMPOSSIBLE);
        }
        Some(match op {
            CmpOp::Eq => Self::exact(n),
            CmpOp::Gt => Self::new(to_pos(n.floor() + 1.0), usize::MAX),
            CmpOp::Ge => Self::new(to_pos(n.ceil()), usize::MAX),
            CmpOp::Lt => Self::new(1, to_pos(n.ceil() - 1.0)),
            CmpOp::Le => Self::new(1, to_pos(n.floor())),
            CmpOp::Ne => return None,
        })
    }

    /// `(matches, more)`: whether `pos` is in range and whether a later position can be.
    pub fn eval(&self, pos: usize) -> (bool, bool) {
        (self.min <= pos && pos <= self.max, pos < self.max)
    }

    pub fn is_impossible(&self) -> bool {
        self.min > self.max
    }
}

fn to_pos(n: f64) -> usize {
    if n <= 0.0 {
        0
    } else if n >= usize::MAX as f64 {
        usize::MAX
    } else {
        n as usize
    }
}

impl fmt::Display for PredPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            _ if self.is_impossible() => f.write_str("false()"),
            (a, b) if a == b => write!(f, "{a}"),
            (a, usize::MAX) => write!(f, "position() >= {a}"),
            (1, b) => write!(f, "position() <= {b}"),
            (a, b) => write!(f, "position() >= {a} and position() <= {b}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PredSimple {
    pub expr: Expr,
}

#[derive(Debug, Clone)]
pub enum Pred {
    Pos(PredPos),
    Simple(PredSimple),
}

impl Pred {
    pub fn simple(expr: Expr) -> Pred {
        Pred::Simple(PredSimple { expr })
    }

    /// Compile the wrapped expression and specialize positional forms into ranges.
    pub fn compile(self, ctx: &CompileContext<'_>) -> Result<Pred, Error> {
        let expr = match self {
            Pred::Pos(_) => return Ok(self),
            Pred::Simple(s) => s.expr.compile(ctx)?,
        };
        Ok(match specialize(&expr) {
            Some(pos) => Pred::Pos(pos),
            None => Pred::simple(expr),
        })
    }

    /// `0` when not a single position, `n > 0` for exactly position `n`, `-1` when the
    /// predicate can never hold.
    pub fn pos_pred(&self) -> i32 {
        match self {
            Pred::Pos(p) if p.is_impossible() => -1,
            Pred::Pos(p) if p.min == p.max => i32::try_from(p.min).unwrap_or(0),
            _ => 0,
        }
    }

    pub fn uses_size(&self) -> bool {
        match self {
            Pred::Pos(_) => false,
            Pred::Simple(s) => s.expr.uses_last(),
        }
    }

    pub fn uses_position(&self) -> bool {
        match self {
            Pred::Pos(_) => true,
            Pred::Simple(s) => s.expr.uses_focus_position() || s.expr.may_be_numeric(),
        }
    }

    /// `(matches, more)`; `more` is only ever false for position ranges.
    pub fn eval(&self, ctx: &EvalContext<'_>, pre: Pre, pos: usize, size: usize) -> Result<(bool, bool), Error> {
        match self {
            Pred::Pos(p) => Ok(p.eval(pos)),
            Pred::Simple(s) => {
                let v = s.expr.eval(ctx, Focus { pre, pos, size })?;
                let ok = match v {
                    Value::Num(n) => n == pos as f64,
                    other => other.to_bool(),
                };
                Ok((ok, true))
            }
        }
    }

    /// Value lookup equivalent to this predicate: `text() = 'lit'` or `@name = 'lit'`
    /// with a string literal on either side.
    pub fn index_query(&self) -> Option<IndexQuery> {
        let Pred::Simple(PredSimple {
            expr: Expr::Cmp(CmpOp::Eq, l, r),
        }) = self
        else {
            return None;
        };
        let (path, lit) = match (l.as_ref(), r.as_ref()) {
            (Expr::Path(p), Expr::Str(s)) | (Expr::Str(s), Expr::Path(p)) => (p, s),
            _ => return None,
        };
        let step = path.single_step()?;
        if !step.preds.is_empty() {
            return None;
        }
        let value = CompactString::from(lit.as_str());
        match (step.axis, &step.test) {
            (Axis::Child, Test::Text) => Some(IndexQuery::Text { value }),
            (
                Axis::Attribute,
                Test::Name {
                    name: NameTest::Id(id, _),
                    kind: Principal::Attribute,
                },
            ) => Some(IndexQuery::Attribute { name: *id, value }),
            _ => None,
        }
    }
}

/// Turn a numeric literal or a comparison of `position()` against a numeric literal into
/// a position range.
fn specialize(expr: &Expr) -> Option<PredPos> {
    match expr {
        Expr::Num(n) => Some(PredPos::exact(*n)),
        Expr::Cmp(op, l, r) => match (l.as_ref(), r.as_ref()) {
            (Expr::Call(Func::Position, a), Expr::Num(n)) if a.is_empty() => {
                PredPos::from_cmp(*op, *n)
            }
            (Expr::Num(n), Expr::Call(Func::Position, a)) if a.is_empty() => {
                PredPos::from_cmp(op.mirror(), *n)
            }
            _ => None,
        },
        _ => None,
    }
}

impl fmt::Display for Pred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pred::Pos(p) => write!(f, "[{p}]"),
            Pred::Simple(s) => write!(f, "[{}]", s.expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CmpOp::Eq, 2.0, 2, 2)]
    #[case(CmpOp::Gt, 2.5, 3, usize::MAX)]
    #[case(CmpOp::Ge, 2.5, 3, usize::MAX)]
    #[case(CmpOp::Lt, 3.0, 1, 2)]
    #[case(CmpOp::Lt, 2.5, 1, 2)]
    #[case(CmpOp::Le, 2.5, 1, 2)]
    #[case(CmpOp::Gt, -4.0, 1, usize::MAX)]
    fn comparison_ranges(#[case] op: CmpOp, #[case] n: f64, #[case] min: usize, #[case] max: usize) {
        assert_eq!(PredPos::from_cmp(op, n), Some(PredPos { min, max }));
    }

    #[test]
    fn impossible_ranges() {
        assert!(PredPos::exact(1.5).is_impossible());
        assert!(PredPos::exact(0.0).is_impossible());
        assert!(PredPos::from_cmp(CmpOp::Lt, 1.0).is_some_and(|p| p.is_impossible()));
        assert_eq!(Pred::Pos(PredPos::IMPOSSIBLE).pos_pred(), -1);
        assert_eq!(Pred::Pos(PredPos::exact(3.0)).pos_pred(), 3);
        assert_eq!(Pred::Pos(PredPos::new(2, usize::MAX)).pos_pred(), 0);
    }

    #[test]
    fn range_reports_when_more_positions_can_match() {
        let p = PredPos::new(2, 3);
        assert_eq!(p.eval(1), (false, true));
        assert_eq!(p.eval(2), (true, true));
        assert_eq!(p.eval(3), (true, false));
    }

    #[test]
    fn mirrored_position_comparison() {
        let e = Expr::Cmp(
            CmpOp::Lt,
            Box::new(Expr::Num(2.0)),
            Box::new(Expr::Call(Func::Position, vec![])),
        );
        assert_eq!(specialize(&e), Some(PredPos::new(3, usize::MAX)));
        let lit = Expr::Cmp(CmpOp::Eq, Box::new(Expr::Num(2.0)), Box::new(Expr::Num(2.0)));
        assert_eq!(specialize(&lit), None);
    }
}
