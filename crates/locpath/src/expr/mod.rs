//! General expressions evaluated inside predicates and at the top level of a query.

pub mod value;

pub use value::Value;

use crate::context::{CompileContext, EvalContext};
use crate::data::{NodeKind, Pre};
use crate::error::{Error, ErrorCode};
use crate::nodes::NodeSet;
use crate::path::LocPath;
use compact_str::CompactString;
use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// Operator with swapped operands: `a op b == b op.mirror() a`.
    pub fn mirror(self) -> CmpOp {
        match self {
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::Ne => CmpOp::Ne,
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Ge => CmpOp::Le,
        }
    }

    pub fn apply_num(self, l: f64, r: f64) -> bool {
        match self {
            CmpOp::Eq => l == r,
            CmpOp::Ne => l != r,
            CmpOp::Lt => l < r,
            CmpOp::Le => l <= r,
            CmpOp::Gt => l > r,
            CmpOp::Ge => l >= r,
        }
    }

    pub fn apply_bool(self, l: bool, r: bool) -> bool {
        match self {
            CmpOp::Eq => l == r,
            CmpOp::Ne => l != r,
            _ => self.apply_num(f64::from(u8::from(l)), f64::from(u8::from(r))),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "div",
            ArithOp::Mod => "mod",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Position,
    Last,
    Count,
    Not,
    True,
    False,
    Boolean,
    Number,
    String,
    StringLength,
    Contains,
    StartsWith,
    Name,
    Sum,
}

impl Func {
    const ALL: [Func; 14] = [
        Func::Position,
        Func::Last,
        Func::Count,
        Func::Not,
        Func::True,
        Func::False,
        Func::Boolean,
        Func::Number,
        Func::String,
        Func::StringLength,
        Func::Contains,
        Func::StartsWith,
        Func::Name,
        Func::Sum,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Func::Position => "position",
            Func::Last => "last",
            Func::Count => "count",
            Func::Not => "not",
            Func::True => "true",
            Func::False => "false",
            Func::Boolean => "boolean",
            Func::Number => "number",
            Func::String => "string",
            Func::StringLength => "string-length",
            Func::Contains => "contains",
            Func::StartsWith => "starts-with",
            Func::Name => "name",
            Func::Sum => "sum",
        }
    }

    pub fn from_name(name: &str) -> Option<Func> {
        Func::ALL.iter().copied().find(|f| f.name() == name)
    }

    /// Accepted argument counts, inclusive.
    pub fn arity(self) -> (usize, usize) {
        match self {
            Func::Position | Func::Last | Func::True | Func::False => (0, 0),
            Func::Count | Func::Not | Func::Boolean | Func::Sum => (1, 1),
            Func::Number | Func::String | Func::StringLength | Func::Name => (0, 1),
            Func::Contains | Func::StartsWith => (2, 2),
        }
    }

    fn is_numeric(self) -> bool {
        matches!(
            self,
            Func::Position
                | Func::Last
                | Func::Count
                | Func::Number
                | Func::StringLength
                | Func::Sum
        )
    }
}

/// Context node with its position and the size of the sequence it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Focus {
    pub pre: Pre,
    pub pos: usize,
    pub size: usize,
}

impl Focus {
    pub fn single(pre: Pre) -> Self {
        Self {
            pre,
            pos: 1,
            size: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Num(f64),
    Str(CompactString),
    Path(Box<LocPath>),
    Call(Func, Vec<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Union(Vec<Expr>),
}

impl Expr {
    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Num(_) | Expr::Str(_))
    }

    pub(crate) fn compile(self, ctx: &CompileContext<'_>) -> Result<Expr, Error> {
        self.compile_operand(ctx, false)
    }

    /// `opposite_literal` is set for comparison operands whose other side is a literal;
    /// only such paths may take the leaf rewrite.
    fn compile_operand(self, ctx: &CompileContext<'_>, opposite_literal: bool) -> Result<Expr, Error> {
        let all = |v: Vec<Expr>| -> Result<Vec<Expr>, Error> {
            v.into_iter().map(|e| e.compile(ctx)).collect()
        };
        Ok(match self {
            Expr::Num(_) | Expr::Str(_) => self,
            Expr::Path(p) => {
                let pctx = ctx.with_leaf(ctx.leaf && opposite_literal);
                Expr::Path(Box::new(p.compile(&pctx)?))
            }
            Expr::Cmp(op, l, r) => {
                let (ll, rl) = (l.is_literal(), r.is_literal());
                Expr::Cmp(
                    op,
                    Box::new(l.compile_operand(ctx, rl)?),
                    Box::new(r.compile_operand(ctx, ll)?),
                )
            }
            Expr::Call(f, args) => Expr::Call(f, all(args)?),
            Expr::Arith(op, l, r) => {
                Expr::Arith(op, Box::new(l.compile(ctx)?), Box::new(r.compile(ctx)?))
            }
            Expr::Neg(e) => Expr::Neg(Box::new(e.compile(ctx)?)),
            Expr::And(v) => Expr::And(all(v)?),
            Expr::Or(v) => Expr::Or(all(v)?),
            Expr::Union(v) => Expr::Union(all(v)?),
        })
    }

    /// `true` if `last()` is called at this level. Nested paths have their own focus.
    pub fn uses_last(&self) -> bool {
        self.any_call(Func::Last)
    }

    /// `true` if `position()` or `last()` is called at this level.
    pub fn uses_focus_position(&self) -> bool {
        self.any_call(Func::Position) || self.any_call(Func::Last)
    }

    fn any_call(&self, func: Func) -> bool {
        match self {
            Expr::Num(_) | Expr::Str(_) | Expr::Path(_) => false,
            Expr::Call(f, args) => *f == func || args.iter().any(|a| a.any_call(func)),
            Expr::Cmp(_, l, r) | Expr::Arith(_, l, r) => l.any_call(func) || r.any_call(func),
            Expr::Neg(e) => e.any_call(func),
            Expr::And(v) | Expr::Or(v) | Expr::Union(v) => v.iter().any(|e| e.any_call(func)),
        }
    }

    /// `true` if the expression may evaluate to a number, which a predicate compares
    /// against the context position.
    pub fn may_be_numeric(&self) -> bool {
        match self {
            Expr::Num(_) | Expr::Arith(..) | Expr::Neg(_) => true,
            Expr::Call(f, _) => f.is_numeric(),
            _ => false,
        }
    }

    pub fn eval(&self, ctx: &EvalContext<'_>, focus: Focus) -> Result<Value, Error> {
        let data = ctx.data();
        Ok(match self {
            Expr::Num(n) => Value::Num(*n),
            Expr::Str(s) => Value::Str(s.to_string()),
            Expr::Path(p) => Value::Nodes(p.eval(ctx, &NodeSet::single(focus.pre))?),
            Expr::Union(parts) => {
                let mut out = NodeSet::empty();
                for e in parts {
                    out = out.union(&e.eval(ctx, focus)?.into_nodes()?);
                }
                Value::Nodes(out)
            }
            Expr::Cmp(op, l, r) => {
                let l = l.eval(ctx, focus)?;
                let r = r.eval(ctx, focus)?;
                Value::Bool(l.compare(*op, &r, data))
            }
            Expr::Arith(op, l, r) => {
                let l = l.eval(ctx, focus)?.to_num(data);
                let r = r.eval(ctx, focus)?.to_num(data);
                Value::Num(match op {
                    ArithOp::Add => l + r,
                    ArithOp::Sub => l - r,
                    ArithOp::Mul => l * r,
                    ArithOp::Div => l / r,
                    ArithOp::Mod => l % r,
                })
            }
            Expr::Neg(e) => Value::Num(-e.eval(ctx, focus)?.to_num(data)),
            Expr::And(v) => {
                for e in v {
                    if !e.eval(ctx, focus)?.to_bool() {
                        return Ok(Value::Bool(false));
                    }
                }
                Value::Bool(true)
            }
            Expr::Or(v) => {
                for e in v {
                    if e.eval(ctx, focus)?.to_bool() {
                        return Ok(Value::Bool(true));
                    }
                }
                Value::Bool(false)
            }
            Expr::Call(f, args) => Self::call(*f, args, ctx, focus)?,
        })
    }

    fn call(f: Func, args: &[Expr], ctx: &EvalContext<'_>, focus: Focus) -> Result<Value, Error> {
        let data = ctx.data();
        let arg = |i: usize| -> Result<Value, Error> {
            match args.get(i) {
                Some(e) => e.eval(ctx, focus),
                None => Ok(Value::Nodes(NodeSet::single(focus.pre))),
            }
        };
        Ok(match f {
            Func::Position => Value::Num(focus.pos as f64),
            Func::Last => Value::Num(focus.size as f64),
            Func::True => Value::Bool(true),
            Func::False => Value::Bool(false),
            Func::Count => Value::Num(arg(0)?.into_nodes()?.len() as f64),
            Func::Not => Value::Bool(!arg(0)?.to_bool()),
            Func::Boolean => Value::Bool(arg(0)?.to_bool()),
            Func::Number => Value::Num(arg(0)?.to_num(data)),
            Func::String => Value::Str(arg(0)?.to_str(data)),
            Func::StringLength => Value::Num(arg(0)?.to_str(data).chars().count() as f64),
            Func::Contains => {
                let hay = arg(0)?.to_str(data);
                Value::Bool(hay.contains(arg(1)?.to_str(data).as_str()))
            }
            Func::StartsWith => {
                let hay = arg(0)?.to_str(data);
                Value::Bool(hay.starts_with(arg(1)?.to_str(data).as_str()))
            }
            Func::Name => {
                let nodes = arg(0)?.into_nodes()?;
                let name = nodes.first().and_then(|p| {
                    let kind = data.kind(p);
                    match kind {
                        NodeKind::Element | NodeKind::Attribute | NodeKind::ProcessingInstruction => {
                            data.name(p, kind).map(|id| data.name_of(id).to_string())
                        }
                        _ => None,
                    }
                });
                Value::Str(name.unwrap_or_default())
            }
            Func::Sum => {
                let nodes = arg(0)?.into_nodes()?;
                let sum = nodes
                    .iter()
                    .map(|p| value::parse_number(&data.string_value(p)))
                    .sum();
                Value::Num(sum)
            }
        })
    }

    /// Evaluate against a whole context set. Paths and unions take every context node as
    /// input; other expressions see the first context node.
    pub fn eval_set(&self, ctx: &EvalContext<'_>, input: &NodeSet) -> Result<Value, Error> {
        match self {
            Expr::Path(p) => Ok(Value::Nodes(p.eval(ctx, input)?)),
            Expr::Union(parts) => {
                let mut out = NodeSet::empty();
                for e in parts {
                    out = out.union(&e.eval_set(ctx, input)?.into_nodes()?);
                }
                Ok(Value::Nodes(out))
            }
            _ => self.eval(ctx, Focus::single(input.first().unwrap_or(0))),
        }
    }
}

impl Value {
    pub fn into_nodes(self) -> Result<NodeSet, Error> {
        match self {
            Value::Nodes(n) => Ok(n),
            other => Err(Error::from_code(
                ErrorCode::XPTY0004,
                format!("expected a node set, got {other:?}"),
            )),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, v: &[Expr], sep: &str| -> fmt::Result {
            for (i, e) in v.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{e}")?;
            }
            Ok(())
        };
        match self {
            Expr::Num(n) => f.write_str(&value::format_number(*n)),
            Expr::Str(s) => write!(f, "'{s}'"),
            Expr::Path(p) => write!(f, "{p}"),
            Expr::Call(func, args) => {
                write!(f, "{}(", func.name())?;
                join(f, args, ", ")?;
                f.write_str(")")
            }
            Expr::Cmp(op, l, r) => write!(f, "{l} {} {r}", op.symbol()),
            Expr::Arith(op, l, r) => write!(f, "({l} {} {r})", op.symbol()),
            Expr::Neg(e) => write!(f, "-{e}"),
            Expr::And(v) => join(f, v, " and "),
            Expr::Or(v) => {
                f.write_str("(")?;
                join(f, v, " or ")?;
                f.write_str(")")
            }
            Expr::Union(v) => join(f, v, " | "),
        }
    }
}
