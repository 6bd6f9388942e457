//! Lowering of the syntax tree into compiled expressions, and the query entry points.

use compact_str::CompactString;
use tracing::debug;

use crate::context::{CompileContext, EvalContext};
use crate::error::{Error, ErrorCode};
use crate::expr::{ArithOp, CmpOp, Expr, Func, Value};
use crate::nodes::NodeSet;
use crate::parser::{ast, parse_query};
use crate::path::{Axis, LocPath, NameTest, Pred, Principal, Root, Step, Test};

/// A parsed and compiled query, ready to be evaluated any number of times.
#[derive(Debug, Clone)]
pub struct Query {
    source: String,
    expr: Expr,
}

impl Query {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// The compiled location path if the whole query is one.
    pub fn as_path(&self) -> Option<&LocPath> {
        match &self.expr {
            Expr::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Names in the query are resolved against the document it was compiled with, so
    /// `ctx` should bind that same document.
    pub fn eval(&self, ctx: &EvalContext<'_>) -> Result<Value, Error> {
        self.expr.eval_set(ctx, ctx.context())
    }

    /// Evaluate a query that must produce nodes.
    pub fn eval_nodes(&self, ctx: &EvalContext<'_>) -> Result<NodeSet, Error> {
        self.eval(ctx)?.into_nodes()
    }
}

/// Parse, lower and compile `src` against the document bound in `ctx`.
pub fn compile_query(src: &str, ctx: &CompileContext<'_>) -> Result<Query, Error> {
    let ast = parse_query(src)?;
    let expr = lower(ast)?.compile(ctx)?;
    debug!(query = src, compiled = %expr, "compiled query");
    Ok(Query {
        source: src.to_string(),
        expr,
    })
}

/// Turn a syntax tree into an uncompiled expression.
pub fn lower(e: ast::Expr) -> Result<Expr, Error> {
    Ok(match e {
        ast::Expr::Literal(ast::Literal::Number(n)) => Expr::Num(n),
        ast::Expr::Literal(ast::Literal::String(s)) => Expr::Str(CompactString::from(s)),
        ast::Expr::FunctionCall { name, args } => {
            let func = Func::from_name(&name).ok_or_else(|| {
                Error::from_code(ErrorCode::XPST0017, format!("unknown function {name}()"))
            })?;
            let (min, max) = func.arity();
            if args.len() < min || args.len() > max {
                return Err(Error::from_code(
                    ErrorCode::XPST0017,
                    format!("{name}() does not take {} arguments", args.len()),
                ));
            }
            Expr::Call(func, args.into_iter().map(lower).collect::<Result<_, _>>()?)
        }
        ast::Expr::Binary { left, op, right } => binary(op, lower(*left)?, lower(*right)?),
        ast::Expr::Negate(e) => Expr::Neg(Box::new(lower(*e)?)),
        ast::Expr::Union(parts) => Expr::Union(parts.into_iter().map(lower).collect::<Result<_, _>>()?),
        ast::Expr::Path(p) => Expr::Path(Box::new(lower_path(p)?)),
    })
}

fn binary(op: ast::BinaryOp, l: Expr, r: Expr) -> Expr {
    use ast::BinaryOp as B;
    let cmp = |op, l, r| Expr::Cmp(op, Box::new(l), Box::new(r));
    let arith = |op, l, r| Expr::Arith(op, Box::new(l), Box::new(r));
    match op {
        B::Or => Expr::Or(flatten(l, r, true)),
        B::And => Expr::And(flatten(l, r, false)),
        B::Eq => cmp(CmpOp::Eq, l, r),
        B::Ne => cmp(CmpOp::Ne, l, r),
        B::Lt => cmp(CmpOp::Lt, l, r),
        B::Le => cmp(CmpOp::Le, l, r),
        B::Gt => cmp(CmpOp::Gt, l, r),
        B::Ge => cmp(CmpOp::Ge, l, r),
        B::Add => arith(ArithOp::Add, l, r),
        B::Sub => arith(ArithOp::Sub, l, r),
        B::Mul => arith(ArithOp::Mul, l, r),
        B::Div => arith(ArithOp::Div, l, r),
        B::Mod => arith(ArithOp::Mod, l, r),
    }
}

/// Merge nested `and`/`or` chains into one operand list.
fn flatten(l: Expr, r: Expr, or: bool) -> Vec<Expr> {
    let mut out = Vec::new();
    for e in [l, r] {
        match (e, or) {
            (Expr::Or(v), true) | (Expr::And(v), false) => out.extend(v),
            (e, _) => out.push(e),
        }
    }
    out
}

fn lower_path(p: ast::PathExpr) -> Result<LocPath, Error> {
    let mut steps = Vec::with_capacity(p.steps.len() + 1);
    let root = match p.start {
        ast::PathStart::Relative => Root::Relative,
        ast::PathStart::Root => Root::Absolute,
        ast::PathStart::RootDescendant => {
            if p.steps.is_empty() {
                return Err(Error::syntax("'//' must be followed by a step"));
            }
            steps.push(Step::new(Axis::DescendantOrSelf, Test::Node, Vec::new()));
            Root::Absolute
        }
    };
    for s in p.steps {
        let test = match s.test {
            ast::NodeTest::Name(name) => Test::Name {
                name: name.map_or(NameTest::Any, |n| NameTest::Unresolved(CompactString::from(n))),
                kind: if s.axis == Axis::Attribute {
                    Principal::Attribute
                } else {
                    Principal::Element
                },
            },
            ast::NodeTest::Text => Test::Text,
            ast::NodeTest::Comment => Test::Comment,
            ast::NodeTest::ProcessingInstruction(t) => Test::Pi(t.map(CompactString::from)),
            ast::NodeTest::Node => Test::Node,
        };
        let preds = s
            .predicates
            .into_iter()
            .map(|e| lower(e).map(Pred::simple))
            .collect::<Result<Vec<_>, _>>()?;
        steps.push(Step::new(s.axis, test, preds));
    }
    Ok(LocPath::new(root, steps))
}
