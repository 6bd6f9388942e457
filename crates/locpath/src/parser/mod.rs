use std::sync::Arc;

use pest::Parser;
use pest::iterators::Pair;

use crate::error::Error;
use crate::path::Axis;

pub mod ast;

#[derive(pest_derive::Parser)]
#[grammar = "locpath.pest"]
pub struct LocPathParser;

/// Parse a query into its syntax tree.
pub fn parse_query(input: &str) -> Result<ast::Expr, Error> {
    LocPathParser::parse_to_ast(input)
}

impl LocPathParser {
    pub fn parse_to_ast(input: &str) -> Result<ast::Expr, Error> {
        let mut pairs = Self::parse(Rule::query, input).map_err(|e| {
            Error::syntax(e.to_string())
                .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
        })?;
        let query = pairs.next().ok_or_else(|| Error::syntax("empty query"))?;
        let expr = query
            .into_inner()
            .find(|p| p.as_rule() == Rule::expr)
            .ok_or_else(|| Error::syntax("empty query"))?;
        Self::build_expr(expr)
    }

    fn build_expr(pair: Pair<Rule>) -> Result<ast::Expr, Error> {
        match pair.as_rule() {
            Rule::expr | Rule::path_expr | Rule::location_path => {
                let inner = pair.into_inner().next().ok_or_else(|| Error::syntax("empty expression"))?;
                Self::build_expr(inner)
            }
            Rule::or_expr
            | Rule::and_expr
            | Rule::eq_expr
            | Rule::rel_expr
            | Rule::add_expr
            | Rule::mul_expr => Self::build_chain(pair),
            Rule::unary_expr => {
                let mut negs = 0;
                let mut operand = None;
                for p in pair.into_inner() {
                    match p.as_rule() {
                        Rule::neg => negs += 1,
                        _ => operand = Some(Self::build_expr(p)?),
                    }
                }
                let mut e = operand.ok_or_else(|| Error::syntax("missing operand"))?;
                for _ in 0..negs {
                    e = ast::Expr::Negate(Box::new(e));
                }
                Ok(e)
            }
            Rule::union_expr => {
                let mut parts = pair
                    .into_inner()
                    .map(Self::build_expr)
                    .collect::<Result<Vec<_>, _>>()?;
                if parts.len() == 1 {
                    if let Some(e) = parts.pop() {
                        return Ok(e);
                    }
                }
                Ok(ast::Expr::Union(parts))
            }
            Rule::primary_expr => {
                let inner = pair.into_inner().next().ok_or_else(|| Error::syntax("empty expression"))?;
                Self::build_expr(inner)
            }
            Rule::number => {
                let v = pair
                    .as_str()
                    .parse::<f64>()
                    .map_err(|_| Error::syntax(format!("invalid number '{}'", pair.as_str())))?;
                Ok(ast::Expr::Literal(ast::Literal::Number(v)))
            }
            Rule::literal => Ok(ast::Expr::Literal(ast::Literal::String(Self::literal_text(pair)))),
            Rule::function_call => {
                let mut inner = pair.into_inner();
                let name = inner
                    .next()
                    .map(|p| p.as_str().to_string())
                    .ok_or_else(|| Error::syntax("missing function name"))?;
                let args = inner.map(Self::build_expr).collect::<Result<Vec<_>, _>>()?;
                Ok(ast::Expr::FunctionCall { name, args })
            }
            Rule::absolute_path => {
                let mut start = ast::PathStart::Root;
                let mut steps = Vec::new();
                for p in pair.into_inner() {
                    match p.as_rule() {
                        Rule::root_descendant => start = ast::PathStart::RootDescendant,
                        Rule::root => start = ast::PathStart::Root,
                        Rule::relative_path => steps = Self::build_steps(p)?,
                        _ => return Err(Self::unexpected(&p)),
                    }
                }
                Ok(ast::Expr::Path(ast::PathExpr { start, steps }))
            }
            Rule::relative_path => Ok(ast::Expr::Path(ast::PathExpr {
                start: ast::PathStart::Relative,
                steps: Self::build_steps(pair)?,
            })),
            _ => Err(Self::unexpected(&pair)),
        }
    }

    /// Left-associative operator chain: `operand (op operand)*`.
    fn build_chain(pair: Pair<Rule>) -> Result<ast::Expr, Error> {
        let mut inner = pair.into_inner();
        let first = inner.next().ok_or_else(|| Error::syntax("missing operand"))?;
        let mut left = Self::build_expr(first)?;
        while let Some(op) = inner.next() {
            let op = Self::binary_op(&op)?;
            let right = inner.next().ok_or_else(|| Error::syntax("missing right operand"))?;
            left = ast::Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(Self::build_expr(right)?),
            };
        }
        Ok(left)
    }

    fn binary_op(pair: &Pair<Rule>) -> Result<ast::BinaryOp, Error> {
        use ast::BinaryOp as B;
        Ok(match (pair.as_rule(), pair.as_str()) {
            (Rule::K_OR, _) => B::Or,
            (Rule::K_AND, _) => B::And,
            (_, "=") => B::Eq,
            (_, "!=") => B::Ne,
            (_, "<") => B::Lt,
            (_, "<=") => B::Le,
            (_, ">") => B::Gt,
            (_, ">=") => B::Ge,
            (_, "+") => B::Add,
            (_, "-") => B::Sub,
            (_, "*") => B::Mul,
            (_, "div") => B::Div,
            (_, "mod") => B::Mod,
            _ => return Err(Self::unexpected(pair)),
        })
    }

    fn build_steps(pair: Pair<Rule>) -> Result<Vec<ast::Step>, Error> {
        let mut steps = Vec::new();
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::step => steps.push(Self::build_step(p)?),
                Rule::step_sep => {
                    if p.into_inner().next().is_some_and(|s| s.as_rule() == Rule::desc_sep) {
                        steps.push(ast::Step::descendant_or_self());
                    }
                }
                _ => return Err(Self::unexpected(&p)),
            }
        }
        Ok(steps)
    }

    fn build_step(pair: Pair<Rule>) -> Result<ast::Step, Error> {
        let mut axis = Axis::Child;
        let mut test = ast::NodeTest::Node;
        let mut predicates = Vec::new();
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::abbrev_parent => axis = Axis::Parent,
                Rule::abbrev_self => axis = Axis::SelfAxis,
                Rule::axis_spec => {
                    let a = p.into_inner().next().ok_or_else(|| Error::syntax("missing axis"))?;
                    axis = match a.as_rule() {
                        Rule::abbrev_attr => Axis::Attribute,
                        _ => Axis::from_name(a.as_str())
                            .ok_or_else(|| Error::syntax(format!("unknown axis '{}'", a.as_str())))?,
                    };
                }
                Rule::node_test => test = Self::build_node_test(p)?,
                Rule::predicate => {
                    let e = p.into_inner().next().ok_or_else(|| Error::syntax("empty predicate"))?;
                    predicates.push(Self::build_expr(e)?);
                }
                _ => return Err(Self::unexpected(&p)),
            }
        }
        Ok(ast::Step {
            axis,
            test,
            predicates,
        })
    }

    fn build_node_test(pair: Pair<Rule>) -> Result<ast::NodeTest, Error> {
        let inner = pair.into_inner().next().ok_or_else(|| Error::syntax("missing node test"))?;
        let test = inner.into_inner().next().ok_or_else(|| Error::syntax("missing node test"))?;
        Ok(match test.as_rule() {
            Rule::wildcard => ast::NodeTest::Name(None),
            Rule::qname => ast::NodeTest::Name(Some(test.as_str().to_string())),
            Rule::pi_test => {
                ast::NodeTest::ProcessingInstruction(test.into_inner().next().map(Self::literal_text))
            }
            Rule::node_kind => match test.as_str() {
                "text" => ast::NodeTest::Text,
                "comment" => ast::NodeTest::Comment,
                _ => ast::NodeTest::Node,
            },
            _ => return Err(Self::unexpected(&test)),
        })
    }

    fn literal_text(pair: Pair<Rule>) -> String {
        pair.into_inner()
            .next()
            .map(|p| p.as_str().to_string())
            .unwrap_or_default()
    }

    fn unexpected(pair: &Pair<Rule>) -> Error {
        Error::syntax(format!("unexpected {:?} at '{}'", pair.as_rule(), pair.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::{BinaryOp, Expr, Literal, NodeTest, PathStart};

    fn path(input: &str) -> ast::PathExpr {
        match parse_query(input) {
            Ok(Expr::Path(p)) => p,
            other => panic!("expected a path for {input}, got {other:?}"),
        }
    }

    #[test]
    fn abbreviations_expand() {
        let p = path("//a/@id");
        assert_eq!(p.start, PathStart::RootDescendant);
        assert_eq!(p.steps.len(), 2);
        assert_eq!(p.steps[1].axis, Axis::Attribute);
        assert_eq!(p.steps[1].test, NodeTest::Name(Some("id".into())));

        let p = path("a//b/..");
        let axes: Vec<_> = p.steps.iter().map(|s| s.axis).collect();
        assert_eq!(
            axes,
            vec![Axis::Child, Axis::DescendantOrSelf, Axis::Child, Axis::Parent]
        );
    }

    #[test]
    fn keywords_and_names_do_not_collide() {
        let p = path("child::text()");
        assert_eq!(p.steps[0].test, NodeTest::Text);
        let p = path("textual");
        assert_eq!(p.steps[0].test, NodeTest::Name(Some("textual".into())));
        assert!(matches!(
            parse_query("a and b"),
            Ok(Expr::Binary { op: BinaryOp::And, .. })
        ));
        assert!(matches!(
            parse_query("2 * 3"),
            Ok(Expr::Binary { op: BinaryOp::Mul, .. })
        ));
    }

    #[test]
    fn literals() {
        assert_eq!(
            parse_query("\"x y\"").ok(),
            Some(Expr::Literal(Literal::String("x y".into())))
        );
        assert_eq!(parse_query(".5").ok(), Some(Expr::Literal(Literal::Number(0.5))));
    }
}
