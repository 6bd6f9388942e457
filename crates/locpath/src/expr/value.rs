//! Expression values and the XPath 1.0 conversion and comparison rules.

use super::CmpOp;
use crate::data::Data;
use crate::nodes::NodeSet;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nodes(NodeSet),
    Num(f64),
    Str(String),
    Bool(bool),
}

impl Value {
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Nodes(n) => !n.is_empty(),
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
        }
    }

    pub fn to_num(&self, data: &dyn Data) -> f64 {
        match self {
            Value::Num(n) => *n,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Str(s) => parse_number(s),
            Value::Nodes(_) => parse_number(&self.to_str(data)),
        }
    }

    pub fn to_str(&self, data: &dyn Data) -> String {
        match self {
            Value::Nodes(n) => n.first().map(|p| data.string_value(p)).unwrap_or_default(),
            Value::Num(n) => format_number(*n),
            Value::Str(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
        }
    }

    pub fn is_num(&self) -> bool {
        matches!(self, Value::Num(_))
    }

    /// General comparison: node sets compare existentially over their string values.
    pub fn compare(&self, op: CmpOp, other: &Value, data: &dyn Data) -> bool {
        match (self, other) {
            (Value::Nodes(a), Value::Nodes(b)) => {
                let right: Vec<String> = b.iter().map(|p| data.string_value(p)).collect();
                a.iter().any(|p| {
                    let l = data.string_value(p);
                    right.iter().any(|r| compare_strings(op, &l, r))
                })
            }
            (Value::Nodes(a), other) => compare_nodes(op, a, other, data, false),
            (other, Value::Nodes(b)) => compare_nodes(op, b, other, data, true),
            (l, r) => compare_atomics(op, l, r, data),
        }
    }
}

fn compare_nodes(op: CmpOp, nodes: &NodeSet, other: &Value, data: &dyn Data, flipped: bool) -> bool {
    let op = if flipped { op.mirror() } else { op };
    match other {
        Value::Bool(b) => op.apply_bool(!nodes.is_empty(), *b),
        Value::Num(n) => nodes
            .iter()
            .any(|p| op.apply_num(parse_number(&data.string_value(p)), *n)),
        Value::Str(s) => nodes
            .iter()
            .any(|p| compare_strings(op, &data.string_value(p), s)),
        Value::Nodes(_) => false,
    }
}

fn compare_strings(op: CmpOp, l: &str, r: &str) -> bool {
    match op {
        CmpOp::Eq => l == r,
        CmpOp::Ne => l != r,
        _ => op.apply_num(parse_number(l), parse_number(r)),
    }
}

fn compare_atomics(op: CmpOp, l: &Value, r: &Value, data: &dyn Data) -> bool {
    if matches!(op, CmpOp::Eq | CmpOp::Ne) {
        if matches!(l, Value::Bool(_)) || matches!(r, Value::Bool(_)) {
            return op.apply_bool(l.to_bool(), r.to_bool());
        }
        if l.is_num() || r.is_num() {
            return op.apply_num(l.to_num(data), r.to_num(data));
        }
        return compare_strings(op, &l.to_str(data), &r.to_str(data));
    }
    op.apply_num(l.to_num(data), r.to_num(data))
}

/// Parse a number the way `number()` does: optional sign, digits and one dot; anything
/// else is NaN.
pub fn parse_number(s: &str) -> f64 {
    let t = s.trim();
    let body = t.strip_prefix('-').unwrap_or(t);
    let mut digits = 0;
    let mut dots = 0;
    for c in body.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return f64::NAN,
        }
    }
    if digits == 0 || dots > 1 {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_syntax() {
        assert_eq!(parse_number(" 12 "), 12.0);
        assert_eq!(parse_number("-1.5"), -1.5);
        assert_eq!(parse_number(".5"), 0.5);
        assert!(parse_number("1e3").is_nan());
        assert!(parse_number("+1").is_nan());
        assert!(parse_number("").is_nan());
        assert!(parse_number("1.2.3").is_nan());
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
    }
}
