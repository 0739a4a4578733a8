//! Pretty printer for filter expressions
//!
//! Prints canonical DSL source. Every binary node is parenthesized so the
//! printed text parses back to the same tree.

use crate::parser::*;
use std::fmt::{self, Write};

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::And => f.write_str("and"),
            BinaryOp::Or => f.write_str("or"),
        }
    }
}

impl fmt::Display for PredicateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DurationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write_quoted(f, s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Duration(d) => write!(f, "{}", d),
            Value::Function(func) => write!(f, "{}({})", func.name, func.arg),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ", self.field, self.op)?;
        match &self.operand {
            Operand::Single(value) => write!(f, "{}", value),
            Operand::List(values) => {
                f.write_char('[')?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_char(']')
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Binary { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Expr::Unary {
                negate: true,
                inner,
            } => write!(f, "not {}", inner),
            Expr::Unary {
                negate: false,
                inner,
            } => write!(f, "{}", inner),
            Expr::Predicate(pred) => write!(f, "{}", pred),
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(source: &str) -> String {
        let expr = parse_filter(source).unwrap();
        let printed = expr.to_string();
        assert_eq!(parse_filter(&printed).unwrap(), expr, "printed: {}", printed);
        printed
    }

    #[test]
    fn test_print_predicate_forms() {
        assert_eq!(roundtrip(r#"state = "open""#), r#"state = "open""#);
        assert_eq!(roundtrip("label in []"), "label in []");
        assert_eq!(
            roundtrip(r#"label not in ["a","b"]"#),
            r#"label not in ["a", "b"]"#
        );
        assert_eq!(roundtrip("updated in LAST(7d)"), "updated in last(7d)");
        assert_eq!(roundtrip("created >= 2025-01-05"), "created >= 2025-01-05");
        assert_eq!(roundtrip("age < -2h"), "age < -2h");
    }

    #[test]
    fn test_print_composition() {
        assert_eq!(
            roundtrip(r#"a = 1 or b = 2 and not c = true"#),
            "(a = 1 or (b = 2 and not c = true))"
        );
        assert_eq!(
            roundtrip(r#"!(a = 1 or b = 2)"#),
            "not (a = 1 or b = 2)"
        );
    }

    #[test]
    fn test_print_escapes_strings() {
        assert_eq!(
            roundtrip(r#"text = "say \"hi\" \\ c:\dir""#),
            r#"text = "say \"hi\" \\ c:\\dir""#
        );
    }
}
