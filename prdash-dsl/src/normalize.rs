//! Canonicalization of parsed filters.

use crate::parser::*;

/// Alias for the current user accepted in string values.
pub const ME_ALIAS: &str = "me";

/// Canonical current-user placeholder.
pub const ME_PLACEHOLDER: &str = "@me";

/// Rewrite aliases and sugar into primitive predicates.
///
/// * `String("me")` becomes `String("@me")` (case-sensitive).
/// * `field in last(D)` and `field = last(D)` become `field >= -D`; the
///   duration is resolved against wall-clock time at translation.
///
/// Pure and idempotent.
pub fn normalize(expr: &Expr) -> Expr {
    match expr {
        Expr::Binary { op, left, right } => Expr::Binary {
            op: *op,
            left: Box::new(normalize(left)),
            right: Box::new(normalize(right)),
        },
        Expr::Unary { negate, inner } => Expr::Unary {
            negate: *negate,
            inner: Box::new(normalize(inner)),
        },
        Expr::Predicate(pred) => Expr::Predicate(normalize_predicate(pred)),
    }
}

fn normalize_predicate(pred: &Predicate) -> Predicate {
    if let Operand::Single(Value::Function(func)) = &pred.operand {
        let rewrites = matches!(
            pred.op,
            PredicateOp::Membership(MembershipOp::In) | PredicateOp::Compare(CompareOp::Eq)
        );
        if func.name == "last" && rewrites {
            return Predicate::compare(
                pred.field.clone(),
                CompareOp::Ge,
                Value::Duration(func.arg.negated()),
            );
        }
    }

    let operand = match &pred.operand {
        Operand::Single(value) => Operand::Single(normalize_value(value)),
        Operand::List(values) => Operand::List(values.iter().map(normalize_value).collect()),
    };
    Predicate {
        field: pred.field.clone(),
        op: pred.op,
        operand,
    }
}

fn normalize_value(value: &Value) -> Value {
    match value {
        Value::String(s) if s == ME_ALIAS => Value::String(ME_PLACEHOLDER.to_string()),
        other => other.clone(),
    }
}
