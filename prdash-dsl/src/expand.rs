//! Current-user placeholder detection and substitution.

use crate::normalize::{ME_ALIAS, ME_PLACEHOLDER};
use crate::parser::*;

/// Fields whose values may name the current user.
pub const USER_FIELDS: [&str; 4] = ["author", "assignee", "review_requested", "involves"];

fn is_user_field(pred: &Predicate) -> bool {
    let key = pred.field_key();
    USER_FIELDS.contains(&key.as_str())
}

fn is_current_user_value(value: &Value) -> bool {
    match value {
        Value::String(s) => s.eq_ignore_ascii_case(ME_ALIAS) || s.eq_ignore_ascii_case(ME_PLACEHOLDER),
        _ => false,
    }
}

/// True when a user field compares against `me`/`@me` (any case).
pub fn requires_current_user(expr: &Expr) -> bool {
    expr.any_predicate(&|pred: &Predicate| {
        is_user_field(pred) && pred.values().iter().any(is_current_user_value)
    })
}

/// Replace every current-user placeholder on a user field with `username`.
pub fn expand_current_user(expr: &Expr, username: &str) -> Expr {
    match expr {
        Expr::Binary { op, left, right } => Expr::Binary {
            op: *op,
            left: Box::new(expand_current_user(left, username)),
            right: Box::new(expand_current_user(right, username)),
        },
        Expr::Unary { negate, inner } => Expr::Unary {
            negate: *negate,
            inner: Box::new(expand_current_user(inner, username)),
        },
        Expr::Predicate(pred) if is_user_field(pred) => {
            let substitute = |value: &Value| {
                if is_current_user_value(value) {
                    Value::String(username.to_string())
                } else {
                    value.clone()
                }
            };
            let operand = match &pred.operand {
                Operand::Single(value) => Operand::Single(substitute(value)),
                Operand::List(values) => Operand::List(values.iter().map(substitute).collect()),
            };
            Expr::Predicate(Predicate {
                field: pred.field.clone(),
                op: pred.op,
                operand,
            })
        }
        Expr::Predicate(_) => expr.clone(),
    }
}
