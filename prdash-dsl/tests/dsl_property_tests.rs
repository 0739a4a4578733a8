//! Property-Based Tests for the Filter DSL
//!
//! Properties:
//! - Printing any expression and parsing the text back yields the same tree
//! - Normalization is idempotent
//! - Translation never panics on well-formed trees

use chrono::{NaiveDate, TimeZone, Utc};
use prdash_dsl::parser::ast::*;
use prdash_dsl::{is_reserved, normalize, parse_filter, translate_github, translate_gitlab};
use proptest::prelude::*;

// ============================================================================
// ARBITRATORS (Generate Random AST Nodes)
// ============================================================================

/// Field identifiers that do not collide with keywords.
fn arb_field() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => prop_oneof![
            Just("author".to_string()),
            Just("assignee".to_string()),
            Just("label".to_string()),
            Just("state".to_string()),
            Just("project".to_string()),
            Just("updated".to_string()),
            Just("provider".to_string()),
        ],
        1 => "[a-zA-Z_][a-zA-Z0-9_]{0,10}".prop_filter("reserved word", |s| !is_reserved(s)),
    ]
}

fn arb_duration() -> impl Strategy<Value = DurationValue> {
    let unit = prop_oneof![
        Just(DurationUnit::Minute),
        Just(DurationUnit::Hour),
        Just(DurationUnit::Day),
        Just(DurationUnit::Week),
    ];
    (-500i64..500, unit).prop_map(|(amount, unit)| DurationValue::new(amount, unit))
}

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        3 => r#"[a-zA-Z0-9 _:@/."\\-]{0,12}"#.prop_map(Value::String),
        1 => Just(Value::String("me".to_string())),
        1 => any::<bool>().prop_map(Value::Bool),
        1 => (0i64..1_000_000).prop_map(Value::Number),
        1 => (1970i32..2100, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| {
            Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
        }),
        1 => arb_duration().prop_map(Value::Duration),
        1 => (1i64..100, arb_duration()).prop_map(|(amount, d)| {
            Value::Function(FunctionValue {
                name: "last".to_string(),
                arg: DurationValue::new(amount, d.unit),
            })
        }),
    ]
}

fn arb_compare_op() -> impl Strategy<Value = CompareOp> {
    prop_oneof![
        Just(CompareOp::Eq),
        Just(CompareOp::Ne),
        Just(CompareOp::Gt),
        Just(CompareOp::Ge),
        Just(CompareOp::Lt),
        Just(CompareOp::Le),
    ]
}

fn arb_predicate() -> impl Strategy<Value = Predicate> {
    let membership_op = prop_oneof![Just(MembershipOp::In), Just(MembershipOp::NotIn)];
    prop_oneof![
        (arb_field(), arb_compare_op(), arb_value())
            .prop_map(|(field, op, value)| Predicate::compare(field, op, value)),
        (
            arb_field(),
            membership_op,
            prop::collection::vec(arb_value(), 0..4)
        )
            .prop_map(|(field, op, values)| Predicate::membership(field, op, values)),
        (arb_field(), 1i64..60).prop_map(|(field, days)| Predicate {
            field,
            op: PredicateOp::Membership(MembershipOp::In),
            operand: Operand::Single(Value::Function(FunctionValue {
                name: "last".to_string(),
                arg: DurationValue::new(days, DurationUnit::Day),
            })),
        }),
    ]
}

/// Expressions whose printed form parses back unchanged. A non-negating
/// unary prints as its inner expression, so only negations are generated.
fn arb_expr() -> impl Strategy<Value = Expr> {
    arb_predicate()
        .prop_map(Expr::Predicate)
        .prop_recursive(4, 24, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(l, r)| Expr::and(l, r)),
                (inner.clone(), inner.clone()).prop_map(|(l, r)| Expr::or(l, r)),
                inner.prop_map(Expr::not),
            ]
        })
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Property: print → parse is the identity on trees
    #[test]
    fn prop_print_parse_round_trip(expr in arb_expr()) {
        let printed = expr.to_string();
        let reparsed = parse_filter(&printed)
            .map_err(|e| TestCaseError::fail(format!("{} failed to parse: {}", printed, e)))?;
        prop_assert_eq!(&reparsed, &expr, "round-trip changed tree for {}", printed);
    }

    /// Property: normalize(normalize(e)) == normalize(e)
    #[test]
    fn prop_normalize_idempotent(expr in arb_expr()) {
        let once = normalize(&expr);
        let twice = normalize(&once);
        prop_assert_eq!(once, twice);
    }

    /// Property: normalization leaves no `me` alias and no positive `in last(..)`
    #[test]
    fn prop_normalize_removes_sugar(expr in arb_expr()) {
        let normalized = normalize(&expr);
        let has_sugar = normalized.any_predicate(&|pred: &Predicate| {
            let sugar_op = matches!(
                pred.op,
                PredicateOp::Membership(MembershipOp::In) | PredicateOp::Compare(CompareOp::Eq)
            );
            pred.values().iter().any(|v| v.as_str() == Some("me"))
                || (sugar_op && matches!(pred.operand, Operand::Single(Value::Function(_))))
        });
        prop_assert!(!has_sugar, "sugar survived in {}", normalized);
    }

    /// Property: translators return errors instead of panicking
    #[test]
    fn prop_translators_total(expr in arb_expr()) {
        let now = Utc.with_ymd_and_hms(2025, 12, 10, 0, 0, 0).unwrap();
        let _ = translate_github(&expr, now);
        let _ = translate_gitlab(&expr, now);
    }

    /// Property: arbitrary text never panics the parser
    #[test]
    fn prop_parse_arbitrary_text(source in ".{0,64}") {
        let _ = parse_filter(&source);
    }
}
