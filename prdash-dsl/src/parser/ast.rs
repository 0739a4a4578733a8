//! AST types for the filter DSL

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// OPERATORS
// ============================================================================

/// Boolean composition operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    And,
    Or,
}

/// Comparison operators for predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }
}

/// List membership operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MembershipOp {
    In,
    NotIn,
}

impl MembershipOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipOp::In => "in",
            MembershipOp::NotIn => "not in",
        }
    }
}

/// Operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredicateOp {
    Compare(CompareOp),
    Membership(MembershipOp),
}

impl PredicateOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredicateOp::Compare(op) => op.as_str(),
            PredicateOp::Membership(op) => op.as_str(),
        }
    }
}

// ============================================================================
// VALUES
// ============================================================================

/// Duration unit as written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DurationUnit {
    Minute,
    Hour,
    Day,
    Week,
}

impl DurationUnit {
    pub fn from_suffix(c: char) -> Option<Self> {
        match c {
            'm' => Some(DurationUnit::Minute),
            'h' => Some(DurationUnit::Hour),
            'd' => Some(DurationUnit::Day),
            'w' => Some(DurationUnit::Week),
            _ => None,
        }
    }

    pub fn suffix(&self) -> char {
        match self {
            DurationUnit::Minute => 'm',
            DurationUnit::Hour => 'h',
            DurationUnit::Day => 'd',
            DurationUnit::Week => 'w',
        }
    }
}

/// Signed duration that keeps the unit it was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DurationValue {
    pub amount: i64,
    pub unit: DurationUnit,
}

impl DurationValue {
    pub fn new(amount: i64, unit: DurationUnit) -> Self {
        Self { amount, unit }
    }

    pub fn negated(&self) -> Self {
        Self {
            amount: self.amount.saturating_neg(),
            unit: self.unit,
        }
    }

    /// Convert to a chrono duration. `None` when out of range.
    pub fn to_chrono(&self) -> Option<chrono::Duration> {
        match self.unit {
            DurationUnit::Minute => chrono::Duration::try_minutes(self.amount),
            DurationUnit::Hour => chrono::Duration::try_hours(self.amount),
            DurationUnit::Day => chrono::Duration::try_days(self.amount),
            DurationUnit::Week => chrono::Duration::try_weeks(self.amount),
        }
    }
}

/// Function call value. `last` is the only defined name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionValue {
    /// Lower-cased function name.
    pub name: String,
    pub arg: DurationValue,
}

/// Literal values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Bool(bool),
    Number(i64),
    Date(NaiveDate),
    Duration(DurationValue),
    Function(FunctionValue),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_last_function(&self) -> bool {
        matches!(self, Value::Function(f) if f.name == "last")
    }
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

/// Right-hand side of a predicate: a single value or a bracketed list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Single(Value),
    List(Vec<Value>),
}

/// A single `field op value(s)` condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    /// Field name as written; compare through [`Predicate::field_key`].
    pub field: String,
    pub op: PredicateOp,
    pub operand: Operand,
}

impl Predicate {
    pub fn compare(field: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Self {
            field: field.into(),
            op: PredicateOp::Compare(op),
            operand: Operand::Single(value),
        }
    }

    pub fn membership(field: impl Into<String>, op: MembershipOp, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            op: PredicateOp::Membership(op),
            operand: Operand::List(values),
        }
    }

    /// Lower-cased field name used for every semantic comparison.
    pub fn field_key(&self) -> String {
        self.field.to_lowercase()
    }

    pub fn values(&self) -> &[Value] {
        match &self.operand {
            Operand::Single(value) => std::slice::from_ref(value),
            Operand::List(values) => values,
        }
    }
}

/// Filter expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        negate: bool,
        inner: Box<Expr>,
    },
    Predicate(Predicate),
}

impl Expr {
    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op: BinaryOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op: BinaryOp::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(inner: Expr) -> Self {
        Expr::Unary {
            negate: true,
            inner: Box::new(inner),
        }
    }

    /// Whether any predicate in the tree satisfies `f`.
    pub fn any_predicate<F>(&self, f: &F) -> bool
    where
        F: Fn(&Predicate) -> bool,
    {
        match self {
            Expr::Binary { left, right, .. } => left.any_predicate(f) || right.any_predicate(f),
            Expr::Unary { inner, .. } => inner.any_predicate(f),
            Expr::Predicate(pred) => f(pred),
        }
    }
}

impl From<Predicate> for Expr {
    fn from(pred: Predicate) -> Self {
        Expr::Predicate(pred)
    }
}
