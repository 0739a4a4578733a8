//! Extraction of `provider` routing predicates from a filter.

use crate::parser::*;
use prdash_core::{matches_pattern, ProviderInstance};
use serde::Serialize;
use thiserror::Error;

/// Field name that routes a filter to provider instances.
pub const PROVIDER_FIELD: &str = "provider";

/// Include/exclude patterns selecting provider instances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl ProviderFilter {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Empty `include` allows every instance; any `exclude` match vetoes.
    pub fn allows(&self, instance: &ProviderInstance) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| matches_pattern(instance, p));
        included && !self.exclude.iter().any(|p| matches_pattern(instance, p))
    }

    fn merge(mut self, other: ProviderFilter) -> Self {
        self.include.extend(other.include);
        self.exclude.extend(other.exclude);
        self
    }
}

/// Misuse of `provider` predicates.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderFilterError {
    #[error("unsupported provider filter operator {op}")]
    UnsupportedOperator { op: String },

    #[error("provider filter values must be strings")]
    NonStringValue,

    #[error("provider filters cannot be negated")]
    Negated,

    #[error("provider filters must be combined with AND")]
    CombinedWithOr,
}

fn is_provider_predicate(pred: &Predicate) -> bool {
    pred.field_key() == PROVIDER_FIELD
}

/// Split provider predicates out of `expr`.
///
/// Returns the remaining expression (`None` when nothing but provider
/// predicates was present) and the merged filter.
pub fn extract_provider_filter(
    expr: &Expr,
) -> Result<(Option<Expr>, ProviderFilter), ProviderFilterError> {
    let extracted = extract(expr)?;
    Ok((extracted.remaining, extracted.filter))
}

struct Extracted {
    remaining: Option<Expr>,
    filter: ProviderFilter,
    has_provider: bool,
}

fn extract(expr: &Expr) -> Result<Extracted, ProviderFilterError> {
    match expr {
        Expr::Predicate(pred) if is_provider_predicate(pred) => Ok(Extracted {
            remaining: None,
            filter: filter_from_predicate(pred)?,
            has_provider: true,
        }),
        Expr::Predicate(_) => Ok(Extracted {
            remaining: Some(expr.clone()),
            filter: ProviderFilter::default(),
            has_provider: false,
        }),
        Expr::Unary { negate, inner } => {
            if *negate && inner.any_predicate(&is_provider_predicate) {
                return Err(ProviderFilterError::Negated);
            }
            let extracted = extract(inner)?;
            let remaining = if *negate {
                extracted.remaining.map(Expr::not)
            } else {
                extracted.remaining
            };
            Ok(Extracted {
                remaining,
                filter: extracted.filter,
                has_provider: extracted.has_provider,
            })
        }
        Expr::Binary { op, left, right } => {
            let left = extract(left)?;
            let right = extract(right)?;

            if *op == BinaryOp::Or
                && ((left.has_provider && right.remaining.is_some())
                    || (right.has_provider && left.remaining.is_some()))
            {
                return Err(ProviderFilterError::CombinedWithOr);
            }

            let remaining = match (left.remaining, right.remaining) {
                (Some(l), Some(r)) => Some(Expr::Binary {
                    op: *op,
                    left: Box::new(l),
                    right: Box::new(r),
                }),
                (Some(only), None) | (None, Some(only)) => Some(only),
                (None, None) => None,
            };

            Ok(Extracted {
                remaining,
                filter: left.filter.merge(right.filter),
                has_provider: left.has_provider || right.has_provider,
            })
        }
    }
}

fn filter_from_predicate(pred: &Predicate) -> Result<ProviderFilter, ProviderFilterError> {
    let patterns = pred
        .values()
        .iter()
        .map(|value| {
            value
                .as_str()
                .map(str::to_string)
                .ok_or(ProviderFilterError::NonStringValue)
        })
        .collect::<Result<Vec<_>, _>>()?;

    match (&pred.op, &pred.operand) {
        (PredicateOp::Compare(CompareOp::Eq), Operand::Single(_))
        | (PredicateOp::Membership(MembershipOp::In), Operand::List(_)) => Ok(ProviderFilter {
            include: patterns,
            exclude: Vec::new(),
        }),
        (PredicateOp::Compare(CompareOp::Ne), Operand::Single(_))
        | (PredicateOp::Membership(MembershipOp::NotIn), Operand::List(_)) => Ok(ProviderFilter {
            include: Vec::new(),
            exclude: patterns,
        }),
        (op, _) => Err(ProviderFilterError::UnsupportedOperator {
            op: op.as_str().to_string(),
        }),
    }
}
