//! GitHub search-string translation.

use super::*;
use crate::normalize::normalize;
use crate::provider_filter::{extract_provider_filter, ProviderFilter, PROVIDER_FIELD};

/// A filter compiled to a GitHub search query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GitHubQuery {
    pub query: String,
    pub provider_filter: ProviderFilter,
}

/// Compile `expr` into a GitHub search string.
///
/// Relative durations are resolved against `now`.
pub fn translate_github(expr: &Expr, now: DateTime<Utc>) -> TranslateResult<GitHubQuery> {
    let normalized = normalize(expr);
    let (remaining, provider_filter) = extract_provider_filter(&normalized)?;
    let query = match remaining {
        Some(expr) => GitHubRenderer { now }.render(&expr)?,
        None => String::new(),
    };
    Ok(GitHubQuery {
        query,
        provider_filter,
    })
}

struct GitHubRenderer {
    now: DateTime<Utc>,
}

impl GitHubRenderer {
    fn render(&self, expr: &Expr) -> TranslateResult<String> {
        match expr {
            Expr::Binary {
                op: BinaryOp::And,
                left,
                right,
            } => {
                let parts = [self.render(left)?, self.render(right)?];
                Ok(parts
                    .iter()
                    .map(|part| part.trim())
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join(" "))
            }
            Expr::Binary {
                op: BinaryOp::Or,
                left,
                right,
            } => {
                let left = self.render(left)?;
                let right = self.render(right)?;
                if left.trim().is_empty() || right.trim().is_empty() {
                    return Err(TranslateError::EmptyOrOperand);
                }
                Ok(format!("({} OR {})", left.trim(), right.trim()))
            }
            Expr::Unary {
                negate: false,
                inner,
            } => self.render(inner),
            Expr::Unary {
                negate: true,
                inner,
            } => match inner.as_ref() {
                Expr::Predicate(pred) => self.negated_predicate(pred),
                _ => Err(TranslateError::NegatedComposite),
            },
            Expr::Predicate(pred) => self.predicate(pred),
        }
    }

    fn predicate(&self, pred: &Predicate) -> TranslateResult<String> {
        let field = pred.field_key();
        if field == PROVIDER_FIELD {
            return Err(unsupported(&field, pred.op));
        }
        match (&pred.op, &pred.operand) {
            (PredicateOp::Compare(op), Operand::Single(value)) => self.compare(&field, *op, value),
            (PredicateOp::Membership(op), Operand::List(values)) => {
                self.membership(&field, *op, values)
            }
            // `not in last(..)` survives normalization and has no search form
            (op, _) => Err(unsupported(&field, *op)),
        }
    }

    /// `not` over a single predicate. Membership flips its operator since
    /// a parenthesized OR group cannot be negated in search syntax.
    fn negated_predicate(&self, pred: &Predicate) -> TranslateResult<String> {
        if let (PredicateOp::Membership(op), Operand::List(values)) = (&pred.op, &pred.operand) {
            let flipped = match op {
                MembershipOp::In => MembershipOp::NotIn,
                MembershipOp::NotIn => MembershipOp::In,
            };
            let field = pred.field_key();
            if field == PROVIDER_FIELD {
                return Err(unsupported(&field, pred.op));
            }
            return self.membership(&field, flipped, values);
        }

        let field = pred.field_key();
        if let (PredicateOp::Compare(CompareOp::Ne), Operand::Single(value)) =
            (&pred.op, &pred.operand)
        {
            if NEGATABLE_FIELDS.contains(&field.as_str()) {
                return self.compare(&field, CompareOp::Eq, value);
            }
        }
        Ok(format!("-{}", self.predicate(pred)?))
    }

    fn compare(&self, field: &str, op: CompareOp, value: &Value) -> TranslateResult<String> {
        match field {
            "project" => negatable("repo", field, op, string_value(field, value)?),
            "state" => negatable("is", field, op, string_value(field, value)?),
            "type" => {
                let value = string_value(field, value)?;
                match op {
                    CompareOp::Eq => Ok(format!("is:{}", value)),
                    _ => Err(unsupported(field, PredicateOp::Compare(op))),
                }
            }
            "author" | "assignee" | "review_requested" | "involves" => {
                let qualifier = field.replace('_', "-");
                negatable(&qualifier, field, op, string_value(field, value)?)
            }
            "label" => negatable("label", field, op, string_value(field, value)?),
            "draft" | "archived" => {
                let flag = bool_value(field, value)?;
                negatable(field, field, op, if flag { "true" } else { "false" })
            }
            "updated" | "created" => {
                let date = date_from_value(field, value, self.now)?;
                Ok(format!("{}:{}{}", field, op.as_str(), date))
            }
            "text" => {
                let text = string_value(field, value)?;
                match op {
                    // a bare leading `-` would read as an exclusion
                    CompareOp::Eq if text.contains([' ', '\t']) || text.starts_with('-') => {
                        Ok(format!("{:?}", text))
                    }
                    CompareOp::Eq => Ok(text.to_string()),
                    _ => Err(unsupported(field, PredicateOp::Compare(op))),
                }
            }
            _ => Err(unsupported(field, PredicateOp::Compare(op))),
        }
    }

    fn membership(
        &self,
        field: &str,
        op: MembershipOp,
        values: &[Value],
    ) -> TranslateResult<String> {
        if !matches!(field, "label" | "project" | "state") {
            return Err(unsupported(field, PredicateOp::Membership(op)));
        }
        if values.is_empty() {
            return Err(TranslateError::EmptyList {
                field: field.to_string(),
            });
        }

        let parts = values
            .iter()
            .map(|value| self.compare(field, CompareOp::Eq, value))
            .collect::<TranslateResult<Vec<_>>>()?;

        Ok(match op {
            MembershipOp::In => format!("({})", parts.join(" OR ")),
            MembershipOp::NotIn => parts
                .iter()
                .map(|part| format!("-{}", part.trim_start_matches('-')))
                .collect::<Vec<_>>()
                .join(" "),
        })
    }
}

/// Fields whose `!=` form renders as a `-qualifier:value` exclusion.
const NEGATABLE_FIELDS: &[&str] = &[
    "project",
    "state",
    "author",
    "assignee",
    "review_requested",
    "involves",
    "label",
    "draft",
    "archived",
];

fn negatable(qualifier: &str, field: &str, op: CompareOp, value: &str) -> TranslateResult<String> {
    match op {
        CompareOp::Eq => Ok(format!("{}:{}", qualifier, value)),
        CompareOp::Ne => Ok(format!("-{}:{}", qualifier, value)),
        _ => Err(unsupported(field, PredicateOp::Compare(op))),
    }
}

fn unsupported(field: &str, op: PredicateOp) -> TranslateError {
    UnsupportedPredicateError::new(Backend::GitHub, field, op).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_filter;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 10, 12, 0, 0).unwrap()
    }

    fn github(source: &str) -> TranslateResult<GitHubQuery> {
        translate_github(&parse_filter(source).unwrap(), now())
    }

    fn query(source: &str) -> String {
        github(source).unwrap().query
    }

    #[test]
    fn test_basic_and_chain() {
        assert_eq!(
            query(r#"project = "org/repo" and state = "open" and author = "@me""#),
            "repo:org/repo is:open author:@me"
        );
        assert_eq!(query(r#"author = "me""#), "author:@me");
    }

    #[test]
    fn test_date_comparisons() {
        assert_eq!(query("updated >= 2025-12-01"), "updated:>=2025-12-01");
        assert_eq!(query("created < 2025-01-31"), "created:<2025-01-31");
        assert_eq!(query("updated >= -7d"), "updated:>=2025-12-03");
        assert_eq!(query("updated in last(2w)"), "updated:>=2025-11-26");
        assert_eq!(query("Created = last(1d)"), "created:>=2025-12-09");
    }

    #[test]
    fn test_membership() {
        assert_eq!(query(r#"label in ["a", "b"]"#), "(label:a OR label:b)");
        assert_eq!(
            query(r#"label not in ["wip", "blocked"]"#),
            "-label:wip -label:blocked"
        );
        assert_eq!(
            query(r#"state in ["open", "merged"] and project in ["o/a"]"#),
            "(is:open OR is:merged) (repo:o/a)"
        );
    }

    #[test]
    fn test_or_and_negation() {
        assert_eq!(
            query(r#"label = "a" or author = "bob""#),
            "(label:a OR author:bob)"
        );
        assert_eq!(query(r#"not label = "wip""#), "-label:wip");
        assert_eq!(query(r#"!assignee != "bob""#), "assignee:bob");
        assert_eq!(query(r#"not label in ["a", "b"]"#), "-label:a -label:b");
        assert_eq!(query("not updated >= 2025-12-01"), "-updated:>=2025-12-01");
        assert_eq!(query("not updated != 2025-12-01"), "-updated:!=2025-12-01");
        assert_eq!(
            github(r#"not (label = "a" and state = "open")"#).unwrap_err(),
            TranslateError::NegatedComposite
        );
    }

    #[test]
    fn test_negated_text_keeps_leading_dash() {
        assert_eq!(query(r#"text = "-wip""#), r#""-wip""#);
        assert_eq!(query(r#"not text = "-wip""#), r#"-"-wip""#);
        assert_eq!(query(r#"not text = "flaky""#), "-flaky");
        assert_eq!(query(r#"not text = "flaky test""#), r#"-"flaky test""#);
    }

    #[test]
    fn test_qualifier_table() {
        assert_eq!(query(r#"review_requested = "alice""#), "review-requested:alice");
        assert_eq!(query(r#"involves != "bob""#), "-involves:bob");
        assert_eq!(query(r#"type = "pr""#), "is:pr");
        assert_eq!(query("draft = true and archived != false"), "draft:true -archived:false");
        assert_eq!(query(r#"text = "flaky test""#), r#""flaky test""#);
        assert_eq!(query(r#"text = "flaky""#), "flaky");
    }

    #[test]
    fn test_provider_predicates_are_extracted() {
        let result = github(r#"provider in ["github:github.com"] and state = "open""#).unwrap();
        assert_eq!(result.query, "is:open");
        assert_eq!(result.provider_filter.include, vec!["github:github.com"]);

        let result = github(r#"provider = "github""#).unwrap();
        assert_eq!(result.query, "");
    }

    #[test]
    fn test_or_with_empty_side() {
        assert_eq!(
            github(r#"provider = "github" or provider = "gitlab""#)
                .unwrap()
                .query,
            ""
        );
        let err = github(r#"label = "a" or (provider = "x" and provider = "y")"#).unwrap_err();
        assert_eq!(
            err,
            TranslateError::ProviderFilter(crate::ProviderFilterError::CombinedWithOr)
        );
    }

    #[test]
    fn test_unsupported_predicates() {
        let err = github(r#"type != "pr""#).unwrap_err();
        assert_eq!(
            err,
            TranslateError::Unsupported(UnsupportedPredicateError {
                backend: Backend::GitHub,
                field: "type".to_string(),
                operator: "!=".to_string(),
            })
        );
        assert!(matches!(
            github(r#"milestone = "v1""#).unwrap_err(),
            TranslateError::Unsupported(_)
        ));
        assert!(matches!(
            github(r#"author in ["a", "b"]"#).unwrap_err(),
            TranslateError::Unsupported(_)
        ));
        assert!(matches!(
            github("updated not in last(7d)").unwrap_err(),
            TranslateError::Unsupported(_)
        ));
        assert!(matches!(
            github(r#"label > "a""#).unwrap_err(),
            TranslateError::Unsupported(_)
        ));
    }

    #[test]
    fn test_value_type_errors() {
        assert_eq!(
            github("label = 3").unwrap_err().to_string(),
            "expected string value for label"
        );
        assert_eq!(
            github(r#"draft = "yes""#).unwrap_err().to_string(),
            "expected boolean value for draft"
        );
        assert_eq!(
            github("label in []").unwrap_err(),
            TranslateError::EmptyList {
                field: "label".to_string()
            }
        );
    }
}
