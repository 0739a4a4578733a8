//! GitLab REST parameter translation.
//!
//! GitLab list endpoints only filter by conjunction, so the expression must
//! be a chain of AND-ed predicates.

use super::*;
use crate::normalize::normalize;
use crate::provider_filter::{extract_provider_filter, ProviderFilter};
use std::collections::BTreeMap;

/// A filter compiled to GitLab query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GitLabQuery {
    /// `group/project` scope, resolved to a numeric id by the client.
    pub project_path: Option<String>,
    pub params: BTreeMap<String, String>,
    pub provider_filter: ProviderFilter,
}

/// Compile `expr` into GitLab list parameters.
pub fn translate_gitlab(expr: &Expr, now: DateTime<Utc>) -> TranslateResult<GitLabQuery> {
    let normalized = normalize(expr);
    let (remaining, provider_filter) = extract_provider_filter(&normalized)?;

    let mut builder = GitLabBuilder {
        now,
        project_path: None,
        params: BTreeMap::new(),
    };
    if let Some(expr) = remaining {
        builder.visit(&expr)?;
    }

    Ok(GitLabQuery {
        project_path: builder.project_path,
        params: builder.params,
        provider_filter,
    })
}

struct GitLabBuilder {
    now: DateTime<Utc>,
    project_path: Option<String>,
    params: BTreeMap<String, String>,
}

impl GitLabBuilder {
    fn visit(&mut self, expr: &Expr) -> TranslateResult<()> {
        match expr {
            Expr::Binary {
                op: BinaryOp::And,
                left,
                right,
            } => {
                self.visit(left)?;
                self.visit(right)
            }
            Expr::Binary {
                op: BinaryOp::Or, ..
            } => Err(TranslateError::OrNotSupported {
                backend: Backend::GitLab,
            }),
            Expr::Unary {
                negate: false,
                inner,
            } => self.visit(inner),
            Expr::Unary { negate: true, .. } => Err(TranslateError::NegationNotSupported {
                backend: Backend::GitLab,
            }),
            Expr::Predicate(pred) => self.predicate(pred),
        }
    }

    fn predicate(&mut self, pred: &Predicate) -> TranslateResult<()> {
        let field = pred.field_key();
        match (&pred.op, &pred.operand) {
            (PredicateOp::Compare(op), Operand::Single(value)) => self.compare(&field, *op, value),
            (PredicateOp::Membership(MembershipOp::In), Operand::List(values))
                if field == "label" =>
            {
                if values.is_empty() {
                    return Err(TranslateError::EmptyList { field });
                }
                let labels = string_values(&field, values)?;
                self.params.insert("labels".to_string(), labels.join(","));
                Ok(())
            }
            (op, _) => Err(unsupported(&field, *op)),
        }
    }

    fn compare(&mut self, field: &str, op: CompareOp, value: &Value) -> TranslateResult<()> {
        let eq_only = |op: CompareOp| -> TranslateResult<()> {
            match op {
                CompareOp::Eq => Ok(()),
                _ => Err(unsupported(field, PredicateOp::Compare(op))),
            }
        };

        match field {
            "project" => {
                eq_only(op)?;
                let path = string_value(field, value)?.trim();
                if path.is_empty() {
                    // unscoped
                    return Ok(());
                }
                match &self.project_path {
                    Some(existing) if existing != path => Err(TranslateError::ConflictingProject {
                        first: existing.clone(),
                        second: path.to_string(),
                    }),
                    _ => {
                        self.project_path = Some(path.to_string());
                        Ok(())
                    }
                }
            }
            "state" | "author" | "assignee" | "review_requested" | "label" | "text" => {
                eq_only(op)?;
                let param = match field {
                    "state" => "state",
                    "author" => "author_username",
                    "assignee" => "assignee_username",
                    "review_requested" => "reviewer_username",
                    "label" => "labels",
                    _ => "search",
                };
                self.set(param, string_value(field, value)?);
                Ok(())
            }
            "draft" => {
                eq_only(op)?;
                let flag = bool_value(field, value)?;
                self.set("wip", if flag { "true" } else { "false" });
                Ok(())
            }
            "updated" | "created" => {
                let date = date_from_value(field, value, self.now)?;
                let after = format!("{}_after", field);
                let before = format!("{}_before", field);
                match op {
                    CompareOp::Gt | CompareOp::Ge => self.set(&after, &date),
                    CompareOp::Lt | CompareOp::Le => self.set(&before, &date),
                    CompareOp::Eq => {
                        self.set(&after, &date);
                        self.set(&before, &date);
                    }
                    CompareOp::Ne => return Err(unsupported(field, PredicateOp::Compare(op))),
                }
                Ok(())
            }
            // no equivalent filter on the list endpoints
            "type" => eq_only(op),
            _ => Err(unsupported(field, PredicateOp::Compare(op))),
        }
    }

    fn set(&mut self, key: &str, value: &str) {
        self.params.insert(key.to_string(), value.to_string());
    }
}

fn unsupported(field: &str, op: PredicateOp) -> TranslateError {
    UnsupportedPredicateError::new(Backend::GitLab, field, op).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_filter;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 10, 12, 0, 0).unwrap()
    }

    fn gitlab(source: &str) -> TranslateResult<GitLabQuery> {
        translate_gitlab(&parse_filter(source).unwrap(), now())
    }

    fn param<'q>(query: &'q GitLabQuery, key: &str) -> Option<&'q str> {
        query.params.get(key).map(String::as_str)
    }

    #[test]
    fn test_project_state_label() {
        let query =
            gitlab(r#"project = "group/repo" and state = "open" and label = "bug""#).unwrap();
        assert_eq!(query.project_path.as_deref(), Some("group/repo"));
        assert_eq!(param(&query, "state"), Some("open"));
        assert_eq!(param(&query, "labels"), Some("bug"));
        assert_eq!(query.params.len(), 2);
    }

    #[test]
    fn test_user_params() {
        let query = gitlab(
            r#"author = "me" and assignee = "bob" and review_requested = "carol" and text = "crash""#,
        )
        .unwrap();
        assert_eq!(param(&query, "author_username"), Some("@me"));
        assert_eq!(param(&query, "assignee_username"), Some("bob"));
        assert_eq!(param(&query, "reviewer_username"), Some("carol"));
        assert_eq!(param(&query, "search"), Some("crash"));
    }

    #[test]
    fn test_draft_and_type() {
        let query = gitlab(r#"draft = false and type = "pr""#).unwrap();
        assert_eq!(param(&query, "wip"), Some("false"));
        assert!(!query.params.contains_key("type"));
    }

    #[test]
    fn test_date_brackets() {
        let query = gitlab("updated > 2025-11-01 and created <= 2025-12-01").unwrap();
        assert_eq!(param(&query, "updated_after"), Some("2025-11-01"));
        assert_eq!(param(&query, "created_before"), Some("2025-12-01"));

        let query = gitlab("created = 2025-06-15").unwrap();
        assert_eq!(param(&query, "created_after"), Some("2025-06-15"));
        assert_eq!(param(&query, "created_before"), Some("2025-06-15"));

        let query = gitlab("updated in last(3d)").unwrap();
        assert_eq!(param(&query, "updated_after"), Some("2025-12-07"));

        assert!(matches!(
            gitlab("updated != 2025-06-15").unwrap_err(),
            TranslateError::Unsupported(_)
        ));
    }

    #[test]
    fn test_label_membership() {
        let query = gitlab(r#"label in ["bug", "p1"]"#).unwrap();
        assert_eq!(param(&query, "labels"), Some("bug,p1"));

        assert_eq!(
            gitlab("label in []").unwrap_err(),
            TranslateError::EmptyList {
                field: "label".to_string()
            }
        );
        assert!(gitlab("label in [1]").unwrap_err().to_string().contains("string"));
    }

    #[test]
    fn test_not_in_is_unsupported() {
        for source in [
            r#"label not in ["bug"]"#,
            r#"state not in ["closed"]"#,
            r#"author not in ["bob"]"#,
            r#"milestone not in ["v1"]"#,
        ] {
            let err = gitlab(source).unwrap_err();
            match err {
                TranslateError::Unsupported(e) => {
                    assert_eq!(e.backend, Backend::GitLab);
                    assert_eq!(e.operator, "not in");
                }
                other => panic!("unexpected error for {}: {:?}", source, other),
            }
        }
    }

    #[test]
    fn test_composition_errors() {
        assert_eq!(
            gitlab(r#"label = "a" or label = "b""#).unwrap_err().to_string(),
            "gitlab translation only supports AND predicates"
        );
        assert_eq!(
            gitlab(r#"not label = "a""#).unwrap_err().to_string(),
            "gitlab translation does not support negation"
        );
    }

    #[test]
    fn test_project_conflicts() {
        let query = gitlab(r#"project = "a/b" and project = "a/b""#).unwrap();
        assert_eq!(query.project_path.as_deref(), Some("a/b"));

        assert_eq!(
            gitlab(r#"project = "a/b" and project = "c/d""#).unwrap_err(),
            TranslateError::ConflictingProject {
                first: "a/b".to_string(),
                second: "c/d".to_string(),
            }
        );
        assert!(matches!(
            gitlab(r#"project != "a/b""#).unwrap_err(),
            TranslateError::Unsupported(_)
        ));
    }

    #[test]
    fn test_blank_project_is_unscoped() {
        let query = gitlab(r#"project = "" and state = "opened""#).unwrap();
        assert!(query.project_path.is_none());
        assert_eq!(query.params.get("state").map(String::as_str), Some("opened"));

        let query = gitlab(r#"project = "a/b" and project = "  ""#).unwrap();
        assert_eq!(query.project_path.as_deref(), Some("a/b"));
    }

    #[test]
    fn test_provider_only_filter() {
        let query = gitlab(r#"provider = "gitlab:*""#).unwrap();
        assert!(query.params.is_empty());
        assert!(query.project_path.is_none());
        assert_eq!(query.provider_filter.include, vec!["gitlab:*"]);
    }
}
