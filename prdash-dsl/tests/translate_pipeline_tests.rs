//! End-to-end checks of filter text through both translators.

use chrono::{DateTime, TimeZone, Utc};
use prdash_core::{ProviderInstance, ProviderKind};
use prdash_dsl::*;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 15, 9, 0, 0).unwrap()
}

fn github(source: &str) -> GitHubQuery {
    translate_github(&parse_filter(source).unwrap(), now()).unwrap()
}

fn gitlab(source: &str) -> GitLabQuery {
    translate_gitlab(&parse_filter(source).unwrap(), now()).unwrap()
}

#[test]
fn test_github_basic_query_is_time_independent() {
    let expr = parse_filter(r#"project = "org/repo" and state = "open" and author = "@me""#).unwrap();
    for at in [now(), Utc.with_ymd_and_hms(1999, 1, 1, 0, 0, 0).unwrap()] {
        assert_eq!(
            translate_github(&expr, at).unwrap().query,
            "repo:org/repo is:open author:@me"
        );
    }
}

#[test]
fn test_github_date_and_label_list() {
    assert_eq!(github("updated >= 2025-12-01").query, "updated:>=2025-12-01");
    assert_eq!(github(r#"label in ["a","b"]"#).query, "(label:a OR label:b)");
}

#[test]
fn test_gitlab_project_state_label() {
    let query = gitlab(r#"project = "group/repo" and state = "open" and label = "bug""#);
    assert_eq!(query.project_path.as_deref(), Some("group/repo"));
    assert_eq!(query.params["state"], "open");
    assert_eq!(query.params["labels"], "bug");
}

#[test]
fn test_provider_routing_through_github() {
    let query = github(r#"provider in ["github:github.com"] and state = "open""#);
    assert_eq!(query.query, "is:open");
    assert_eq!(query.provider_filter.include, vec!["github:github.com"]);

    let github_com = ProviderInstance::new(ProviderKind::GitHub, "github.com");
    let ghe = ProviderInstance::new(ProviderKind::GitHub, "ghe.example.com");
    assert!(query.provider_filter.allows(&github_com));
    assert!(!query.provider_filter.allows(&ghe));
}

#[test]
fn test_provider_or_with_content_is_rejected() {
    let expr = parse_filter(r#"provider = "github" or label = "bug""#).unwrap();
    assert_eq!(
        extract_provider_filter(&expr).unwrap_err(),
        ProviderFilterError::CombinedWithOr
    );
    assert!(matches!(
        translate_gitlab(&expr, now()).unwrap_err(),
        TranslateError::ProviderFilter(ProviderFilterError::CombinedWithOr)
    ));
}

#[test]
fn test_gitlab_not_in_never_yields_empty_params() {
    for field in ["label", "state", "author", "assignee", "project", "text", "draft"] {
        let source = format!(r#"{} not in ["x"]"#, field);
        match translate_gitlab(&parse_filter(&source).unwrap(), now()) {
            Err(TranslateError::Unsupported(err)) => {
                assert_eq!(err.backend, Backend::GitLab);
                assert_eq!(err.field, field);
                assert_eq!(err.operator, "not in");
            }
            other => panic!("{} produced {:?}", source, other),
        }
    }
}

#[test]
fn test_relative_dates_resolve_against_now() {
    assert_eq!(github("updated in last(7d)").query, "updated:>=2026-03-08");
    assert_eq!(
        gitlab("created in last(1w)").params["created_after"],
        "2026-03-08"
    );
}

#[test]
fn test_current_user_expansion_before_translation() {
    let expr = normalize(&parse_filter(r#"author = "me" and label = "bug""#).unwrap());
    assert!(requires_current_user(&expr));

    let expanded = expand_current_user(&expr, "octocat");
    assert_eq!(
        translate_github(&expanded, now()).unwrap().query,
        "author:octocat label:bug"
    );
    assert_eq!(
        translate_gitlab(&expanded, now()).unwrap().params["author_username"],
        "octocat"
    );
}

#[test]
fn test_filter_error_wraps_every_stage() {
    fn compile(source: &str) -> FilterResult<GitHubQuery> {
        validate_filter(source)?;
        let expr = parse_filter(source)?;
        Ok(translate_github(&expr, now())?)
    }

    assert!(matches!(compile("is:open"), Err(FilterError::Validation(_))));
    assert!(matches!(compile("label = #"), Err(FilterError::Parse(_))));
    assert!(matches!(
        compile(r#"milestone = "v1""#),
        Err(FilterError::Translate(TranslateError::Unsupported(_)))
    ));
    assert_eq!(compile(r#"label = "ok""#).unwrap().query, "label:ok");
}

#[test]
fn test_canonical_text_translates_identically() {
    let source = r#"State = "open" and (Label = "a" or label = "b") and not draft = true"#;
    let expr = parse_filter(source).unwrap();
    let reparsed = parse_filter(&expr.to_string()).unwrap();
    assert_eq!(
        translate_github(&expr, now()).unwrap(),
        translate_github(&reparsed, now()).unwrap()
    );
    assert_eq!(
        github(source).query,
        "is:open (label:a OR label:b) -draft:true"
    );
}
