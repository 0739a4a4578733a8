//! GitHub GraphQL client: viewer login and issue search.

use crate::cache::ProviderCaches;
use crate::config::ClientSettings;
use crate::current_user::expand_for_instance;
use crate::error::{ClientError, ClientResult};
use crate::filter::parse_section_filter;
use crate::http::{build_http_client, status_error, with_scheme};
use crate::retry::{retry_read, RetryPolicy};
use chrono::{DateTime, Utc};
use prdash_core::{
    Issue, ItemState, Page, ProviderInstance, PullRequest, WorkItemKey, WorkItemType,
};
use prdash_dsl::{translate_github, FilterError, GitHubQuery};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const PROVIDER: &str = "github";

/// Items requested when a section sets no limit.
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

/// Upper bound GitHub accepts for `first`.
const MAX_SEARCH_LIMIT: u32 = 100;

const VIEWER_QUERY: &str = "query UserCurrent { viewer { login } }";

const SEARCH_QUERY: &str = r#"query Search($query: String!, $limit: Int!) {
  search(query: $query, type: ISSUE, first: $limit) {
    issueCount
    nodes {
      __typename
      ... on PullRequest {
        number title state url createdAt updatedAt isDraft
        headRefName baseRefName
        repository { nameWithOwner }
        author { login }
        assignees(first: 10) { nodes { login } }
        labels(first: 20) { nodes { name } }
        comments { totalCount }
      }
      ... on Issue {
        number title state url createdAt updatedAt
        repository { nameWithOwner }
        author { login }
        assignees(first: 10) { nodes { login } }
        labels(first: 20) { nodes { name } }
        comments { totalCount }
      }
    }
  }
}"#;

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Serialize)]
struct GraphQlRequest<'a, V: Serialize> {
    query: &'a str,
    variables: V,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct ViewerData {
    viewer: Viewer,
}

#[derive(Deserialize)]
struct Viewer {
    #[serde(default)]
    login: String,
}

#[derive(Serialize)]
struct SearchVariables<'a> {
    query: &'a str,
    limit: u32,
}

#[derive(Deserialize)]
struct SearchData {
    search: SearchConnection,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchConnection {
    issue_count: u64,
    #[serde(default)]
    nodes: Vec<SearchNode>,
}

#[derive(Deserialize)]
#[serde(tag = "__typename")]
enum SearchNode {
    PullRequest(PullRequestNode),
    Issue(IssueNode),
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct Login {
    login: String,
}

#[derive(Deserialize)]
struct LabelName {
    name: String,
}

#[derive(Deserialize)]
struct Nodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Repository {
    name_with_owner: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TotalCount {
    total_count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestNode {
    number: u64,
    title: String,
    state: ItemState,
    url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    is_draft: bool,
    #[serde(default)]
    head_ref_name: String,
    #[serde(default)]
    base_ref_name: String,
    repository: Repository,
    author: Option<Login>,
    assignees: Nodes<Login>,
    labels: Nodes<LabelName>,
    comments: TotalCount,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueNode {
    number: u64,
    title: String,
    state: ItemState,
    url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    repository: Repository,
    author: Option<Login>,
    assignees: Nodes<Login>,
    labels: Nodes<LabelName>,
    comments: TotalCount,
}

impl PullRequestNode {
    fn into_pull_request(self, provider_id: &str) -> PullRequest {
        let repo = self.repository.name_with_owner;
        PullRequest {
            key: WorkItemKey::new(provider_id, repo.clone(), self.number, WorkItemType::PullRequest),
            title: self.title,
            state: self.state,
            url: self.url,
            repo_name_with_owner: repo,
            author: self.author.map(|a| a.login).unwrap_or_default(),
            assignees: self.assignees.nodes.into_iter().map(|a| a.login).collect(),
            labels: self.labels.nodes.into_iter().map(|l| l.name).collect(),
            head_ref: self.head_ref_name,
            base_ref: self.base_ref_name,
            is_draft: self.is_draft,
            comment_count: self.comments.total_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl IssueNode {
    fn into_issue(self, provider_id: &str) -> Issue {
        let repo = self.repository.name_with_owner;
        Issue {
            key: WorkItemKey::new(provider_id, repo.clone(), self.number, WorkItemType::Issue),
            title: self.title,
            state: self.state,
            url: self.url,
            repo_name_with_owner: repo,
            author: self.author.map(|a| a.login).unwrap_or_default(),
            assignees: self.assignees.nodes.into_iter().map(|a| a.login).collect(),
            labels: self.labels.nodes.into_iter().map(|l| l.name).collect(),
            comment_count: self.comments.total_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    caches: Arc<ProviderCaches>,
    retry: RetryPolicy,
    validate_filters: bool,
}

impl GitHubClient {
    pub fn new(settings: &ClientSettings, caches: Arc<ProviderCaches>) -> ClientResult<Self> {
        Ok(Self {
            http: build_http_client(settings)?,
            caches,
            retry: settings.retry,
            validate_filters: settings.validate_filters,
        })
    }

    /// `api.github.com` for github.com, `/api/graphql` on the host for
    /// Enterprise installs.
    pub fn graphql_endpoint(instance: &ProviderInstance) -> String {
        let host = instance.host.trim().trim_end_matches('/');
        if host.eq_ignore_ascii_case("github.com") {
            "https://api.github.com/graphql".to_string()
        } else {
            format!("{}/api/graphql", with_scheme(host))
        }
    }

    pub async fn viewer_login(&self, instance: &ProviderInstance) -> ClientResult<String> {
        let data: ViewerData = self
            .graphql(instance, VIEWER_QUERY, serde_json::json!({}))
            .await?;
        if data.viewer.login.is_empty() {
            return Err(ClientError::InvalidResponse(format!(
                "empty login for host {:?}",
                instance.host
            )));
        }
        Ok(data.viewer.login)
    }

    pub async fn fetch_pull_requests(
        &self,
        instance: &ProviderInstance,
        filter: &str,
        limit: Option<u32>,
    ) -> ClientResult<Option<Page<PullRequest>>> {
        let Some(query) = self.prepare_query(instance, filter).await? else {
            return Ok(None);
        };
        let page = self
            .search_pull_requests(instance, &query.query, limit)
            .await?;
        Ok(Some(page))
    }

    pub async fn fetch_issues(
        &self,
        instance: &ProviderInstance,
        filter: &str,
        limit: Option<u32>,
    ) -> ClientResult<Option<Page<Issue>>> {
        let Some(query) = self.prepare_query(instance, filter).await? else {
            return Ok(None);
        };
        let page = self.search_issues(instance, &query.query, limit).await?;
        Ok(Some(page))
    }

    pub async fn search_pull_requests(
        &self,
        instance: &ProviderInstance,
        query: &str,
        limit: Option<u32>,
    ) -> ClientResult<Page<PullRequest>> {
        let query = with_type_qualifier(query, WorkItemType::PullRequest);
        let search = self.search(instance, &query, limit).await?;
        let items = search
            .nodes
            .into_iter()
            .filter_map(|node| match node {
                SearchNode::PullRequest(pr) => Some(pr.into_pull_request(&instance.id)),
                _ => None,
            })
            .collect();
        Ok(Page::new(items, search.issue_count))
    }

    pub async fn search_issues(
        &self,
        instance: &ProviderInstance,
        query: &str,
        limit: Option<u32>,
    ) -> ClientResult<Page<Issue>> {
        let query = with_type_qualifier(query, WorkItemType::Issue);
        let search = self.search(instance, &query, limit).await?;
        let items = search
            .nodes
            .into_iter()
            .filter_map(|node| match node {
                SearchNode::Issue(issue) => Some(issue.into_issue(&instance.id)),
                _ => None,
            })
            .collect();
        Ok(Page::new(items, search.issue_count))
    }

    async fn search(
        &self,
        instance: &ProviderInstance,
        query: &str,
        limit: Option<u32>,
    ) -> ClientResult<SearchConnection> {
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .min(MAX_SEARCH_LIMIT);
        tracing::debug!(provider = %instance.id, query, limit, "GitHub search");
        let data: SearchData = self
            .graphql(instance, SEARCH_QUERY, SearchVariables { query, limit })
            .await?;
        Ok(data.search)
    }

    async fn prepare_query(
        &self,
        instance: &ProviderInstance,
        filter: &str,
    ) -> ClientResult<Option<GitHubQuery>> {
        let Some(expr) = parse_section_filter(filter, self.validate_filters)? else {
            return Ok(Some(GitHubQuery::default()));
        };
        let expr = expand_for_instance(expr, instance, &self.caches.current_user, || {
            self.viewer_login(instance)
        })
        .await?;
        let query = translate_github(&expr, Utc::now()).map_err(FilterError::from)?;
        if !query.provider_filter.allows(instance) {
            tracing::debug!(provider = %instance.id, "Skipped by provider filter");
            return Ok(None);
        }
        Ok(Some(query))
    }

    /// POST a GraphQL document with retries. Requires a token.
    async fn graphql<T, V>(
        &self,
        instance: &ProviderInstance,
        document: &str,
        variables: V,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
        V: Serialize,
    {
        let token = instance
            .auth_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| ClientError::MissingToken {
                provider_id: instance.id.clone(),
            })?;
        let url = Self::graphql_endpoint(instance);
        let body = serde_json::to_value(GraphQlRequest {
            query: document,
            variables,
        })?;
        let (url, body) = (&url, &body);

        retry_read(&self.retry, "graphql", || async move {
            let response = self
                .http
                .post(url)
                .bearer_auth(token)
                .json(body)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(status_error(PROVIDER, &response));
            }
            let payload = response.json::<GraphQlResponse<T>>().await?;
            if !payload.errors.is_empty() {
                let messages: Vec<String> =
                    payload.errors.into_iter().map(|e| e.message).collect();
                return Err(ClientError::GraphQl(messages.join("; ")));
            }
            payload
                .data
                .ok_or_else(|| ClientError::InvalidResponse("graphql response without data".to_string()))
        })
        .await
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("retry", &self.retry)
            .field("validate_filters", &self.validate_filters)
            .finish()
    }
}

/// Append `is:pr`/`is:issue` unless the query already names a type.
pub fn with_type_qualifier(query: &str, item_type: WorkItemType) -> String {
    let names_type = query.split_whitespace().any(|token| {
        let token = token.trim_start_matches(['(', '-']).trim_end_matches(')');
        matches!(
            token.to_ascii_lowercase().as_str(),
            "is:pr" | "is:issue" | "type:pr" | "type:issue"
        )
    });
    let query = query.trim();
    if names_type {
        return query.to_string();
    }
    let qualifier = match item_type {
        WorkItemType::PullRequest => "is:pr",
        WorkItemType::Issue => "is:issue",
    };
    if query.is_empty() {
        qualifier.to_string()
    } else {
        format!("{} {}", query, qualifier)
    }
}
