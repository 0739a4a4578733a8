//! GitLab REST client (API v4).
//!
//! Reads go through [`retry_read`]; write actions are sent once.

use crate::cache::{scoped_key, ProviderCaches, PROJECT_ID_TTL};
use crate::config::ClientSettings;
use crate::current_user::expand_for_instance;
use crate::error::{ClientError, ClientResult};
use crate::filter::parse_section_filter;
use crate::http::{build_http_client, status_error, with_scheme};
use crate::retry::{retry_read, RetryPolicy};
use chrono::{DateTime, Utc};
use prdash_core::{
    issue_state, merge_request_state, project_path_from_reference, Capabilities, Issue, Page,
    ProviderInstance, PullRequest, WorkItemKey, WorkItemType,
};
use prdash_dsl::{translate_gitlab, FilterError, GitLabQuery};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

const PROVIDER: &str = "gitlab";

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct GitLabReferences {
    #[serde(default)]
    full: String,
}

#[derive(Debug, Deserialize)]
struct GitLabUserRef {
    username: String,
}

#[derive(Debug, Deserialize)]
struct GitLabMergeRequest {
    iid: u64,
    title: String,
    state: String,
    web_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    source_branch: String,
    #[serde(default)]
    target_branch: String,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    references: GitLabReferences,
    author: Option<GitLabUserRef>,
    #[serde(default)]
    assignees: Vec<GitLabUserRef>,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    work_in_progress: bool,
    #[serde(default)]
    user_notes_count: u64,
}

#[derive(Debug, Deserialize)]
struct GitLabIssue {
    iid: u64,
    title: String,
    state: String,
    web_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    references: GitLabReferences,
    author: Option<GitLabUserRef>,
    #[serde(default)]
    assignees: Vec<GitLabUserRef>,
    #[serde(default)]
    user_notes_count: u64,
}

#[derive(Debug, Deserialize)]
struct GitLabProject {
    #[serde(default)]
    id: u64,
}

#[derive(Debug, Deserialize)]
struct GitLabUser {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct GitLabCurrentUser {
    #[serde(default)]
    username: String,
}

fn usernames(users: Vec<GitLabUserRef>) -> Vec<String> {
    users.into_iter().map(|u| u.username).collect()
}

impl GitLabMergeRequest {
    fn into_pull_request(self, provider_id: &str) -> PullRequest {
        let path = project_path_from_reference(&self.references.full, &self.web_url);
        PullRequest {
            key: WorkItemKey::new(provider_id, path.clone(), self.iid, WorkItemType::PullRequest),
            title: self.title,
            state: merge_request_state(&self.state),
            url: self.web_url,
            repo_name_with_owner: path,
            author: self.author.map(|a| a.username).unwrap_or_default(),
            assignees: usernames(self.assignees),
            labels: self.labels,
            head_ref: self.source_branch,
            base_ref: self.target_branch,
            is_draft: self.draft || self.work_in_progress,
            comment_count: self.user_notes_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl GitLabIssue {
    fn into_issue(self, provider_id: &str) -> Issue {
        let path = project_path_from_reference(&self.references.full, &self.web_url);
        Issue {
            key: WorkItemKey::new(provider_id, path.clone(), self.iid, WorkItemType::Issue),
            title: self.title,
            state: issue_state(&self.state),
            url: self.web_url,
            repo_name_with_owner: path,
            author: self.author.map(|a| a.username).unwrap_or_default(),
            assignees: usernames(self.assignees),
            labels: self.labels,
            comment_count: self.user_notes_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// ============================================================================
// CLIENT
// ============================================================================

/// `state_event` values accepted by merge request and issue updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
    Close,
    Reopen,
}

impl StateEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateEvent::Close => "close",
            StateEvent::Reopen => "reopen",
        }
    }
}

#[derive(Clone)]
pub struct GitLabClient {
    http: reqwest::Client,
    caches: Arc<ProviderCaches>,
    retry: RetryPolicy,
    validate_filters: bool,
}

impl GitLabClient {
    pub fn new(settings: &ClientSettings, caches: Arc<ProviderCaches>) -> ClientResult<Self> {
        Ok(Self {
            http: build_http_client(settings)?,
            caches,
            retry: settings.retry,
            validate_filters: settings.validate_filters,
        })
    }

    /// `https://host/api/v4`, keeping an explicit scheme.
    pub fn api_base(instance: &ProviderInstance) -> String {
        format!("{}/api/v4", with_scheme(&instance.host))
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Merge requests matching `filter`; `None` when the filter routes away
    /// from this instance.
    pub async fn fetch_merge_requests(
        &self,
        instance: &ProviderInstance,
        filter: &str,
        limit: Option<u32>,
    ) -> ClientResult<Option<Page<PullRequest>>> {
        let Some(query) = self.prepare_query(instance, filter).await? else {
            return Ok(None);
        };
        let (items, total) = self
            .list::<GitLabMergeRequest>(instance, "merge_requests", query, limit)
            .await?;
        let items = items
            .into_iter()
            .map(|mr| mr.into_pull_request(&instance.id))
            .collect();
        Ok(Some(Page::new(items, total)))
    }

    /// Issues matching `filter`; `None` when the filter routes away from
    /// this instance.
    pub async fn fetch_issues(
        &self,
        instance: &ProviderInstance,
        filter: &str,
        limit: Option<u32>,
    ) -> ClientResult<Option<Page<Issue>>> {
        let Some(query) = self.prepare_query(instance, filter).await? else {
            return Ok(None);
        };
        let (items, total) = self
            .list::<GitLabIssue>(instance, "issues", query, limit)
            .await?;
        let items = items
            .into_iter()
            .map(|issue| issue.into_issue(&instance.id))
            .collect();
        Ok(Some(Page::new(items, total)))
    }

    /// Username of the token owner.
    pub async fn current_username(&self, instance: &ProviderInstance) -> ClientResult<String> {
        let (user, _) = self
            .get::<GitLabCurrentUser>(instance, "/user", &BTreeMap::new())
            .await?;
        if user.username.is_empty() {
            return Err(ClientError::InvalidResponse(
                "gitlab current user response missing username".to_string(),
            ));
        }
        Ok(user.username)
    }

    /// Numeric id of `group/project`, cached per provider.
    pub async fn project_id(&self, instance: &ProviderInstance, path: &str) -> ClientResult<u64> {
        if path.is_empty() {
            return Err(ClientError::MissingProjectPath);
        }
        let key = scoped_key(&instance.id, path);
        if let Some(id) = self.caches.project_ids.get(&key) {
            tracing::trace!(provider = %instance.id, project = path, "Project id cache hit");
            return Ok(id);
        }

        let endpoint = format!("/projects/{}", urlencoding::encode(path));
        let (project, _) = self
            .get::<GitLabProject>(instance, &endpoint, &BTreeMap::new())
            .await?;
        if project.id == 0 {
            return Err(ClientError::ProjectNotFound {
                path: path.to_string(),
            });
        }
        self.caches.project_ids.set(key, project.id, PROJECT_ID_TTL);
        Ok(project.id)
    }

    /// Parse, expand `me`, translate and apply provider routing.
    async fn prepare_query(
        &self,
        instance: &ProviderInstance,
        filter: &str,
    ) -> ClientResult<Option<GitLabQuery>> {
        let Some(expr) = parse_section_filter(filter, self.validate_filters)? else {
            return Ok(Some(GitLabQuery::default()));
        };
        let expr = expand_for_instance(expr, instance, &self.caches.current_user, || {
            self.current_username(instance)
        })
        .await?;
        let query = translate_gitlab(&expr, Utc::now()).map_err(FilterError::from)?;
        if !query.provider_filter.allows(instance) {
            tracing::debug!(provider = %instance.id, "Skipped by provider filter");
            return Ok(None);
        }
        Ok(Some(query))
    }

    async fn list<T: DeserializeOwned>(
        &self,
        instance: &ProviderInstance,
        resource: &str,
        query: GitLabQuery,
        limit: Option<u32>,
    ) -> ClientResult<(Vec<T>, u64)> {
        let mut params = query.params;
        params.insert("scope".to_string(), "all".to_string());
        if let Some(limit) = limit.filter(|l| *l > 0) {
            params.insert("per_page".to_string(), limit.to_string());
        }
        let endpoint = match &query.project_path {
            Some(path) => {
                let id = self.project_id(instance, path).await?;
                format!("/projects/{}/{}", id, resource)
            }
            None => format!("/{}", resource),
        };
        self.get::<Vec<T>>(instance, &endpoint, &params).await
    }

    /// GET with retries; returns the body and the `X-Total` header (0 when
    /// absent).
    async fn get<T: DeserializeOwned>(
        &self,
        instance: &ProviderInstance,
        endpoint: &str,
        params: &BTreeMap<String, String>,
    ) -> ClientResult<(T, u64)> {
        let url = format!("{}{}", Self::api_base(instance), endpoint);
        let url = &url;
        retry_read(&self.retry, endpoint, || async move {
            let response = self
                .request(instance, Method::GET, url)
                .query(params)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(status_error(PROVIDER, &response));
            }
            let total = response
                .headers()
                .get("x-total")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(0);
            let body = response.json::<T>().await?;
            Ok((body, total))
        })
        .await
    }

    fn request(
        &self,
        instance: &ProviderInstance,
        method: Method,
        url: &str,
    ) -> reqwest::RequestBuilder {
        let request = self.http.request(method, url);
        match &instance.auth_token {
            Some(token) => request.header("PRIVATE-TOKEN", token.as_str()),
            None => request,
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    pub async fn comment(
        &self,
        instance: &ProviderInstance,
        key: &WorkItemKey,
        body: &str,
    ) -> ClientResult<()> {
        let endpoint = format!("{}/notes", item_endpoint(key)?);
        self.send_form(instance, Method::POST, &endpoint, &[("body", body.to_string())])
            .await
    }

    /// Approve a merge request, posting `comment` first when given.
    pub async fn approve(
        &self,
        instance: &ProviderInstance,
        key: &WorkItemKey,
        comment: Option<&str>,
    ) -> ClientResult<()> {
        require_capability(instance, Capabilities::APPROVALS, "approve")?;
        require_pull_request(key, "approve")?;
        if let Some(comment) = comment.filter(|c| !c.is_empty()) {
            self.comment(instance, key, comment).await?;
        }
        let endpoint = format!("{}/approve", item_endpoint(key)?);
        self.send_form(instance, Method::POST, &endpoint, &[]).await
    }

    pub async fn merge(&self, instance: &ProviderInstance, key: &WorkItemKey) -> ClientResult<()> {
        require_capability(instance, Capabilities::MERGE, "merge")?;
        require_pull_request(key, "merge")?;
        let endpoint = format!("{}/merge", item_endpoint(key)?);
        self.send_form(instance, Method::PUT, &endpoint, &[]).await
    }

    pub async fn set_state(
        &self,
        instance: &ProviderInstance,
        key: &WorkItemKey,
        event: StateEvent,
    ) -> ClientResult<()> {
        let endpoint = item_endpoint(key)?;
        self.send_form(
            instance,
            Method::PUT,
            &endpoint,
            &[("state_event", event.as_str().to_string())],
        )
        .await
    }

    /// Replace all labels.
    pub async fn set_labels(
        &self,
        instance: &ProviderInstance,
        key: &WorkItemKey,
        labels: &[String],
    ) -> ClientResult<()> {
        require_capability(instance, Capabilities::LABELS, "set labels")?;
        let endpoint = item_endpoint(key)?;
        self.send_form(instance, Method::PUT, &endpoint, &[("labels", labels.join(","))])
            .await
    }

    /// Replace all assignees; an empty list clears them.
    pub async fn set_assignees(
        &self,
        instance: &ProviderInstance,
        key: &WorkItemKey,
        usernames: &[String],
    ) -> ClientResult<()> {
        require_capability(instance, Capabilities::ASSIGNEES, "set assignees")?;
        let endpoint = item_endpoint(key)?;
        let ids = self.user_ids(instance, usernames).await?;
        let form: Vec<(&str, String)> = if ids.is_empty() {
            vec![("assignee_ids", String::new())]
        } else {
            ids.iter().map(|id| ("assignee_ids[]", id.to_string())).collect()
        };
        self.send_form(instance, Method::PUT, &endpoint, &form).await
    }

    /// Ids for `usernames`: trimmed, blanks dropped, de-duplicated without
    /// regard to case, input order kept.
    pub async fn user_ids(
        &self,
        instance: &ProviderInstance,
        usernames: &[String],
    ) -> ClientResult<Vec<u64>> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for username in usernames.iter().map(|u| u.trim()).filter(|u| !u.is_empty()) {
            if !seen.insert(username.to_lowercase()) {
                continue;
            }
            ids.push(self.user_id(instance, username).await?);
        }
        Ok(ids)
    }

    async fn user_id(&self, instance: &ProviderInstance, username: &str) -> ClientResult<u64> {
        let key = scoped_key(&instance.id, username);
        if let Some(id) = self.caches.user_ids.get(&key) {
            return Ok(id);
        }
        let params = BTreeMap::from([("username".to_string(), username.to_string())]);
        let (users, _) = self.get::<Vec<GitLabUser>>(instance, "/users", &params).await?;
        let id = users
            .first()
            .map(|user| user.id)
            .ok_or_else(|| ClientError::UserNotFound {
                username: username.to_string(),
            })?;
        self.caches.user_ids.set_permanent(key, id);
        Ok(id)
    }

    async fn send_form(
        &self,
        instance: &ProviderInstance,
        method: Method,
        endpoint: &str,
        form: &[(&str, String)],
    ) -> ClientResult<()> {
        let url = format!("{}{}", Self::api_base(instance), endpoint);
        tracing::debug!(provider = %instance.id, %method, endpoint, "GitLab write");
        let response = self.request(instance, method, &url).form(form).send().await?;
        if !response.status().is_success() {
            return Err(status_error(PROVIDER, &response));
        }
        Ok(())
    }
}

impl std::fmt::Debug for GitLabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabClient")
            .field("retry", &self.retry)
            .field("validate_filters", &self.validate_filters)
            .finish()
    }
}

/// `/projects/:path/(merge_requests|issues)/:iid`
fn item_endpoint(key: &WorkItemKey) -> ClientResult<String> {
    if key.repo_path.is_empty() {
        return Err(ClientError::MissingProjectPath);
    }
    let collection = match key.item_type {
        WorkItemType::PullRequest => "merge_requests",
        WorkItemType::Issue => "issues",
    };
    Ok(format!(
        "/projects/{}/{}/{}",
        urlencoding::encode(&key.repo_path),
        collection,
        key.number
    ))
}

fn require_capability(
    instance: &ProviderInstance,
    capability: Capabilities,
    action: &'static str,
) -> ClientResult<()> {
    if instance.supports(capability) {
        Ok(())
    } else {
        Err(ClientError::MissingCapability {
            provider_id: instance.id.clone(),
            action,
        })
    }
}

fn require_pull_request(key: &WorkItemKey, action: &'static str) -> ClientResult<()> {
    match key.item_type {
        WorkItemType::PullRequest => Ok(()),
        item_type => Err(ClientError::UnsupportedAction { action, item_type }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prdash_core::{ItemState, ProviderKind};

    #[test]
    fn test_api_base() {
        let instance = ProviderInstance::new(ProviderKind::GitLab, "gitlab.example.com");
        assert_eq!(
            GitLabClient::api_base(&instance),
            "https://gitlab.example.com/api/v4"
        );
        let instance = ProviderInstance::new(ProviderKind::GitLab, "http://127.0.0.1:9000");
        assert_eq!(GitLabClient::api_base(&instance), "http://127.0.0.1:9000/api/v4");
    }

    #[test]
    fn test_item_endpoint() {
        let key = WorkItemKey::new("gitlab:gitlab.com", "group/sub/repo", 42, WorkItemType::PullRequest);
        assert_eq!(
            item_endpoint(&key).unwrap(),
            "/projects/group%2Fsub%2Frepo/merge_requests/42"
        );
        let key = WorkItemKey::new("gitlab:gitlab.com", "", 1, WorkItemType::Issue);
        assert!(matches!(item_endpoint(&key), Err(ClientError::MissingProjectPath)));
    }

    #[tokio::test]
    async fn test_writes_require_capability() {
        let client = GitLabClient::new(&ClientSettings::default(), Arc::default()).unwrap();
        let mut instance = ProviderInstance::new(ProviderKind::GitLab, "127.0.0.1:1");
        instance.capabilities.remove(Capabilities::APPROVALS | Capabilities::ASSIGNEES);
        let key = WorkItemKey::new(&instance.id, "g/r", 1, WorkItemType::PullRequest);

        let err = client.approve(&instance, &key, Some("lgtm")).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::MissingCapability { action: "approve", .. }
        ));
        let err = client
            .set_assignees(&instance, &key, &["alice".to_string()])
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "set assignees is not supported by gitlab:127.0.0.1:1"
        );
    }

    #[test]
    fn test_require_pull_request() {
        let key = WorkItemKey::new("gitlab:gitlab.com", "g/r", 1, WorkItemType::Issue);
        assert!(matches!(
            require_pull_request(&key, "merge"),
            Err(ClientError::UnsupportedAction { action: "merge", .. })
        ));
    }

    #[test]
    fn test_merge_request_conversion() {
        let mr: GitLabMergeRequest = serde_json::from_value(serde_json::json!({
            "iid": 7,
            "title": "Fix flaky test",
            "state": "merged",
            "web_url": "https://gitlab.com/group/repo/-/merge_requests/7",
            "created_at": "2025-12-01T10:00:00Z",
            "updated_at": "2025-12-02T10:00:00.000Z",
            "source_branch": "fix",
            "target_branch": "main",
            "labels": ["bug"],
            "references": {"full": "group/repo!7"},
            "author": {"username": "alice"},
            "assignees": [{"username": "bob"}],
            "draft": false,
            "work_in_progress": true,
            "user_notes_count": 3
        }))
        .unwrap();
        let pr = mr.into_pull_request("gitlab:gitlab.com");
        assert_eq!(pr.key.to_string(), "gitlab:gitlab.com/group/repo!7");
        assert_eq!(pr.state, ItemState::Merged);
        assert!(pr.is_draft);
        assert_eq!(pr.assignees, vec!["bob"]);
        assert_eq!(pr.comment_count, 3);
    }

    #[test]
    fn test_issue_conversion_falls_back_to_web_url() {
        let issue: GitLabIssue = serde_json::from_value(serde_json::json!({
            "iid": 3,
            "title": "Crash",
            "state": "opened",
            "web_url": "https://gitlab.com/group/repo/-/issues/3",
            "created_at": "2025-12-01T10:00:00Z",
            "updated_at": "2025-12-01T10:00:00Z",
            "author": null
        }))
        .unwrap();
        let issue = issue.into_issue("gitlab:gitlab.com");
        assert_eq!(issue.repo_name_with_owner, "group/repo");
        assert_eq!(issue.state, ItemState::Open);
        assert_eq!(issue.author, "");
    }

    #[test]
    fn test_state_event() {
        assert_eq!(StateEvent::Close.as_str(), "close");
        assert_eq!(StateEvent::Reopen.as_str(), "reopen");
    }
}
