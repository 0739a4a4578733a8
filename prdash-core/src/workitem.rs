//! Pull requests and issues as returned by the provider clients.

use crate::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a work item is a pull/merge request or an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkItemType {
    #[serde(rename = "pr")]
    PullRequest,
    #[serde(rename = "issue")]
    Issue,
}

impl WorkItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkItemType::PullRequest => "pr",
            WorkItemType::Issue => "issue",
        }
    }
}

/// Identity of a work item across providers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItemKey {
    pub provider_id: String,
    pub repo_path: String,
    pub number: u64,
    pub item_type: WorkItemType,
}

impl WorkItemKey {
    pub fn new(
        provider_id: impl Into<String>,
        repo_path: impl Into<String>,
        number: u64,
        item_type: WorkItemType,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            repo_path: repo_path.into(),
            number,
            item_type,
        }
    }
}

impl fmt::Display for WorkItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = match self.item_type {
            WorkItemType::PullRequest => '!',
            WorkItemType::Issue => '#',
        };
        write!(f, "{}/{}{}{}", self.provider_id, self.repo_path, sep, self.number)
    }
}

/// Normalized item state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemState {
    Open,
    Closed,
    Merged,
}

/// Pull request (or merge request) record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub key: WorkItemKey,
    pub title: String,
    pub state: ItemState,
    pub url: String,
    pub repo_name_with_owner: String,
    pub author: String,
    pub assignees: Vec<String>,
    pub labels: Vec<String>,
    pub head_ref: String,
    pub base_ref: String,
    pub is_draft: bool,
    pub comment_count: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Issue record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub key: WorkItemKey,
    pub title: String,
    pub state: ItemState,
    pub url: String,
    pub repo_name_with_owner: String,
    pub author: String,
    pub assignees: Vec<String>,
    pub labels: Vec<String>,
    pub comment_count: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One page of fetched items plus the provider-reported total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: u64) -> Self {
        Self { items, total_count }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::new(Vec::new(), 0)
    }
}

/// Common read access over pull requests and issues.
pub trait WorkItem {
    fn key(&self) -> &WorkItemKey;
    fn title(&self) -> &str;
    fn url(&self) -> &str;
    fn repo_name_with_owner(&self) -> &str;
    fn created_at(&self) -> Timestamp;
    fn updated_at(&self) -> Timestamp;

    fn number(&self) -> u64 {
        self.key().number
    }
}

impl WorkItem for PullRequest {
    fn key(&self) -> &WorkItemKey {
        &self.key
    }
    fn title(&self) -> &str {
        &self.title
    }
    fn url(&self) -> &str {
        &self.url
    }
    fn repo_name_with_owner(&self) -> &str {
        &self.repo_name_with_owner
    }
    fn created_at(&self) -> Timestamp {
        self.created_at
    }
    fn updated_at(&self) -> Timestamp {
        self.updated_at
    }
}

impl WorkItem for Issue {
    fn key(&self) -> &WorkItemKey {
        &self.key
    }
    fn title(&self) -> &str {
        &self.title
    }
    fn url(&self) -> &str {
        &self.url
    }
    fn repo_name_with_owner(&self) -> &str {
        &self.repo_name_with_owner
    }
    fn created_at(&self) -> Timestamp {
        self.created_at
    }
    fn updated_at(&self) -> Timestamp {
        self.updated_at
    }
}

/// Map a GitLab merge-request state onto [`ItemState`].
pub fn merge_request_state(state: &str) -> ItemState {
    match state.to_ascii_lowercase().as_str() {
        "merged" => ItemState::Merged,
        "closed" => ItemState::Closed,
        _ => ItemState::Open,
    }
}

/// Map a GitLab issue state onto [`ItemState`].
pub fn issue_state(state: &str) -> ItemState {
    if state.eq_ignore_ascii_case("closed") {
        ItemState::Closed
    } else {
        ItemState::Open
    }
}

/// Derive a project path from a GitLab reference (`group/repo!12`) or, failing
/// that, from the web URL (`https://host/group/repo/-/merge_requests/12`).
pub fn project_path_from_reference(reference: &str, web_url: &str) -> String {
    if let Some(idx) = reference.find(['!', '#']) {
        let path = reference[..idx].trim();
        if !path.is_empty() {
            return path.to_string();
        }
    }
    let without_scheme = web_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(web_url);
    let path = without_scheme
        .split_once('/')
        .map(|(_, rest)| rest)
        .unwrap_or("");
    match path.split_once("/-/") {
        Some((project, _)) => project.trim_matches('/').to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_key_display() {
        let key = WorkItemKey::new("gitlab:gitlab.com", "group/repo", 12, WorkItemType::PullRequest);
        assert_eq!(key.to_string(), "gitlab:gitlab.com/group/repo!12");
        let key = WorkItemKey::new("github:github.com", "org/repo", 3, WorkItemType::Issue);
        assert_eq!(key.to_string(), "github:github.com/org/repo#3");
    }

    #[test]
    fn test_state_mapping() {
        assert_eq!(merge_request_state("merged"), ItemState::Merged);
        assert_eq!(merge_request_state("closed"), ItemState::Closed);
        assert_eq!(merge_request_state("opened"), ItemState::Open);
        assert_eq!(merge_request_state("locked"), ItemState::Open);
        assert_eq!(issue_state("closed"), ItemState::Closed);
        assert_eq!(issue_state("opened"), ItemState::Open);
    }

    #[test]
    fn test_project_path_from_reference() {
        assert_eq!(project_path_from_reference("group/sub/repo!42", ""), "group/sub/repo");
        assert_eq!(project_path_from_reference("group/repo#7", ""), "group/repo");
        assert_eq!(
            project_path_from_reference(
                "!42",
                "https://gitlab.example.com/group/repo/-/merge_requests/42"
            ),
            "group/repo"
        );
        assert_eq!(project_path_from_reference("", "https://gitlab.example.com/"), "");
    }

    #[test]
    fn test_work_item_type_serde() {
        let json = serde_json::to_string(&WorkItemType::PullRequest).unwrap();
        assert_eq!(json, "\"pr\"");
    }
}
