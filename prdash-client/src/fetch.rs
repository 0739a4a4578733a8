//! Per-section fan-out over every configured provider instance.

use crate::cache::ProviderCaches;
use crate::config::{ClientSettings, DashConfig, SectionConfig, SectionKind};
use crate::error::ClientResult;
use crate::github::{GitHubClient, DEFAULT_SEARCH_LIMIT};
use crate::gitlab::GitLabClient;
use futures_util::future::join_all;
use prdash_core::{filter_instances, Issue, Page, ProviderInstance, ProviderKind, PullRequest};
use prdash_dsl::{extract_provider_filter, normalize, parse_filter};
use std::sync::Arc;

/// Items fetched for one section from one provider.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionItems {
    PullRequests(Page<PullRequest>),
    Issues(Page<Issue>),
}

impl SectionItems {
    pub fn len(&self) -> usize {
        match self {
            SectionItems::PullRequests(page) => page.items.len(),
            SectionItems::Issues(page) => page.items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_count(&self) -> u64 {
        match self {
            SectionItems::PullRequests(page) => page.total_count,
            SectionItems::Issues(page) => page.total_count,
        }
    }
}

/// Result of one provider for one section.
#[derive(Debug)]
pub struct ProviderOutcome {
    pub provider_id: String,
    pub display_name: String,
    pub result: ClientResult<SectionItems>,
}

/// Owns the provider clients, their shared caches and the configured
/// instances.
#[derive(Debug, Clone)]
pub struct Dashboard {
    gitlab: GitLabClient,
    github: GitHubClient,
    instances: Vec<ProviderInstance>,
}

impl Dashboard {
    pub fn new(settings: &ClientSettings, instances: Vec<ProviderInstance>) -> ClientResult<Self> {
        let caches = Arc::new(ProviderCaches::new());
        Ok(Self {
            gitlab: GitLabClient::new(settings, Arc::clone(&caches))?,
            github: GitHubClient::new(settings, caches)?,
            instances,
        })
    }

    pub fn from_config(config: &DashConfig) -> ClientResult<Self> {
        let instances = config.provider_instances()?;
        Self::new(&ClientSettings::from_config(config), instances)
    }

    pub fn instances(&self) -> &[ProviderInstance] {
        &self.instances
    }

    pub fn gitlab(&self) -> &GitLabClient {
        &self.gitlab
    }

    pub fn github(&self) -> &GitHubClient {
        &self.github
    }

    /// Fetch `section` from the selected instances concurrently, in
    /// selection order. A failing provider does not affect the others.
    pub async fn fetch_section(&self, section: &SectionConfig) -> Vec<ProviderOutcome> {
        let selected = self.select_instances(&section.filter);
        let fetches = selected
            .iter()
            .map(|instance| self.fetch_instance(instance, section));
        join_all(fetches).await.into_iter().flatten().collect()
    }

    /// Instances the filter's `provider` predicates route to, ordered by
    /// id or by include pattern.
    ///
    /// A filter that does not parse selects every instance so each one
    /// reports the error itself.
    pub fn select_instances(&self, filter: &str) -> Vec<ProviderInstance> {
        if filter.trim().is_empty() {
            return filter_instances(&self.instances, &[], &[]);
        }
        let provider_filter = parse_filter(filter)
            .ok()
            .and_then(|expr| extract_provider_filter(&normalize(&expr)).ok())
            .map(|(_, provider_filter)| provider_filter)
            .unwrap_or_default();
        filter_instances(
            &self.instances,
            &provider_filter.include,
            &provider_filter.exclude,
        )
    }

    async fn fetch_instance(
        &self,
        instance: &ProviderInstance,
        section: &SectionConfig,
    ) -> Option<ProviderOutcome> {
        let limit = Some(section.limit.unwrap_or(DEFAULT_SEARCH_LIMIT));
        tracing::debug!(
            provider = %instance.id,
            section = %section.title,
            "Fetching section"
        );
        let result = match (instance.kind, section.kind) {
            (ProviderKind::GitLab, SectionKind::Prs) => self
                .gitlab
                .fetch_merge_requests(instance, &section.filter, limit)
                .await
                .map(|page| page.map(SectionItems::PullRequests)),
            (ProviderKind::GitLab, SectionKind::Issues) => self
                .gitlab
                .fetch_issues(instance, &section.filter, limit)
                .await
                .map(|page| page.map(SectionItems::Issues)),
            (ProviderKind::GitHub, SectionKind::Prs) => self
                .github
                .fetch_pull_requests(instance, &section.filter, limit)
                .await
                .map(|page| page.map(SectionItems::PullRequests)),
            (ProviderKind::GitHub, SectionKind::Issues) => self
                .github
                .fetch_issues(instance, &section.filter, limit)
                .await
                .map(|page| page.map(SectionItems::Issues)),
        };

        let result = match result {
            Ok(Some(items)) => Ok(items),
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(
                    provider = %instance.id,
                    section = %section.title,
                    error = %err,
                    "Section fetch failed"
                );
                Err(err)
            }
        };
        Some(ProviderOutcome {
            provider_id: instance.id.clone(),
            display_name: instance.display_name.clone(),
            result,
        })
    }
}
