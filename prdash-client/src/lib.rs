//! prdash Client - Provider Access and Dashboard Fetching
//!
//! Turns section filters into provider requests and runs them:
//!
//! ```text
//! section filter ──► parse ──► expand `me` ──► translate ──┬─► GitLab REST (api/v4)
//!                              (current_user)               └─► GitHub GraphQL search
//!                                                                  │
//! Dashboard::fetch_section ◄── join_all over instances ◄───────────┘
//! ```
//!
//! Reads are retried with exponential backoff; writes are sent once.
//! Current-user logins, GitLab project ids and GitLab user ids are cached in
//! a [`ProviderCaches`] shared by both clients.

pub mod cache;
pub mod config;
pub mod current_user;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod github;
pub mod gitlab;
mod http;
pub mod retry;

pub use cache::{scoped_key, ProviderCaches, TtlCache, CURRENT_USER_TTL, PROJECT_ID_TTL};
pub use config::{
    dsl_validate_enabled, ClientSettings, ConfigError, DashConfig, ProviderConfig, RetryConfig,
    SectionConfig, SectionKind, CONFIG_ENV, FF_DSL_VALIDATE,
};
pub use current_user::{expand_for_instance, resolve_current_user};
pub use error::{ClientError, ClientResult, ErrorKind};
pub use fetch::{Dashboard, ProviderOutcome, SectionItems};
pub use filter::parse_section_filter;
pub use github::{with_type_qualifier, GitHubClient, DEFAULT_SEARCH_LIMIT};
pub use gitlab::{GitLabClient, StateEvent};
pub use retry::{retry_read, should_retry, RetryPolicy};
