//! Provider registry: kinds, instances, capabilities and pattern selection.

use crate::error::{ProviderError, ProviderResult};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// PROVIDER KIND
// ============================================================================

/// Code-hosting backend family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    GitHub,
    GitLab,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::GitHub => "github",
            ProviderKind::GitLab => "gitlab",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(ProviderKind::GitHub),
            "gitlab" => Ok(ProviderKind::GitLab),
            other => Err(ProviderError::UnknownKind {
                kind: other.to_string(),
            }),
        }
    }
}

// ============================================================================
// CAPABILITIES
// ============================================================================

bitflags! {
    /// Actions a provider kind supports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u16 {
        const APPROVALS = 1 << 0;
        const MERGE = 1 << 1;
        const READY = 1 << 2;
        const UPDATE_BRANCH = 1 << 3;
        const CHECKS = 1 << 4;
        const REVIEWS = 1 << 5;
        const FILES = 1 << 6;
        const LINES = 1 << 7;
        const LABELS = 1 << 8;
        const ASSIGNEES = 1 << 9;
        const REACTIONS = 1 << 10;
        const CHECKOUT = 1 << 11;
        const DIFF = 1 << 12;
    }
}

impl Capabilities {
    /// Capability set for a provider kind.
    pub fn for_kind(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::GitLab => {
                Capabilities::APPROVALS
                    | Capabilities::MERGE
                    | Capabilities::LABELS
                    | Capabilities::ASSIGNEES
            }
            ProviderKind::GitHub => Capabilities::all(),
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::empty()
    }
}

// Manual serde implementation for Capabilities (bitflags 2.x + serde)
impl Serialize for Capabilities {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Capabilities {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = u16::deserialize(deserializer)?;
        Self::from_bits(bits).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid Capabilities bits: {:#06x}", bits))
        })
    }
}

// ============================================================================
// PROVIDER INSTANCE
// ============================================================================

/// One configured code-hosting instance, identified as `kind:host`.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderInstance {
    pub id: String,
    pub kind: ProviderKind,
    pub host: String,
    pub display_name: String,
    /// Username pinned by configuration; skips the identity lookup when set.
    pub user: Option<String>,
    pub auth_token: Option<String>,
    pub authenticated: bool,
    pub capabilities: Capabilities,
}

impl ProviderInstance {
    pub fn new(kind: ProviderKind, host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            id: format!("{}:{}", kind.as_str(), host),
            kind,
            display_name: host.clone(),
            host,
            user: None,
            auth_token: None,
            authenticated: false,
            capabilities: Capabilities::for_kind(kind),
        }
    }

    /// Like [`ProviderInstance::new`], rejecting blank hosts.
    pub fn try_new(kind: ProviderKind, host: &str) -> ProviderResult<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ProviderError::EmptyHost);
        }
        Ok(Self::new(kind, host))
    }

    /// Parse an instance id of the form `kind:host`.
    pub fn from_id(id: &str) -> ProviderResult<Self> {
        let (kind, host) = id.split_once(':').ok_or(ProviderError::EmptyHost)?;
        let kind = kind.parse::<ProviderKind>()?;
        Self::try_new(kind, host)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.authenticated = !token.trim().is_empty();
        self.auth_token = Some(token);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        let user = user.into();
        self.user = if user.trim().is_empty() {
            None
        } else {
            Some(user)
        };
        self
    }

    pub fn supports(&self, capability: Capabilities) -> bool {
        self.capabilities.contains(capability)
    }
}

impl fmt::Debug for ProviderInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderInstance")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("authenticated", &self.authenticated)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

// ============================================================================
// PATTERN SELECTION
// ============================================================================

/// Check whether `pattern` selects `provider`.
///
/// Patterns are a bare kind (`gitlab`), a wildcard ending in `:*` matched as
/// an id prefix (`gitlab:*`), or an exact instance id. Blank patterns never
/// match.
pub fn matches_pattern(provider: &ProviderInstance, pattern: &str) -> bool {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return false;
    }
    let kind = provider.kind.as_str();
    if pattern == kind || pattern.strip_suffix(":*") == Some(kind) {
        return true;
    }
    if pattern.ends_with(":*") {
        return provider.id.starts_with(&pattern[..pattern.len() - 1]);
    }
    provider.id == pattern
}

fn matches_any(provider: &ProviderInstance, patterns: &[&str]) -> bool {
    patterns.iter().any(|pattern| matches_pattern(provider, pattern))
}

fn normalize_patterns(patterns: &[String]) -> Vec<&str> {
    patterns
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Select instances by include/exclude patterns.
///
/// Instances are ordered by id. A non-empty include list selects in pattern
/// order, each instance at most once; excludes are applied afterwards.
pub fn filter_instances(
    instances: &[ProviderInstance],
    include: &[String],
    exclude: &[String],
) -> Vec<ProviderInstance> {
    let include = normalize_patterns(include);
    let exclude = normalize_patterns(exclude);

    let mut ordered: Vec<&ProviderInstance> = instances.iter().collect();
    ordered.sort_by(|a, b| a.id.cmp(&b.id));

    let selected: Vec<&ProviderInstance> = if include.is_empty() {
        ordered
    } else {
        let mut seen = HashSet::new();
        let mut selected = Vec::new();
        for pattern in &include {
            for instance in &ordered {
                if seen.contains(instance.id.as_str()) {
                    continue;
                }
                if matches_pattern(instance, pattern) {
                    seen.insert(instance.id.as_str());
                    selected.push(*instance);
                }
            }
        }
        selected
    };

    selected
        .into_iter()
        .filter(|instance| !matches_any(instance, &exclude))
        .cloned()
        .collect()
}
