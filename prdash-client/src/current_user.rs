//! Resolution of the `me` placeholder to a provider login.

use crate::cache::{TtlCache, CURRENT_USER_TTL};
use crate::error::{ClientError, ClientResult};
use prdash_core::ProviderInstance;
use prdash_dsl::{expand_current_user, requires_current_user, Expr};
use std::future::Future;

/// Login of the authenticated user on `instance`.
///
/// A configured `user` wins. Otherwise the cache is consulted and `lookup`
/// (the provider's identity endpoint) runs on a miss; its result is cached.
pub async fn resolve_current_user<F, Fut>(
    instance: &ProviderInstance,
    cache: &TtlCache<String>,
    lookup: F,
) -> ClientResult<String>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ClientResult<String>>,
{
    if let Some(user) = &instance.user {
        return Ok(user.clone());
    }
    if let Some(cached) = cache.get(&instance.id) {
        tracing::trace!(provider = %instance.id, "Current user cache hit");
        return Ok(cached);
    }

    let username = lookup().await.map_err(|err| ClientError::CurrentUser {
        provider_id: instance.id.clone(),
        reason: err.to_string(),
    })?;
    let username = username.trim().to_string();
    if username.is_empty() {
        return Err(ClientError::CurrentUser {
            provider_id: instance.id.clone(),
            reason: "empty username".to_string(),
        });
    }

    tracing::debug!(provider = %instance.id, user = %username, "Resolved current user");
    cache.set(instance.id.clone(), username.clone(), CURRENT_USER_TTL);
    Ok(username)
}

/// Substitute the current user into `expr` when it refers to `me`; the
/// lookup only runs in that case.
pub async fn expand_for_instance<F, Fut>(
    expr: Expr,
    instance: &ProviderInstance,
    cache: &TtlCache<String>,
    lookup: F,
) -> ClientResult<Expr>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ClientResult<String>>,
{
    if !requires_current_user(&expr) {
        return Ok(expr);
    }
    let username = resolve_current_user(instance, cache, lookup).await?;
    Ok(expand_current_user(&expr, &username))
}
