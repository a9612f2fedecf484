use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::RetryConfig;
use crate::context::CallContext;
use crate::error::Result;
use crate::store::ResourceStore;
use crate::types::{ApplicationVersion, Repository, Resource};

/// Budget for status writes rejected with a version conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            backoff: Duration::from_secs(1),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            attempts: config.attempts.max(1),
            backoff: config.backoff(),
        }
    }
}

/// Outcome of a status reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// The status was already in the desired state; nothing was written.
    Unchanged,
    /// Written on the given attempt.
    Updated { attempts: u32 },
    /// Every attempt hit a conflict; the status was left as is.
    Exhausted { attempts: u32 },
}

/// Resources whose status subresource the migration writes.
pub trait StatusResource: Resource {
    fn fetch(store: &dyn ResourceStore, ctx: &CallContext, name: &str) -> Result<Self>;
    fn write_status(store: &dyn ResourceStore, ctx: &CallContext, resource: &Self)
    -> Result<Self>;
}

impl StatusResource for Repository {
    fn fetch(store: &dyn ResourceStore, ctx: &CallContext, name: &str) -> Result<Self> {
        store.get_repository(ctx, name)
    }

    fn write_status(store: &dyn ResourceStore, ctx: &CallContext, resource: &Self) -> Result<Self> {
        store.update_repository_status(ctx, resource)
    }
}

impl StatusResource for ApplicationVersion {
    fn fetch(store: &dyn ResourceStore, ctx: &CallContext, name: &str) -> Result<Self> {
        store.get_application_version(ctx, name)
    }

    fn write_status(store: &dyn ResourceStore, ctx: &CallContext, resource: &Self) -> Result<Self> {
        store.update_application_version_status(ctx, resource)
    }
}

/// Brings the status of `name` to the desired state.
///
/// Each attempt fetches the latest copy, returns early if `is_reconciled`
/// holds for it, applies `mutate` and writes the status back. Conflicts are
/// retried up to the policy budget; any other error is returned.
pub fn reconcile_status<R: StatusResource>(
    store: &dyn ResourceStore,
    ctx: &CallContext,
    policy: &RetryPolicy,
    name: &str,
    is_reconciled: impl Fn(&R) -> bool,
    mutate: impl FnMut(&mut R),
) -> Result<Reconciled> {
    retry_on_conflict(
        ctx,
        policy,
        &format!("{} {name}", R::KIND),
        |ctx| R::fetch(store, ctx, name),
        |ctx, resource| R::write_status(store, ctx, resource),
        is_reconciled,
        mutate,
    )
}

fn retry_on_conflict<R>(
    ctx: &CallContext,
    policy: &RetryPolicy,
    what: &str,
    mut fetch: impl FnMut(&CallContext) -> Result<R>,
    mut write: impl FnMut(&CallContext, &R) -> Result<R>,
    is_reconciled: impl Fn(&R) -> bool,
    mut mutate: impl FnMut(&mut R),
) -> Result<Reconciled> {
    for attempt in 1..=policy.attempts {
        ctx.check()?;
        let mut current = fetch(ctx)?;
        if is_reconciled(&current) {
            return Ok(Reconciled::Unchanged);
        }

        mutate(&mut current);
        match write(ctx, &current) {
            Ok(_) => return Ok(Reconciled::Updated { attempts: attempt }),
            Err(e) if e.is_conflict() => {
                info!("update {what} status conflict, retry: {attempt}");
                if attempt < policy.attempts {
                    backoff(ctx, policy.backoff);
                }
            }
            Err(e) => return Err(e),
        }
    }

    warn!(
        "update {what} status gave up after {} conflicts",
        policy.attempts
    );
    Ok(Reconciled::Exhausted {
        attempts: policy.attempts,
    })
}

fn backoff(ctx: &CallContext, wait: Duration) {
    let wait = match ctx.remaining() {
        Some(remaining) => wait.min(remaining),
        None => wait,
    };
    if !wait.is_zero() {
        thread::sleep(wait);
    }
}
