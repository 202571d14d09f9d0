//! Request-scoped tenant binding.
//!
//! The current tenant lives in a tokio task-local. It is visible to
//! everything awaited inside [`scope`] and to nothing else: two requests
//! handled on different tasks (or different worker threads) can never see
//! each other's binding, and code running outside any scope gets an error
//! instead of a stale value.
//!
//! Tasks spawned from inside a scope do not inherit the binding. Pass the
//! [`TenantContext`] to them explicitly and open a new scope.

use std::cell::RefCell;
use std::future::Future;

use anyhow::Result;

use crate::errors::HubError;
use crate::tenant::{TenantContext, TenantName};

tokio::task_local! {
    static CURRENT: RefCell<TenantContext>;
}

/// Run `fut` with `ctx` bound as the current tenant.
pub async fn scope<F>(ctx: TenantContext, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(RefCell::new(ctx), fut).await
}

/// The tenant bound to the running task.
pub fn current() -> Result<TenantName> {
    current_context().map(|ctx| ctx.tenant)
}

pub fn current_context() -> Result<TenantContext> {
    CURRENT
        .try_with(|c| c.borrow().clone())
        .map_err(|_| unbound())
}

/// Rebind the current scope to another tenant.
///
/// Only valid inside [`scope`]; the change is visible to the rest of this
/// request and to no other.
pub fn set(tenant: TenantName) -> Result<()> {
    CURRENT
        .try_with(|c| {
            c.borrow_mut().tenant = tenant;
        })
        .map_err(|_| unbound())
}

pub fn is_bound() -> bool {
    CURRENT.try_with(|_| ()).is_ok()
}

fn unbound() -> anyhow::Error {
    HubError::general_error("No tenant context is bound to this task").into_anyhow()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn current_fails_outside_a_scope() {
        assert!(!is_bound());
        assert!(current().is_err());
        assert!(set(TenantName::new("branda")).is_err());
    }

    #[tokio::test]
    async fn set_rebinds_only_the_current_scope() {
        scope(TenantContext::default_tenant(), async {
            assert_eq!(current().unwrap(), "default");
            set(TenantName::new("BrandA")).unwrap();
            assert_eq!(current().unwrap(), "branda");

            // A nested scope shadows and then restores.
            scope(TenantContext::new("brandb"), async {
                assert_eq!(current().unwrap(), "brandb");
            })
            .await;
            assert_eq!(current().unwrap(), "branda");
        })
        .await;
        assert!(current().is_err());
    }

    #[tokio::test]
    async fn spawned_tasks_do_not_inherit_the_binding() {
        scope(TenantContext::new("branda"), async {
            let inherited = tokio::spawn(async { is_bound() }).await.unwrap();
            assert!(!inherited);
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_scopes_never_observe_each_other() {
        let mut handles = Vec::new();
        for i in 0..64u64 {
            let tenant = if i % 2 == 0 { "branda" } else { "brandb" };
            handles.push(tokio::spawn(scope(TenantContext::new(tenant), async move {
                for step in 0..10u64 {
                    // Interleave with the other tasks across worker threads.
                    tokio::time::sleep(Duration::from_micros((i * 7 + step) % 50)).await;
                    assert_eq!(current().unwrap(), tenant);
                }
                tenant
            })));
        }
        let results = futures::future::join_all(handles).await;
        for (i, r) in results.into_iter().enumerate() {
            let expected = if i % 2 == 0 { "branda" } else { "brandb" };
            assert_eq!(r.unwrap(), expected);
        }
    }
}
