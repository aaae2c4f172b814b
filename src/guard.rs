//! Scope guards: entering a volatile scope for a unit of work.

use std::future::Future;
use std::marker::PhantomData;

use crate::ambient::{self, Slot};
use crate::error::DiError;
use crate::provider::{Container, VolatileScope};

/// RAII guard that makes a fresh volatile scope ambient.
///
/// Entering creates a volatile scope under the container, remembers the
/// ambient value it replaces and installs the new scope. Dropping the guard,
/// on every exit path including unwinding, first restores the remembered
/// value and then disposes the scope. Guards therefore nest: leaving an
/// inner guard makes the outer guard's scope current again.
///
/// The guard is `!Send`. It belongs to the execution that entered it; for
/// async units of work use [`run_scoped_async`], which keeps the scope in
/// the future's own task-local context. Entering a guard on a tokio runtime
/// thread outside a task-local slot fails with
/// [`DiError::GuardOutsideTaskScope`]: futures polled on that thread would
/// otherwise share one slot. Wrap the future in
/// [`ambient::scope_with`](crate::ambient::scope_with) to hold a guard
/// across `.await`.
///
/// # Examples
///
/// ```
/// use ferrous_volatile::{ambient, Component, ScopeGuard, ServiceCollection};
///
/// struct Request;
///
/// let mut services = ServiceCollection::new();
/// services.add(Component::new(|_| Ok(Request)).volatile());
/// let container = services.build().unwrap();
///
/// let outer = ScopeGuard::enter(&container).unwrap();
/// {
///     let inner = ScopeGuard::enter(&container).unwrap();
///     assert_eq!(ambient::current().as_ref(), Some(inner.scope()));
/// }
/// assert_eq!(ambient::current().as_ref(), Some(outer.scope()));
///
/// let scope = outer.scope().clone();
/// outer.exit();
/// assert!(scope.is_disposed());
/// assert!(ambient::current().is_none());
/// ```
pub struct ScopeGuard {
    scope: VolatileScope,
    slot: Slot,
    previous: Option<VolatileScope>,
    _not_send: PhantomData<*const ()>,
}

impl ScopeGuard {
    /// Creates a volatile scope and makes it ambient for this execution.
    pub fn enter(container: &Container) -> Result<Self, DiError> {
        if !ambient::task_slot_installed() && tokio::runtime::Handle::try_current().is_ok() {
            return Err(DiError::GuardOutsideTaskScope);
        }
        Self::enter_unchecked(container)
    }

    /// Enters without the runtime check; only for callers that cannot
    /// suspend while the guard is alive.
    fn enter_unchecked(container: &Container) -> Result<Self, DiError> {
        let scope = container.create_volatile_scope()?;
        let (slot, previous) = ambient::replace(Some(scope.clone()));
        tracing::debug!(
            scope_id = scope.id(),
            outer = previous.as_ref().map(VolatileScope::id),
            "entered volatile scope"
        );
        Ok(Self {
            scope,
            slot,
            previous,
            _not_send: PhantomData,
        })
    }

    /// The scope this guard owns.
    pub fn scope(&self) -> &VolatileScope {
        &self.scope
    }

    /// Leaves the scope; equivalent to dropping the guard.
    pub fn exit(self) {
        drop(self);
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        // restore before dispose: no reader may observe a disposed scope
        let previous = self.previous.take();
        if !ambient::restore_if_current(self.slot, &self.scope, previous) {
            tracing::warn!(
                scope_id = self.scope.id(),
                "volatile scope guard dropped out of order; ambient context left unchanged"
            );
        }
        self.scope.dispose();
        tracing::debug!(scope_id = self.scope.id(), "exited volatile scope");
    }
}

impl std::fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("scope", &self.scope)
            .field("slot", &self.slot)
            .finish()
    }
}

/// Runs a synchronous unit of work inside a fresh volatile scope.
///
/// The scope is ambient while `f` runs and disposed when it returns, fails
/// or panics. Generic over the caller's error type so engine errors and
/// application errors travel in one `Result`.
///
/// # Examples
///
/// ```
/// use ferrous_volatile::{run_scoped, Component, DiError, Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// struct Request { id: u32 }
///
/// let mut services = ServiceCollection::new();
/// services.add(Component::new(|_| Ok(Request { id: 7 })).volatile());
/// let container = services.build().unwrap();
///
/// let (a, b) = run_scoped(&container, |scope| {
///     Ok::<_, DiError>((scope.resolve::<Request>()?, scope.resolve::<Request>()?))
/// })
/// .unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(a.id, 7);
/// ```
pub fn run_scoped<F, R, E>(container: &Container, f: F) -> Result<R, E>
where
    F: FnOnce(&VolatileScope) -> Result<R, E>,
    E: From<DiError>,
{
    // f is synchronous, so the thread slot is safe even on a runtime thread
    let guard = ScopeGuard::enter_unchecked(container)?;
    f(guard.scope())
}

/// Runs an asynchronous unit of work inside a fresh volatile scope.
///
/// The future runs as its own logical execution with the scope ambient, so
/// it may suspend, hop worker threads and fork child tasks (see
/// [`ambient::spawn`](crate::ambient::spawn)) without losing or leaking the
/// scope. When the future completes, async disposers are awaited and then
/// sync disposers run. If the returned future is dropped before completion
/// (cancellation, timeout, panic) the scope is still disposed, running its
/// sync disposers only.
///
/// # Examples
///
/// ```
/// use ferrous_volatile::{run_scoped_async, Component, DiError, Resolver, ServiceCollection};
///
/// struct Request { id: u32 }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut services = ServiceCollection::new();
/// services.add(Component::new(|_| Ok(Request { id: 3 })).volatile());
/// let container = services.build().unwrap();
///
/// let id = run_scoped_async(&container, |scope| async move {
///     tokio::task::yield_now().await;
///     Ok::<_, DiError>(scope.resolve::<Request>()?.id)
/// })
/// .await
/// .unwrap();
/// assert_eq!(id, 3);
/// # }
/// ```
pub async fn run_scoped_async<F, Fut, R, E>(container: &Container, f: F) -> Result<R, E>
where
    F: FnOnce(VolatileScope) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: From<DiError>,
{
    let scope = container.create_volatile_scope()?;
    let release = Release {
        scope: Some(scope.clone()),
    };
    tracing::debug!(scope_id = scope.id(), "entered volatile scope");

    let ambient_scope = Some(scope.clone());
    let result = ambient::scope_with(ambient_scope, async move { f(scope).await }).await;

    release.finish().await;
    result
}

/// Disposes the scope of an async unit of work even if its future is dropped.
struct Release {
    scope: Option<VolatileScope>,
}

impl Release {
    async fn finish(mut self) {
        if let Some(scope) = self.scope.take() {
            scope.dispose_async().await;
            tracing::debug!(scope_id = scope.id(), "exited volatile scope");
        }
    }
}

impl Drop for Release {
    fn drop(&mut self) {
        if let Some(scope) = self.scope.take() {
            tracing::debug!(scope_id = scope.id(), "unit of work abandoned; releasing volatile scope");
            scope.dispose();
        }
    }
}
