//! Ambient context: the volatile scope current for a logical execution.
//!
//! Two slots back the context:
//!
//! - a tokio task-local slot, installed per future by [`scope_with`] and
//!   [`fork`]. Tokio re-enters it on every poll, so the value survives
//!   suspension and resumption on any worker thread, and each forked
//!   future gets its own copy that it can overwrite without affecting its
//!   parent or siblings;
//! - a thread-local slot for synchronous code running outside any
//!   task-local slot. Each OS thread starts empty; [`Snapshot`] carries a
//!   value into a spawned thread.
//!
//! Reads prefer the task-local slot when one is installed. Writes happen
//! only through [`ScopeGuard`](crate::ScopeGuard) and the `run_scoped`
//! functions. A guard puts the previous value back only while its own scope
//! is still the current one; a disposed scope always reads as `None`.
//!
//! A [`ScopeGuard`](crate::ScopeGuard) refuses to enter on a tokio runtime
//! thread unless a task-local slot is installed, since a guard held across
//! `.await` would otherwise leak into whatever the thread polls next.
//!
//! # Request pipelines
//!
//! A server integrates by wrapping each request handler in
//! [`run_scoped_async`](crate::run_scoped_async), or by wrapping the
//! handler future in [`scope_with`] with a scope it manages itself.

use std::cell::RefCell;
use std::future::Future;

use crate::provider::VolatileScope;

tokio::task_local! {
    static TASK_SLOT: RefCell<Option<VolatileScope>>;
}

thread_local! {
    static THREAD_SLOT: RefCell<Option<VolatileScope>> = const { RefCell::new(None) };
}

/// Which slot a write went to; the matching restore must use the same one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Task,
    Thread,
}

/// The live volatile scope current for this execution, if any.
///
/// A scope that has already been disposed reads as `None`, even if it is
/// still installed (e.g. in a task that outlived its unit of work).
///
/// # Examples
///
/// ```
/// use ferrous_volatile::{ambient, ServiceCollection};
///
/// let container = ServiceCollection::new().build().unwrap();
/// assert!(ambient::current().is_none());
///
/// container
///     .run_scoped(|scope| {
///         assert_eq!(ambient::current().as_ref(), Some(scope));
///         Ok::<_, ferrous_volatile::DiError>(())
///     })
///     .unwrap();
///
/// assert!(ambient::current().is_none());
/// ```
pub fn current() -> Option<VolatileScope> {
    let value = match TASK_SLOT.try_with(|cell| cell.borrow().clone()) {
        Ok(value) => value,
        Err(_) => THREAD_SLOT
            .try_with(|cell| cell.borrow().clone())
            .ok()
            .flatten(),
    };
    // a disposed scope is never reported as current
    value.filter(|scope| !scope.is_disposed())
}

/// Whether a volatile scope is current for this execution.
pub fn is_active() -> bool {
    current().is_some()
}

/// Writes `value` into the slot of the current execution, returning the slot
/// written and the value it replaced.
pub(crate) fn replace(value: Option<VolatileScope>) -> (Slot, Option<VolatileScope>) {
    let mut pending = Some(value);
    match TASK_SLOT.try_with(|cell| cell.replace(pending.take().flatten())) {
        Ok(previous) => (Slot::Task, previous),
        Err(_) => {
            let previous = THREAD_SLOT
                .try_with(|cell| cell.replace(pending.take().flatten()))
                .ok()
                .flatten();
            (Slot::Thread, previous)
        }
    }
}

/// Puts `previous` back into `slot`.
///
/// Silently does nothing if the slot is gone (thread teardown, or a guard
/// dropped outside the task-local it was entered in).
pub(crate) fn restore(slot: Slot, previous: Option<VolatileScope>) {
    let replaced = match slot {
        Slot::Task => TASK_SLOT.try_with(|cell| cell.replace(previous)).ok(),
        Slot::Thread => THREAD_SLOT.try_with(|cell| cell.replace(previous)).ok(),
    };
    drop(replaced);
}

/// Whether the current execution runs inside a task-local slot.
pub(crate) fn task_slot_installed() -> bool {
    TASK_SLOT.try_with(|_| ()).is_ok()
}

/// Puts `previous` back into `slot` only if the slot still holds `expected`.
///
/// Returns `false` and leaves the slot untouched when something else was
/// installed in the meantime. A disposed `previous` is written as `None`.
pub(crate) fn restore_if_current(
    slot: Slot,
    expected: &VolatileScope,
    previous: Option<VolatileScope>,
) -> bool {
    let put_back = move |cell: &RefCell<Option<VolatileScope>>| {
        let mut value = cell.borrow_mut();
        if value.as_ref() != Some(expected) {
            return false;
        }
        *value = previous.filter(|scope| !scope.is_disposed());
        true
    };
    match slot {
        Slot::Task => TASK_SLOT.try_with(put_back).unwrap_or(false),
        Slot::Thread => THREAD_SLOT.try_with(put_back).unwrap_or(false),
    }
}

struct Restore {
    slot: Slot,
    previous: Option<VolatileScope>,
}

impl Drop for Restore {
    fn drop(&mut self) {
        restore(self.slot, self.previous.take());
    }
}

/// Runs `f` with the ambient context set to `value`, restoring it afterwards,
/// also on panic.
pub(crate) fn with_value<R>(value: Option<VolatileScope>, f: impl FnOnce() -> R) -> R {
    let (slot, previous) = replace(value);
    let _restore = Restore { slot, previous };
    f()
}

/// Runs `f` with no ambient volatile scope.
pub(crate) fn suppress<R>(f: impl FnOnce() -> R) -> R {
    with_value(None, f)
}

/// Runs `fut` as its own logical execution, starting with `value` current.
///
/// Writes made inside `fut` stay inside it.
pub fn scope_with<F>(value: Option<VolatileScope>, fut: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    TASK_SLOT.scope(RefCell::new(value), fut)
}

/// Runs `fut` as a child logical execution seeded with a snapshot of the
/// current value.
pub fn fork<F>(fut: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    scope_with(current(), fut)
}

/// `tokio::spawn` that carries the current volatile scope into the task.
///
/// # Examples
///
/// ```
/// use ferrous_volatile::{ambient, ServiceCollection};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let container = ServiceCollection::new().build().unwrap();
///
/// container
///     .run_scoped_async(|scope| async move {
///         let seen = ambient::spawn(async { ambient::current() }).await.unwrap();
///         assert_eq!(seen, Some(scope));
///         Ok::<_, ferrous_volatile::DiError>(())
///     })
///     .await
///     .unwrap();
/// # }
/// ```
pub fn spawn<F>(fut: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(fork(fut))
}

/// A captured ambient value, for carrying into another execution.
///
/// # Examples
///
/// ```
/// use ferrous_volatile::{ambient, ServiceCollection};
///
/// let container = ServiceCollection::new().build().unwrap();
/// container
///     .run_scoped(|scope| {
///         let snapshot = ambient::Snapshot::capture();
///         let seen = std::thread::spawn(move || snapshot.run(ambient::current))
///             .join()
///             .unwrap();
///         assert_eq!(seen.as_ref(), Some(scope));
///         Ok::<_, ferrous_volatile::DiError>(())
///     })
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    value: Option<VolatileScope>,
}

impl Snapshot {
    pub fn capture() -> Self {
        Self { value: current() }
    }

    pub fn volatile_scope(&self) -> Option<&VolatileScope> {
        self.value.as_ref()
    }

    /// Runs `f` on the current thread with the captured value current.
    pub fn run<R>(self, f: impl FnOnce() -> R) -> R {
        with_value(self.value, f)
    }

    /// Runs `fut` as its own logical execution with the captured value current.
    pub fn wrap<F: Future>(self, fut: F) -> impl Future<Output = F::Output> {
        scope_with(self.value, fut)
    }
}
