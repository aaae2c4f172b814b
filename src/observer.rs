//! Diagnostic observers for resolution and scope events.
//!
//! Observers are registered on the [`ServiceCollection`](crate::ServiceCollection)
//! and shared by every scope of the built container. With no observers
//! registered the resolver skips timing entirely.

use std::sync::Arc;
use std::time::Duration;

use crate::error::DiError;
use crate::key::Key;
use crate::lifetime::{Lifetime, ScopeTag};

/// Hooks for observing resolution and scope lifecycle events.
///
/// Every method has an empty default, so an observer only implements the
/// events it cares about.
///
/// # Examples
///
/// ```rust
/// use ferrous_volatile::{DiObserver, Key, Lifetime, ServiceCollection};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct CountingObserver {
///     resolved: AtomicUsize,
/// }
///
/// impl DiObserver for CountingObserver {
///     fn resolved(&self, _key: &Key, _lifetime: Lifetime, _duration: Duration) {
///         self.resolved.fetch_add(1, Ordering::Relaxed);
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_observer(Arc::new(CountingObserver::default()));
/// ```
pub trait DiObserver: Send + Sync {
    /// A component is about to be resolved.
    fn resolving(&self, key: &Key, lifetime: Lifetime) {
        let _ = (key, lifetime);
    }

    /// A component was resolved, from cache or freshly constructed.
    fn resolved(&self, key: &Key, lifetime: Lifetime, duration: Duration) {
        let _ = (key, lifetime, duration);
    }

    /// Resolution of a component failed.
    fn resolve_failed(&self, key: &Key, error: &DiError) {
        let _ = (key, error);
    }

    /// A scope was created.
    fn scope_opened(&self, scope_id: u64, tag: ScopeTag) {
        let _ = (scope_id, tag);
    }

    /// A scope was disposed; `released` counts the disposal hooks that ran.
    fn scope_disposed(&self, scope_id: u64, tag: ScopeTag, released: usize) {
        let _ = (scope_id, tag, released);
    }
}

#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn resolving(&self, key: &Key, lifetime: Lifetime) {
        for observer in &self.observers {
            observer.resolving(key, lifetime);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, key: &Key, lifetime: Lifetime, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(key, lifetime, duration);
        }
    }

    #[inline]
    pub(crate) fn resolve_failed(&self, key: &Key, error: &DiError) {
        for observer in &self.observers {
            observer.resolve_failed(key, error);
        }
    }

    pub(crate) fn scope_opened(&self, scope_id: u64, tag: ScopeTag) {
        for observer in &self.observers {
            observer.scope_opened(scope_id, tag);
        }
    }

    pub(crate) fn scope_disposed(&self, scope_id: u64, tag: ScopeTag, released: usize) {
        for observer in &self.observers {
            observer.scope_disposed(scope_id, tag, released);
        }
    }
}

/// Observer that forwards every event to `tracing`.
///
/// Resolution events are emitted at `TRACE`, scope events at `DEBUG` and
/// failures at `WARN`, all under the `ferrous_volatile` target.
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self {
            prefix: "ferrous-volatile".to_string(),
        }
    }

    /// Tags every event with a custom prefix, e.g. the application name.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl DiObserver for LoggingObserver {
    fn resolving(&self, key: &Key, lifetime: Lifetime) {
        tracing::trace!(
            target: "ferrous_volatile",
            prefix = %self.prefix,
            component = key.display_name(),
            %lifetime,
            "resolving"
        );
    }

    fn resolved(&self, key: &Key, lifetime: Lifetime, duration: Duration) {
        tracing::trace!(
            target: "ferrous_volatile",
            prefix = %self.prefix,
            component = key.display_name(),
            %lifetime,
            ?duration,
            "resolved"
        );
    }

    fn resolve_failed(&self, key: &Key, error: &DiError) {
        tracing::warn!(
            target: "ferrous_volatile",
            prefix = %self.prefix,
            component = key.display_name(),
            %error,
            "resolution failed"
        );
    }

    fn scope_opened(&self, scope_id: u64, tag: ScopeTag) {
        tracing::debug!(
            target: "ferrous_volatile",
            prefix = %self.prefix,
            scope_id,
            ?tag,
            "scope opened"
        );
    }

    fn scope_disposed(&self, scope_id: u64, tag: ScopeTag, released: usize) {
        tracing::debug!(
            target: "ferrous_volatile",
            prefix = %self.prefix,
            scope_id,
            ?tag,
            released,
            "scope disposed"
        );
    }
}
