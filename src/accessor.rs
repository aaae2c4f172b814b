//! The volatile accessor singletons hold instead of a volatile component.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::ambient;
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::provider::VolatileScope;
use crate::traits::Resolver;

/// Late-bound handle to volatile component `I`.
///
/// Holds no reference to any scope. Every [`value`](Self::value) call reads
/// the ambient context and resolves `I` from whichever volatile scope is
/// current at that instant, so one long-lived accessor serves a different
/// instance to every unit of work. Nothing is cached by the accessor itself.
///
/// Exactly one accessor exists per container and `I`; get it from
/// [`ResolverContext::volatile`](crate::ResolverContext::volatile) in a
/// constructor, or from [`Container::volatile`](crate::Container::volatile).
///
/// # Examples
///
/// ```
/// use ferrous_volatile::{Component, DiError, ServiceCollection};
///
/// struct Request { path: String }
///
/// let mut services = ServiceCollection::new();
/// services.add(Component::new(|_| Ok(Request { path: "/".to_string() })).volatile());
/// let container = services.build().unwrap();
///
/// let request = container.volatile::<Request>();
/// assert!(matches!(request.value(), Err(DiError::VolatileResolvedOutsideScope(_))));
///
/// let path = container.run_scoped(|_| request.value().map(|r| r.path.clone())).unwrap();
/// assert_eq!(path, "/");
/// ```
pub struct Volatile<I: ?Sized> {
    key: Key,
    _marker: PhantomData<fn() -> Arc<I>>,
}

impl<I: ?Sized + Send + Sync + 'static> Volatile<I> {
    pub(crate) fn new() -> Self {
        Self {
            key: Key::of::<I>(),
            _marker: PhantomData,
        }
    }

    /// Resolves `I` from the current volatile scope.
    ///
    /// Fails with [`DiError::VolatileResolvedOutsideScope`] when no volatile
    /// scope is current, including inside singleton constructors and in
    /// deferred work evaluated after its guard exited.
    pub fn value(&self) -> DiResult<Arc<I>> {
        self.current_scope()?.resolve::<I>()
    }

    /// Resolves every component routed to `I` from the current volatile scope.
    pub fn values(&self) -> DiResult<Vec<Arc<I>>> {
        self.current_scope()?.resolve_all::<I>()
    }

    /// Whether [`value`](Self::value) would find a live volatile scope.
    pub fn is_available(&self) -> bool {
        self.current_scope().is_ok()
    }

    pub fn key(&self) -> Key {
        self.key
    }

    fn current_scope(&self) -> DiResult<VolatileScope> {
        ambient::current().ok_or(DiError::VolatileResolvedOutsideScope(self.key.display_name()))
    }
}

impl<I: ?Sized> fmt::Debug for Volatile<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Volatile<{}>", self.key.display_name())
    }
}
