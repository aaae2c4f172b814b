//! Resolver traits for service resolution.

use std::any::Any;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::internal::dispose_bag::BoxFutureUnit;
use crate::key::Key;
use crate::traits::{AsyncDispose, Dispose};

/// Core resolver trait for object-safe service resolution.
///
/// Implemented by the root [`Container`](crate::Container), by every
/// [`VolatileScope`](crate::VolatileScope) and by the
/// [`ResolverContext`](crate::ResolverContext) handed to constructors.
/// Most callers use the generic [`Resolver`] methods instead.
pub trait ResolverCore: Send + Sync {
    /// Resolves the value registered for `key`.
    ///
    /// Values come back as `Arc<Arc<I>>` erased behind `Arc<dyn Any>`; the
    /// outer `Arc` is a routing envelope, the inner one is the shared value.
    fn resolve_any(&self, key: &Key) -> DiResult<Arc<dyn Any + Send + Sync>>;

    /// Resolves every component routed to `key`, in registration order.
    fn resolve_many(&self, key: &Key) -> DiResult<Vec<Arc<dyn Any + Send + Sync>>>;

    /// Registers a synchronous disposal hook with the current scope.
    fn push_sync_disposer(&self, f: Box<dyn FnOnce() + Send>);

    /// Registers an asynchronous disposal hook with the current scope.
    fn push_async_disposer(&self, f: Box<dyn FnOnce() -> BoxFutureUnit + Send>);
}

/// High-level resolver interface with generic methods for type-safe service resolution.
///
/// `I` may be a concrete component type or a capability interface such as
/// `dyn Clock`.
///
/// # Examples
///
/// ```
/// use ferrous_volatile::{capability, Component, ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
/// capability!(dyn Clock => Singleton);
///
/// struct FixedClock;
/// impl Clock for FixedClock {
///     fn now(&self) -> u64 { 42 }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add(Component::new(|_| Ok(FixedClock)).exposes::<dyn Clock>(|c| c as Arc<dyn Clock>));
/// let container = services.build().unwrap();
///
/// let clock = container.resolve::<dyn Clock>().unwrap();
/// assert_eq!(clock.now(), 42);
///
/// // the concrete type is routable too, and shares the singleton
/// let concrete = container.resolve::<FixedClock>().unwrap();
/// assert_eq!(concrete.now(), clock.now());
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves one value of `I`.
    ///
    /// When several components are routed to `I` the last registered wins.
    fn resolve<I: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<I>> {
        let any = self.resolve_any(&Key::of::<I>())?;
        unwrap_routed::<I>(any)
    }

    /// Resolves every component routed to `I`, in registration order.
    ///
    /// Returns an empty vector when nothing is routed to `I`.
    fn resolve_all<I: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<I>>> {
        let anys = self.resolve_many(&Key::of::<I>())?;
        anys.into_iter().map(unwrap_routed::<I>).collect()
    }

    /// Resolves `I`, panicking on failure.
    fn resolve_required<I: ?Sized + Send + Sync + 'static>(&self) -> Arc<I> {
        self.resolve::<I>()
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {}", std::any::type_name::<I>(), e))
    }

    fn register_disposer<T: Dispose>(&self, service: Arc<T>) {
        self.push_sync_disposer(Box::new(move || service.dispose()));
    }

    fn register_async_disposer<T: AsyncDispose>(&self, service: Arc<T>) {
        self.push_async_disposer(Box::new(move || {
            Box::pin(async move {
                service.dispose().await;
            })
        }));
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}

fn unwrap_routed<I: ?Sized + Send + Sync + 'static>(
    any: Arc<dyn Any + Send + Sync>,
) -> DiResult<Arc<I>> {
    any.downcast::<Arc<I>>()
        .map(|routed| (*routed).clone())
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<I>()))
}
