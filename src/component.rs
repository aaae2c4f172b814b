//! Component declarations: the discoverable types the registration table is built from.
//!
//! Rust has no runtime reflection, so the bootstrapper that would otherwise
//! scan for types describes each one explicitly: its constructor, the lifetime
//! markers it carries, the capability interfaces it exposes and the
//! dependencies its constructor takes.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::internal::DisposeBag;
use crate::key::Key;
use crate::lifetime::{Capability, Lifetime};
use crate::provider::ResolverContext;
use crate::traits::{AsyncDispose, Dispose};

// Type-erased Arc for storage
pub(crate) type AnyArc = Arc<dyn std::any::Any + Send + Sync>;

pub(crate) type Ctor = Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>;

/// Converts a stored component (`Arc<T>`) into the value handed out for one
/// route: an `Arc<Arc<I>>` erased behind `AnyArc`.
pub(crate) type Upcast = Arc<dyn Fn(&AnyArc) -> DiResult<AnyArc> + Send + Sync>;

/// Registers disposal of a freshly created instance with its owning scope.
pub(crate) type DisposeHook = Arc<dyn Fn(&AnyArc, &mut DisposeBag) + Send + Sync>;

pub(crate) struct ExposedService {
    pub(crate) key: Key,
    pub(crate) marker: Option<Lifetime>,
    pub(crate) upcast: Upcast,
}

/// Type-erased declaration of one concrete component.
///
/// Produced from a [`Component`] builder; consumed by
/// [`ServiceCollection::register`](crate::ServiceCollection::register).
pub struct ComponentType {
    pub(crate) key: Key,
    pub(crate) markers: Vec<Lifetime>,
    pub(crate) services: Vec<ExposedService>,
    pub(crate) dependencies: Vec<Key>,
    pub(crate) ctor: Ctor,
    pub(crate) as_self: Upcast,
    pub(crate) dispose_hooks: Vec<DisposeHook>,
}

impl ComponentType {
    /// Key of the concrete component type.
    pub fn key(&self) -> Key {
        self.key
    }

    /// Lifetime markers declared directly on the component.
    pub fn direct_markers(&self) -> &[Lifetime] {
        &self.markers
    }

    /// Markers inherited from the exposed capability interfaces.
    pub fn inherited_markers(&self) -> impl Iterator<Item = Lifetime> + '_ {
        self.services.iter().filter_map(|s| s.marker)
    }

    /// Capability interfaces the component can be resolved as, besides itself.
    pub fn services(&self) -> impl Iterator<Item = Key> + '_ {
        self.services.iter().map(|s| s.key)
    }

    /// Keys the constructor declares it will resolve.
    pub fn dependencies(&self) -> &[Key] {
        &self.dependencies
    }
}

impl std::fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentType")
            .field("key", &self.key)
            .field("markers", &self.markers)
            .field("services", &self.services.iter().map(|s| s.key).collect::<Vec<_>>())
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// Typed builder describing one concrete component.
///
/// # Examples
///
/// ```rust
/// use ferrous_volatile::{capability, Component, ServiceCollection, Resolver, Volatile};
/// use std::sync::Arc;
///
/// pub trait CurrentUser: Send + Sync {
///     fn name(&self) -> String;
/// }
/// capability!(dyn CurrentUser => Volatile);
///
/// struct AnonymousUser;
/// impl CurrentUser for AnonymousUser {
///     fn name(&self) -> String { "anonymous".to_string() }
/// }
///
/// struct Greeter {
///     user: Arc<Volatile<dyn CurrentUser>>,
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add(
///     Component::new(|_| Ok(AnonymousUser))
///         .exposes::<dyn CurrentUser>(|c| c as Arc<dyn CurrentUser>),
/// );
/// services.add(
///     Component::new(|r| Ok(Greeter { user: r.volatile::<dyn CurrentUser>() }))
///         .singleton()
///         .depends_on::<Volatile<dyn CurrentUser>>(),
/// );
///
/// let container = services.build().unwrap();
/// let greeter = container.resolve::<Greeter>().unwrap();
/// let name = container
///     .run_scoped(|_| greeter.user.value().map(|u| u.name()))
///     .unwrap();
/// assert_eq!(name, "anonymous");
/// ```
pub struct Component<T> {
    inner: ComponentType,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Component<T>
where
    T: Send + Sync + 'static,
{
    /// Starts a declaration from the component's constructor.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> {
            Ok(Arc::new(factory(r)?) as AnyArc)
        };
        let as_self = |value: &AnyArc| -> DiResult<AnyArc> {
            let concrete = downcast_component::<T>(value)?;
            Ok(Arc::new(concrete) as AnyArc)
        };
        Self {
            inner: ComponentType {
                key: Key::of::<T>(),
                markers: Vec::new(),
                services: Vec::new(),
                dependencies: Vec::new(),
                ctor: Arc::new(ctor),
                as_self: Arc::new(as_self),
                dispose_hooks: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    /// Adds a lifetime marker directly on the component.
    pub fn marker(mut self, lifetime: Lifetime) -> Self {
        self.inner.markers.push(lifetime);
        self
    }

    pub fn instance(self) -> Self {
        self.marker(Lifetime::Instance)
    }

    pub fn singleton(self) -> Self {
        self.marker(Lifetime::Singleton)
    }

    pub fn volatile(self) -> Self {
        self.marker(Lifetime::Volatile)
    }

    /// Exposes the component as capability interface `I`.
    ///
    /// `upcast` is normally `|c| c as Arc<dyn Trait>`. Any marker carried by
    /// `I` becomes one of the component's markers.
    pub fn exposes<I>(mut self, upcast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        I: ?Sized + Capability + Send + Sync,
    {
        let convert = move |value: &AnyArc| -> DiResult<AnyArc> {
            let concrete = downcast_component::<T>(value)?;
            Ok(Arc::new(upcast(concrete)) as AnyArc)
        };
        self.inner.services.push(ExposedService {
            key: Key::of::<I>(),
            marker: I::MARKER,
            upcast: Arc::new(convert),
        });
        self
    }

    /// Declares that the constructor resolves `D`.
    ///
    /// Declared dependencies let `build()` reject a singleton that takes a
    /// volatile dependency directly, before any unit of work runs.
    pub fn depends_on<D: ?Sized + 'static>(mut self) -> Self {
        self.inner.dependencies.push(Key::of::<D>());
        self
    }

    /// Runs [`Dispose::dispose`] when the scope owning the instance is released.
    pub fn disposable(mut self) -> Self
    where
        T: Dispose,
    {
        let hook = |value: &AnyArc, bag: &mut DisposeBag| {
            if let Ok(service) = value.clone().downcast::<T>() {
                bag.push_sync(Box::new(move || service.dispose()));
            }
        };
        self.inner.dispose_hooks.push(Arc::new(hook));
        self
    }

    /// Awaits [`AsyncDispose::dispose`] when the owning scope is released
    /// through `dispose_async` (or a completed `run_scoped_async`).
    pub fn async_disposable(mut self) -> Self
    where
        T: AsyncDispose,
    {
        let hook = |value: &AnyArc, bag: &mut DisposeBag| {
            if let Ok(service) = value.clone().downcast::<T>() {
                bag.push_async(move || async move { service.dispose().await });
            }
        };
        self.inner.dispose_hooks.push(Arc::new(hook));
        self
    }

    /// Finishes the declaration.
    pub fn into_type(self) -> ComponentType {
        self.inner
    }
}

impl<T> From<Component<T>> for ComponentType
where
    T: Send + Sync + 'static,
{
    fn from(component: Component<T>) -> Self {
        component.into_type()
    }
}

fn downcast_component<T: Send + Sync + 'static>(value: &AnyArc) -> DiResult<Arc<T>> {
    value
        .clone()
        .downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
}
