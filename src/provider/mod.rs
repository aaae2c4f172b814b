//! The root container and the scope tree hanging off it.
//!
//! [`Container`] is the root of the scope tree. It resolves instance and
//! singleton components directly, hands out non-volatile child scopes and
//! volatile scopes, and owns the per-root [`Volatile`] accessors.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::accessor::Volatile;
use crate::component::AnyArc;
use crate::config::ContainerConfig;
use crate::descriptors::ServiceDescriptor;
use crate::error::DiResult;
use crate::guard;
use crate::internal::dispose_bag::BoxFutureUnit;
use crate::key::Key;
use crate::lifetime::ScopeTag;
use crate::observer::Observers;
use crate::registration::Registry;
use crate::traits::ResolverCore;

pub mod context;
pub mod scope;

pub use context::ResolverContext;
pub use scope::{Scope, VolatileScope};
pub(crate) use scope::ScopeNode;

/// State shared by every scope of one container.
pub(crate) struct ProviderInner {
    pub(crate) registry: Registry,
    pub(crate) config: ContainerConfig,
    pub(crate) observers: Observers,
    accessors: Mutex<HashMap<Key, AnyArc>>,
}

impl ProviderInner {
    pub(crate) fn new(registry: Registry, config: ContainerConfig, observers: Observers) -> Self {
        Self {
            registry,
            config,
            observers,
            accessors: Mutex::new(HashMap::new()),
        }
    }

    /// One accessor per `I` for the lifetime of the root.
    pub(crate) fn accessor<I: ?Sized + Send + Sync + 'static>(&self) -> Arc<Volatile<I>> {
        let mut accessors = self.accessors.lock();
        let entry = accessors
            .entry(Key::of::<Volatile<I>>())
            .or_insert_with(|| Arc::new(Volatile::<I>::new()) as AnyArc);
        // keyed by TypeId, so the downcast only fails if the map is corrupted
        entry
            .clone()
            .downcast::<Volatile<I>>()
            .unwrap_or_else(|_| Arc::new(Volatile::new()))
    }
}

/// The root container.
///
/// Cheap to clone; clones share the same singletons and accessors. Volatile
/// components cannot be resolved from here: they need a volatile scope,
/// usually entered with [`run_scoped`](Self::run_scoped) or
/// [`run_scoped_async`](Self::run_scoped_async).
///
/// # Examples
///
/// ```
/// use ferrous_volatile::{Component, DiError, Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// struct Config { name: String }
/// struct Request { id: u32 }
///
/// let mut services = ServiceCollection::new();
/// services.add(Component::new(|_| Ok(Config { name: "app".to_string() })).singleton());
/// services.add(Component::new(|_| Ok(Request { id: 1 })).volatile());
/// let container = services.build().unwrap();
///
/// let a = container.resolve::<Config>().unwrap();
/// let b = container.resolve::<Config>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// assert!(matches!(
///     container.resolve::<Request>(),
///     Err(DiError::VolatileResolvedOutsideScope(_))
/// ));
///
/// let id = container
///     .run_scoped(|scope| scope.resolve::<Request>().map(|r| r.id))
///     .unwrap();
/// assert_eq!(id, 1);
/// ```
#[derive(Clone)]
pub struct Container {
    pub(crate) node: Arc<ScopeNode>,
}

impl Container {
    pub(crate) fn new(registry: Registry, config: ContainerConfig, observers: Observers) -> Self {
        let shared = Arc::new(ProviderInner::new(registry, config, observers));
        Self {
            node: ScopeNode::root(shared),
        }
    }

    /// Creates a non-volatile child scope.
    ///
    /// Instance components resolved through it are disposed with it;
    /// volatile components stay unreachable.
    pub fn create_child_scope(&self) -> DiResult<Scope> {
        Ok(Scope {
            node: self.node.child(ScopeTag::Child)?,
        })
    }

    /// Creates a volatile scope whose parent is this container.
    ///
    /// The caller owns the scope and must dispose it. Prefer
    /// [`run_scoped`](Self::run_scoped), which also makes the scope ambient.
    pub fn create_volatile_scope(&self) -> DiResult<VolatileScope> {
        Ok(VolatileScope::new(self.node.child(ScopeTag::Volatile)?))
    }

    /// The accessor for volatile component `I`.
    ///
    /// Always the same `Arc` for a given `I` and container.
    pub fn volatile<I: ?Sized + Send + Sync + 'static>(&self) -> Arc<Volatile<I>> {
        self.node.shared.accessor::<I>()
    }

    /// Runs `f` inside a fresh volatile scope. See [`run_scoped`](crate::run_scoped).
    pub fn run_scoped<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&VolatileScope) -> Result<R, E>,
        E: From<crate::DiError>,
    {
        guard::run_scoped(self, f)
    }

    /// Runs the future built by `f` inside a fresh volatile scope. See
    /// [`run_scoped_async`](crate::run_scoped_async).
    pub async fn run_scoped_async<F, Fut, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(VolatileScope) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: From<crate::DiError>,
    {
        guard::run_scoped_async(self, f).await
    }

    /// Registered components, in registration order.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        self.node
            .shared
            .registry
            .components
            .iter()
            .map(|c| ServiceDescriptor {
                component: c.key,
                lifetime: c.lifetime,
                services: c.services.clone(),
                dependencies: c.dependencies.clone(),
            })
            .collect()
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.node.shared.config
    }

    pub fn is_disposed(&self) -> bool {
        self.node.is_disposed()
    }

    /// Disposes every open child and volatile scope, then releases
    /// singletons and root-owned instances, running sync disposers in LIFO
    /// order. Later calls are no-ops.
    pub fn dispose(&self) {
        self.node.dispose();
    }

    /// Like [`dispose`](Self::dispose), awaiting async disposers first.
    pub async fn dispose_async(&self) {
        self.node.dispose_async().await;
    }
}

impl ResolverCore for Container {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.node.resolve_key(key, None)
    }

    fn resolve_many(&self, key: &Key) -> DiResult<Vec<AnyArc>> {
        self.node.resolve_all_keys(key, None)
    }

    fn push_sync_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.node.push_sync(f);
    }

    fn push_async_disposer(&self, f: Box<dyn FnOnce() -> BoxFutureUnit + Send>) {
        self.node.push_async(f);
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.node.id)
            .field("components", &self.node.shared.registry.components.len())
            .field("disposed", &self.node.is_disposed())
            .finish()
    }
}
