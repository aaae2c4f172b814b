//! Scope tree: the root container, plain child scopes and volatile scopes.
//!
//! Every scope is a [`ScopeNode`] holding its own instance table and
//! disposal bag. Singletons are memoized in the root node, volatile
//! components in the nearest enclosing volatile node, instance components
//! nowhere (their disposal hooks go to the scope they were resolved from).

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::Mutex;

use super::{ProviderInner, ResolverContext};
use crate::accessor::Volatile;
use crate::ambient;
use crate::component::AnyArc;
use crate::error::{DiError, DiResult};
use crate::internal::dispose_bag::BoxFutureUnit;
use crate::internal::{with_circular_check, DisposeBag};
use crate::key::Key;
use crate::lifetime::{Lifetime, ScopeTag};
use crate::registration::ComponentRegistration;
use crate::traits::ResolverCore;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) struct ScopeNode {
    pub(crate) id: u64,
    pub(crate) tag: ScopeTag,
    parent: Option<Arc<ScopeNode>>,
    pub(crate) shared: Arc<ProviderInner>,
    instances: Mutex<HashMap<usize, AnyArc>>,
    disposers: Mutex<DisposeBag>,
    children: Mutex<Vec<Weak<ScopeNode>>>,
    disposed: AtomicBool,
}

impl ScopeNode {
    pub(crate) fn root(shared: Arc<ProviderInner>) -> Arc<Self> {
        Self::create(ScopeTag::Root, None, shared)
    }

    pub(crate) fn child(self: &Arc<Self>, tag: ScopeTag) -> DiResult<Arc<Self>> {
        // checked under the lock so dispose() never misses a new child
        let mut children = self.children.lock();
        self.ensure_live()?;
        let node = Self::create(tag, Some(self.clone()), self.shared.clone());
        children.retain(|c| c.strong_count() > 0);
        children.push(Arc::downgrade(&node));
        Ok(node)
    }

    fn live_children(&self) -> Vec<Arc<ScopeNode>> {
        std::mem::take(&mut *self.children.lock())
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    fn create(tag: ScopeTag, parent: Option<Arc<ScopeNode>>, shared: Arc<ProviderInner>) -> Arc<Self> {
        let node = Arc::new(Self {
            id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
            tag,
            parent,
            shared,
            instances: Mutex::new(HashMap::new()),
            disposers: Mutex::new(DisposeBag::default()),
            children: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        });
        node.shared.observers.scope_opened(node.id, tag);
        node
    }

    #[inline]
    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn ensure_live(&self) -> DiResult<()> {
        if self.is_disposed() {
            return Err(DiError::ScopeDisposed(self.id));
        }
        Ok(())
    }

    fn root_node(self: &Arc<Self>) -> &Arc<Self> {
        let mut node = self;
        while let Some(parent) = &node.parent {
            node = parent;
        }
        node
    }

    fn nearest(self: &Arc<Self>, tag: ScopeTag) -> Option<&Arc<Self>> {
        let mut node = Some(self);
        while let Some(current) = node {
            if current.tag == tag {
                return Some(current);
            }
            node = current.parent.as_ref();
        }
        None
    }

    /// Resolves `key`; `owner` names the singleton under construction, if any.
    pub(crate) fn resolve_key(self: &Arc<Self>, key: &Key, owner: Option<&'static str>) -> DiResult<AnyArc> {
        self.ensure_live()?;
        let route = self
            .shared
            .registry
            .route(key)
            .ok_or(DiError::NotFound(key.display_name()))?;
        let value = self.resolve_component(route.component, key, owner)?;
        (route.upcast)(&value)
    }

    pub(crate) fn resolve_all_keys(
        self: &Arc<Self>,
        key: &Key,
        owner: Option<&'static str>,
    ) -> DiResult<Vec<AnyArc>> {
        self.ensure_live()?;
        let routes = self.shared.registry.routes(key);
        let mut results = Vec::with_capacity(routes.len());
        for route in routes {
            let value = self.resolve_component(route.component, key, owner)?;
            results.push((route.upcast)(&value)?);
        }
        Ok(results)
    }

    fn resolve_component(
        self: &Arc<Self>,
        slot: usize,
        requested: &Key,
        owner: Option<&'static str>,
    ) -> DiResult<AnyArc> {
        let reg = self.shared.registry.component(slot);
        let observers = &self.shared.observers;
        let started = if observers.has_observers() {
            observers.resolving(&reg.key, reg.lifetime);
            Some(Instant::now())
        } else {
            None
        };

        tracing::trace!(
            component = reg.key.display_name(),
            lifetime = %reg.lifetime,
            scope_id = self.id,
            "resolving component"
        );

        let result = with_circular_check(reg.key.display_name(), self.shared.config.max_depth, || {
            match reg.lifetime {
                Lifetime::Instance => self.transient(reg, owner),
                Lifetime::Singleton => {
                    self.root_node().memoized(reg, Some(reg.key.display_name()))
                }
                Lifetime::Volatile => {
                    if let Some(singleton) = owner {
                        return Err(DiError::VolatileInjectedDirectlyIntoSingleton {
                            singleton,
                            dependency: requested.display_name(),
                        });
                    }
                    let scope = self
                        .nearest(ScopeTag::Volatile)
                        .ok_or(DiError::VolatileResolvedOutsideScope(requested.display_name()))?;
                    scope.memoized(reg, None)
                }
            }
        });

        if let Some(started) = started {
            match &result {
                Ok(_) => observers.resolved(&reg.key, reg.lifetime, started.elapsed()),
                Err(e) => observers.resolve_failed(&reg.key, e),
            }
        }
        result
    }

    /// Runs the constructor; hooks it registers, and the component's own
    /// disposal hooks, come back staged rather than owned by the scope.
    fn construct(
        self: &Arc<Self>,
        reg: &ComponentRegistration,
        owner: Option<&'static str>,
    ) -> DiResult<(AnyArc, DisposeBag)> {
        let ctx = ResolverContext::new(self, owner);
        let value = match reg.lifetime {
            // no volatile scope exists for the lifetime of a singleton
            Lifetime::Singleton => ambient::suppress(|| (reg.ctor)(&ctx)),
            _ => (reg.ctor)(&ctx),
        };
        let mut staged = ctx.into_staged();
        let value = match value {
            Ok(value) => value,
            Err(e) => {
                // hooks registered before the failure still release what they hold
                self.release_discarded(reg, staged);
                return Err(e);
            }
        };
        for hook in &reg.dispose_hooks {
            hook(&value, &mut staged);
        }
        Ok((value, staged))
    }

    fn transient(self: &Arc<Self>, reg: &ComponentRegistration, owner: Option<&'static str>) -> DiResult<AnyArc> {
        let (value, staged) = self.construct(reg, owner)?;
        self.adopt(reg, staged);
        Ok(value)
    }

    /// Resolves `reg` once per scope.
    ///
    /// Constructors may resolve recursively, so the lock is never held while
    /// one runs. When two executions race, both construct; the loser's copy
    /// is released on the spot, hooks included, and it receives the
    /// winner's instance.
    fn memoized(self: &Arc<Self>, reg: &ComponentRegistration, owner: Option<&'static str>) -> DiResult<AnyArc> {
        if let Some(hit) = self.instances.lock().get(&reg.slot) {
            return Ok(hit.clone());
        }
        self.ensure_live()?;

        let (value, staged) = self.construct(reg, owner)?;

        let mut instances = self.instances.lock();
        let outcome = match self.ensure_live() {
            Err(e) => Err(e),
            Ok(()) => match instances.get(&reg.slot) {
                Some(hit) => Ok(hit.clone()),
                None => {
                    instances.insert(reg.slot, value.clone());
                    self.adopt(reg, staged);
                    return Ok(value);
                }
            },
        };
        drop(instances);
        self.release_discarded(reg, staged);
        outcome
    }

    /// Moves staged hooks into the scope, or runs them now if the scope has
    /// been disposed meanwhile.
    fn adopt(&self, reg: &ComponentRegistration, staged: DisposeBag) {
        if staged.is_empty() {
            return;
        }
        let mut bag = self.disposers.lock();
        if !self.is_disposed() {
            bag.append(staged);
            return;
        }
        drop(bag);
        self.release_discarded(reg, staged);
    }

    fn release_discarded(&self, reg: &ComponentRegistration, mut staged: DisposeBag) {
        let skipped = staged.discard_async();
        if skipped > 0 {
            tracing::warn!(
                scope_id = self.id,
                component = reg.key.display_name(),
                skipped,
                "async disposers of a discarded instance dropped without running"
            );
        }
        let released = staged.run_all_sync_reverse();
        tracing::trace!(
            scope_id = self.id,
            component = reg.key.display_name(),
            released,
            "released discarded instance"
        );
    }

    pub(crate) fn push_sync(&self, f: Box<dyn FnOnce() + Send>) {
        self.disposers.lock().push_sync(f);
    }

    pub(crate) fn push_async(&self, f: Box<dyn FnOnce() -> BoxFutureUnit + Send>) {
        self.disposers.lock().push_async(move || (f)());
    }

    /// Releases live descendants, newest first, then every owned instance;
    /// only the first call does any work.
    ///
    /// Async hooks cannot run here and are dropped with a warning.
    pub(crate) fn dispose(&self) -> usize {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return 0;
        }
        for child in self.live_children().iter().rev() {
            child.dispose();
        }
        let instances = std::mem::take(&mut *self.instances.lock());
        let mut bag = self.disposers.lock().take();

        let skipped = bag.discard_async();
        if skipped > 0 {
            tracing::warn!(
                scope_id = self.id,
                skipped,
                "async disposers skipped by synchronous dispose; use dispose_async to run them"
            );
        }
        let released = bag.run_all_sync_reverse();
        drop(instances);
        self.disposed_with(released)
    }

    /// Descendants first, then async hooks, then sync hooks, each in LIFO
    /// order. Boxed because it recurses into child scopes.
    pub(crate) fn dispose_async(&self) -> Pin<Box<dyn Future<Output = usize> + Send + '_>> {
        Box::pin(async move {
            if self.disposed.swap(true, Ordering::AcqRel) {
                return 0;
            }
            let children = self.live_children();
            for child in children.iter().rev() {
                child.dispose_async().await;
            }
            let instances = std::mem::take(&mut *self.instances.lock());
            let mut bag = self.disposers.lock().take();

            let mut released = bag.run_all_async_reverse().await;
            released += bag.run_all_sync_reverse();
            drop(instances);
            self.disposed_with(released)
        })
    }

    fn disposed_with(&self, released: usize) -> usize {
        tracing::debug!(scope_id = self.id, tag = ?self.tag, released, "scope disposed");
        self.shared.observers.scope_disposed(self.id, self.tag, released);
        released
    }
}

impl Drop for ScopeNode {
    fn drop(&mut self) {
        if *self.disposed.get_mut() || !self.shared.config.warn_undisposed {
            return;
        }
        let pending = self.disposers.get_mut().len();
        if pending > 0 {
            tracing::warn!(
                scope_id = self.id,
                tag = ?self.tag,
                pending,
                "scope dropped with undisposed resources; call dispose() or dispose_async() first"
            );
        }
    }
}

/// A non-volatile child scope.
///
/// Shares the container's registrations and singletons; instance components
/// resolved through it are disposed with it. Volatile components are not
/// reachable from here.
pub struct Scope {
    pub(crate) node: Arc<ScopeNode>,
}

impl Scope {
    pub fn id(&self) -> u64 {
        self.node.id
    }

    pub fn is_disposed(&self) -> bool {
        self.node.is_disposed()
    }

    /// Nested non-volatile child of this scope.
    pub fn create_child_scope(&self) -> DiResult<Scope> {
        Ok(Scope {
            node: self.node.child(ScopeTag::Child)?,
        })
    }

    pub fn dispose(&self) {
        self.node.dispose();
    }

    pub async fn dispose_async(&self) {
        self.node.dispose_async().await;
    }
}

impl ResolverCore for Scope {
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

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.node.id)
            .field("disposed", &self.node.is_disposed())
            .finish()
    }
}

/// Handle to a volatile scope.
///
/// Cloning yields another handle to the same scope. A volatile scope
/// memoizes one instance of every volatile component resolved through it
/// and releases them all, exactly once, when disposed. Normally created and
/// disposed by a [`ScopeGuard`](crate::ScopeGuard) or
/// [`run_scoped`](crate::run_scoped) rather than by hand.
///
/// Handing one volatile scope to several concurrent executions is
/// memory-safe but gives them shared mutable state; each unit of work is
/// expected to own its scope.
#[derive(Clone)]
pub struct VolatileScope {
    pub(crate) node: Arc<ScopeNode>,
}

impl VolatileScope {
    pub(crate) fn new(node: Arc<ScopeNode>) -> Self {
        debug_assert_eq!(node.tag, ScopeTag::Volatile);
        Self { node }
    }

    /// Process-unique scope identifier.
    pub fn id(&self) -> u64 {
        self.node.id
    }

    pub fn is_disposed(&self) -> bool {
        self.node.is_disposed()
    }

    /// Accessor for `I`; the same instance the container hands to singletons.
    pub fn volatile<I: ?Sized + Send + Sync + 'static>(&self) -> Arc<Volatile<I>> {
        self.node.shared.accessor::<I>()
    }

    /// Non-volatile child of this scope.
    ///
    /// Volatile components resolved through the child are this scope's
    /// instances; instance components are disposed with the child. The
    /// child is disposed with this scope at the latest.
    pub fn create_child_scope(&self) -> DiResult<Scope> {
        Ok(Scope {
            node: self.node.child(ScopeTag::Child)?,
        })
    }

    /// Releases the scope's instances and its child scopes. Later calls are
    /// no-ops.
    pub fn dispose(&self) {
        self.node.dispose();
    }

    /// Like [`dispose`](Self::dispose), awaiting async disposers first.
    pub async fn dispose_async(&self) {
        self.node.dispose_async().await;
    }
}

impl ResolverCore for VolatileScope {
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

impl PartialEq for VolatileScope {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl Eq for VolatileScope {}

impl fmt::Debug for VolatileScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VolatileScope")
            .field("id", &self.node.id)
            .field("disposed", &self.node.is_disposed())
            .finish()
    }
}
