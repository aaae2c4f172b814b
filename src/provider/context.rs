//! Resolver context passed to component constructors.

use std::sync::Arc;

use parking_lot::Mutex;

use super::scope::ScopeNode;
use crate::accessor::Volatile;
use crate::component::AnyArc;
use crate::error::DiResult;
use crate::internal::dispose_bag::BoxFutureUnit;
use crate::internal::DisposeBag;
use crate::key::Key;
use crate::lifetime::ScopeTag;
use crate::traits::ResolverCore;

/// Context handed to a constructor for resolving its dependencies.
///
/// Resolutions go through the scope the component is being constructed in:
/// the root for singletons, the volatile scope for volatile components, the
/// requesting scope for instance components. While a singleton is under
/// construction, asking for a volatile component fails with
/// [`DiError::VolatileInjectedDirectlyIntoSingleton`](crate::DiError::VolatileInjectedDirectlyIntoSingleton);
/// take a [`Volatile`] accessor from [`volatile`](Self::volatile) instead.
///
/// Disposers registered here belong to the instance under construction and
/// pass to the owning scope only once that instance is kept.
///
/// # Examples
///
/// ```
/// use ferrous_volatile::{Component, Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut services = ServiceCollection::new();
/// services.add(
///     Component::new(|_| Ok(Database { url: "postgres://localhost".to_string() })).singleton(),
/// );
/// services.add(
///     Component::new(|r| Ok(UserService { db: r.resolve::<Database>()? }))
///         .instance()
///         .depends_on::<Database>(),
/// );
///
/// let container = services.build().unwrap();
/// let users = container.resolve::<UserService>().unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
pub struct ResolverContext<'a> {
    scope: &'a Arc<ScopeNode>,
    owner: Option<&'static str>,
    staged: Mutex<DisposeBag>,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(scope: &'a Arc<ScopeNode>, owner: Option<&'static str>) -> Self {
        Self {
            scope,
            owner,
            staged: Mutex::new(DisposeBag::default()),
        }
    }

    pub(crate) fn into_staged(self) -> DisposeBag {
        self.staged.into_inner()
    }

    /// The singleton accessor for volatile component `I`.
    pub fn volatile<I: ?Sized + Send + Sync + 'static>(&self) -> Arc<Volatile<I>> {
        self.scope.shared.accessor::<I>()
    }

    pub fn scope_id(&self) -> u64 {
        self.scope.id
    }

    pub fn scope_tag(&self) -> ScopeTag {
        self.scope.tag
    }

    /// Name of the singleton being constructed, when resolving on its behalf.
    pub fn constructing_singleton(&self) -> Option<&'static str> {
        self.owner
    }
}

impl<'a> ResolverCore for ResolverContext<'a> {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.scope.resolve_key(key, self.owner)
    }

    fn resolve_many(&self, key: &Key) -> DiResult<Vec<AnyArc>> {
        self.scope.resolve_all_keys(key, self.owner)
    }

    fn push_sync_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.staged.lock().push_sync(f);
    }

    fn push_async_disposer(&self, f: Box<dyn FnOnce() -> BoxFutureUnit + Send>) {
        self.staged.lock().push_async(move || (f)());
    }
}
