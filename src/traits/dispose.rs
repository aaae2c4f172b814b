//! Disposal traits for resource cleanup.

/// Trait for synchronous resource disposal.
///
/// Components declared with [`Component::disposable`](crate::Component::disposable)
/// are disposed when the scope that owns them is released: volatile
/// instances when their scope guard exits, instance values with the scope
/// they were resolved from, singletons with the root container.
///
/// # Examples
///
/// ```
/// use ferrous_volatile::{Component, Dispose, ServiceCollection};
///
/// struct UnitOfWork;
///
/// impl Dispose for UnitOfWork {
///     fn dispose(&self) {
///         println!("committing unit of work");
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add(Component::new(|_| Ok(UnitOfWork)).volatile().disposable());
/// ```
pub trait Dispose: Send + Sync + 'static {
    fn dispose(&self);
}

/// Trait for asynchronous resource disposal.
///
/// Async hooks run before sync hooks, both in LIFO order, when a scope is
/// released through `dispose_async` or at the end of `run_scoped_async`.
///
/// # Examples
///
/// ```
/// use ferrous_volatile::{AsyncDispose, Component, ServiceCollection};
/// use async_trait::async_trait;
///
/// struct Transaction {
///     id: u64,
/// }
///
/// #[async_trait]
/// impl AsyncDispose for Transaction {
///     async fn dispose(&self) {
///         println!("rolling back transaction {}", self.id);
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add(
///     Component::new(|_| Ok(Transaction { id: 7 }))
///         .volatile()
///         .async_disposable(),
/// );
/// ```
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    async fn dispose(&self);
}
