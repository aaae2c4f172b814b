//! # ferrous-volatile
//!
//! Dependency lifetimes with ambient, per-execution volatile scopes.
//!
//! ## Features
//!
//! - **Three lifetimes**: `Instance` (fresh every time), `Singleton` (one per
//!   container) and `Volatile` (one per unit of work)
//! - **Marker classification**: lifetimes come from markers on a component or
//!   on the capability interfaces it exposes, checked once at build time
//! - **Ambient scopes**: the volatile scope of a unit of work follows it
//!   across `.await` points and into forked tasks, and never leaks sideways
//! - **Singleton-safe access**: singletons hold a [`Volatile<T>`] accessor that
//!   re-resolves from whatever volatile scope is current on every call
//! - **Guaranteed release**: a scope is disposed exactly once on every exit
//!   path, including panics and cancelled futures
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_volatile::{capability, Component, Resolver, ServiceCollection, Volatile};
//! use std::sync::Arc;
//!
//! pub trait RequestInfo: Send + Sync {
//!     fn path(&self) -> &str;
//! }
//! capability!(dyn RequestInfo => Volatile);
//!
//! struct HttpRequest;
//! impl RequestInfo for HttpRequest {
//!     fn path(&self) -> &str { "/orders" }
//! }
//!
//! struct AuditLog {
//!     request: Arc<Volatile<dyn RequestInfo>>,
//! }
//! impl AuditLog {
//!     fn entry(&self) -> String {
//!         match self.request.value() {
//!             Ok(request) => format!("request to {}", request.path()),
//!             Err(e) => format!("no request: {}", e),
//!         }
//!     }
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add(
//!     Component::new(|_| Ok(HttpRequest))
//!         .exposes::<dyn RequestInfo>(|c| c as Arc<dyn RequestInfo>),
//! );
//! services.add(
//!     Component::new(|r| Ok(AuditLog { request: r.volatile::<dyn RequestInfo>() }))
//!         .singleton()
//!         .depends_on::<Volatile<dyn RequestInfo>>(),
//! );
//! let container = services.build().unwrap();
//!
//! let audit = container.resolve::<AuditLog>().unwrap();
//! assert!(audit.entry().starts_with("no request"));
//!
//! let entry = container
//!     .run_scoped(|_| Ok::<_, ferrous_volatile::DiError>(audit.entry()))
//!     .unwrap();
//! assert_eq!(entry, "request to /orders");
//! ```
//!
//! ## Service Lifetimes
//!
//! - **Instance**: constructed on every resolution, owned by the resolving scope
//! - **Singleton**: constructed once per container, with no volatile scope visible
//! - **Volatile**: constructed once per volatile scope; resolving it outside one
//!   fails with [`DiError::VolatileResolvedOutsideScope`]
//!
//! ## Async units of work
//!
//! ```rust
//! use ferrous_volatile::{ambient, Component, DiError, Resolver, ServiceCollection};
//! use std::sync::Arc;
//!
//! struct Transaction;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut services = ServiceCollection::new();
//! services.add(Component::new(|_| Ok(Transaction)).volatile());
//! let container = services.build().unwrap();
//! let accessor = container.volatile::<Transaction>();
//!
//! container
//!     .run_scoped_async(|scope| async move {
//!         let mine = scope.resolve::<Transaction>()?;
//!         // child tasks see the same scope
//!         let theirs = ambient::spawn(async move { accessor.value() }).await.unwrap()?;
//!         assert!(Arc::ptr_eq(&mine, &theirs));
//!         Ok::<_, DiError>(())
//!     })
//!     .await
//!     .unwrap();
//! # }
//! ```

pub mod accessor;
pub mod ambient;
pub mod classifier;
pub mod collection;
pub mod component;
pub mod config;
pub mod descriptors;
pub mod error;
pub mod guard;
pub mod key;
pub mod lifetime;
pub mod observer;
pub mod provider;
pub mod traits;

mod internal;
mod registration;

pub use accessor::Volatile;
pub use classifier::classify;
pub use collection::{ServiceCollection, ServiceCollectionExt, ServiceCollectionModuleExt, ServiceModule};
pub use component::{Component, ComponentType};
pub use config::ContainerConfig;
pub use descriptors::ServiceDescriptor;
pub use error::{DiError, DiResult};
pub use guard::{run_scoped, run_scoped_async, ScopeGuard};
pub use key::{key_of_type, Key};
pub use lifetime::{Capability, Lifetime, ScopeTag, Sharing};
pub use observer::{DiObserver, LoggingObserver};
pub use provider::{Container, ResolverContext, Scope, VolatileScope};
pub use traits::{AsyncDispose, Dispose, Resolver, ResolverCore};
