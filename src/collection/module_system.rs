//! Modular registration.
//!
//! A module groups the component declarations of one feature area, standing
//! in for assembly scanning: the bootstrapper lists modules instead of types.

use crate::{DiResult, ServiceCollection};

/// A group of component declarations registered together.
///
/// # Example
///
/// ```rust
/// use ferrous_volatile::{
///     Component, DiResult, Resolver, ServiceCollection, ServiceCollectionExt, ServiceModule,
/// };
/// use std::sync::Arc;
///
/// struct UserConfig;
/// struct UserRepository { config: Arc<UserConfig> }
///
/// struct UserModule;
///
/// impl ServiceModule for UserModule {
///     fn register_services(self, services: &mut ServiceCollection) -> DiResult<()> {
///         services.add(Component::new(|_| Ok(UserConfig)).singleton());
///         services.add(
///             Component::new(|r| Ok(UserRepository { config: r.resolve::<UserConfig>()? }))
///                 .volatile()
///                 .depends_on::<UserConfig>(),
///         );
///         Ok(())
///     }
/// }
///
/// # fn main() -> DiResult<()> {
/// let container = ServiceCollection::new().add_module(UserModule)?.build()?;
/// container.run_scoped(|scope| scope.resolve::<UserRepository>().map(drop))?;
/// # Ok(())
/// # }
/// ```
pub trait ServiceModule {
    fn register_services(self, services: &mut ServiceCollection) -> DiResult<()>;
}

/// Chaining module registration on an owned collection.
pub trait ServiceCollectionExt {
    fn add_module<M: ServiceModule>(self, module: M) -> DiResult<Self>
    where
        Self: Sized;
}

impl ServiceCollectionExt for ServiceCollection {
    fn add_module<M: ServiceModule>(mut self, module: M) -> DiResult<Self> {
        module.register_services(&mut self)?;
        Ok(self)
    }
}

/// In-place module registration matching the `&mut Self` builder style.
pub trait ServiceCollectionModuleExt {
    fn add_module_mut<M: ServiceModule>(&mut self, module: M) -> DiResult<&mut Self>;
}

impl ServiceCollectionModuleExt for ServiceCollection {
    fn add_module_mut<M: ServiceModule>(&mut self, module: M) -> DiResult<&mut Self> {
        module.register_services(self)?;
        Ok(self)
    }
}
