//! Service collection: gathers component declarations and builds the container.

use std::sync::Arc;

use crate::classifier::classify;
use crate::component::ComponentType;
use crate::config::ContainerConfig;
use crate::error::DiResult;
use crate::observer::{DiObserver, Observers};
use crate::provider::Container;
use crate::registration::register;

pub mod module_system;
pub use module_system::*;

/// Collection of component declarations.
///
/// Components are gathered here by the bootstrapper, then classified and
/// frozen into a [`Container`] by [`build`](Self::build). Nothing is
/// classified or validated until then.
///
/// # Examples
///
/// ```
/// use ferrous_volatile::{capability, Component, Resolver, ServiceCollection, Volatile};
/// use std::sync::{Arc, Mutex};
///
/// pub trait User: Send + Sync {
///     fn name(&self) -> String;
///     fn set_name(&self, name: &str);
/// }
/// capability!(dyn User => Volatile);
///
/// #[derive(Default)]
/// struct SessionUser {
///     name: Mutex<String>,
/// }
/// impl User for SessionUser {
///     fn name(&self) -> String { self.name.lock().unwrap().clone() }
///     fn set_name(&self, name: &str) { *self.name.lock().unwrap() = name.to_string(); }
/// }
///
/// struct Greeter {
///     user: Arc<Volatile<dyn User>>,
/// }
/// impl Greeter {
///     fn greet(&self) -> String {
///         match self.user.value() {
///             Ok(user) => format!("hello {}", user.name()),
///             Err(_) => "hello stranger".to_string(),
///         }
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services
///     .add(Component::new(|_| Ok(SessionUser::default())).exposes::<dyn User>(|c| c as Arc<dyn User>))
///     .add(Component::new(|r| Ok(Greeter { user: r.volatile::<dyn User>() })).singleton());
/// let container = services.build().unwrap();
///
/// let greeter = container.resolve::<Greeter>().unwrap();
/// assert_eq!(greeter.greet(), "hello stranger");
///
/// let greeting = container
///     .run_scoped(|scope| {
///         scope.resolve::<dyn User>()?.set_name("ada");
///         Ok::<_, ferrous_volatile::DiError>(greeter.greet())
///     })
///     .unwrap();
/// assert_eq!(greeting, "hello ada");
/// ```
pub struct ServiceCollection {
    components: Vec<ComponentType>,
    observers: Observers,
    config: ContainerConfig,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            observers: Observers::new(),
            config: ContainerConfig::default(),
        }
    }

    /// Adds one component declaration.
    pub fn add<C: Into<ComponentType>>(&mut self, component: C) -> &mut Self {
        self.components.push(component.into());
        self
    }

    /// Adds every discovered component, in iteration order.
    pub fn register<I>(&mut self, types: I) -> &mut Self
    where
        I: IntoIterator<Item = ComponentType>,
    {
        self.components.extend(types);
        self
    }

    /// Registers a diagnostic observer shared by every scope of the container.
    pub fn add_observer(&mut self, observer: Arc<dyn DiObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    pub fn with_config(&mut self, config: ContainerConfig) -> &mut Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Classifies every component and freezes the registration table.
    ///
    /// Fails with [`DiError::InvalidLifetimeDeclaration`](crate::DiError::InvalidLifetimeDeclaration)
    /// for a component without exactly one lifetime, and (unless disabled in
    /// [`ContainerConfig`]) with
    /// [`DiError::VolatileInjectedDirectlyIntoSingleton`](crate::DiError::VolatileInjectedDirectlyIntoSingleton)
    /// for a singleton declaring a direct volatile dependency.
    pub fn build(self) -> DiResult<Container> {
        self.config.validate()?;
        let count = self.components.len();
        let registry = register(self.components, classify)?;
        if self.config.validate_on_build {
            registry.validate()?;
        }
        tracing::debug!(components = count, "container built");
        Ok(Container::new(registry, self.config, self.observers))
    }
}

impl Default for ServiceCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("components", &self.components)
            .field("config", &self.config)
            .finish()
    }
}
