//! The registration table built once at bootstrap.

use std::collections::{HashMap, HashSet};

use crate::component::{ComponentType, Ctor, DisposeHook, Upcast};
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::lifetime::Lifetime;

/// One classified component.
pub(crate) struct ComponentRegistration {
    /// Index into `Registry::components`; memoization key in scope tables.
    pub(crate) slot: usize,
    pub(crate) key: Key,
    pub(crate) lifetime: Lifetime,
    pub(crate) ctor: Ctor,
    pub(crate) dependencies: Vec<Key>,
    pub(crate) dispose_hooks: Vec<DisposeHook>,
    pub(crate) services: Vec<Key>,
}

/// How a requested key reaches a component.
pub(crate) struct Route {
    pub(crate) component: usize,
    pub(crate) upcast: Upcast,
}

/// Read-only after bootstrap; shared by every scope of one container.
pub(crate) struct Registry {
    pub(crate) components: Vec<ComponentRegistration>,
    routes: HashMap<Key, Vec<Route>>,
}

impl Registry {
    /// Last registered route for `key`.
    pub(crate) fn route(&self, key: &Key) -> Option<&Route> {
        self.routes.get(key).and_then(|routes| routes.last())
    }

    /// Every route for `key`, in registration order.
    pub(crate) fn routes(&self, key: &Key) -> &[Route] {
        self.routes.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn component(&self, slot: usize) -> &ComponentRegistration {
        &self.components[slot]
    }

    /// Lifetime of the component a key resolves to, if routed.
    pub(crate) fn lifetime_of(&self, key: &Key) -> Option<Lifetime> {
        self.route(key).map(|r| self.components[r.component].lifetime)
    }

    /// Rejects singletons that take a volatile dependency directly.
    ///
    /// Instance dependencies are followed transitively: a singleton holding
    /// an instance that holds a volatile is captured for the process
    /// lifetime just the same.
    pub(crate) fn validate(&self) -> DiResult<()> {
        for component in self.components.iter().filter(|c| c.lifetime == Lifetime::Singleton) {
            let mut visited = HashSet::new();
            if let Some(dependency) = self.find_volatile(&component.dependencies, &mut visited) {
                return Err(DiError::VolatileInjectedDirectlyIntoSingleton {
                    singleton: component.key.display_name(),
                    dependency: dependency.display_name(),
                });
            }
        }
        Ok(())
    }

    fn find_volatile(&self, dependencies: &[Key], visited: &mut HashSet<usize>) -> Option<Key> {
        for dependency in dependencies {
            // unrouted keys (accessors, unregistered types) are checked at resolution
            let Some(route) = self.route(dependency) else {
                continue;
            };
            let target = &self.components[route.component];
            match target.lifetime {
                Lifetime::Volatile => return Some(*dependency),
                Lifetime::Instance if visited.insert(target.slot) => {
                    if let Some(found) = self.find_volatile(&target.dependencies, visited) {
                        return Some(found);
                    }
                }
                _ => {}
            }
        }
        None
    }
}

/// Classifies every component and builds the routing table.
///
/// Each component routes from its own concrete type and from every
/// capability interface it exposes.
pub(crate) fn register<C>(types: Vec<ComponentType>, mut classify: C) -> DiResult<Registry>
where
    C: FnMut(&ComponentType) -> DiResult<Lifetime>,
{
    let mut components = Vec::with_capacity(types.len());
    let mut routes: HashMap<Key, Vec<Route>> = HashMap::new();

    for (slot, ty) in types.into_iter().enumerate() {
        let lifetime = classify(&ty)?;

        routes.entry(ty.key).or_default().push(Route {
            component: slot,
            upcast: ty.as_self.clone(),
        });
        for service in &ty.services {
            routes.entry(service.key).or_default().push(Route {
                component: slot,
                upcast: service.upcast.clone(),
            });
        }

        components.push(ComponentRegistration {
            slot,
            key: ty.key,
            lifetime,
            ctor: ty.ctor,
            dependencies: ty.dependencies,
            dispose_hooks: ty.dispose_hooks,
            services: ty.services.iter().map(|s| s.key).collect(),
        });
    }

    Ok(Registry { components, routes })
}
