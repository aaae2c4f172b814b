//! Service descriptors for introspection and diagnostics.

use crate::key::Key;
use crate::lifetime::Lifetime;

/// Describes one registered component.
///
/// Returned by [`Container::descriptors`](crate::Container::descriptors) in
/// registration order.
///
/// # Examples
///
/// ```
/// use ferrous_volatile::{Component, Lifetime, ServiceCollection};
///
/// struct Settings;
///
/// let mut services = ServiceCollection::new();
/// services.add(Component::new(|_| Ok(Settings)).singleton());
/// let container = services.build().unwrap();
///
/// let descriptors = container.descriptors();
/// assert_eq!(descriptors.len(), 1);
/// assert_eq!(descriptors[0].lifetime, Lifetime::Singleton);
/// assert!(descriptors[0].type_name().ends_with("Settings"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// The concrete component type.
    pub component: Key,
    pub lifetime: Lifetime,
    /// Capability interfaces routed to the component.
    pub services: Vec<Key>,
    /// Declared constructor dependencies.
    pub dependencies: Vec<Key>,
}

impl ServiceDescriptor {
    pub fn type_name(&self) -> &'static str {
        self.component.display_name()
    }

    /// Whether the component can be resolved as `key`.
    pub fn serves(&self, key: &Key) -> bool {
        self.component == *key || self.services.contains(key)
    }
}
