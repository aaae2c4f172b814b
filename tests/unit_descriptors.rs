/// Unit tests for ServiceDescriptor
use ferrous_volatile::{capability, Component, Key, Lifetime, ServiceCollection, ServiceDescriptor, Volatile};
use std::sync::Arc;

pub trait Cache: Send + Sync {}
capability!(dyn Cache => Singleton);

pub trait Session: Send + Sync {}
capability!(dyn Session => Volatile);

struct MemoryCache;
impl Cache for MemoryCache {}

struct WebSession;
impl Session for WebSession {}

struct Handler;

#[test]
fn test_descriptor_accessors() {
    let descriptor = ServiceDescriptor {
        component: Key::of::<MemoryCache>(),
        lifetime: Lifetime::Singleton,
        services: vec![Key::of::<dyn Cache>()],
        dependencies: vec![],
    };

    assert_eq!(descriptor.type_name(), std::any::type_name::<MemoryCache>());
    assert!(descriptor.serves(&Key::of::<MemoryCache>()));
    assert!(descriptor.serves(&Key::of::<dyn Cache>()));
    assert!(!descriptor.serves(&Key::of::<dyn Session>()));
}

#[test]
fn test_descriptors_follow_registration_order() {
    let mut services = ServiceCollection::new();
    services.add(Component::new(|_| Ok(MemoryCache)).exposes::<dyn Cache>(|c| c as Arc<dyn Cache>));
    services.add(Component::new(|_| Ok(WebSession)).exposes::<dyn Session>(|c| c as Arc<dyn Session>));
    services.add(
        Component::new(|_| Ok(Handler))
            .instance()
            .depends_on::<dyn Cache>()
            .depends_on::<Volatile<dyn Session>>(),
    );
    let container = services.build().unwrap();

    let descriptors = container.descriptors();
    let lifetimes: Vec<Lifetime> = descriptors.iter().map(|d| d.lifetime).collect();
    assert_eq!(lifetimes, vec![Lifetime::Singleton, Lifetime::Volatile, Lifetime::Instance]);

    assert_eq!(descriptors[1].services, vec![Key::of::<dyn Session>()]);
    assert_eq!(
        descriptors[2].dependencies,
        vec![Key::of::<dyn Cache>(), Key::of::<Volatile<dyn Session>>()]
    );
    assert!(descriptors[2].services.is_empty());
}

#[test]
fn test_descriptor_equality() {
    let a = ServiceDescriptor {
        component: Key::of::<Handler>(),
        lifetime: Lifetime::Instance,
        services: vec![],
        dependencies: vec![],
    };
    let mut b = a.clone();
    assert_eq!(a, b);

    b.lifetime = Lifetime::Volatile;
    assert_ne!(a, b);
}
