/// Volatile accessor behavior, including the request-scoped user scenarios.
use ferrous_volatile::{
    ambient, capability, run_scoped, Component, Container, DiError, Resolver, ServiceCollection, Volatile,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub trait User: Send + Sync {
    fn name(&self) -> String;
    fn set_name(&self, name: &str);
}
capability!(dyn User => Volatile);

#[derive(Default)]
struct RequestUser {
    name: Mutex<String>,
}

impl User for RequestUser {
    fn name(&self) -> String {
        self.name.lock().unwrap().clone()
    }

    fn set_name(&self, name: &str) {
        *self.name.lock().unwrap() = name.to_string();
    }
}

struct UserGreeter {
    user: Arc<Volatile<dyn User>>,
}

impl UserGreeter {
    fn check(&self, expected: &str) -> bool {
        matches!(self.user.value(), Ok(user) if user.name() == expected)
    }

    async fn check_later(&self, expected: &str) -> bool {
        tokio::time::sleep(Duration::from_millis(1)).await;
        self.check(expected)
    }

    /// Deferred per-character view of the current user's name.
    fn letters(&self) -> impl Iterator<Item = Result<char, DiError>> + '_ {
        (0..3).map(move |i| {
            let user = self.user.value()?;
            Ok(user.name().chars().nth(i).unwrap_or('-'))
        })
    }
}

fn container() -> Container {
    let mut services = ServiceCollection::new();
    services.add(
        Component::new(|_| Ok(RequestUser::default())).exposes::<dyn User>(|c| c as Arc<dyn User>),
    );
    services.add(
        Component::new(|r| Ok(UserGreeter { user: r.volatile::<dyn User>() }))
            .singleton()
            .depends_on::<Volatile<dyn User>>(),
    );
    services.build().unwrap()
}

#[test]
fn test_value_before_inside_and_after_guard() {
    let container = container();
    let accessor = container.volatile::<dyn User>();

    assert!(matches!(accessor.value(), Err(DiError::VolatileResolvedOutsideScope(_))));

    let inside = container
        .run_scoped(|scope| {
            let from_accessor = accessor.value()?;
            let from_scope = scope.resolve::<dyn User>()?;
            assert!(Arc::ptr_eq(&from_accessor, &from_scope));
            Ok::<_, DiError>(from_accessor)
        })
        .unwrap();
    inside.set_name("still usable");

    assert!(matches!(accessor.value(), Err(DiError::VolatileResolvedOutsideScope(_))));
}

#[test]
fn test_one_accessor_per_container_and_type() {
    let container = container();
    let greeter = container.resolve::<UserGreeter>().unwrap();

    assert!(Arc::ptr_eq(&greeter.user, &container.volatile::<dyn User>()));
    container
        .run_scoped(|scope| {
            assert!(Arc::ptr_eq(&greeter.user, &scope.volatile::<dyn User>()));
            Ok::<_, DiError>(())
        })
        .unwrap();

    let other = self::container();
    assert!(!Arc::ptr_eq(&greeter.user, &other.volatile::<dyn User>()));
}

#[test]
fn test_accessor_read_in_singleton_constructor_fails() {
    struct Eager {
        captured: Result<String, DiError>,
    }

    let mut services = ServiceCollection::new();
    services.add(
        Component::new(|_| Ok(RequestUser::default())).exposes::<dyn User>(|c| c as Arc<dyn User>),
    );
    services.add(
        Component::new(|r| {
            let user = r.volatile::<dyn User>();
            Ok(Eager { captured: user.value().map(|u| u.name()) })
        })
        .singleton(),
    );
    let container = services.build().unwrap();

    // first resolved lazily inside a guard: the constructor still sees no scope
    let eager = container.run_scoped(|scope| scope.resolve::<Eager>()).unwrap();
    assert!(matches!(eager.captured, Err(DiError::VolatileResolvedOutsideScope(_))));
}

// ten concurrent requests, each with its own user
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_each_see_their_own_user() {
    let container = container();
    let greeter = container.resolve::<UserGreeter>().unwrap();

    let handles: Vec<_> = (0..10u64)
        .map(|i| {
            let container = container.clone();
            let greeter = greeter.clone();
            tokio::spawn(async move {
                container
                    .run_scoped_async(|scope| async move {
                        let name = format!("user-{i}");
                        scope.resolve::<dyn User>()?.set_name(&name);
                        tokio::time::sleep(Duration::from_millis((i * 7) % 13)).await;
                        let sync_ok = greeter.check(&name);
                        let async_ok = greeter.check_later(&name).await;
                        Ok::<_, DiError>(sync_ok && async_ok)
                    })
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().unwrap());
    }
}

#[tokio::test]
async fn test_concurrent_requests_on_one_task() {
    let container = container();
    let greeter = container.resolve::<UserGreeter>().unwrap();

    let units = (0..10u64).map(|i| {
        let greeter = greeter.clone();
        let container = container.clone();
        async move {
            container
                .run_scoped_async(|scope| async move {
                    let name = format!("inline-{i}");
                    scope.resolve::<dyn User>()?.set_name(&name);
                    tokio::time::sleep(Duration::from_millis(13 - (i * 7) % 13)).await;
                    Ok::<_, DiError>(greeter.check_later(&name).await)
                })
                .await
        }
    });

    let results = futures::future::join_all(units).await;
    assert_eq!(results.len(), 10);
    assert!(results.into_iter().all(|r| r.unwrap()));
}

// lazy evaluation escaping the unit of work
#[test]
fn test_deferred_evaluation_leaking_out_of_guard_fails() {
    let container = container();
    let greeter = container.resolve::<UserGreeter>().unwrap();

    let leaked = run_scoped(&container, |scope| {
        scope.resolve::<dyn User>()?.set_name("ada");
        let inside: Result<String, DiError> = greeter.letters().collect();
        assert_eq!(inside.unwrap(), "ada");
        Ok::<_, DiError>(greeter.letters())
    })
    .unwrap();

    let outside: Vec<Result<char, DiError>> = leaked.collect();
    assert_eq!(outside.len(), 3);
    assert!(outside
        .iter()
        .all(|r| matches!(r, Err(DiError::VolatileResolvedOutsideScope(_)))));
}

#[test]
fn test_leaked_evaluation_in_later_scope_sees_later_scope() {
    let container = container();
    let greeter = container.resolve::<UserGreeter>().unwrap();

    let leaked = container
        .run_scoped(|scope| {
            scope.resolve::<dyn User>()?.set_name("old");
            Ok::<_, DiError>(greeter.letters())
        })
        .unwrap();

    let later = container
        .run_scoped(|scope| {
            scope.resolve::<dyn User>()?.set_name("new");
            leaked.collect::<Result<String, DiError>>()
        })
        .unwrap();
    assert_eq!(later, "new");
}

#[test]
fn test_values_resolves_every_implementation() {
    struct Guest;
    impl User for Guest {
        fn name(&self) -> String {
            "guest".to_string()
        }
        fn set_name(&self, _: &str) {}
    }

    let mut services = ServiceCollection::new();
    services.add(
        Component::new(|_| Ok(RequestUser::default())).exposes::<dyn User>(|c| c as Arc<dyn User>),
    );
    services.add(Component::new(|_| Ok(Guest)).exposes::<dyn User>(|c| c as Arc<dyn User>));
    let container = services.build().unwrap();
    let accessor = container.volatile::<dyn User>();

    assert!(accessor.values().is_err());
    let names = container
        .run_scoped(|_| {
            let users = accessor.values()?;
            Ok::<_, DiError>(users.iter().map(|u| u.name()).collect::<Vec<_>>())
        })
        .unwrap();
    assert_eq!(names, vec![String::new(), "guest".to_string()]);
}

#[test]
fn test_manually_installed_disposed_scope_is_not_used() {
    let container = container();
    let accessor = container.volatile::<dyn User>();
    let scope = container.create_volatile_scope().unwrap();
    scope.dispose();

    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let result = runtime.block_on(ambient::scope_with(Some(scope), async move { accessor.value().map(|_| ()) }));
    assert!(matches!(result, Err(DiError::VolatileResolvedOutsideScope(_))));
}
