/// Scope guard behavior for synchronous units of work.
use ferrous_volatile::{ambient, Component, Container, DiError, Resolver, ScopeGuard, ServiceCollection};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

struct Session {
    id: usize,
}

fn container() -> Container {
    let next = Arc::new(AtomicUsize::new(0));
    let mut services = ServiceCollection::new();
    services.add(Component::new(move |_| Ok(Session { id: next.fetch_add(1, Ordering::SeqCst) })).volatile());
    services.build().unwrap()
}

// leaving an inner guard makes the outer scope current again
#[test]
fn test_nested_guards_restore_outer_scope() {
    let container = container();
    let accessor = container.volatile::<Session>();

    let outer = ScopeGuard::enter(&container).unwrap();
    let outer_session = accessor.value().unwrap();

    {
        let inner = ScopeGuard::enter(&container).unwrap();
        let inner_session = accessor.value().unwrap();
        assert!(!Arc::ptr_eq(&outer_session, &inner_session));
        assert_eq!(ambient::current().as_ref(), Some(inner.scope()));
    }

    let again = accessor.value().unwrap();
    assert!(Arc::ptr_eq(&outer_session, &again));
    assert_eq!(ambient::current().as_ref(), Some(outer.scope()));

    drop(outer);
    assert!(ambient::current().is_none());
    assert!(matches!(accessor.value(), Err(DiError::VolatileResolvedOutsideScope(_))));
}

#[test]
fn test_guard_disposes_scope_on_exit() {
    let container = container();
    let guard = ScopeGuard::enter(&container).unwrap();
    let scope = guard.scope().clone();
    assert!(!scope.is_disposed());

    guard.exit();
    assert!(scope.is_disposed());
    assert!(matches!(scope.resolve::<Session>(), Err(DiError::ScopeDisposed(_))));
}

#[test]
fn test_run_scoped_restores_and_disposes_on_error() {
    let container = container();
    let mut captured = None;

    let result: Result<(), DiError> = container.run_scoped(|scope| {
        captured = Some(scope.clone());
        Err(DiError::construction::<Session>("boom"))
    });

    assert!(result.is_err());
    assert!(captured.unwrap().is_disposed());
    assert!(ambient::current().is_none());
}

#[test]
fn test_run_scoped_restores_and_disposes_on_panic() {
    let container = container();
    let mut captured = None;

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        container
            .run_scoped(|scope| {
                captured = Some(scope.clone());
                if scope.id() > 0 {
                    panic!("unit of work failed");
                }
                Ok::<_, DiError>(())
            })
            .unwrap();
    }));

    assert!(outcome.is_err());
    assert!(captured.unwrap().is_disposed());
    assert!(ambient::current().is_none());
}

#[test]
fn test_custom_error_type_through_run_scoped() {
    #[derive(Debug)]
    enum AppError {
        Di(DiError),
        Rejected,
    }
    impl From<DiError> for AppError {
        fn from(e: DiError) -> Self {
            AppError::Di(e)
        }
    }

    let container = container();
    let result = container.run_scoped(|scope| {
        let session = scope.resolve::<Session>()?;
        if session.id == usize::MAX {
            return Ok(session.id);
        }
        Err(AppError::Rejected)
    });
    assert!(matches!(result, Err(AppError::Rejected)));

    container.dispose();
    let after = container.run_scoped(|_| Ok::<_, AppError>(()));
    assert!(matches!(after, Err(AppError::Di(DiError::ScopeDisposed(_)))));
}

#[test]
fn test_threads_do_not_share_ambient_scope() {
    let container = container();
    let accessor = container.volatile::<Session>();

    container
        .run_scoped(|_| {
            assert!(accessor.is_available());
            let seen = thread::scope(|s| s.spawn(|| accessor.is_available()).join().unwrap());
            assert!(!seen);
            Ok::<_, DiError>(())
        })
        .unwrap();
}

#[test]
fn test_snapshot_carries_scope_into_thread() {
    let container = container();
    let accessor = container.volatile::<Session>();

    container
        .run_scoped(|scope| {
            let mine = scope.resolve::<Session>()?;
            let snapshot = ambient::Snapshot::capture();
            let accessor = accessor.clone();
            let theirs = thread::spawn(move || snapshot.run(|| accessor.value()))
                .join()
                .unwrap()?;
            assert!(Arc::ptr_eq(&mine, &theirs));
            Ok::<_, DiError>(())
        })
        .unwrap();
}

#[test]
fn test_parallel_threads_get_isolated_scopes() {
    let container = container();
    let accessor = container.volatile::<Session>();

    let ids: Vec<(usize, usize)> = (0..8)
        .map(|_| {
            let container = container.clone();
            let accessor = accessor.clone();
            thread::spawn(move || {
                container
                    .run_scoped(|scope| {
                        let direct = scope.resolve::<Session>()?;
                        thread::yield_now();
                        let through_accessor = accessor.value()?;
                        Ok::<_, DiError>((direct.id, through_accessor.id))
                    })
                    .unwrap()
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect();

    for (direct, through_accessor) in &ids {
        assert_eq!(direct, through_accessor);
    }
    let mut distinct: Vec<usize> = ids.iter().map(|(d, _)| *d).collect();
    distinct.sort_unstable();
    distinct.dedup();
    assert_eq!(distinct.len(), 8);
}

#[test]
fn test_child_scope_dispose_cascades_down_only() {
    let container = container();
    let child = container.create_child_scope().unwrap();
    let grandchild = child.create_child_scope().unwrap();
    let sibling = container.create_child_scope().unwrap();

    child.dispose();
    assert!(child.is_disposed());
    assert!(grandchild.is_disposed());
    assert!(!sibling.is_disposed());
    assert!(!container.is_disposed());
    assert!(matches!(child.create_child_scope(), Err(DiError::ScopeDisposed(_))));
    sibling.dispose();
}

// dropping guards out of order leaves the slot holding the newer scope
#[test]
fn test_out_of_order_guard_drop_keeps_newer_scope() {
    let container = container();
    let outer = ScopeGuard::enter(&container).unwrap();
    let inner = ScopeGuard::enter(&container).unwrap();
    let inner_scope = inner.scope().clone();

    drop(outer);
    assert_eq!(ambient::current().as_ref(), Some(&inner_scope));

    // the disposed outer scope is not brought back
    drop(inner);
    assert!(ambient::current().is_none());
}

#[tokio::test]
async fn test_guard_refused_on_runtime_without_task_slot() {
    let container = container();
    assert!(matches!(ScopeGuard::enter(&container), Err(DiError::GuardOutsideTaskScope)));
    assert!(ambient::current().is_none());
}

#[tokio::test]
async fn test_guards_held_across_await_stay_isolated() {
    let container = container();
    let accessor = container.volatile::<Session>();

    let unit = |container: Container| {
        let accessor = accessor.clone();
        ambient::scope_with(None, async move {
            let guard = ScopeGuard::enter(&container)?;
            let first = accessor.value()?;
            for _ in 0..3 {
                tokio::task::yield_now().await;
                assert_eq!(ambient::current().as_ref(), Some(guard.scope()));
                assert!(Arc::ptr_eq(&first, &accessor.value()?));
            }
            drop(guard);
            assert!(ambient::current().is_none());
            Ok::<_, DiError>(first.id)
        })
    };

    let (a, b) = futures::join!(unit(container.clone()), unit(container.clone()));
    assert_ne!(a.unwrap(), b.unwrap());
    assert!(ambient::current().is_none());
}

#[test]
fn test_volatile_scope_child_shares_volatile_instances() {
    struct Handle {
        released: Arc<AtomicUsize>,
    }
    impl ferrous_volatile::Dispose for Handle {
        fn dispose(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    let released = Arc::new(AtomicUsize::new(0));
    let next = Arc::new(AtomicUsize::new(0));
    let mut services = ServiceCollection::new();
    services.add(Component::new(move |_| Ok(Session { id: next.fetch_add(1, Ordering::SeqCst) })).volatile());
    let r = released.clone();
    services.add(Component::new(move |_| Ok(Handle { released: r.clone() })).instance().disposable());
    let container = services.build().unwrap();

    let scope = container.create_volatile_scope().unwrap();
    let child = scope.create_child_scope().unwrap();

    let from_child = child.resolve::<Session>().unwrap();
    let from_scope = scope.resolve::<Session>().unwrap();
    assert!(Arc::ptr_eq(&from_child, &from_scope));

    child.resolve::<Handle>().unwrap();
    child.dispose();
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert!(!scope.is_disposed());
    assert!(Arc::ptr_eq(&scope.resolve::<Session>().unwrap(), &from_scope));

    scope.dispose();
    assert!(matches!(scope.create_child_scope(), Err(DiError::ScopeDisposed(_))));
}
