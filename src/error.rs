//! Error types for the dependency lifetime engine.

use crate::lifetime::Lifetime;

/// Dependency injection errors
///
/// Every variant is a programmer-visible defect rather than a transient
/// runtime condition: the engine surfaces them unchanged and never retries.
///
/// # Examples
///
/// ```rust
/// use ferrous_volatile::{DiError, ServiceCollection, Resolver};
///
/// let container = ServiceCollection::new().build().unwrap();
/// match container.resolve::<String>() {
///     Err(DiError::NotFound(type_name)) => {
///         assert_eq!(type_name, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_volatile::DiError;
///
/// let outside = DiError::VolatileResolvedOutsideScope("dyn app::CurrentUser");
/// let circular = DiError::Circular(vec!["ServiceA", "ServiceB", "ServiceA"]);
///
/// println!("Error: {}", outside);
/// println!("Error: {}", circular);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiError {
    /// Service not registered
    #[error("Service not found: {0}")]
    NotFound(&'static str),
    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// Circular dependency detected (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<&'static str>),
    /// Maximum recursion depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// A component declares zero, or more than one distinct, lifetime marker.
    ///
    /// Raised while the registration table is built; fatal to bootstrap.
    #[error("Invalid lifetime declaration for {component}: expected exactly one lifetime marker, found [{}]", lifetime_list(.markers))]
    InvalidLifetimeDeclaration {
        component: &'static str,
        markers: Vec<Lifetime>,
    },
    /// A volatile dependency was requested while no volatile scope is
    /// active for the current execution (or from a non-volatile scope).
    #[error("Attempted to access volatile dependency {0} outside a volatile scope; wrap this code in run_scoped or run_scoped_async")]
    VolatileResolvedOutsideScope(&'static str),
    /// A singleton constructor takes a volatile dependency directly instead
    /// of through `Volatile<T>`.
    #[error("Singleton {singleton} depends directly on volatile {dependency}; depend on Volatile<{dependency}> instead")]
    VolatileInjectedDirectlyIntoSingleton {
        singleton: &'static str,
        dependency: &'static str,
    },
    /// Resolution was attempted on a scope that has already been released.
    #[error("Scope {0} has already been disposed")]
    ScopeDisposed(u64),
    /// A [`ScopeGuard`](crate::ScopeGuard) was entered on a runtime thread
    /// outside any task-local ambient slot, where concurrent futures would
    /// share the thread's slot.
    #[error("ScopeGuard entered inside an async runtime without a task-local ambient slot; use run_scoped_async or wrap the future in ambient::scope_with")]
    GuardOutsideTaskScope,
    /// A component constructor reported a failure of its own.
    #[error("Failed to construct {component}: {message}")]
    Construction {
        component: &'static str,
        message: String,
    },
    /// Container configuration could not be loaded or is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DiError {
    /// Wraps a constructor failure for component `T`.
    pub fn construction<T: ?Sized + 'static>(message: impl Into<String>) -> Self {
        DiError::Construction {
            component: std::any::type_name::<T>(),
            message: message.into(),
        }
    }

    /// True for the errors that indicate a scoping mistake rather than a
    /// missing or broken registration.
    pub fn is_scoping_error(&self) -> bool {
        matches!(
            self,
            DiError::VolatileResolvedOutsideScope(_)
                | DiError::VolatileInjectedDirectlyIntoSingleton { .. }
                | DiError::ScopeDisposed(_)
                | DiError::GuardOutsideTaskScope
        )
    }
}

fn lifetime_list(markers: &[Lifetime]) -> String {
    markers
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for DI operations
///
/// A convenience type alias for `Result<T, DiError>` used throughout the crate.
pub type DiResult<T> = Result<T, DiError>;
