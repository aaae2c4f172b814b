//! Service lifetime definitions and capability markers.

use std::fmt;

/// Service lifetimes controlling instance caching behavior
///
/// Every registered component is classified into exactly one of these kinds
/// (see [`classify`](crate::classify)).
///
/// # Lifetime Characteristics
///
/// - **Instance**: fresh value on every resolution, never cached
/// - **Singleton**: one value per root container, for the process lifetime
/// - **Volatile**: one value per active volatile scope; only reachable from a
///   volatile scope or through a [`Volatile`](crate::Volatile) accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
pub enum Lifetime {
    /// New instance per resolution, never cached
    Instance,
    /// Single instance per root container, cached until the root is disposed
    Singleton,
    /// Single instance per volatile scope, released when that scope's guard exits
    Volatile,
}

impl Lifetime {
    /// How the resolver memoizes values of this lifetime.
    pub fn sharing(self) -> Sharing {
        match self {
            Lifetime::Instance => Sharing::None,
            Lifetime::Singleton => Sharing::PerRoot,
            Lifetime::Volatile => Sharing::PerMatchingScope(ScopeTag::Volatile),
        }
    }

    /// Whether a root or plain child scope may hand out this lifetime.
    pub fn is_non_volatile(self) -> bool {
        !matches!(self, Lifetime::Volatile)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifetime::Instance => "Instance",
            Lifetime::Singleton => "Singleton",
            Lifetime::Volatile => "Volatile",
        };
        f.write_str(name)
    }
}

/// Tag carried by every scope in the scope tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeTag {
    /// The root container.
    Root,
    /// A non-volatile child created with `create_child_scope`.
    Child,
    /// A volatile scope; owns the volatile instances resolved inside it.
    Volatile,
}

/// Resolver-level memoization policy derived from a [`Lifetime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sharing {
    /// Construct on every resolution.
    None,
    /// Construct once and cache at the root.
    PerRoot,
    /// Construct once per nearest enclosing scope carrying the tag.
    PerMatchingScope(ScopeTag),
}

/// A capability interface a component can be resolved as.
///
/// Implemented for the interface type itself, usually a `dyn Trait`. An
/// interface that carries a lifetime marker passes it on to every component
/// exposing it, the way a trait extending a marker trait would.
///
/// Use the [`capability!`](crate::capability) macro rather than implementing
/// this by hand.
///
/// # Examples
///
/// ```rust
/// use ferrous_volatile::{capability, Capability, Lifetime};
///
/// pub trait HttpRequest: Send + Sync {
///     fn path(&self) -> String;
/// }
/// pub trait Audit: Send + Sync {}
///
/// capability!(dyn HttpRequest => Volatile);
/// capability!(dyn Audit);
///
/// assert_eq!(<dyn HttpRequest as Capability>::MARKER, Some(Lifetime::Volatile));
/// assert_eq!(<dyn Audit as Capability>::MARKER, None);
/// ```
pub trait Capability: 'static {
    /// Lifetime marker inherited by implementers, if any.
    const MARKER: Option<Lifetime> = None;
}

/// Declares a capability interface, optionally carrying a lifetime marker.
///
/// `capability!(dyn Trait)` declares a plain interface;
/// `capability!(dyn Trait => Singleton)` also marks every implementer
/// exposing it as a singleton.
#[macro_export]
macro_rules! capability {
    ($ty:ty) => {
        impl $crate::Capability for $ty {}
    };
    ($ty:ty => $marker:ident) => {
        impl $crate::Capability for $ty {
            const MARKER: ::core::option::Option<$crate::Lifetime> =
                ::core::option::Option::Some($crate::Lifetime::$marker);
        }
    };
}
