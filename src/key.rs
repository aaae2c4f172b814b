//! Service key types for the dependency injection container.

use std::any::TypeId;
use std::fmt;

/// Key for service storage and lookup.
///
/// A key identifies either a concrete component type or a capability
/// interface (usually a `dyn Trait`). Both are plain `'static` types, so one
/// `TypeId` covers them; the type name is carried along for diagnostics only
/// and never takes part in equality or hashing.
///
/// Parameterized types are keyed by their full identity:
/// `Volatile<dyn A>` and `Volatile<dyn B>` are different keys.
///
/// # Examples
///
/// ```rust
/// use ferrous_volatile::Key;
///
/// trait Clock: Send + Sync {}
///
/// let a = Key::of::<dyn Clock>();
/// let b = Key::of::<dyn Clock>();
/// assert_eq!(a, b);
/// assert_ne!(a, Key::of::<String>());
/// assert!(a.display_name().contains("Clock"));
/// ```
#[derive(Clone, Copy)]
pub struct Key {
    id: TypeId,
    name: &'static str,
}

impl Key {
    /// Key for any `'static` type, sized or not.
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Key {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Get the type or trait name for display
    pub fn display_name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// TypeId-only comparison; the name is diagnostic
impl PartialEq for Key {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    #[inline(always)]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    #[inline(always)]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl std::hash::Hash for Key {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Helper function for creating type keys
#[inline(always)]
pub fn key_of_type<T: ?Sized + 'static>() -> Key {
    Key::of::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    trait Marker: Send + Sync {}

    #[test]
    fn keys_compare_by_type_identity() {
        let mut set = HashSet::new();
        set.insert(Key::of::<String>());
        set.insert(Key::of::<String>());
        set.insert(Key::of::<dyn Marker>());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn parameterized_types_are_distinct() {
        struct Wrapper<T: ?Sized>(std::marker::PhantomData<T>);
        assert_ne!(Key::of::<Wrapper<u8>>(), Key::of::<Wrapper<u16>>());
        assert_ne!(Key::of::<Wrapper<dyn Marker>>(), Key::of::<dyn Marker>());
    }
}
