//! Lifetime classification of discovered components.

use crate::component::ComponentType;
use crate::error::{DiError, DiResult};
use crate::lifetime::Lifetime;

/// Derives the single lifetime kind of a component.
///
/// The marker set is the component's direct markers together with the
/// markers carried by every capability interface it exposes. Repeats of the
/// same marker collapse; anything other than exactly one distinct marker is
/// rejected with [`DiError::InvalidLifetimeDeclaration`].
///
/// # Examples
///
/// ```rust
/// use ferrous_volatile::{classify, Component, DiError, Lifetime};
///
/// struct Clock;
///
/// let ok = Component::new(|_| Ok(Clock)).singleton().into_type();
/// assert_eq!(classify(&ok).unwrap(), Lifetime::Singleton);
///
/// let unmarked = Component::new(|_| Ok(Clock)).into_type();
/// assert!(matches!(
///     classify(&unmarked),
///     Err(DiError::InvalidLifetimeDeclaration { .. })
/// ));
/// ```
pub fn classify(component: &ComponentType) -> DiResult<Lifetime> {
    let mut markers: Vec<Lifetime> = component
        .direct_markers()
        .iter()
        .copied()
        .chain(component.inherited_markers())
        .collect();
    markers.sort();
    markers.dedup();

    match markers.as_slice() {
        [only] => Ok(*only),
        _ => Err(DiError::InvalidLifetimeDeclaration {
            component: component.key().display_name(),
            markers,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{capability, Component};
    use std::sync::Arc;

    trait Session: Send + Sync {}
    trait Cache: Send + Sync {}
    trait Plain: Send + Sync {}
    capability!(dyn Session => Volatile);
    capability!(dyn Cache => Singleton);
    capability!(dyn Plain);

    struct Both;
    impl Session for Both {}
    impl Cache for Both {}
    impl Plain for Both {}

    #[test]
    fn inherited_marker_classifies() {
        let ty = Component::new(|_| Ok(Both))
            .exposes::<dyn Session>(|c| c as Arc<dyn Session>)
            .exposes::<dyn Plain>(|c| c as Arc<dyn Plain>)
            .into_type();
        assert_eq!(classify(&ty), Ok(Lifetime::Volatile));
    }

    #[test]
    fn repeated_marker_collapses() {
        let ty = Component::new(|_| Ok(Both))
            .volatile()
            .exposes::<dyn Session>(|c| c as Arc<dyn Session>)
            .into_type();
        assert_eq!(classify(&ty), Ok(Lifetime::Volatile));
    }

    #[test]
    fn conflicting_markers_are_rejected() {
        let ty = Component::new(|_| Ok(Both))
            .exposes::<dyn Session>(|c| c as Arc<dyn Session>)
            .exposes::<dyn Cache>(|c| c as Arc<dyn Cache>)
            .into_type();
        match classify(&ty) {
            Err(DiError::InvalidLifetimeDeclaration { markers, .. }) => {
                assert_eq!(markers, vec![Lifetime::Singleton, Lifetime::Volatile]);
            }
            other => panic!("expected invalid declaration, got {:?}", other),
        }
    }

    #[test]
    fn missing_marker_is_rejected() {
        let ty = Component::new(|_| Ok(Both))
            .exposes::<dyn Plain>(|c| c as Arc<dyn Plain>)
            .into_type();
        assert!(matches!(
            classify(&ty),
            Err(DiError::InvalidLifetimeDeclaration { ref markers, .. }) if markers.is_empty()
        ));
    }
}
