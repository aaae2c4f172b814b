//! Circular dependency detection infrastructure.
//!
//! Constructors run synchronously on the resolving thread, so one
//! thread-local stack sees the whole chain of a single resolution.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};

thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
}

/// Entry on the thread-local resolution stack, popped on drop.
pub(crate) struct StackGuard {
    name: &'static str,
}

impl StackGuard {
    pub(crate) fn enter(name: &'static str, max_depth: usize) -> DiResult<Self> {
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            if stack.iter().any(|&n| n == name) {
                let mut path = stack.clone();
                path.push(name);
                return Err(DiError::Circular(path));
            }
            if stack.len() >= max_depth {
                return Err(DiError::DepthExceeded(max_depth));
            }

            stack.push(name);
            Ok(StackGuard { name })
        })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            debug_assert_eq!(popped, Some(self.name));
        });
    }
}

/// Runs `f` with `name` pushed on the resolution stack.
pub(crate) fn with_circular_check<T, F>(name: &'static str, max_depth: usize, f: F) -> DiResult<T>
where
    F: FnOnce() -> DiResult<T>,
{
    let _guard = StackGuard::enter(name, max_depth)?;
    f()
}
