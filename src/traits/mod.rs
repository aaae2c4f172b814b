//! Core traits for the dependency lifetime engine.

mod dispose;
mod resolver;

pub use dispose::{AsyncDispose, Dispose};
pub use resolver::{Resolver, ResolverCore};
