//! Credential identity resolution
//!
//! The upstream platform serves models under project-scoped paths, but
//! callers only hold an opaque API key. These modules infer the project
//! that owns a key by probing the upstream, and memoize the answer for
//! the lifetime of the process.

pub mod cache;
pub mod identity;

pub use cache::ProjectCache;
pub use identity::{IdentityResolver, ResolveProject};
