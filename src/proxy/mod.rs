//! Proxy module
//!
//! Credential extraction, path rewriting onto the upstream scheme, and the
//! upstream round trip itself.

pub mod credentials;
pub mod path;
pub mod upstream;

pub use upstream::UpstreamClient;
