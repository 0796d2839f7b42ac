//! Mock infrastructure for testing against the upstream platform
//!
//! The relay only talks to one external service, so a single wiremock
//! wrapper covers both kinds of traffic it receives: identity-resolution
//! probes and forwarded model calls.
//!
//! All mocks are designed to be reusable across different test files and
//! support various response scenarios (success, errors, request capture).


pub use vertex::*;
