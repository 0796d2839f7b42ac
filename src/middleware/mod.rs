//! Middleware module
//!
//! Contains the CORS boundary applied around the whole router.

pub mod cors;
