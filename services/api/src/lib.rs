//! Avatar API Library Crate
//!
//! Everything behind the avatar entry point: configuration and credential
//! loading, the two bridge strategies, the session supervisor and the axum
//! routing. The binaries in `bin/` are thin wrappers around this library.

pub mod bridge;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod session;
pub mod state;
pub mod supervisor;

#[cfg(test)]
mod test_support;
