//! Repository adapters that live inside the domain crate.
//!
//! The in-memory repositories are the only storage this service has; state
//! resets on restart.

pub mod memory_repo;
