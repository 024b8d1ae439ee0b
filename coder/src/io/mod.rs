//! I/O boundaries: filesystem, model backend and configuration.

pub mod applier;
pub mod backend;
pub mod config;
pub mod prompt;
pub mod reviews;
pub mod snapshot;
