//! Pure logic shared by the pipeline.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod error;
pub mod memory;
pub mod path;
pub mod reply;
pub mod schema;
pub mod types;
