//! LLM-driven code mutation pipeline.
//!
//! The crate teaches a model the contents of a source tree and turns its
//! structured replies into file mutations, dependency lists or review
//! findings. The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure logic (message memory, reply parsing, schema
//!   validation, path rooting). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (snapshot walking, model backend,
//!   file application, config).
//! - **[`agents`]**: The conversation client with reply recovery and the
//!   orchestrators built on it.
//!
//! [`session`] wires these together for the CLI.

pub mod agents;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
