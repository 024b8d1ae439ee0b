//! Stable exit codes for coder CLI commands.

use crate::core::error::PipelineError;

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid config, I/O failure, backend failure or any other error.
pub const INVALID: i32 = 1;
/// The model never produced a usable structured reply.
pub const BAD_REPLY: i32 = 2;
/// A file action was refused (outside the root, unsafe root, missing delete target).
pub const UNSAFE_ACTION: i32 = 3;

/// Map an error to the exit code the CLI reports.
pub fn for_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::ReplyUnparseable { .. } | PipelineError::SchemaViolation { .. }) => {
            BAD_REPLY
        }
        Some(
            PipelineError::OutsideRoot { .. }
            | PipelineError::UnsafeRoot { .. }
            | PipelineError::MissingDeleteTarget { .. },
        ) => UNSAFE_ACTION,
        None => INVALID,
    }
}
