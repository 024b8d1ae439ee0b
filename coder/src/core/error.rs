//! Failure classes the pipeline distinguishes.
//!
//! These travel inside `anyhow::Error`; callers that need to branch on the
//! class (the CLI picking an exit code, tests) use `downcast_ref`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Every attempt produced a reply that was not JSON.
    #[error("model reply was not valid JSON after {attempts} attempts")]
    ReplyUnparseable { attempts: u32, last_reply: String },

    /// The reply was JSON but not of the requested shape.
    #[error("model reply does not match the {schema} schema: {}", .details.join("; "))]
    SchemaViolation {
        schema: &'static str,
        details: Vec<String>,
    },

    #[error("{} is outside repository root {}", .path.display(), .root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("refusing to modify repository root {}: {reason}", .root.display())]
    UnsafeRoot { root: PathBuf, reason: String },

    #[error("cannot delete {}: file does not exist", .path.display())]
    MissingDeleteTarget { path: PathBuf },
}
