// Error types shared by the buffer, the negotiator and the coordinator.

use thiserror::Error;

use crate::clipboard::ClipboardError;

/// A paragraph-scoped range ended up off a paragraph boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} range {start}..{end} must start and end at a paragraph boundary")]
pub struct SpanBoundaryError {
    pub kind: &'static str,
    pub start: usize,
    pub end: usize,
}

/// Errors raised by [`crate::styled_buffer::StyledBuffer`] mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("range {start}..{end} is out of bounds for a buffer of length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error(transparent)]
    SpanBoundary(#[from] SpanBoundaryError),
}

/// Failures of the user-facing compose operations.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("clipboard holds nothing that can be pasted")]
    NoContent,
    #[error("nothing is selected")]
    EmptySelection,
    #[error("snippet {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
    #[error("conversion worker is not running")]
    WorkerUnavailable,
}

pub type Result<T> = std::result::Result<T, ComposeError>;
