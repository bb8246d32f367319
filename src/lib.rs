// Library exports for richcompose

pub mod address;
pub mod caret;
pub mod clipboard;
pub mod config;
pub mod convert;
pub mod coordinator;
pub mod error;
pub mod host;
pub mod html;
pub mod image;
pub mod menu;
pub mod plaintext;
pub mod session;
pub mod snippet;
pub mod styled_buffer;
pub mod theme;
pub mod worker;

pub use caret::Caret;
pub use coordinator::InsertionCoordinator;
pub use error::{ComposeError, EditError, SpanBoundaryError};
pub use styled_buffer::{StyleKind, StyleRange, StyledBuffer};
