// Interfaces to the text widget hosting the compose core.

use crate::address::{self, Address, AddressParseError};
use crate::caret::Caret;
use crate::styled_buffer::StyledBuffer;

/// Commands whose availability only the host knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCommand {
    Undo,
    Redo,
}

/// The text input surface: owns the live buffer, the caret and the undo
/// history. All methods are called on the interaction thread.
pub trait ComposeHost {
    /// Current selection; `None` when the widget has no caret
    fn selection(&self) -> Option<Caret>;

    fn set_selection(&mut self, caret: Caret);

    /// The live buffer; `None` when the widget is detached
    fn text(&self) -> Option<&StyledBuffer>;

    fn text_mut(&mut self) -> Option<&mut StyledBuffer>;

    fn query_command(&self, _command: HostCommand) -> bool {
        false
    }

    fn perform_command(&mut self, _command: HostCommand) -> bool {
        false
    }

    /// Show a short-lived message to the user
    fn show_notice(&mut self, message: &str);
}

/// The "to" field of the message being composed
pub trait RecipientField {
    fn text(&self) -> String;

    fn parse_addresses(&self, text: &str) -> Result<Vec<Address>, AddressParseError> {
        address::parse_addresses(text)
    }
}

/// A recipient field holding fixed text
#[derive(Debug, Default, Clone)]
pub struct StaticRecipients(pub String);

impl RecipientField for StaticRecipients {
    fn text(&self) -> String {
        self.0.clone()
    }
}
