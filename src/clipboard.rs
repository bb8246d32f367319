// Clipboard content negotiation.
// Picks the best representation the clipboard offers for a paste and builds
// the payload written on copy.

use thiserror::Error;

use crate::caret::Caret;
use crate::convert::to_html_range;
use crate::error::ComposeError;
use crate::plaintext::format_plain_text;
use crate::styled_buffer::StyledBuffer;

/// One representation offered by the clipboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardItem {
    /// Markup with an optional plain text alternative
    Html { html: String, text: Option<String> },
    PlainText(String),
}

impl ClipboardItem {
    fn describe(&self) -> String {
        match self {
            ClipboardItem::Html { html, text } => format!(
                "text/html ({} bytes{})",
                html.len(),
                if text.is_some() { ", with text" } else { "" }
            ),
            ClipboardItem::PlainText(text) => format!("text/plain ({} bytes)", text.len()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard access failed: {0}")]
    Access(String),
}

pub trait Clipboard {
    fn read(&mut self) -> Result<Vec<ClipboardItem>, ClipboardError>;
    fn write(&mut self, items: Vec<ClipboardItem>) -> Result<(), ClipboardError>;
}

/// Process-local clipboard
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    items: Vec<ClipboardItem>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<ClipboardItem>) -> Self {
        MemoryClipboard { items }
    }

    pub fn items(&self) -> &[ClipboardItem] {
        &self.items
    }
}

impl Clipboard for MemoryClipboard {
    fn read(&mut self) -> Result<Vec<ClipboardItem>, ClipboardError> {
        Ok(self.items.clone())
    }

    fn write(&mut self, items: Vec<ClipboardItem>) -> Result<(), ClipboardError> {
        self.items = items;
        Ok(())
    }
}

/// The desktop clipboard
#[cfg(feature = "system-clipboard")]
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

#[cfg(feature = "system-clipboard")]
impl SystemClipboard {
    pub fn new() -> Result<Self, ClipboardError> {
        let inner =
            arboard::Clipboard::new().map_err(|err| ClipboardError::Unavailable(err.to_string()))?;
        Ok(SystemClipboard { inner })
    }
}

#[cfg(feature = "system-clipboard")]
impl Clipboard for SystemClipboard {
    fn read(&mut self) -> Result<Vec<ClipboardItem>, ClipboardError> {
        let mut items = Vec::new();
        let text = match self.inner.get_text() {
            Ok(text) => Some(text),
            Err(arboard::Error::ContentNotAvailable) => None,
            Err(err) => return Err(ClipboardError::Access(err.to_string())),
        };
        match self.inner.get().html() {
            Ok(html) => items.push(ClipboardItem::Html {
                html,
                text: text.clone(),
            }),
            Err(arboard::Error::ContentNotAvailable) => {}
            Err(err) => log::debug!("Clipboard html unavailable: {err}"),
        }
        if let Some(text) = text {
            items.push(ClipboardItem::PlainText(text));
        }
        Ok(items)
    }

    fn write(&mut self, items: Vec<ClipboardItem>) -> Result<(), ClipboardError> {
        let Some(item) = items.into_iter().next() else {
            return self
                .inner
                .clear()
                .map_err(|err| ClipboardError::Access(err.to_string()));
        };
        let result = match item {
            ClipboardItem::Html { html, text } => self.inner.set_html(html, text),
            ClipboardItem::PlainText(text) => self.inner.set_text(text),
        };
        result.map_err(|err| ClipboardError::Access(err.to_string()))
    }
}

/// What a paste will insert once converted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingPaste {
    /// Inserted as is, without styling
    Literal(String),
    /// Sanitized and converted on the worker first
    Html(String),
}

/// Choose the representation to paste
pub fn prepare_paste(items: &[ClipboardItem], raw: bool) -> Result<PendingPaste, ComposeError> {
    log_formats(items);

    if raw {
        let plain = items.iter().find_map(|item| match item {
            ClipboardItem::PlainText(text) => Some(text),
            _ => None,
        });
        let text = plain.or_else(|| {
            items.iter().find_map(|item| match item {
                ClipboardItem::Html {
                    text: Some(text), ..
                } => Some(text),
                _ => None,
            })
        });
        return match text {
            Some(text) if !text.is_empty() => Ok(PendingPaste::Literal(text.clone())),
            _ => Err(ComposeError::NoContent),
        };
    }

    let html = items.iter().find_map(|item| match item {
        ClipboardItem::Html { html, .. } if !html.trim().is_empty() => Some(html.clone()),
        _ => None,
    });
    if let Some(html) = html {
        return Ok(PendingPaste::Html(html));
    }

    let text = items.iter().find_map(|item| match item {
        ClipboardItem::PlainText(text) => Some(text),
        _ => None,
    });
    match text {
        Some(text) if !text.is_empty() => Ok(PendingPaste::Html(format!(
            "<div>{}</div>",
            format_plain_text(text)
        ))),
        _ => Err(ComposeError::NoContent),
    }
}

/// Both representations of a copied selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPayload {
    pub html: String,
    pub plain_text: String,
}

impl CopyPayload {
    pub fn into_item(self) -> ClipboardItem {
        ClipboardItem::Html {
            html: self.html,
            text: Some(self.plain_text),
        }
    }
}

pub fn prepare_copy(buffer: &StyledBuffer, caret: Caret) -> Result<CopyPayload, ComposeError> {
    let caret = caret.clamp(buffer.len());
    if caret.is_collapsed() {
        return Err(ComposeError::EmptySelection);
    }
    Ok(CopyPayload {
        html: to_html_range(buffer, caret.start(), caret.end())?,
        plain_text: buffer.slice_text(caret.start(), caret.end())?,
    })
}

fn log_formats(items: &[ClipboardItem]) {
    if items.is_empty() {
        log::debug!("Clipboard formats during paste: (none detected)");
    } else {
        let formats: Vec<String> = items.iter().map(ClipboardItem::describe).collect();
        log::debug!("Clipboard formats during paste: {}", formats.join(", "));
    }
}
