// Snippets
// Reusable HTML fragments offered in the context menu. The list is fetched
// once from a SnippetStore on the conversion worker and read without locking
// afterwards.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use thiserror::Error;

use crate::address::Address;
use crate::html::escape_text;

pub type Template = Arc<dyn Fn(&[Address]) -> String + Send + Sync>;

#[derive(Clone)]
pub struct Snippet {
    pub id: i64,
    pub name: String,
    template: Template,
}

impl Snippet {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        template: impl Fn(&[Address]) -> String + Send + Sync + 'static,
    ) -> Self {
        Snippet {
            id,
            name: name.into(),
            template: Arc::new(template),
        }
    }

    /// A snippet whose HTML may mention the first recipient through the
    /// `$name$`, `$firstname$`, `$lastname$` and `$email$` placeholders
    pub fn from_html(id: i64, name: impl Into<String>, html: impl Into<String>) -> Self {
        let html: String = html.into();
        Self::new(id, name, move |to| expand_placeholders(&html, to.first()))
    }

    /// HTML for a message addressed to `to`
    pub fn expand(&self, to: &[Address]) -> String {
        (self.template)(to)
    }
}

impl fmt::Debug for Snippet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snippet")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn expand_placeholders(html: &str, recipient: Option<&Address>) -> String {
    let name = recipient.map(|to| to.display_name()).unwrap_or_default();
    let email = recipient.map(|to| to.email.as_str()).unwrap_or_default();
    let (first, last) = match recipient.and_then(|to| to.name.as_deref()) {
        Some(full) => match full.trim().rsplit_once(' ') {
            Some((first, last)) => (first.trim(), last.trim()),
            None => (full.trim(), ""),
        },
        None => ("", ""),
    };

    let escaped = |value: &str| {
        let mut out = String::new();
        escape_text(value, &mut out);
        out
    };
    html.replace("$name$", &escaped(name))
        .replace("$firstname$", &escaped(first))
        .replace("$lastname$", &escaped(last))
        .replace("$email$", &escaped(email))
}

#[derive(Debug, Error)]
pub enum SnippetStoreError {
    #[error("snippet store unavailable: {0}")]
    Unavailable(String),
}

pub trait SnippetStore: Send + Sync {
    fn snippets(&self) -> Result<Vec<Snippet>, SnippetStoreError>;

    fn lookup(&self, id: i64) -> Option<Snippet> {
        self.snippets()
            .ok()?
            .into_iter()
            .find(|snippet| snippet.id == id)
    }
}

/// Store backed by a fixed list
#[derive(Debug, Default, Clone)]
pub struct MemorySnippetStore {
    snippets: Vec<Snippet>,
}

impl MemorySnippetStore {
    pub fn new(snippets: Vec<Snippet>) -> Self {
        MemorySnippetStore { snippets }
    }
}

impl SnippetStore for MemorySnippetStore {
    fn snippets(&self) -> Result<Vec<Snippet>, SnippetStoreError> {
        Ok(self.snippets.clone())
    }
}

/// Write-once list of snippets
#[derive(Debug, Default)]
pub struct SnippetCache {
    cell: OnceCell<Vec<Snippet>>,
}

impl SnippetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the cache from `store` unless already filled. A failing store
    /// leaves the cache empty so a later attempt can retry.
    pub fn load(&self, store: &dyn SnippetStore) -> Result<usize, SnippetStoreError> {
        if let Some(snippets) = self.cell.get() {
            return Ok(snippets.len());
        }
        let snippets = store.snippets()?;
        let count = snippets.len();
        if self.cell.set(snippets).is_err() {
            log::debug!("Snippet cache was filled concurrently");
        }
        Ok(count)
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn snippets(&self) -> &[Snippet] {
        self.cell.get().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn lookup(&self, id: i64) -> Option<&Snippet> {
        self.snippets().iter().find(|snippet| snippet.id == id)
    }
}
