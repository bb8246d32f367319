// Insertion Coordinator
// Runs the caret-relative compose actions. Conversions happen on the worker
// (phase one); their results come back over a channel and are applied here
// against whatever caret and buffer exist at that moment (phase two).

use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender, unbounded};

use crate::address::Address;
use crate::caret::Caret;
use crate::clipboard::{Clipboard, PendingPaste, prepare_copy, prepare_paste};
use crate::config::ComposeConfig;
use crate::convert::HtmlConverter;
use crate::error::{ComposeError, EditError};
use crate::host::{ComposeHost, HostCommand, RecipientField};
use crate::image::{ImageResolver, PlaceholderResolver};
use crate::menu::{MenuAction, MenuEntry, MenuState, menu_entries};
use crate::session::SessionState;
use crate::snippet::{SnippetCache, SnippetStore};
use crate::styled_buffer::{OBJECT_REPLACEMENT, StyleKind, StyledBuffer};
use crate::worker::{ConversionWorker, JobPanicked};

/// Inserted by the arrow action
pub const ARROW: &str = " \u{27F6} ";

enum Outcome {
    Paste(StyledBuffer),
    Snippet(StyledBuffer),
    SnippetsLoaded,
}

struct Completion {
    generation: u64,
    outcome: Result<Outcome, JobPanicked>,
}

pub struct InsertionCoordinator<H: ComposeHost> {
    host: H,
    clipboard: Box<dyn Clipboard>,
    recipients: Option<Box<dyn RecipientField>>,
    converter: Arc<HtmlConverter>,
    worker: Arc<ConversionWorker>,
    snippets: Arc<SnippetCache>,
    config: ComposeConfig,
    raw: bool,

    generation: u64,
    in_flight: usize,
    completion_tx: Sender<Completion>,
    completion_rx: Receiver<Completion>,

    selection_listener: Option<Box<dyn FnMut(bool)>>,
    input_content_listener: Option<Box<dyn FnMut(&str) -> bool>>,
}

impl<H: ComposeHost> InsertionCoordinator<H> {
    pub fn new(
        host: H,
        clipboard: Box<dyn Clipboard>,
        worker: Arc<ConversionWorker>,
        config: ComposeConfig,
    ) -> Self {
        let (completion_tx, completion_rx) = unbounded();
        let converter = Arc::new(HtmlConverter::new(
            config.policy.clone(),
            config.theme.clone(),
            Arc::new(PlaceholderResolver),
        ));
        InsertionCoordinator {
            host,
            clipboard,
            recipients: None,
            converter,
            worker,
            snippets: Arc::new(SnippetCache::new()),
            config,
            raw: false,
            generation: 0,
            in_flight: 0,
            completion_tx,
            completion_rx,
            selection_listener: None,
            input_content_listener: None,
        }
    }

    pub fn with_image_resolver(mut self, resolver: Arc<dyn ImageResolver>) -> Self {
        self.converter = Arc::new(HtmlConverter::new(
            self.config.policy.clone(),
            self.config.theme.clone(),
            resolver,
        ));
        self
    }

    pub fn with_recipients(mut self, field: impl RecipientField + 'static) -> Self {
        self.recipients = Some(Box::new(field));
        self
    }

    /// Share one snippet list between several surfaces
    pub fn with_snippet_cache(mut self, cache: Arc<SnippetCache>) -> Self {
        self.snippets = cache;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn snippet_cache(&self) -> &Arc<SnippetCache> {
        &self.snippets
    }

    pub fn set_raw(&mut self, raw: bool) {
        self.raw = raw;
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }

    pub fn save_state(&self) -> SessionState {
        SessionState { raw: self.raw }
    }

    pub fn restore_state(&mut self, state: SessionState) {
        self.set_raw(state.raw);
    }

    /// Fetch the snippet list on the worker
    pub fn load_snippets(&mut self, store: Arc<dyn SnippetStore>) -> Result<(), ComposeError> {
        let cache = Arc::clone(&self.snippets);
        self.submit(move || {
            match cache.load(store.as_ref()) {
                Ok(count) => log::debug!("Loaded {count} snippets"),
                Err(err) => log::error!("Failed to load snippets: {err}"),
            }
            Outcome::SnippetsLoaded
        })
    }

    /// Paste the clipboard at the caret once converted
    pub fn paste(&mut self) -> Result<(), ComposeError> {
        let items = self.clipboard.read()?;
        match prepare_paste(&items, self.raw)? {
            PendingPaste::Literal(text) => {
                self.submit(move || Outcome::Paste(StyledBuffer::from_text(&text)))
            }
            PendingPaste::Html(html) => {
                let converter = Arc::clone(&self.converter);
                self.submit(move || Outcome::Paste(converter.spanned(&html)))
            }
        }
    }

    /// Expand a cached snippet for the current recipients and insert it at
    /// the caret once converted
    pub fn insert_snippet(&mut self, id: i64) -> Result<(), ComposeError> {
        let Some(snippet) = self.snippets.lookup(id).cloned() else {
            return Err(ComposeError::NotFound(id));
        };
        let html = snippet.expand(&self.recipients());
        let converter = Arc::clone(&self.converter);
        self.submit(move || {
            let mut fragment = converter.spanned(&html);
            fragment.trim_trailing_newline();
            Outcome::Snippet(fragment)
        })
    }

    /// Put a separator line on its own line at the caret
    pub fn insert_line(&mut self) -> bool {
        let Some(caret) = self.host.selection() else {
            return false;
        };
        let separator = self.converter.theme().separator_style();
        let Some(text) = self.host.text_mut() else {
            return false;
        };

        let start = caret.start().min(text.len());
        let mut fragment = StyledBuffer::new();
        if start == 0 || text.char_at(start - 1) != Some('\n') {
            fragment.push_char('\n');
        }
        let glyph = start + fragment.len();
        let result = fragment
            .push_styled(
                &OBJECT_REPLACEMENT.to_string(),
                StyleKind::Separator(separator),
            )
            .and_then(|_| {
                if text.char_at(start) != Some('\n') {
                    fragment.push_char('\n');
                }
                text.insert(start, &fragment)
            });

        match result {
            Ok(_) => {
                self.host.set_selection(Caret::at(glyph + 2));
                true
            }
            Err(err) => {
                log::error!("Failed to insert line: {err}");
                self.host.show_notice(&err.to_string());
                false
            }
        }
    }

    pub fn insert_arrow(&mut self) -> bool {
        let Some(caret) = self.host.selection() else {
            return false;
        };
        let Some(text) = self.host.text_mut() else {
            return false;
        };
        let start = caret.start().min(text.len());
        match text.insert_str(start, ARROW) {
            Ok(inserted) => {
                self.host.set_selection(Caret::at(start + inserted));
                true
            }
            Err(err) => {
                log::error!("Failed to insert arrow: {err}");
                false
            }
        }
    }

    /// Copy the selection as HTML plus plain text
    pub fn copy(&mut self) -> bool {
        let Some(caret) = self.host.selection() else {
            return false;
        };
        let Some(text) = self.host.text() else {
            return false;
        };
        let end = caret.clamp(text.len()).end();
        let payload = match prepare_copy(text, caret) {
            Ok(payload) => payload,
            Err(ComposeError::EmptySelection) => return false,
            Err(err) => {
                log::error!("Copy failed: {err}");
                return false;
            }
        };

        if let Err(err) = self.clipboard.write(vec![payload.into_item()]) {
            log::error!("Copy failed: {err}");
            return false;
        }
        self.host.set_selection(Caret::at(end));
        true
    }

    pub fn can_undo(&self) -> bool {
        self.host.query_command(HostCommand::Undo)
    }

    pub fn can_redo(&self) -> bool {
        self.host.query_command(HostCommand::Redo)
    }

    /// Entries to append to the host's context menu
    pub fn menu_entries(&self) -> Vec<MenuEntry> {
        let undo_manager = self.config.undo_manager;
        menu_entries(&MenuState {
            undo_manager,
            show_arrow: self.config.show_arrow,
            can_undo: undo_manager && self.can_undo(),
            can_redo: undo_manager && self.can_redo(),
            snippets: self.snippets.snippets(),
        })
    }

    pub fn handle_menu_action(&mut self, action: MenuAction) -> bool {
        match action {
            MenuAction::Undo => self.host.perform_command(HostCommand::Undo),
            MenuAction::Redo => self.host.perform_command(HostCommand::Redo),
            MenuAction::InsertLine => self.insert_line(),
            MenuAction::InsertArrow => self.insert_arrow(),
            MenuAction::Snippet(id) => match self.insert_snippet(id) {
                Ok(()) => true,
                Err(err) => {
                    log::debug!("Snippet not inserted: {err}");
                    false
                }
            },
        }
    }

    pub fn set_selection_listener(&mut self, listener: impl FnMut(bool) + 'static) {
        self.selection_listener = Some(Box::new(listener));
    }

    /// Called by the host whenever the selection moves
    pub fn on_selection_changed(&mut self, caret: Caret) {
        if let Some(listener) = self.selection_listener.as_mut() {
            listener(!caret.is_collapsed());
        }
    }

    pub fn set_input_content_listener(&mut self, listener: impl FnMut(&str) -> bool + 'static) {
        self.input_content_listener = Some(Box::new(listener));
    }

    /// Rich content committed by an input method. Only images are taken.
    pub fn commit_content(&mut self, uri: &str, mime: &str) -> bool {
        if !mime.starts_with("image/") {
            return false;
        }
        match self.input_content_listener.as_mut() {
            Some(listener) => listener(uri),
            None => false,
        }
    }

    /// Drop the results of every conversion still running
    pub fn detach(&mut self) {
        self.generation += 1;
    }

    pub fn pending(&self) -> usize {
        self.in_flight
    }

    /// Apply finished conversions without blocking; returns how many
    /// changed the buffer
    pub fn process_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completion_rx.try_recv() {
            if self.complete(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Block until every submitted conversion has been applied
    pub fn wait_for_idle(&mut self) -> usize {
        let mut applied = 0;
        while self.in_flight > 0 {
            let Ok(completion) = self.completion_rx.recv() else {
                break;
            };
            if self.complete(completion) {
                applied += 1;
            }
        }
        applied
    }

    fn submit(
        &mut self,
        task: impl FnOnce() -> Outcome + Send + 'static,
    ) -> Result<(), ComposeError> {
        let tx = self.completion_tx.clone();
        let generation = self.generation;
        self.worker
            .submit(task, move |outcome| {
                if tx.send(Completion { generation, outcome }).is_err() {
                    log::debug!("Compose surface is gone; dropping conversion result");
                }
            })
            .map_err(|err| {
                log::error!("{err}");
                ComposeError::WorkerUnavailable
            })?;
        self.in_flight += 1;
        Ok(())
    }

    fn complete(&mut self, completion: Completion) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        if completion.generation != self.generation {
            log::debug!("Dropping stale conversion result");
            return false;
        }
        match completion.outcome {
            Ok(Outcome::Paste(fragment)) => self.apply_paste(&fragment),
            Ok(Outcome::Snippet(fragment)) => self.apply_snippet(&fragment),
            Ok(Outcome::SnippetsLoaded) => false,
            Err(err) => {
                log::error!("{err}");
                false
            }
        }
    }

    fn apply_paste(&mut self, fragment: &StyledBuffer) -> bool {
        let caret = self.host.selection().unwrap_or_default();
        let Some(text) = self.host.text_mut() else {
            log::debug!("No buffer to paste into");
            return false;
        };
        let caret = caret.clamp(text.len());
        let result = if caret.is_collapsed() {
            text.insert(caret.start(), fragment)
        } else {
            text.replace_range(caret.start(), caret.end(), fragment)
        };

        match result {
            Ok(inserted) => {
                self.host.set_selection(Caret::at(caret.start() + inserted));
                true
            }
            Err(EditError::SpanBoundary(err)) => {
                log::warn!("Paste dropped: {err}");
                self.host.show_notice(&err.to_string());
                false
            }
            Err(err) => {
                log::error!("Paste failed: {err}");
                false
            }
        }
    }

    /// A fragment that opens with a quote cannot follow the separating
    /// space, so such snippets only apply at the start of a line.
    fn apply_snippet(&mut self, fragment: &StyledBuffer) -> bool {
        let start = self
            .host
            .selection()
            .map(|caret| caret.start())
            .unwrap_or(0);
        let Some(text) = self.host.text_mut() else {
            log::debug!("No buffer to insert the snippet into");
            return false;
        };
        let start = start.min(text.len());

        let needs_space = start > 0
            && text
                .char_at(start - 1)
                .is_some_and(|ch| !ch.is_whitespace());
        let result = if needs_space {
            let mut spaced = StyledBuffer::from_text(" ");
            spaced
                .insert(1, fragment)
                .and_then(|_| text.insert(start, &spaced))
        } else {
            text.insert(start, fragment)
        };

        match result {
            Ok(inserted) => {
                self.host.set_selection(Caret::at(start + inserted));
                true
            }
            Err(err) => {
                log::error!("Failed to insert snippet: {err}");
                false
            }
        }
    }

    fn recipients(&self) -> Vec<Address> {
        let Some(field) = &self.recipients else {
            return Vec::new();
        };
        match field.parse_addresses(&field.text()) {
            Ok(addresses) => addresses,
            Err(err) => {
                log::debug!("Ignoring recipients: {err}");
                Vec::new()
            }
        }
    }
}
