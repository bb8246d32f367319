// Integration tests for the compose actions: paste, snippets, separator and
// arrow insertion, copy and the context menu


use richcompose::clipboard::ClipboardItem;
use richcompose::config::ComposeConfig;
use richcompose::convert::to_html;
use richcompose::coordinator::{ARROW, InsertionCoordinator};
use richcompose::host::{HostCommand, StaticRecipients};
use richcompose::menu::MenuAction;
use richcompose::session::SessionState;
use richcompose::snippet::{MemorySnippetStore, Snippet, SnippetCache};
use richcompose::styled_buffer::OBJECT_REPLACEMENT;
use richcompose::worker::ConversionWorker;
use richcompose::{Caret, ComposeError, StyleKind, StyledBuffer};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::memory_host::{MemoryHost, SharedClipboard, html};

fn coordinator(
    host: MemoryHost,
    items: Vec<ClipboardItem>,
) -> (InsertionCoordinator<MemoryHost>, SharedClipboard) {
    coordinator_with_config(host, items, ComposeConfig::default())
}

fn coordinator_with_config(
    host: MemoryHost,
    items: Vec<ClipboardItem>,
    config: ComposeConfig,
) -> (InsertionCoordinator<MemoryHost>, SharedClipboard) {
    let clipboard = SharedClipboard::with_items(items);
    let worker = Arc::new(ConversionWorker::start().unwrap());
    let coordinator =
        InsertionCoordinator::new(host, Box::new(clipboard.clone()), worker, config);
    (coordinator, clipboard)
}

fn spans(buffer: &StyledBuffer) -> Vec<(&'static str, usize, usize)> {
    let mut spans: Vec<_> = buffer
        .ranges()
        .into_iter()
        .map(|range| (range.kind.name(), range.start, range.end))
        .collect();
    spans.sort();
    spans
}

fn load_snippets(coordinator: &mut InsertionCoordinator<MemoryHost>, snippets: Vec<Snippet>) {
    coordinator
        .load_snippets(Arc::new(MemorySnippetStore::new(snippets)))
        .unwrap();
    assert_eq!(coordinator.wait_for_idle(), 0);
    assert!(coordinator.snippet_cache().is_loaded());
}

#[test]
fn test_paste_at_collapsed_caret() {
    let host = MemoryHost::with_text("hello world", Caret::at(6));
    let (mut coordinator, _) = coordinator(host, vec![html("<b>big</b>")]);

    coordinator.paste().unwrap();
    assert_eq!(coordinator.pending(), 1);
    assert_eq!(coordinator.wait_for_idle(), 1);
    assert_eq!(coordinator.pending(), 0);

    let host = coordinator.host();
    assert_eq!(host.text_string(), "hello bigworld");
    assert_eq!(host.caret, Some(Caret::at(9)));
    let buffer = host.buffer.as_ref().unwrap();
    assert_eq!(spans(buffer), vec![("bold", 6, 9)]);
    insta::assert_snapshot!(to_html(buffer), @"hello <b>big</b>world");
}

#[test]
fn test_paste_replaces_selection() {
    let host = MemoryHost::with_text("hello world", Caret::new(0, 5));
    let (mut coordinator, _) = coordinator(host, vec![html("<i>bye</i>")]);

    coordinator.paste().unwrap();
    coordinator.wait_for_idle();

    let host = coordinator.host();
    assert_eq!(host.text_string(), "bye world");
    assert_eq!(host.caret, Some(Caret::at(3)));
    assert_eq!(spans(host.buffer.as_ref().unwrap()), vec![("italic", 0, 3)]);
}

#[test]
fn test_paste_lands_at_caret_moved_while_converting() {
    let host = MemoryHost::with_text("hello world", Caret::at(0));
    let (mut coordinator, _) = coordinator(host, vec![html("<b>big</b>")]);

    coordinator.paste().unwrap();
    coordinator.host_mut().caret = Some(Caret::at(6));
    assert_eq!(coordinator.wait_for_idle(), 1);

    let host = coordinator.host();
    assert_eq!(host.text_string(), "hello bigworld");
    assert_eq!(host.caret, Some(Caret::at(9)));
    assert_eq!(spans(host.buffer.as_ref().unwrap()), vec![("bold", 6, 9)]);
}

#[test]
fn test_paste_replaces_selection_made_while_converting() {
    let host = MemoryHost::with_text("hello world", Caret::at(0));
    let (mut coordinator, _) = coordinator(host, vec![html("<i>bye</i>")]);

    coordinator.paste().unwrap();
    coordinator.host_mut().caret = Some(Caret::new(6, 11));
    coordinator.wait_for_idle();

    let host = coordinator.host();
    assert_eq!(host.text_string(), "hello bye");
    assert_eq!(host.caret, Some(Caret::at(9)));
    assert_eq!(spans(host.buffer.as_ref().unwrap()), vec![("italic", 6, 9)]);
}

#[test]
fn test_paste_applies_to_buffer_edited_while_converting() {
    let host = MemoryHost::with_text("hello world", Caret::at(11));
    let (mut coordinator, _) = coordinator(host, vec![html("<u>x</u>")]);

    coordinator.paste().unwrap();
    let host = coordinator.host_mut();
    host.buffer = Some(StyledBuffer::from_text("ab"));
    host.caret = Some(Caret::at(1));
    coordinator.wait_for_idle();

    assert_eq!(coordinator.host().text_string(), "axb");
    assert_eq!(coordinator.host().caret, Some(Caret::at(2)));
}

#[test]
fn test_paste_without_caret_goes_to_start() {
    let mut host = MemoryHost::with_text("tail", Caret::at(0));
    host.caret = None;
    let (mut coordinator, _) = coordinator(host, vec![html("<u>x</u>")]);

    coordinator.paste().unwrap();
    coordinator.wait_for_idle();

    assert_eq!(coordinator.host().text_string(), "xtail");
    assert_eq!(coordinator.host().caret, Some(Caret::at(1)));
}

#[test]
fn test_plain_text_paste_is_converted() {
    let host = MemoryHost::with_text("", Caret::at(0));
    let items = vec![ClipboardItem::PlainText("plain".to_string())];
    let (mut coordinator, _) = coordinator(host, items);

    coordinator.paste().unwrap();
    coordinator.wait_for_idle();

    assert_eq!(coordinator.host().text_string(), "plain");
    assert!(coordinator.host().buffer.as_ref().unwrap().ranges().is_empty());
}

#[test]
fn test_raw_paste_is_literal() {
    let host = MemoryHost::with_text("ab", Caret::at(1));
    let items = vec![ClipboardItem::Html {
        html: "<b>x</b>".to_string(),
        text: Some("x <b>\ny".to_string()),
    }];
    let (mut coordinator, _) = coordinator(host, items);
    coordinator.set_raw(true);

    coordinator.paste().unwrap();
    coordinator.wait_for_idle();

    let host = coordinator.host();
    assert_eq!(host.text_string(), "ax <b>\nyb");
    assert_eq!(host.caret, Some(Caret::at(8)));
    assert!(host.buffer.as_ref().unwrap().ranges().is_empty());
}

#[test]
fn test_raw_mode_survives_restore() {
    let host = MemoryHost::with_text("", Caret::at(0));
    let (mut coordinator, _) = coordinator(host, Vec::new());
    assert_eq!(coordinator.save_state(), SessionState { raw: false });

    coordinator.restore_state(SessionState { raw: true });
    assert!(coordinator.is_raw());
    assert_eq!(coordinator.save_state(), SessionState { raw: true });
}

#[test]
fn test_empty_clipboard_is_an_error() {
    let host = MemoryHost::with_text("ab", Caret::at(1));
    let (mut coordinator, _) = coordinator(host, Vec::new());

    assert!(matches!(coordinator.paste(), Err(ComposeError::NoContent)));
    assert_eq!(coordinator.pending(), 0);
}

#[test]
fn test_successive_pastes_apply_in_order() {
    let host = MemoryHost::with_text("ab", Caret::at(2));
    let (mut coordinator, _) = coordinator(host, vec![html("<b>x</b>")]);

    coordinator.paste().unwrap();
    coordinator.paste().unwrap();
    assert_eq!(coordinator.wait_for_idle(), 2);

    assert_eq!(coordinator.host().text_string(), "abxx");
    assert_eq!(coordinator.host().caret, Some(Caret::at(4)));
}

#[test]
fn test_paste_breaking_a_quote_is_dropped() {
    let host = MemoryHost::with_text("abcd", Caret::at(2));
    let (mut coordinator, _) = coordinator(host, vec![html("<blockquote>q</blockquote>")]);

    coordinator.paste().unwrap();
    assert_eq!(coordinator.wait_for_idle(), 0);

    let host = coordinator.host();
    assert_eq!(host.text_string(), "abcd");
    assert_eq!(host.caret, Some(Caret::at(2)));
    assert_eq!(host.notices.len(), 1);
    assert!(host.buffer.as_ref().unwrap().ranges().is_empty());
}

#[test]
fn test_quote_pasted_on_a_new_last_line() {
    let host = MemoryHost::with_text("ab\n", Caret::at(3));
    let (mut coordinator, _) = coordinator(host, vec![html("<blockquote>q</blockquote>")]);

    coordinator.paste().unwrap();
    assert_eq!(coordinator.wait_for_idle(), 1);

    let host = coordinator.host();
    assert_eq!(host.text_string(), "ab\nq");
    assert_eq!(spans(host.buffer.as_ref().unwrap()), vec![("quote", 3, 4)]);
    assert!(host.notices.is_empty());
}

#[test]
fn test_detach_drops_running_conversions() {
    let host = MemoryHost::with_text("ab", Caret::at(1));
    let (mut coordinator, _) = coordinator(host, vec![html("<b>x</b>")]);

    coordinator.paste().unwrap();
    coordinator.detach();
    assert_eq!(coordinator.wait_for_idle(), 0);
    assert_eq!(coordinator.host().text_string(), "ab");

    coordinator.paste().unwrap();
    assert_eq!(coordinator.wait_for_idle(), 1);
    assert_eq!(coordinator.host().text_string(), "axb");
}

#[test]
fn test_paste_into_detached_widget() {
    let mut host = MemoryHost::with_text("ab", Caret::at(1));
    host.buffer = None;
    let (mut coordinator, _) = coordinator(host, vec![html("x")]);

    coordinator.paste().unwrap();
    assert_eq!(coordinator.wait_for_idle(), 0);
}

#[test]
fn test_snippet_gets_a_leading_space() {
    let host = MemoryHost::with_text("Hi", Caret::at(2));
    let (coordinator, _) = coordinator(host, Vec::new());
    let mut coordinator =
        coordinator.with_recipients(StaticRecipients("Jane Doe <jane@example.com>".to_string()));
    load_snippets(
        &mut coordinator,
        vec![Snippet::from_html(1, "Greeting", "<p>Dear $firstname$</p>")],
    );

    coordinator.insert_snippet(1).unwrap();
    assert_eq!(coordinator.wait_for_idle(), 1);

    assert_eq!(coordinator.host().text_string(), "Hi Dear Jane");
    assert_eq!(coordinator.host().caret, Some(Caret::at(12)));
}

#[test]
fn test_snippet_trailing_newline_is_trimmed() {
    let host = MemoryHost::with_text("Hi ", Caret::at(3));
    let (mut coordinator, _) = coordinator(host, Vec::new());
    load_snippets(&mut coordinator, vec![Snippet::from_html(7, "X", "x<br>")]);

    coordinator.insert_snippet(7).unwrap();
    coordinator.wait_for_idle();

    assert_eq!(coordinator.host().text_string(), "Hi x");
    assert_eq!(coordinator.host().caret, Some(Caret::at(4)));
}

#[test]
fn test_snippet_with_unparsable_recipients() {
    let host = MemoryHost::with_text("", Caret::at(0));
    let (coordinator, _) = coordinator(host, Vec::new());
    let mut coordinator = coordinator.with_recipients(StaticRecipients("<<<".to_string()));
    load_snippets(
        &mut coordinator,
        vec![Snippet::from_html(2, "Sign", "Bye $name$!")],
    );

    coordinator.insert_snippet(2).unwrap();
    coordinator.wait_for_idle();

    assert_eq!(coordinator.host().text_string(), "Bye !");
}

#[test]
fn test_snippet_follows_caret_moved_while_converting() {
    let host = MemoryHost::with_text("ab cd", Caret::at(0));
    let (mut coordinator, _) = coordinator(host, Vec::new());
    load_snippets(&mut coordinator, vec![Snippet::from_html(4, "X", "x")]);

    coordinator.insert_snippet(4).unwrap();
    coordinator.host_mut().caret = Some(Caret::at(2));
    coordinator.wait_for_idle();

    assert_eq!(coordinator.host().text_string(), "ab x cd");
    assert_eq!(coordinator.host().caret, Some(Caret::at(4)));
}

#[test]
fn test_snippet_cache_is_shared_between_surfaces() {
    let cache = Arc::new(SnippetCache::new());
    let (first, _) = coordinator(MemoryHost::with_text("", Caret::at(0)), Vec::new());
    let mut first = first.with_snippet_cache(Arc::clone(&cache));
    let (second, _) = coordinator(MemoryHost::with_text("", Caret::at(0)), Vec::new());
    let mut second = second.with_snippet_cache(Arc::clone(&cache));

    load_snippets(&mut first, vec![Snippet::from_html(5, "Shared", "s")]);
    assert!(second.snippet_cache().is_loaded());

    second.insert_snippet(5).unwrap();
    second.wait_for_idle();
    assert_eq!(second.host().text_string(), "s");
}

#[test]
fn test_quote_snippet_after_text_is_dropped() {
    let host = MemoryHost::with_text("Hi", Caret::at(2));
    let (mut coordinator, _) = coordinator(host, Vec::new());
    load_snippets(
        &mut coordinator,
        vec![Snippet::from_html(6, "Quote", "<blockquote>q</blockquote>")],
    );

    coordinator.insert_snippet(6).unwrap();
    assert_eq!(coordinator.wait_for_idle(), 0);

    assert_eq!(coordinator.host().text_string(), "Hi");
    assert_eq!(coordinator.host().caret, Some(Caret::at(2)));
}

#[test]
fn test_unknown_snippet() {
    let host = MemoryHost::with_text("", Caret::at(0));
    let (mut coordinator, _) = coordinator(host, Vec::new());

    assert!(matches!(
        coordinator.insert_snippet(99),
        Err(ComposeError::NotFound(99))
    ));
    assert!(!coordinator.handle_menu_action(MenuAction::Snippet(99)));
}

#[test]
fn test_insert_line_mid_paragraph() {
    let host = MemoryHost::with_text("abcd", Caret::at(2));
    let (mut coordinator, _) = coordinator(host, Vec::new());

    assert!(coordinator.insert_line());

    let host = coordinator.host();
    assert_eq!(host.text_string(), format!("ab\n{OBJECT_REPLACEMENT}\ncd"));
    assert_eq!(host.caret, Some(Caret::at(5)));
    assert_eq!(spans(host.buffer.as_ref().unwrap()), vec![("separator", 3, 4)]);
}

#[test]
fn test_insert_line_between_paragraphs() {
    let host = MemoryHost::with_text("ab\ncd", Caret::at(3));
    let (mut coordinator, _) = coordinator(host, Vec::new());

    assert!(coordinator.insert_line());

    let host = coordinator.host();
    assert_eq!(host.text_string(), format!("ab\n{OBJECT_REPLACEMENT}\ncd"));
    assert_eq!(host.caret, Some(Caret::at(5)));
}

#[test]
fn test_insert_line_without_caret() {
    let mut host = MemoryHost::with_text("ab", Caret::at(0));
    host.caret = None;
    let (mut coordinator, _) = coordinator(host, Vec::new());

    assert!(!coordinator.insert_line());
    assert_eq!(coordinator.host().text_string(), "ab");
}

#[test]
fn test_insert_arrow() {
    let host = MemoryHost::with_text("ab", Caret::at(1));
    let (mut coordinator, _) = coordinator(host, Vec::new());

    assert!(coordinator.insert_arrow());
    assert_eq!(coordinator.host().text_string(), format!("a{ARROW}b"));
    assert_eq!(coordinator.host().caret, Some(Caret::at(4)));
}

#[test]
fn test_copy_selection() {
    let mut buffer = StyledBuffer::from_text("0123456789");
    buffer.add_range(StyleKind::Bold, 0, 4).unwrap();
    let host = MemoryHost::new(buffer, Caret::new(2, 5));
    let (mut coordinator, clipboard) = coordinator(host, Vec::new());

    assert!(coordinator.copy());

    assert_eq!(
        clipboard.items(),
        vec![ClipboardItem::Html {
            html: "<b>23</b>4".to_string(),
            text: Some("234".to_string()),
        }]
    );
    assert_eq!(coordinator.host().caret, Some(Caret::at(5)));
    assert_eq!(coordinator.host().text_string(), "0123456789");
}

#[test]
fn test_copy_needs_a_selection() {
    let host = MemoryHost::with_text("abc", Caret::at(1));
    let (mut coordinator, clipboard) = coordinator(host, vec![html("keep")]);

    assert!(!coordinator.copy());
    assert_eq!(clipboard.items(), vec![html("keep")]);
}

#[test]
fn test_menu_entries_follow_config_and_host() {
    let mut host = MemoryHost::with_text("", Caret::at(0));
    host.can_undo = true;
    let config = ComposeConfig {
        undo_manager: true,
        show_arrow: true,
        ..ComposeConfig::default()
    };
    let (mut coordinator, _) = coordinator_with_config(host, Vec::new(), config);
    load_snippets(&mut coordinator, vec![Snippet::from_html(3, "Thanks", "Thanks!")]);

    let entries = coordinator.menu_entries();
    let titles: Vec<&str> = entries.iter().map(|entry| entry.title.as_str()).collect();
    assert_eq!(titles, vec!["Undo", "Insert line", "Insert arrow", "Thanks"]);
    assert!(entries[0].emphasized);
    assert_eq!(entries[3].action, MenuAction::Snippet(3));

    assert!(coordinator.handle_menu_action(MenuAction::Undo));
    assert_eq!(coordinator.host().performed, vec![HostCommand::Undo]);
}

#[test]
fn test_history_hidden_without_undo_manager() {
    let mut host = MemoryHost::with_text("", Caret::at(0));
    host.can_undo = true;
    host.can_redo = true;
    let (coordinator, _) = coordinator(host, Vec::new());

    let actions: Vec<MenuAction> = coordinator
        .menu_entries()
        .iter()
        .map(|entry| entry.action)
        .collect();
    assert_eq!(actions, vec![MenuAction::InsertLine]);
}

#[test]
fn test_selection_listener() {
    let host = MemoryHost::with_text("abc", Caret::at(0));
    let (mut coordinator, _) = coordinator(host, Vec::new());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    coordinator.set_selection_listener(move |has_selection| sink.borrow_mut().push(has_selection));

    coordinator.on_selection_changed(Caret::new(0, 2));
    coordinator.on_selection_changed(Caret::at(1));

    assert_eq!(*seen.borrow(), vec![true, false]);
}

#[test]
fn test_commit_content_takes_images_only() {
    let host = MemoryHost::with_text("", Caret::at(0));
    let (mut coordinator, _) = coordinator(host, Vec::new());
    assert!(!coordinator.commit_content("content://a.png", "image/png"));

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    coordinator.set_input_content_listener(move |uri| {
        sink.borrow_mut().push(uri.to_string());
        true
    });

    assert!(coordinator.commit_content("content://a.png", "image/png"));
    assert!(!coordinator.commit_content("content://b.txt", "text/plain"));
    assert_eq!(*seen.borrow(), vec!["content://a.png".to_string()]);
}
