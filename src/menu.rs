use crate::snippet::Snippet;

/// First order number handed out to compose entries, after the host's own
const FIRST_ORDER: u32 = 1000;

/// What a compose context menu entry does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Undo,
    Redo,
    InsertLine,
    InsertArrow,
    Snippet(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub action: MenuAction,
    pub title: String,
    /// Rendered in italics to set history entries apart
    pub emphasized: bool,
    pub order: u32,
}

/// State the compose entries depend on
pub struct MenuState<'a> {
    pub undo_manager: bool,
    pub show_arrow: bool,
    pub can_undo: bool,
    pub can_redo: bool,
    pub snippets: &'a [Snippet],
}

/// Entries appended to the host's context menu, in display order
pub fn menu_entries(state: &MenuState<'_>) -> Vec<MenuEntry> {
    let mut entries = Vec::new();
    let mut add = |action: MenuAction, title: &str, emphasized: bool| {
        let order = FIRST_ORDER + entries.len() as u32;
        entries.push(MenuEntry {
            action,
            title: title.to_string(),
            emphasized,
            order,
        });
    };

    if state.undo_manager && state.can_undo {
        add(MenuAction::Undo, "Undo", true);
    }
    if state.undo_manager && state.can_redo {
        add(MenuAction::Redo, "Redo", true);
    }
    add(MenuAction::InsertLine, "Insert line", false);
    if state.show_arrow {
        add(MenuAction::InsertArrow, "Insert arrow", false);
    }
    for snippet in state.snippets {
        add(MenuAction::Snippet(snippet.id), &snippet.name, false);
    }
    entries
}
