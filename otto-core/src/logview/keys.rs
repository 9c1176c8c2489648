//! Keyboard shortcuts for the log panel
//!
//! Maps a key press to a panel action given the panel's current state. The
//! embedding UI performs the action.

/// Keys the panel reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Space,
    ArrowUp,
    ArrowDown,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    /// Ctrl on Linux/Windows, Cmd on macOS
    pub ctrl: bool,
}

impl KeyPress {
    pub fn plain(key: Key) -> Self {
        Self { key, ctrl: false }
    }

    pub fn ctrl(key: Key) -> Self {
        Self { key, ctrl: true }
    }
}

/// Panel state relevant to shortcut handling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelState {
    pub open: bool,
    pub expanded: bool,
    /// Focus is inside a text input
    pub typing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    CollapseExpanded,
    ClosePanel,
    ToggleExpanded,
    /// Move to the previous entry of the enclosing list (not a search result)
    PreviousItem,
    NextItem,
    FocusSearch,
    OpenInNewContext,
}

/// Resolves a key press to an action, or `None` if the press should be left
/// to the default handler.
pub fn resolve(press: KeyPress, state: PanelState) -> Option<PanelAction> {
    if !state.open {
        return None;
    }

    if press.ctrl && is_char(press.key, 'f') {
        return Some(PanelAction::FocusSearch);
    }

    if state.typing {
        return None;
    }

    if press.ctrl {
        return is_char(press.key, 'n').then_some(PanelAction::OpenInNewContext);
    }

    match press.key {
        Key::Escape if state.expanded => Some(PanelAction::CollapseExpanded),
        Key::Escape => Some(PanelAction::ClosePanel),
        Key::Space => Some(PanelAction::ToggleExpanded),
        Key::ArrowUp => Some(PanelAction::PreviousItem),
        Key::ArrowDown => Some(PanelAction::NextItem),
        Key::Char(_) => None,
    }
}

fn is_char(key: Key, expected: char) -> bool {
    matches!(key, Key::Char(c) if c.eq_ignore_ascii_case(&expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN: PanelState = PanelState {
        open: true,
        expanded: false,
        typing: false,
    };

    #[test]
    fn test_closed_panel_ignores_everything() {
        let closed = PanelState::default();
        assert_eq!(resolve(KeyPress::plain(Key::Escape), closed), None);
        assert_eq!(resolve(KeyPress::ctrl(Key::Char('f')), closed), None);
    }

    #[test]
    fn test_escape_collapses_before_closing() {
        let expanded = PanelState {
            expanded: true,
            ..OPEN
        };
        assert_eq!(
            resolve(KeyPress::plain(Key::Escape), expanded),
            Some(PanelAction::CollapseExpanded)
        );
        assert_eq!(
            resolve(KeyPress::plain(Key::Escape), OPEN),
            Some(PanelAction::ClosePanel)
        );
    }

    #[test]
    fn test_navigation_and_toggle() {
        assert_eq!(
            resolve(KeyPress::plain(Key::Space), OPEN),
            Some(PanelAction::ToggleExpanded)
        );
        assert_eq!(
            resolve(KeyPress::plain(Key::ArrowUp), OPEN),
            Some(PanelAction::PreviousItem)
        );
        assert_eq!(
            resolve(KeyPress::plain(Key::ArrowDown), OPEN),
            Some(PanelAction::NextItem)
        );
        assert_eq!(
            resolve(KeyPress::ctrl(Key::Char('N')), OPEN),
            Some(PanelAction::OpenInNewContext)
        );
        assert_eq!(resolve(KeyPress::plain(Key::Char('x')), OPEN), None);
    }

    #[test]
    fn test_text_input_only_allows_search_focus() {
        let typing = PanelState {
            typing: true,
            ..OPEN
        };
        assert_eq!(
            resolve(KeyPress::ctrl(Key::Char('f')), typing),
            Some(PanelAction::FocusSearch)
        );
        assert_eq!(resolve(KeyPress::plain(Key::Escape), typing), None);
        assert_eq!(resolve(KeyPress::plain(Key::Space), typing), None);
        assert_eq!(resolve(KeyPress::ctrl(Key::Char('n')), typing), None);
    }
}
