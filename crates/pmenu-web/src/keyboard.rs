#![forbid(unsafe_code)]

//! Global keyboard shortcuts: `Ctrl+M` toggles, `Escape` closes.

use std::rc::Rc;

use crate::document::{
    DomError, DomEvent, EventDisposition, EventKind, HostDocument, ListenerId, ListenerTarget,
};
use crate::widget::MenuControl;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    Toggle,
    Close,
}

/// Map a keydown to a menu action given the current open state.
#[must_use]
pub fn shortcut_for(event: &DomEvent, open: bool) -> Option<ShortcutAction> {
    if event.kind != EventKind::KeyDown {
        return None;
    }
    if event.ctrl_key && event.key == "m" {
        return Some(ShortcutAction::Toggle);
    }
    (open && event.key == "Escape").then_some(ShortcutAction::Close)
}

/// Register the document keydown listener driving `control`.
pub fn install<D: HostDocument>(
    doc: &mut D,
    control: Rc<dyn MenuControl>,
) -> Result<ListenerId, DomError> {
    doc.add_listener(
        ListenerTarget::Document,
        EventKind::KeyDown,
        Rc::new(move |event| match shortcut_for(event, control.is_open()) {
            Some(ShortcutAction::Toggle) => {
                control.toggle();
                EventDisposition {
                    prevent_default: true,
                    stop_propagation: false,
                }
            }
            Some(ShortcutAction::Close) => {
                control.close();
                EventDisposition::PASS
            }
            None => EventDisposition::PASS,
        }),
    )
}
