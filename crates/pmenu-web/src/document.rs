#![forbid(unsafe_code)]

//! The slice of the host document the lifecycle needs.
//!
//! Mutating calls take `&mut self`; event callbacks never receive the
//! document, so a dispatch can not re-enter it.

use core::fmt;
use std::rc::Rc;

use thiserror::Error;

/// A DOM operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("invalid selector `{0}`")]
    InvalidSelector(String),
    #[error("node is not attached to a parent")]
    Detached,
    #[error("document has no <{0}> element")]
    MissingElement(&'static str),
    #[error("{op} failed: {message}")]
    Host { op: &'static str, message: String },
}

/// `document.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    /// Parse the `document.readyState` string. Unknown values count as
    /// loaded.
    #[must_use]
    pub fn from_dom(value: &str) -> Self {
        match value {
            "loading" => Self::Loading,
            "interactive" => Self::Interactive,
            _ => Self::Complete,
        }
    }
}

/// Event types the lifecycle listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    KeyDown,
}

impl EventKind {
    /// DOM event type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::KeyDown => "keydown",
        }
    }
}

/// The fields of a DOM event a listener may inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub kind: EventKind,
    /// `KeyboardEvent.key`; empty for pointer events.
    pub key: String,
    pub ctrl_key: bool,
}

impl DomEvent {
    #[must_use]
    pub fn click() -> Self {
        Self {
            kind: EventKind::Click,
            key: String::new(),
            ctrl_key: false,
        }
    }

    #[must_use]
    pub fn key_down(key: impl Into<String>, ctrl_key: bool) -> Self {
        Self {
            kind: EventKind::KeyDown,
            key: key.into(),
            ctrl_key,
        }
    }
}

/// What a listener asks the host to do with the event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventDisposition {
    pub prevent_default: bool,
    pub stop_propagation: bool,
}

impl EventDisposition {
    /// Let the event continue untouched.
    pub const PASS: Self = Self {
        prevent_default: false,
        stop_propagation: false,
    };

    /// Cancel the default action and stop propagation.
    pub const CONSUME: Self = Self {
        prevent_default: true,
        stop_propagation: true,
    };

    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self {
            prevent_default: self.prevent_default || other.prevent_default,
            stop_propagation: self.stop_propagation || other.stop_propagation,
        }
    }
}

pub type EventCallback = Rc<dyn Fn(&DomEvent) -> EventDisposition>;

/// Where a listener is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerTarget<N> {
    Document,
    Element(N),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u32);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// Document operations used by discovery, mounting and self-heal.
pub trait HostDocument {
    type Node: Clone + PartialEq + fmt::Debug;

    /// `location.hostname` of the page.
    fn hostname(&self) -> String;

    fn ready_state(&self) -> ReadyState;

    fn element_by_id(&self, id: &str) -> Option<Self::Node>;

    /// First element in document order matching `selector`.
    fn query_selector(&self, selector: &str) -> Result<Option<Self::Node>, DomError>;

    fn parent_element(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Whether `node` is connected to the document.
    fn contains(&self, node: &Self::Node) -> bool;

    /// Rendered height in CSS pixels.
    fn offset_height(&self, node: &Self::Node) -> f64;

    fn create_element(&mut self, tag: &str) -> Result<Self::Node, DomError>;

    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str)
    -> Result<(), DomError>;

    /// Set one inline style property (custom properties included).
    fn set_style(&mut self, node: &Self::Node, property: &str, value: &str)
    -> Result<(), DomError>;

    fn set_text(&mut self, node: &Self::Node, text: &str) -> Result<(), DomError>;

    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), DomError>;

    /// Insert `node` as the immediately preceding sibling of `reference`.
    ///
    /// Fails with [`DomError::Detached`] when `reference` has no parent.
    fn insert_before(&mut self, node: &Self::Node, reference: &Self::Node)
    -> Result<(), DomError>;

    fn append_to_body(&mut self, node: &Self::Node) -> Result<(), DomError>;

    fn append_to_head(&mut self, node: &Self::Node) -> Result<(), DomError>;

    /// Detach `node` from its parent. No-op when already detached.
    fn remove(&mut self, node: &Self::Node);

    /// Attach an open shadow root to `host` and return it.
    fn attach_isolated_root(&mut self, host: &Self::Node) -> Result<Self::Node, DomError>;

    fn clear_children(&mut self, node: &Self::Node);

    fn add_listener(
        &mut self,
        target: ListenerTarget<Self::Node>,
        kind: EventKind,
        callback: EventCallback,
    ) -> Result<ListenerId, DomError>;

    /// Returns `false` when `id` was not registered.
    fn remove_listener(&mut self, id: ListenerId) -> bool;

    /// Start a subtree/childList observer on the body.
    ///
    /// Deliveries are pushed back through the runtime by observer id.
    fn observe_mutations(&mut self) -> Result<ObserverId, DomError>;

    fn disconnect_observer(&mut self, id: ObserverId) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_state_parses_dom_strings() {
        assert_eq!(ReadyState::from_dom("loading"), ReadyState::Loading);
        assert_eq!(ReadyState::from_dom("interactive"), ReadyState::Interactive);
        assert_eq!(ReadyState::from_dom("complete"), ReadyState::Complete);
        assert_eq!(ReadyState::from_dom(""), ReadyState::Complete);
    }

    #[test]
    fn dispositions_merge_by_or() {
        let merged = EventDisposition::PASS.merge(EventDisposition {
            prevent_default: true,
            stop_propagation: false,
        });
        assert!(merged.prevent_default);
        assert!(!merged.stop_propagation);
        assert_eq!(merged.merge(EventDisposition::CONSUME), EventDisposition::CONSUME);
    }

    #[test]
    fn dom_error_messages_name_the_operation() {
        let err = DomError::Host {
            op: "attachShadow",
            message: "NotSupportedError".into(),
        };
        assert_eq!(err.to_string(), "attachShadow failed: NotSupportedError");
    }
}
