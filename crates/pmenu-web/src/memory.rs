#![forbid(unsafe_code)]

//! In-memory [`HostDocument`] for deterministic lifecycle tests.
//!
//! An arena of element nodes rooted at `<html>` with `<head>` and `<body>`,
//! plus shadow roots, listener registrations with bubbling dispatch, and
//! body-subtree mutation observers whose deliveries the caller drains with
//! [`MemoryDocument::take_mutation_deliveries`].
//!
//! Selectors are evaluated by `scraper` against markup serialized from the
//! light tree, so the usual HTML parser repairs apply to the tree being
//! matched.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use scraper::{Html, Selector};

use crate::document::{
    DomError, DomEvent, EventCallback, EventDisposition, EventKind, HostDocument, ListenerId,
    ListenerTarget, ObserverId, ReadyState,
};

/// Handle to a node in a [`MemoryDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

const SHADOW_ROOT_TAG: &str = "#shadow-root";

/// Attribute carrying the arena index through serialized markup.
const NODE_MARKER: &str = "data-pmenu-node";

#[derive(Debug, Clone, Default)]
struct NodeData {
    tag: String,
    attrs: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    shadow_root: Option<NodeId>,
    /// Set on shadow roots only.
    shadow_host: Option<NodeId>,
    offset_height: f64,
}

struct Listener {
    id: ListenerId,
    target: ListenerTarget<NodeId>,
    kind: EventKind,
    callback: EventCallback,
}

/// Arena-backed document.
pub struct MemoryDocument {
    hostname: String,
    ready_state: ReadyState,
    nodes: Vec<NodeData>,
    html: NodeId,
    head: NodeId,
    body: NodeId,
    listeners: Vec<Listener>,
    next_listener: u32,
    observers: BTreeMap<ObserverId, bool>,
    next_observer: u32,
    queries: Cell<u32>,
}

impl core::fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryDocument")
            .field("hostname", &self.hostname)
            .field("ready_state", &self.ready_state)
            .field("nodes", &self.nodes.len())
            .field("listeners", &self.listeners.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl MemoryDocument {
    /// A loaded page (`readyState == "complete"`) served from `hostname`.
    #[must_use]
    pub fn new(hostname: impl Into<String>) -> Self {
        let mut doc = Self {
            hostname: hostname.into(),
            ready_state: ReadyState::Complete,
            nodes: Vec::new(),
            html: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
            listeners: Vec::new(),
            next_listener: 1,
            observers: BTreeMap::new(),
            next_observer: 1,
            queries: Cell::new(0),
        };
        doc.html = doc.alloc("html");
        doc.head = doc.alloc("head");
        doc.body = doc.alloc("body");
        doc.link(doc.html, doc.head);
        doc.link(doc.html, doc.body);
        doc
    }

    #[must_use]
    pub fn with_ready_state(mut self, state: ReadyState) -> Self {
        self.ready_state = state;
        self
    }

    pub fn set_ready_state(&mut self, state: ReadyState) {
        self.ready_state = state;
    }

    #[must_use]
    pub const fn document_element(&self) -> NodeId {
        self.html
    }

    #[must_use]
    pub const fn head(&self) -> NodeId {
        self.head
    }

    #[must_use]
    pub const fn body(&self) -> NodeId {
        self.body
    }

    /// Create an element and append it to `parent`.
    pub fn element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let node = self.alloc(tag);
        for (name, value) in attrs {
            self.nodes[node.0]
                .attrs
                .insert((*name).to_owned(), (*value).to_owned());
        }
        self.link(parent, node);
        self.note_mutation(parent);
        node
    }

    pub fn set_offset_height(&mut self, node: NodeId, height: f64) {
        self.nodes[node.0].offset_height = height;
    }

    #[must_use]
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node.0].attrs.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.nodes[node.0].styles.get(property).map(String::as_str)
    }

    #[must_use]
    pub fn text(&self, node: NodeId) -> &str {
        &self.nodes[node.0].text
    }

    #[must_use]
    pub fn tag_name(&self, node: NodeId) -> &str {
        &self.nodes[node.0].tag
    }

    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    #[must_use]
    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.nodes[host.0].shadow_root
    }

    /// Connected light-DOM elements carrying `id`.
    #[must_use]
    pub fn count_by_id(&self, id: &str) -> usize {
        self.light_tree(self.html)
            .into_iter()
            .filter(|&node| self.attribute(node, "id") == Some(id))
            .count()
    }

    /// First element with `id` inside `root`, piercing nested shadow roots.
    #[must_use]
    pub fn find_in(&self, root: NodeId, id: &str) -> Option<NodeId> {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if self.attribute(node, "id") == Some(id) {
                return Some(node);
            }
            let data = &self.nodes[node.0];
            stack.extend(data.shadow_root);
            stack.extend(data.children.iter().rev().copied());
        }
        None
    }

    /// First element with `class` inside `root`, piercing shadow roots.
    #[must_use]
    pub fn find_by_class(&self, root: NodeId, class: &str) -> Option<NodeId> {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if self
                .attribute(node, "class")
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
            {
                return Some(node);
            }
            let data = &self.nodes[node.0];
            stack.extend(data.shadow_root);
            stack.extend(data.children.iter().rev().copied());
        }
        None
    }

    /// Listeners registered on `target` for `kind`.
    #[must_use]
    pub fn listener_count(&self, target: &ListenerTarget<NodeId>, kind: EventKind) -> usize {
        self.listeners
            .iter()
            .filter(|l| l.target == *target && l.kind == kind)
            .count()
    }

    #[must_use]
    pub fn total_listeners(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn active_observers(&self) -> usize {
        self.observers.len()
    }

    /// Number of `query_selector` calls so far.
    #[must_use]
    pub fn query_count(&self) -> u32 {
        self.queries.get()
    }

    /// Observers with a pending delivery; clears the pending flags.
    pub fn take_mutation_deliveries(&mut self) -> Vec<ObserverId> {
        self.observers
            .iter_mut()
            .filter(|(_, pending)| **pending)
            .map(|(&id, pending)| {
                *pending = false;
                id
            })
            .collect()
    }

    /// Dispatch a click at `node`, bubbling to the document.
    pub fn click(&mut self, node: NodeId) -> EventDisposition {
        self.dispatch(Some(node), &DomEvent::click())
    }

    /// Dispatch a keydown at the document.
    pub fn key_down(&mut self, key: &str, ctrl_key: bool) -> EventDisposition {
        self.dispatch(None, &DomEvent::key_down(key, ctrl_key))
    }

    /// Run listeners along the propagation path starting at `target`
    /// (or at the document when `None`).
    ///
    /// Shadow roots bubble to their host. A listener asking to stop
    /// propagation lets its siblings on the same node finish first.
    pub fn dispatch(&mut self, target: Option<NodeId>, event: &DomEvent) -> EventDisposition {
        let mut path: Vec<ListenerTarget<NodeId>> = Vec::new();
        let mut cursor = target;
        while let Some(node) = cursor {
            path.push(ListenerTarget::Element(node));
            let data = &self.nodes[node.0];
            cursor = data.parent.or(data.shadow_host);
        }
        path.push(ListenerTarget::Document);

        let mut disposition = EventDisposition::PASS;
        for hop in path {
            let callbacks: Vec<EventCallback> = self
                .listeners
                .iter()
                .filter(|l| l.target == hop && l.kind == event.kind)
                .map(|l| l.callback.clone())
                .collect();
            for callback in callbacks {
                disposition = disposition.merge(callback(event));
            }
            if disposition.stop_propagation {
                break;
            }
        }
        disposition
    }

    fn alloc(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            tag: tag.to_ascii_lowercase(),
            ..NodeData::default()
        });
        id
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.unlink(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    fn unlink(&mut self, child: NodeId) -> Option<NodeId> {
        let parent = self.nodes[child.0].parent.take()?;
        self.nodes[parent.0].children.retain(|&c| c != child);
        Some(parent)
    }

    fn is_connected(&self, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == self.html {
                return true;
            }
            let data = &self.nodes[current.0];
            cursor = data.parent.or(data.shadow_host);
        }
        false
    }

    /// Whether `node` is the body or a light-DOM descendant of it.
    fn in_body_subtree(&self, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == self.body {
                return true;
            }
            cursor = self.nodes[current.0].parent;
        }
        false
    }

    fn note_mutation(&mut self, parent: NodeId) {
        if self.in_body_subtree(parent) {
            self.observers.values_mut().for_each(|pending| *pending = true);
        }
    }

    /// Pre-order light-DOM walk from `root`.
    fn light_tree(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.nodes[node.0].children.iter().rev().copied());
        }
        order
    }

    /// Light tree as an HTML document, each element tagged with its index.
    fn markup(&self) -> String {
        let mut out = String::from("<!DOCTYPE html>");
        self.write_markup(self.html, &mut out);
        out
    }

    fn write_markup(&self, node: NodeId, out: &mut String) {
        let data = &self.nodes[node.0];
        let _ = write!(out, "<{} {NODE_MARKER}=\"{}\"", data.tag, node.0);
        for (name, value) in &data.attrs {
            let value = value.replace('&', "&amp;").replace('"', "&quot;");
            let _ = write!(out, " {name}=\"{value}\"");
        }
        out.push('>');
        for &child in &data.children {
            self.write_markup(child, out);
        }
        let _ = write!(out, "</{}>", data.tag);
    }

    fn check(&self, node: NodeId) -> Result<(), DomError> {
        if node.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(DomError::Host {
                op: "lookup",
                message: format!("unknown node {}", node.0),
            })
        }
    }
}

impl HostDocument for MemoryDocument {
    type Node = NodeId;

    fn hostname(&self) -> String {
        self.hostname.clone()
    }

    fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.light_tree(self.html)
            .into_iter()
            .find(|&node| self.attribute(node, "id") == Some(id))
    }

    fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, DomError> {
        self.queries.set(self.queries.get().saturating_add(1));
        let parsed = Selector::parse(selector)
            .map_err(|_| DomError::InvalidSelector(selector.to_owned()))?;
        let page = Html::parse_document(&self.markup());
        Ok(page.select(&parsed).find_map(|element| {
            let index = element.value().attr(NODE_MARKER)?.parse().ok()?;
            Some(NodeId(index))
        }))
    }

    fn parent_element(&self, node: &NodeId) -> Option<NodeId> {
        self.nodes[node.0]
            .parent
            .filter(|parent| self.nodes[parent.0].tag != SHADOW_ROOT_TAG)
    }

    fn contains(&self, node: &NodeId) -> bool {
        self.is_connected(*node)
    }

    fn offset_height(&self, node: &NodeId) -> f64 {
        self.nodes[node.0].offset_height
    }

    fn create_element(&mut self, tag: &str) -> Result<NodeId, DomError> {
        Ok(self.alloc(tag))
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.check(*node)?;
        self.nodes[node.0]
            .attrs
            .insert(name.to_owned(), value.to_owned());
        Ok(())
    }

    fn set_style(&mut self, node: &NodeId, property: &str, value: &str) -> Result<(), DomError> {
        self.check(*node)?;
        self.nodes[node.0]
            .styles
            .insert(property.to_owned(), value.to_owned());
        Ok(())
    }

    fn set_text(&mut self, node: &NodeId, text: &str) -> Result<(), DomError> {
        self.check(*node)?;
        self.nodes[node.0].text = text.to_owned();
        Ok(())
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), DomError> {
        self.check(*parent)?;
        self.check(*child)?;
        if let Some(old) = self.unlink(*child) {
            self.note_mutation(old);
        }
        self.link(*parent, *child);
        self.note_mutation(*parent);
        Ok(())
    }

    fn insert_before(&mut self, node: &NodeId, reference: &NodeId) -> Result<(), DomError> {
        self.check(*node)?;
        let parent = self.nodes[reference.0].parent.ok_or(DomError::Detached)?;
        if let Some(old) = self.unlink(*node) {
            self.note_mutation(old);
        }
        let children = &mut self.nodes[parent.0].children;
        let at = children
            .iter()
            .position(|c| c == reference)
            .unwrap_or(children.len());
        children.insert(at, *node);
        self.nodes[node.0].parent = Some(parent);
        self.note_mutation(parent);
        Ok(())
    }

    fn append_to_body(&mut self, node: &NodeId) -> Result<(), DomError> {
        let body = self.body;
        self.append_child(&body, node)
    }

    fn append_to_head(&mut self, node: &NodeId) -> Result<(), DomError> {
        let head = self.head;
        self.append_child(&head, node)
    }

    fn remove(&mut self, node: &NodeId) {
        if let Some(parent) = self.unlink(*node) {
            self.note_mutation(parent);
        }
    }

    fn attach_isolated_root(&mut self, host: &NodeId) -> Result<NodeId, DomError> {
        self.check(*host)?;
        if self.nodes[host.0].shadow_root.is_some() {
            return Err(DomError::Host {
                op: "attachShadow",
                message: "element already hosts a shadow root".into(),
            });
        }
        let root = self.alloc(SHADOW_ROOT_TAG);
        self.nodes[root.0].shadow_host = Some(*host);
        self.nodes[host.0].shadow_root = Some(root);
        Ok(root)
    }

    fn clear_children(&mut self, node: &NodeId) {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in &children {
            self.nodes[child.0].parent = None;
        }
        if !children.is_empty() {
            self.note_mutation(*node);
        }
    }

    fn add_listener(
        &mut self,
        target: ListenerTarget<NodeId>,
        kind: EventKind,
        callback: EventCallback,
    ) -> Result<ListenerId, DomError> {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push(Listener {
            id,
            target,
            kind,
            callback,
        });
        Ok(id)
    }

    fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    fn observe_mutations(&mut self) -> Result<ObserverId, DomError> {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.insert(id, false);
        Ok(id)
    }

    fn disconnect_observer(&mut self, id: ObserverId) -> bool {
        self.observers.remove(&id).is_some()
    }
}
