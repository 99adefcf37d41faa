#![forbid(unsafe_code)]

//! [`HostDocument`] over the live browser document.

use std::collections::HashMap;
use std::rc::Rc;

use pmenu_web::document::{
    DomError, DomEvent, EventCallback, EventKind, HostDocument, ListenerId, ListenerTarget,
    ObserverId, ReadyState,
};
use pmenu_web::widget::{MenuControl, MenuWidget, MountedWidget, WidgetMounter, WidgetProps};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Element, EventTarget, HtmlElement, KeyboardEvent,
    MutationObserver, MutationObserverInit, Node, ShadowRootInit, ShadowRootMode,
};

type EventClosure = Closure<dyn FnMut(web_sys::Event)>;
type MutationClosure = Closure<dyn FnMut(js_sys::Array, MutationObserver)>;

/// Called with the observer id on every mutation-observer delivery.
pub type MutationSink = Rc<dyn Fn(ObserverId)>;

struct Registration {
    target: EventTarget,
    kind: EventKind,
    closure: EventClosure,
}

struct Observation {
    observer: MutationObserver,
    _callback: MutationClosure,
}

fn host_error(op: &'static str) -> impl Fn(JsValue) -> DomError {
    move |err| DomError::Host {
        op,
        message: err.as_string().unwrap_or_else(|| format!("{err:?}")),
    }
}

pub struct WebDocument {
    document: Document,
    listeners: HashMap<u32, Registration>,
    observers: HashMap<u32, Observation>,
    next_id: u32,
    on_mutation: MutationSink,
}

impl WebDocument {
    pub fn new(document: Document, on_mutation: MutationSink) -> Self {
        Self {
            document,
            listeners: HashMap::new(),
            observers: HashMap::new(),
            next_id: 0,
            on_mutation,
        }
    }

    fn next_id(&mut self) -> u32 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }

    fn event_target(&self, target: &ListenerTarget<Node>) -> EventTarget {
        match target {
            ListenerTarget::Document => self.document.clone().into(),
            ListenerTarget::Element(node) => node.clone().into(),
        }
    }
}

fn not_an(op: &'static str, kind: &str) -> DomError {
    DomError::Host {
        op,
        message: format!("node is not an {kind}"),
    }
}

fn as_element(node: &Node, op: &'static str) -> Result<&Element, DomError> {
    node.dyn_ref::<Element>().ok_or_else(|| not_an(op, "element"))
}

fn to_dom_event(kind: EventKind, event: &web_sys::Event) -> DomEvent {
    match (kind, event.dyn_ref::<KeyboardEvent>()) {
        (EventKind::KeyDown, Some(key)) => DomEvent::key_down(&key.key(), key.ctrl_key()),
        _ => DomEvent::click(),
    }
}

impl HostDocument for WebDocument {
    type Node = Node;

    fn hostname(&self) -> String {
        self.document
            .location()
            .and_then(|location| location.hostname().ok())
            .unwrap_or_default()
    }

    fn ready_state(&self) -> ReadyState {
        ReadyState::from_dom(&self.document.ready_state())
    }

    fn element_by_id(&self, id: &str) -> Option<Node> {
        self.document.get_element_by_id(id).map(Into::into)
    }

    fn query_selector(&self, selector: &str) -> Result<Option<Node>, DomError> {
        self.document
            .query_selector(selector)
            .map(|found| found.map(Into::into))
            .map_err(|_| DomError::InvalidSelector(selector.to_owned()))
    }

    fn parent_element(&self, node: &Node) -> Option<Node> {
        node.parent_element().map(Into::into)
    }

    fn contains(&self, node: &Node) -> bool {
        node.is_connected()
    }

    fn offset_height(&self, node: &Node) -> f64 {
        node.dyn_ref::<HtmlElement>()
            .map_or(0.0, |element| f64::from(element.offset_height()))
    }

    fn create_element(&mut self, tag: &str) -> Result<Node, DomError> {
        self.document
            .create_element(tag)
            .map(Into::into)
            .map_err(host_error("create_element"))
    }

    fn set_attribute(&mut self, node: &Node, name: &str, value: &str) -> Result<(), DomError> {
        as_element(node, "set_attribute")?
            .set_attribute(name, value)
            .map_err(host_error("set_attribute"))
    }

    fn set_style(&mut self, node: &Node, property: &str, value: &str) -> Result<(), DomError> {
        node.dyn_ref::<HtmlElement>()
            .ok_or_else(|| not_an("set_style", "html element"))?
            .style()
            .set_property(property, value)
            .map_err(host_error("set_style"))
    }

    fn set_text(&mut self, node: &Node, text: &str) -> Result<(), DomError> {
        node.set_text_content(Some(text));
        Ok(())
    }

    fn append_child(&mut self, parent: &Node, child: &Node) -> Result<(), DomError> {
        parent
            .append_child(child)
            .map(drop)
            .map_err(host_error("append_child"))
    }

    fn insert_before(&mut self, node: &Node, reference: &Node) -> Result<(), DomError> {
        let parent = reference.parent_node().ok_or(DomError::Detached)?;
        parent
            .insert_before(node, Some(reference))
            .map(drop)
            .map_err(host_error("insert_before"))
    }

    fn append_to_body(&mut self, node: &Node) -> Result<(), DomError> {
        let body = self.document.body().ok_or(DomError::MissingElement("body"))?;
        body.append_child(node)
            .map(drop)
            .map_err(host_error("append_to_body"))
    }

    fn append_to_head(&mut self, node: &Node) -> Result<(), DomError> {
        let head = self.document.head().ok_or(DomError::MissingElement("head"))?;
        head.append_child(node)
            .map(drop)
            .map_err(host_error("append_to_head"))
    }

    fn remove(&mut self, node: &Node) {
        if let Some(element) = node.dyn_ref::<Element>() {
            element.remove();
        } else if let Some(parent) = node.parent_node() {
            let _ = parent.remove_child(node);
        }
    }

    fn attach_isolated_root(&mut self, host: &Node) -> Result<Node, DomError> {
        let element = as_element(host, "attach_shadow")?;
        if let Some(existing) = element.shadow_root() {
            return Ok(existing.into());
        }
        element
            .attach_shadow(&ShadowRootInit::new(ShadowRootMode::Open))
            .map(Into::into)
            .map_err(host_error("attach_shadow"))
    }

    fn clear_children(&mut self, node: &Node) {
        node.set_text_content(None);
    }

    fn add_listener(
        &mut self,
        target: ListenerTarget<Node>,
        kind: EventKind,
        callback: EventCallback,
    ) -> Result<ListenerId, DomError> {
        let target = self.event_target(&target);
        let closure = EventClosure::new(move |event: web_sys::Event| {
            let disposition = callback(&to_dom_event(kind, &event));
            if disposition.prevent_default {
                event.prevent_default();
            }
            if disposition.stop_propagation {
                event.stop_propagation();
            }
        });
        target
            .add_event_listener_with_callback(kind.as_str(), closure.as_ref().unchecked_ref())
            .map_err(host_error("add_event_listener"))?;
        let id = self.next_id();
        self.listeners.insert(
            id,
            Registration {
                target,
                kind,
                closure,
            },
        );
        Ok(ListenerId(id))
    }

    fn remove_listener(&mut self, id: ListenerId) -> bool {
        let Some(registration) = self.listeners.remove(&id.0) else {
            return false;
        };
        let _ = registration.target.remove_event_listener_with_callback(
            registration.kind.as_str(),
            registration.closure.as_ref().unchecked_ref(),
        );
        true
    }

    fn observe_mutations(&mut self) -> Result<ObserverId, DomError> {
        let body = self.document.body().ok_or(DomError::MissingElement("body"))?;
        let id = ObserverId(self.next_id());
        let sink = Rc::clone(&self.on_mutation);
        let callback =
            MutationClosure::new(move |_records: js_sys::Array, _observer: MutationObserver| {
                sink(id);
            });
        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())
            .map_err(host_error("mutation_observer"))?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        observer
            .observe_with_options(&body, &init)
            .map_err(host_error("observe"))?;
        self.observers.insert(
            id.0,
            Observation {
                observer,
                _callback: callback,
            },
        );
        Ok(id)
    }

    fn disconnect_observer(&mut self, id: ObserverId) -> bool {
        let Some(observation) = self.observers.remove(&id.0) else {
            return false;
        };
        observation.observer.disconnect();
        true
    }
}

/// [`MenuWidget`] that mirrors the open state into the root's `data-open`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomMenuWidget;

impl WidgetMounter<WebDocument> for DomMenuWidget {
    fn mount(
        &self,
        doc: &mut WebDocument,
        container: &Node,
        props: &WidgetProps,
    ) -> Result<MountedWidget<Node>, DomError> {
        let (mounted, menu) = MenuWidget.mount_shared(doc, container, props)?;
        if let Some(root) = mounted.root.dyn_ref::<Element>().cloned() {
            menu.on_change(move |open| {
                let _ = root.set_attribute("data-open", if open { "true" } else { "false" });
            });
        }
        tracing::debug!(mode = %props.mode, open = menu.is_open(), "widget mounted");
        Ok(mounted)
    }
}
