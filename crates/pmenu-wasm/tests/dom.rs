#![cfg(target_arch = "wasm32")]
#![forbid(unsafe_code)]

use std::cell::Cell;
use std::rc::Rc;

use pmenu_wasm::dom::WebDocument;
use pmenu_web::document::{
    EventDisposition, EventKind, HostDocument, ListenerTarget, ReadyState,
};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

wasm_bindgen_test_configure!(run_in_browser);

fn web_document() -> WebDocument {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .expect("browser document");
    WebDocument::new(document, Rc::new(|_| {}))
}

#[wasm_bindgen_test]
fn queries_and_ascends_the_live_tree() {
    let mut doc = web_document();
    assert_ne!(doc.ready_state(), ReadyState::Loading);

    let nav = doc.create_element("nav").unwrap();
    doc.set_attribute(&nav, "id", "dom-test-nav").unwrap();
    let logo = doc.create_element("div").unwrap();
    doc.set_attribute(&logo, "class", "dom-test-logo").unwrap();
    doc.append_child(&nav, &logo).unwrap();
    doc.append_to_body(&nav).unwrap();

    let found = doc.query_selector("#dom-test-nav .dom-test-logo").unwrap();
    assert_eq!(found.as_ref(), Some(&logo));
    assert_eq!(doc.parent_element(&logo), Some(nav.clone()));
    assert!(doc.query_selector("[[").is_err());

    doc.remove(&nav);
    assert!(!doc.contains(&logo));
}

#[wasm_bindgen_test]
fn isolated_root_hides_children_from_queries() {
    let mut doc = web_document();
    let host = doc.create_element("div").unwrap();
    doc.append_to_body(&host).unwrap();
    let root = doc.attach_isolated_root(&host).unwrap();
    let inner = doc.create_element("span").unwrap();
    doc.set_attribute(&inner, "id", "dom-test-inner").unwrap();
    doc.append_child(&root, &inner).unwrap();

    assert_eq!(doc.element_by_id("dom-test-inner"), None);
    assert_eq!(doc.attach_isolated_root(&host).unwrap(), root);

    doc.clear_children(&root);
    doc.remove(&host);
}

#[wasm_bindgen_test]
fn listeners_fire_until_removed() {
    let mut doc = web_document();
    let button = doc.create_element("button").unwrap();
    doc.append_to_body(&button).unwrap();

    let clicks = Rc::new(Cell::new(0));
    let counter = Rc::clone(&clicks);
    let id = doc
        .add_listener(
            ListenerTarget::Element(button.clone()),
            EventKind::Click,
            Rc::new(move |_| {
                counter.set(counter.get() + 1);
                EventDisposition::PASS
            }),
        )
        .unwrap();

    let element = button.dyn_ref::<web_sys::HtmlElement>().unwrap();
    element.click();
    assert_eq!(clicks.get(), 1);

    assert!(doc.remove_listener(id));
    assert!(!doc.remove_listener(id));
    element.click();
    assert_eq!(clicks.get(), 1);
    doc.remove(&button);
}

#[wasm_bindgen_test]
fn observers_disconnect_once() {
    let mut doc = web_document();
    let observer = doc.observe_mutations().unwrap();
    assert!(doc.disconnect_observer(observer));
    assert!(!doc.disconnect_observer(observer));
}
