//! Browser tests: `wasm-pack test --headless --firefox extension/highlighter`.

#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use inspect::{channel, Command, Dom, FrameError, NodeRef};
use inspect_ext_highlighter::{decode, decode_highlight, setup_highlighter, WebDom};
use js_sys::{Array, Function, Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> web_sys::Document {
    web_sys::window().unwrap().document().unwrap()
}

fn set(target: &JsValue, key: &str, value: &JsValue) {
    Reflect::set(target, &JsValue::from_str(key), value).unwrap();
}

/// `{ show, hide }` that logs "show:<count>" and "hide".
fn recording_overlay(log: Rc<RefCell<Vec<String>>>) -> JsValue {
    let overlay = Object::new();
    let shows = Rc::clone(&log);
    let show = Closure::<dyn FnMut(Array, bool)>::new(move |elements: Array, _hide: bool| {
        shows.borrow_mut().push(format!("show:{}", elements.length()));
    });
    let hide = Closure::<dyn FnMut()>::new(move || log.borrow_mut().push("hide".into()));
    set(&overlay, "show", show.as_ref());
    set(&overlay, "hide", hide.as_ref());
    show.forget();
    hide.forget();
    overlay.into()
}

#[wasm_bindgen_test]
fn decodes_highlight_payloads() {
    let payload = js_sys::JSON::parse(r#"{ "nodes": ["body", null], "hideAfterTimeout": true }"#).unwrap();
    let request = decode_highlight(&payload).unwrap();
    assert_eq!(request.nodes, [NodeRef::Selector("body".into())]);
    assert!(request.hide_after_timeout);

    assert!(decode_highlight(&JsValue::UNDEFINED).unwrap().nodes.is_empty());

    let bad = js_sys::JSON::parse(r#"{ "nodes": 3 }"#).unwrap();
    assert!(decode_highlight(&bad).is_err());

    assert_eq!(decode(channel::SHUTDOWN, &JsValue::NULL).unwrap(), Command::Shutdown);
    assert!(decode("PING", &JsValue::NULL).is_err());
}

#[wasm_bindgen_test]
fn frames_are_probed_without_instanceof() {
    let dom = WebDom::new(document());
    let frame = document().create_element("iframe").unwrap();
    let div = document().create_element("div").unwrap();

    assert!(dom.is_frame(&frame));
    assert!(!dom.is_frame(&div));
    assert!(dom.is_element_node(&div));
    // Detached iframes have no content window.
    assert_eq!(dom.content_view(&frame), Err(FrameError::NoContent));
    assert!(!dom.has_listener_api(&JsValue::from(Object::new())));
    assert!(dom.has_listener_api(&web_sys::window().unwrap().into()));
}

#[wasm_bindgen_test]
fn setup_runs_highlight_and_start_stop() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let config = Object::new();
    set(&config, "overlay", &recording_overlay(Rc::clone(&log)));

    let highlighter = setup_highlighter(config.into()).unwrap();
    assert_eq!(highlighter.subscription_count(), 0);

    let request = js_sys::JSON::parse(r#"{ "nodes": ["body"] }"#).unwrap();
    highlighter.highlight(request).unwrap();
    assert_eq!(*log.borrow(), ["show:1"]);

    highlighter.start(JsValue::UNDEFINED).unwrap();
    assert!(highlighter.is_inspecting());
    highlighter.stop();
    assert!(!highlighter.is_inspecting());
    assert_eq!(log.borrow().last().map(String::as_str), Some("hide"));
}

#[wasm_bindgen_test]
fn bridge_subscribes_to_inbound_channels() {
    let handlers: Rc<RefCell<Vec<(String, Function)>>> = Rc::default();
    let bridge = Object::new();
    let registered = Rc::clone(&handlers);
    let on_message = Closure::<dyn FnMut(String, Function)>::new(move |name: String, handler: Function| {
        registered.borrow_mut().push((name, handler));
    });
    let send_message = Closure::<dyn FnMut(String, JsValue)>::new(|_: String, _: JsValue| {});
    set(&bridge, "onMessage", on_message.as_ref());
    set(&bridge, "sendMessage", send_message.as_ref());
    on_message.forget();
    send_message.forget();

    let config = Object::new();
    set(&config, "overlay", &recording_overlay(Rc::default()));
    set(&config, "bridge", &bridge);
    let highlighter = setup_highlighter(config.into()).unwrap();

    assert_eq!(highlighter.subscription_count(), 5);
    let start = handlers
        .borrow()
        .iter()
        .find(|(name, _)| name == channel::START_INSPECTING)
        .map(|(_, handler)| handler.clone())
        .unwrap();
    start.call1(&JsValue::NULL, &Object::new()).unwrap();
    assert!(highlighter.is_inspecting());
    highlighter.stop();
    assert!(!highlighter.is_inspecting());
}
