//! `Dom` over the live page.
//!
//! Frames live in other JS realms, so nothing here relies on `instanceof`:
//! capabilities are probed with `Reflect` and handles are cast unchecked.

use std::cell::RefCell;
use std::collections::HashMap;

use inspect::{Dom, DomEvent, EventKind, FrameError, FrameResult, Listener, ListenerId};
use js_sys::{Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event};

const ELEMENT_NODE: f64 = 1.0;

pub struct WebDom {
    document: Document,
    // One JS function per engine listener, so removal sees the same reference.
    callbacks: RefCell<HashMap<ListenerId, Closure<dyn FnMut(JsValue)>>>,
}

impl WebDom {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            callbacks: RefCell::new(HashMap::new()),
        }
    }

    /// Host for the global `document`, if there is one.
    pub fn global() -> Option<Self> {
        let document = web_sys::window()?.document()?;
        Some(Self::new(document))
    }

    fn callback(&self, listener: &Listener<WebEvent>) -> JsValue {
        if let Some(callback) = self.callbacks.borrow().get(&listener.id()) {
            return callback.as_ref().clone();
        }

        let handler = listener.clone();
        let callback = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
            handler.call(&WebEvent(event.unchecked_into()));
        });
        let function = callback.as_ref().clone();
        self.callbacks.borrow_mut().insert(listener.id(), callback);
        function
    }

    fn call_listener_api(
        &self,
        view: &JsValue,
        method: &str,
        kind: EventKind,
        listener: &Listener<WebEvent>,
    ) -> FrameResult<()> {
        let api = Reflect::get(view, &JsValue::from_str(method)).map_err(rejected)?;
        if !api.is_function() {
            return Err(FrameError::Rejected(format!("{method} is not a function")));
        }
        let callback = self.callback(listener);
        api.unchecked_into::<Function>()
            .call3(view, &JsValue::from_str(kind.as_str()), &callback, &JsValue::TRUE)
            .map(|_| ())
            .map_err(rejected)
    }
}

fn rejected(error: JsValue) -> FrameError {
    FrameError::Rejected(describe_js_error(&error))
}

pub(crate) fn describe_js_error(error: &JsValue) -> String {
    error
        .as_string()
        .or_else(|| js_sys::JSON::stringify(error).ok()?.as_string())
        .unwrap_or_else(|| format!("{error:?}"))
}

fn property(target: &JsValue, name: &str) -> JsValue {
    Reflect::get(target, &JsValue::from_str(name)).unwrap_or(JsValue::UNDEFINED)
}

fn is_element(value: &JsValue) -> bool {
    property(value, "nodeType").as_f64() == Some(ELEMENT_NODE)
}

/// Event wrapper handed to the engine.
pub struct WebEvent(Event);

impl DomEvent for WebEvent {
    type Element = Element;

    fn kind(&self) -> Option<EventKind> {
        EventKind::parse(&self.0.type_())
    }

    fn target(&self) -> Option<Element> {
        let target: JsValue = self.0.target()?.into();
        is_element(&target).then(|| target.unchecked_into())
    }

    fn prevent_default(&self) {
        self.0.prevent_default();
    }

    fn stop_propagation(&self) {
        self.0.stop_propagation();
    }
}

impl Dom for WebDom {
    type Element = Element;
    type View = JsValue;
    type Event = WebEvent;

    fn default_view(&self) -> Option<JsValue> {
        web_sys::window().map(JsValue::from)
    }

    fn has_listener_api(&self, view: &JsValue) -> bool {
        !view.is_undefined()
            && !view.is_null()
            && property(view, "addEventListener").is_function()
            && property(view, "removeEventListener").is_function()
    }

    fn add_listener(&self, view: &JsValue, kind: EventKind, listener: &Listener<WebEvent>) -> FrameResult<()> {
        self.call_listener_api(view, "addEventListener", kind, listener)
    }

    fn remove_listener(&self, view: &JsValue, kind: EventKind, listener: &Listener<WebEvent>) -> FrameResult<()> {
        self.call_listener_api(view, "removeEventListener", kind, listener)
    }

    fn is_frame(&self, element: &Element) -> bool {
        property(element, "tagName").as_string().as_deref() == Some("IFRAME")
    }

    fn content_view(&self, frame: &Element) -> FrameResult<JsValue> {
        let window = property(frame, "contentWindow");
        if window.is_undefined() || window.is_null() {
            return Err(FrameError::NoContent);
        }
        // Reading `document` throws a SecurityError across origins.
        if Reflect::get(&window, &JsValue::from_str("document")).is_err() {
            return Err(FrameError::CrossOrigin {
                origin: frame.get_attribute("src").unwrap_or_default(),
            });
        }
        Ok(window)
    }

    fn is_element_node(&self, element: &Element) -> bool {
        is_element(element)
    }

    fn query_selector(&self, selector: &str) -> Option<Element> {
        self.document.query_selector(selector).ok().flatten()
    }
}
