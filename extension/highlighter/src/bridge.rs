//! Message bridge to the devtools panel.
//!
//! Wraps a page-supplied `{ onMessage(type, handler), sendMessage(type, data) }`
//! object. Handlers receive `{ data }` messages and get the unwrapped `data`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use inspect::bridge::{next_subscription_id, SubscriptionId};
use inspect::{channel, Command, HighlightRequest, MessageBus, NodeRef, ProtocolError, Subscription};
use js_sys::{Array, Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Element;

use crate::overlay::method;

struct Registration {
    active: Rc<Cell<bool>>,
    callback: Closure<dyn FnMut(JsValue)>,
    unsubscribe: Option<Function>,
}

pub struct JsBridge {
    this: JsValue,
    on_message: Function,
    send_message: Function,
    registrations: Rc<RefCell<HashMap<SubscriptionId, Registration>>>,
}

impl JsBridge {
    pub fn from_js(bridge: &JsValue) -> Result<Self, JsValue> {
        Ok(Self {
            this: bridge.clone(),
            on_message: method(bridge, "onMessage")?,
            send_message: method(bridge, "sendMessage")?,
            registrations: Rc::default(),
        })
    }
}

fn release(registration: Registration) {
    registration.active.set(false);
    match registration.unsubscribe {
        Some(unsubscribe) => {
            let _ = unsubscribe.call0(&JsValue::NULL);
        }
        // Without an unsubscribe function the bridge may still call it.
        None => registration.callback.forget(),
    }
}

impl MessageBus for JsBridge {
    type Payload = JsValue;

    fn on_message(&self, channel: &str, handler: Rc<dyn Fn(&JsValue)>) -> Subscription {
        let id = next_subscription_id();
        let active = Rc::new(Cell::new(true));

        let live = Rc::clone(&active);
        let callback = Closure::<dyn FnMut(JsValue)>::new(move |message: JsValue| {
            if live.get() {
                let data = Reflect::get(&message, &JsValue::from_str("data")).unwrap_or(JsValue::UNDEFINED);
                handler(&data);
            }
        });

        let unsubscribe = match self
            .on_message
            .call2(&self.this, &JsValue::from_str(channel), callback.as_ref())
        {
            Ok(returned) if returned.is_function() => Some(returned.unchecked_into()),
            Ok(_) => None,
            Err(error) => {
                web_sys::console::warn_2(&JsValue::from_str("inspect: onMessage threw"), &error);
                None
            }
        };

        self.registrations.borrow_mut().insert(
            id,
            Registration {
                active,
                callback,
                unsubscribe,
            },
        );

        let registrations = Rc::downgrade(&self.registrations);
        Subscription::new(
            id,
            Rc::new(move |id| {
                let removed = registrations
                    .upgrade()
                    .and_then(|map| map.borrow_mut().remove(&id));
                if let Some(registration) = removed {
                    release(registration);
                }
            }),
        )
    }

    fn post(&self, channel: &str, payload: JsValue) {
        if let Err(error) = self
            .send_message
            .call2(&self.this, &JsValue::from_str(channel), &payload)
        {
            web_sys::console::warn_2(&JsValue::from_str("inspect: sendMessage threw"), &error);
        }
    }
}

impl Drop for JsBridge {
    fn drop(&mut self) {
        for (_, registration) in self.registrations.borrow_mut().drain() {
            release(registration);
        }
    }
}

/// Decodes a bridge payload into a command.
pub fn decode(name: &str, data: &JsValue) -> inspect_protocol::Result<Command<Element>> {
    if name == channel::HIGHLIGHT_ELEMENTS {
        return decode_highlight(data).map(Command::HighlightElements);
    }
    Command::bare(name).ok_or_else(|| ProtocolError::UnknownChannel(name.to_string()))
}

/// Reads `{ nodes: Array<string | Element>, hideAfterTimeout }`. A missing
/// payload is an empty request.
pub fn decode_highlight(data: &JsValue) -> inspect_protocol::Result<HighlightRequest<Element>> {
    let invalid = |reason: &str| ProtocolError::Invalid {
        channel: channel::HIGHLIGHT_ELEMENTS,
        reason: reason.to_string(),
    };

    if data.is_undefined() || data.is_null() {
        return Ok(HighlightRequest::default());
    }

    let nodes = Reflect::get(data, &JsValue::from_str("nodes")).map_err(|_| invalid("unreadable nodes"))?;
    let nodes = if nodes.is_undefined() || nodes.is_null() {
        Vec::new()
    } else if Array::is_array(&nodes) {
        Array::from(&nodes)
            .iter()
            .filter(|node| !node.is_undefined() && !node.is_null())
            .map(|node| match node.as_string() {
                Some(selector) => NodeRef::Selector(selector),
                None => NodeRef::Element(node.unchecked_into()),
            })
            .collect()
    } else {
        return Err(invalid("nodes is not an array"));
    };

    let hide_after_timeout = Reflect::get(data, &JsValue::from_str("hideAfterTimeout"))
        .map(|flag| flag.is_truthy())
        .unwrap_or(false);

    Ok(HighlightRequest::new(nodes).hide_after_timeout(hide_after_timeout))
}
