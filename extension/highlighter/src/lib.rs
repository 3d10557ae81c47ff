//! In-page highlighter for the inspect devtools panel.
//!
//! ```js
//! import init, { setupHighlighter } from "./inspect_ext_highlighter.js";
//!
//! await init();
//! const highlighter = setupHighlighter({
//!   overlay: { show: (elements, hideAfterTimeout) => draw(elements), hide: () => clear() },
//!   bridge: Bridge,
//!   postSelections: true,
//!   onSelectNode: (element, { origin }) => panel.select(element, origin),
//! });
//! highlighter.start({ stopOnClick: false });
//! ```

mod bridge;
mod dom;
mod overlay;
mod scheduler;

use std::rc::Rc;
use std::time::Duration;

use inspect::{connect, forward_selections, BridgeConnection, Inspector, InspectorConfig, SelectionMeta, StartOptions};
use js_sys::{Function, Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Element;

pub use bridge::{decode, decode_highlight, JsBridge};
pub use dom::{WebDom, WebEvent};
pub use overlay::JsOverlay;
pub use scheduler::WebScheduler;

/// Session handle returned to JavaScript.
#[wasm_bindgen]
pub struct Highlighter {
    inspector: Inspector<WebDom>,
    // Field order: the connection drops before the bridge it subscribes on.
    connection: Option<BridgeConnection>,
    _bridge: Option<Rc<JsBridge>>,
}

#[wasm_bindgen]
impl Highlighter {
    /// Enters inspect mode. `options` is `{ stopOnClick?, blockEvents? }`.
    pub fn start(&self, options: JsValue) -> Result<(), JsValue> {
        let options: StartOptions = if options.is_undefined() || options.is_null() {
            StartOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)?
        };
        self.inspector.start_with(options);
        Ok(())
    }

    pub fn stop(&self) {
        self.inspector.stop();
    }

    pub fn clear(&self) {
        self.inspector.clear();
    }

    /// Outlines `{ nodes, hideAfterTimeout }`.
    pub fn highlight(&self, request: JsValue) -> Result<(), JsValue> {
        let request = decode_highlight(&request).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.inspector.highlight(request);
        Ok(())
    }

    #[wasm_bindgen(getter, js_name = isInspecting)]
    pub fn is_inspecting(&self) -> bool {
        self.inspector.is_inspecting()
    }

    /// Channels the session is subscribed to, `0` without a bridge.
    #[wasm_bindgen(getter, js_name = subscriptionCount)]
    pub fn subscription_count(&self) -> usize {
        self.connection.as_ref().map_or(0, BridgeConnection::len)
    }
}

fn optional(config: &JsValue, name: &str) -> Result<Option<JsValue>, JsValue> {
    if config.is_undefined() || config.is_null() {
        return Ok(None);
    }
    let value = Reflect::get(config, &JsValue::from_str(name))?;
    Ok((!value.is_undefined() && !value.is_null()).then_some(value))
}

fn optional_function(config: &JsValue, name: &str) -> Result<Option<Function>, JsValue> {
    match optional(config, name)? {
        Some(value) if value.is_function() => Ok(Some(value.unchecked_into())),
        Some(_) => Err(JsValue::from_str(&format!("{name} must be a function"))),
        None => Ok(None),
    }
}

/// `{ element, origin }`, posted on `SELECT_NODE` / `HOVER_NODE`.
fn selection_payload(element: &Element, meta: &SelectionMeta) -> Result<JsValue, JsValue> {
    let payload = Object::new();
    Reflect::set(&payload, &JsValue::from_str("element"), element)?;
    Reflect::set(&payload, &JsValue::from_str("origin"), &JsValue::from_str(meta.origin.as_str()))?;
    Ok(payload.into())
}

/// Creates a session over the global document.
///
/// `config` is `{ overlay, view?, bridge?, postSelections?, onSelectNode?,
/// onDiagnostic?, debounceMs? }`. Only `overlay` is required; `view` defaults
/// to `window`. With `postSelections` set, settled selections are also posted
/// on the bridge.
#[wasm_bindgen(js_name = setupHighlighter)]
pub fn setup_highlighter(config: JsValue) -> Result<Highlighter, JsValue> {
    console_error_panic_hook::set_once();

    let dom = WebDom::global().ok_or_else(|| JsValue::from_str("no global document"))?;
    let scheduler = WebScheduler::global().ok_or_else(|| JsValue::from_str("no global window"))?;
    let overlay = optional(&config, "overlay")?.ok_or_else(|| JsValue::from_str("overlay is required"))?;

    let mut inspector_config =
        InspectorConfig::new(Rc::new(dom), Rc::new(JsOverlay::from_js(&overlay)?), Rc::new(scheduler));

    if let Some(view) = optional(&config, "view")? {
        inspector_config = inspector_config.view(Some(view));
    }
    if let Some(ms) = optional(&config, "debounceMs")?.and_then(|ms| ms.as_f64()) {
        inspector_config = inspector_config.debounce_window(Duration::from_secs_f64(ms.max(0.0) / 1000.0));
    }
    let bridge = match optional(&config, "bridge")? {
        Some(bridge) => Some(Rc::new(JsBridge::from_js(&bridge)?)),
        None => None,
    };
    let on_select_node = optional_function(&config, "onSelectNode")?;
    let forward = match &bridge {
        Some(bridge) if optional(&config, "postSelections")?.is_some_and(|flag| flag.is_truthy()) => {
            Some(forward_selections(Rc::clone(bridge), |element: &Element, meta: &SelectionMeta| {
                selection_payload(element, meta).ok()
            }))
        }
        _ => None,
    };
    if on_select_node.is_some() || forward.is_some() {
        inspector_config = inspector_config.on_select_node(move |element, meta| {
            if let Some(callback) = &on_select_node {
                let js_meta = serde_wasm_bindgen::to_value(meta).unwrap_or(JsValue::UNDEFINED);
                if let Err(error) = callback.call2(&JsValue::NULL, element, &js_meta) {
                    web_sys::console::error_2(&JsValue::from_str("inspect: onSelectNode threw"), &error);
                }
            }
            if let Some(forward) = &forward {
                forward(element, meta);
            }
        });
    }
    if let Some(callback) = optional_function(&config, "onDiagnostic")? {
        inspector_config = inspector_config.on_diagnostic(move |diagnostic| {
            let _ = callback.call1(&JsValue::NULL, &JsValue::from_str(&diagnostic.to_string()));
        });
    }

    let inspector = Inspector::new(inspector_config);

    let connection = bridge
        .as_ref()
        .map(|bridge| connect(&**bridge, &inspector, decode));

    Ok(Highlighter {
        inspector,
        connection,
        _bridge: bridge,
    })
}
