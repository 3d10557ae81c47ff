use inspect::Overlay;
use js_sys::{Array, Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Element;

/// Overlay drawn by the page script: `{ show(elements, hideAfterTimeout), hide() }`.
pub struct JsOverlay {
    this: JsValue,
    show: Function,
    hide: Function,
}

impl JsOverlay {
    pub fn from_js(overlay: &JsValue) -> Result<Self, JsValue> {
        Ok(Self {
            this: overlay.clone(),
            show: method(overlay, "show")?,
            hide: method(overlay, "hide")?,
        })
    }
}

pub(crate) fn method(target: &JsValue, name: &str) -> Result<Function, JsValue> {
    let value = Reflect::get(target, &JsValue::from_str(name))?;
    if !value.is_function() {
        return Err(JsValue::from_str(&format!("{name} must be a function")));
    }
    Ok(value.unchecked_into())
}

fn report(error: &JsValue) {
    web_sys::console::error_2(&JsValue::from_str("inspect: overlay threw"), error);
}

impl Overlay<Element> for JsOverlay {
    fn show(&self, elements: &[Element], hide_after_timeout: bool) {
        let elements: Array = elements.iter().collect();
        if let Err(error) = self
            .show
            .call2(&self.this, &elements, &JsValue::from_bool(hide_after_timeout))
        {
            report(&error);
        }
    }

    fn hide(&self) {
        if let Err(error) = self.hide.call0(&self.this) {
            report(&error);
        }
    }
}
