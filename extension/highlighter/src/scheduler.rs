use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use inspect::{Scheduler, TimerId};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Performance, Window};

/// [`Scheduler`] on `window.setTimeout`.
pub struct WebScheduler {
    window: Window,
    performance: Option<Performance>,
    next_id: Cell<u64>,
    handles: Rc<RefCell<HashMap<TimerId, i32>>>,
}

impl WebScheduler {
    pub fn new(window: Window) -> Self {
        Self {
            performance: window.performance(),
            window,
            next_id: Cell::new(0),
            handles: Rc::default(),
        }
    }

    pub fn global() -> Option<Self> {
        web_sys::window().map(Self::new)
    }
}

impl Scheduler for WebScheduler {
    fn now(&self) -> Duration {
        let millis = self.performance.as_ref().map_or_else(js_sys::Date::now, Performance::now);
        Duration::from_secs_f64(millis.max(0.0) / 1000.0)
    }

    fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerId {
        let id = TimerId(self.next_id.get() + 1);
        self.next_id.set(id.0);

        let handles = Rc::clone(&self.handles);
        // Freed by the browser once it runs. A cleared timer leaks its closure.
        let callback = Closure::once_into_js(move || {
            handles.borrow_mut().remove(&id);
            task();
        });

        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), millis)
        {
            Ok(handle) => {
                self.handles.borrow_mut().insert(id, handle);
            }
            Err(error) => {
                web_sys::console::warn_2(&JsValue::from_str("inspect: setTimeout failed"), &error);
            }
        }
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        if let Some(handle) = self.handles.borrow_mut().remove(&id) {
            self.window.clear_timeout_with_handle(handle);
        }
    }
}
