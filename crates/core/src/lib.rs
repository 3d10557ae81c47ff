//! inspect: cross-frame DOM inspection and highlight engine
//!
//! Puts a document, including nested and possibly cross-origin iframes, into
//! an inspect mode: pointer input is captured before the page sees it, the
//! element under the pointer is outlined through an [`Overlay`], and settled
//! selections are reported to the host, debounced and deduplicated.
//!
//! The engine never touches a real DOM directly. Hosts implement [`Dom`]
//! (and provide a [`Scheduler`] and an [`Overlay`]); [`memory::MemoryDom`] is
//! the in-memory host used by tests and the CLI.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use inspect::{Inspector, InspectorConfig, ManualScheduler, RecordingOverlay, EventKind};
//! use inspect::memory::MemoryDom;
//!
//! let dom = Rc::new(MemoryDom::new("https://app.test"));
//! let button = dom.append_element(dom.body(), "button");
//! let scheduler = Rc::new(ManualScheduler::new());
//!
//! let inspector = Inspector::new(
//!     InspectorConfig::new(dom.clone(), Rc::new(RecordingOverlay::new()), scheduler.clone())
//!         .on_select_node(|element, meta| println!("{element} via {}", meta.origin)),
//! );
//! inspector.start();
//! dom.dispatch(EventKind::PointerOver, button);
//! scheduler.advance_ms(200); // prints "#7 via hover"
//! ```
//!
//! Remote control goes through [`bridge::connect`], which maps the five
//! inbound channels of a [`bridge::MessageBus`] onto [`Inspector::dispatch`].

pub mod bridge;
pub mod capture;
pub mod config;
pub mod debounce;
pub mod dom;
pub mod error;
pub mod frames;
pub mod memory;
pub mod overlay;
pub mod scheduler;
pub mod session;

pub use bridge::{BridgeConnection, LocalBus, MessageBus, Subscription, connect, connect_json, forward_selections};
pub use config::{DiagnosticHook, InspectorConfig};
pub use debounce::{DEFAULT_WINDOW, Selection, SelectionDebouncer, Throttle};
pub use dom::{Dom, DomEvent, EventKind, Listener, ListenerId};
pub use error::{Diagnostic, FrameError, FrameResult, FrameStage};
pub use frames::{FrameHandle, FrameRegistry};
pub use overlay::{Overlay, OverlayCall, RecordingOverlay};
pub use scheduler::{ManualScheduler, Scheduler, TimerId};
pub use session::{Inspector, Mode, WeakInspector};

pub use inspect_protocol::{
	Command, Envelope, HighlightRequest, NodeRef, ProtocolError, SelectionMeta, SelectionOrigin, StartOptions,
	channel,
};
