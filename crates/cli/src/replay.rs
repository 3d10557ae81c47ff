//! Scenario replay.
//!
//! Builds the scenario's document, mounts a session on it with a tracing
//! overlay, a bus connection and a forwarding selection callback, runs every
//! step and reports what the session did. Commands travel through the bus,
//! exactly as a remote panel would send them.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use inspect::memory::{MemoryDom, NodeId};
use inspect::{
	DEFAULT_WINDOW, Dom, EventKind, Inspector, InspectorConfig, LocalBus, ManualScheduler, Overlay, Scheduler,
	SelectionMeta, SelectionOrigin, connect_json, forward_selections,
};
use inspect_protocol::Envelope;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{CliError, Result};
use crate::scenario::{Call, Scenario, SelectorPath, Step};
use crate::scheduler::TokioScheduler;

#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
	/// Sleep for real instead of advancing a virtual clock.
	pub realtime: bool,
	/// Overrides the scenario's debounce window.
	pub window: Option<Duration>,
}

/// One thing the session (or the replay) did, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TraceEntry {
	#[serde(rename_all = "camelCase")]
	Step { at_ms: u64, index: usize, summary: String },
	#[serde(rename_all = "camelCase")]
	Dispatched {
		at_ms: u64,
		kind: EventKindName,
		target: String,
		prevented: bool,
		stopped: bool,
	},
	#[serde(rename_all = "camelCase")]
	Show {
		at_ms: u64,
		elements: Vec<String>,
		hide_after_timeout: bool,
	},
	#[serde(rename_all = "camelCase")]
	Hide { at_ms: u64 },
	#[serde(rename_all = "camelCase")]
	Selection {
		at_ms: u64,
		element: String,
		origin: SelectionOrigin,
	},
	#[serde(rename_all = "camelCase")]
	Mode { at_ms: u64, mode: &'static str },
	#[serde(rename_all = "camelCase")]
	Diagnostic { at_ms: u64, message: String },
}

/// DOM event type as it appears in traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventKindName(pub EventKind);

impl Serialize for EventKindName {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		serializer.serialize_str(self.0.as_str())
	}
}

impl TraceEntry {
	pub fn at_ms(&self) -> u64 {
		match self {
			TraceEntry::Step { at_ms, .. }
			| TraceEntry::Dispatched { at_ms, .. }
			| TraceEntry::Show { at_ms, .. }
			| TraceEntry::Hide { at_ms }
			| TraceEntry::Selection { at_ms, .. }
			| TraceEntry::Mode { at_ms, .. }
			| TraceEntry::Diagnostic { at_ms, .. } => *at_ms,
		}
	}
}

impl fmt::Display for TraceEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:>6}ms  ", self.at_ms())?;
		match self {
			TraceEntry::Step { index, summary, .. } => write!(f, "step {index}: {summary}"),
			TraceEntry::Dispatched {
				kind,
				target,
				prevented,
				stopped,
				..
			} => {
				let fate = match (prevented, stopped) {
					(true, true) => "blocked",
					(true, false) => "prevented",
					(false, true) => "stopped",
					(false, false) => "passed to page",
				};
				write!(f, "  {} on {target}: {fate}", kind.0)
			}
			TraceEntry::Show {
				elements,
				hide_after_timeout,
				..
			} => {
				write!(f, "  overlay show [{}]", elements.join(", "))?;
				if *hide_after_timeout {
					f.write_str(" (auto-hide)")?;
				}
				Ok(())
			}
			TraceEntry::Hide { .. } => f.write_str("  overlay hide"),
			TraceEntry::Selection { element, origin, .. } => write!(f, "  selection {origin}: {element}"),
			TraceEntry::Mode { mode, .. } => write!(f, "  mode -> {mode}"),
			TraceEntry::Diagnostic { message, .. } => write!(f, "  diagnostic: {message}"),
		}
	}
}

/// Result of a replay.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
	pub window_ms: u64,
	pub realtime: bool,
	pub trace: Vec<TraceEntry>,
	/// Mode after the last step settled.
	pub mode: &'static str,
	pub listened_frames: Vec<String>,
	/// Elements outlined at the end, `None` when hidden.
	pub overlay: Option<Vec<String>>,
	/// Messages the session posted on the bus.
	pub posted: Vec<Envelope>,
}

impl ReplayReport {
	/// Delivered selections, in order.
	pub fn selections(&self) -> Vec<(&str, SelectionOrigin)> {
		self.trace
			.iter()
			.filter_map(|entry| match entry {
				TraceEntry::Selection { element, origin, .. } => Some((element.as_str(), *origin)),
				_ => None,
			})
			.collect()
	}

	pub fn diagnostics(&self) -> Vec<&str> {
		self.trace
			.iter()
			.filter_map(|entry| match entry {
				TraceEntry::Diagnostic { message, .. } => Some(message.as_str()),
				_ => None,
			})
			.collect()
	}
}

impl fmt::Display for ReplayReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for entry in &self.trace {
			writeln!(f, "{entry}")?;
		}
		let overlay = match &self.overlay {
			Some(elements) => format!("showing [{}]", elements.join(", ")),
			None => "hidden".to_string(),
		};
		writeln!(
			f,
			"final: {}, overlay {overlay}, {} listened frame(s), {} posted message(s)",
			self.mode,
			self.listened_frames.len(),
			self.posted.len()
		)
	}
}

/// Shared trace sink for the replay's collaborators.
struct Recorder {
	dom: Rc<MemoryDom>,
	clock: Rc<dyn Scheduler>,
	entries: RefCell<Vec<TraceEntry>>,
	visible: RefCell<Option<Vec<NodeId>>>,
}

impl Recorder {
	fn at_ms(&self) -> u64 {
		u64::try_from(self.clock.now().as_millis()).unwrap_or(u64::MAX)
	}

	fn push(&self, entry: TraceEntry) {
		self.entries.borrow_mut().push(entry);
	}

	fn describe(&self, node: NodeId) -> String {
		describe(&self.dom, node)
	}
}

fn describe(dom: &MemoryDom, node: NodeId) -> String {
	let path = dom.css_path(node);
	if path.is_empty() { node.to_string() } else { path }
}

/// Overlay that writes to the trace instead of drawing.
struct TraceOverlay(Rc<Recorder>);

impl Overlay<NodeId> for TraceOverlay {
	fn show(&self, elements: &[NodeId], hide_after_timeout: bool) {
		let recorder = &self.0;
		recorder.push(TraceEntry::Show {
			at_ms: recorder.at_ms(),
			elements: elements.iter().map(|&node| recorder.describe(node)).collect(),
			hide_after_timeout,
		});
		*recorder.visible.borrow_mut() = Some(elements.to_vec());
	}

	fn hide(&self) {
		let recorder = &self.0;
		recorder.push(TraceEntry::Hide {
			at_ms: recorder.at_ms(),
		});
		*recorder.visible.borrow_mut() = None;
	}
}

enum Clock {
	Virtual(Rc<ManualScheduler>),
	Wall(Rc<TokioScheduler>),
}

impl Clock {
	fn scheduler(&self) -> Rc<dyn Scheduler> {
		match self {
			Clock::Virtual(scheduler) => Rc::clone(scheduler) as Rc<dyn Scheduler>,
			Clock::Wall(scheduler) => Rc::clone(scheduler) as Rc<dyn Scheduler>,
		}
	}

	async fn wait(&self, by: Duration) {
		match self {
			Clock::Virtual(scheduler) => {
				let ran = scheduler.advance(by);
				debug!(by = ?by, timers = ran, "advanced virtual clock");
			}
			Clock::Wall(_) => tokio::time::sleep(by).await,
		}
	}
}

/// Replays `scenario`.
///
/// After the last step the clock runs for one more debounce window so a
/// pending selection settles before the report is taken. With
/// `options.realtime` set this must run inside a [`tokio::task::LocalSet`].
///
/// # Errors
///
/// Fails on the first step naming an element, frame or event type that does
/// not exist.
pub async fn replay(scenario: &Scenario, options: &ReplayOptions) -> Result<ReplayReport> {
	let dom = Rc::new(MemoryDom::from_fixture(&scenario.document));
	let clock = if options.realtime {
		Clock::Wall(Rc::new(TokioScheduler::new()))
	} else {
		Clock::Virtual(Rc::new(ManualScheduler::new()))
	};
	let window = options
		.window
		.or(scenario.window_ms.map(Duration::from_millis))
		.unwrap_or(DEFAULT_WINDOW);

	let recorder = Rc::new(Recorder {
		dom: Rc::clone(&dom),
		clock: clock.scheduler(),
		entries: RefCell::new(Vec::new()),
		visible: RefCell::new(None),
	});
	let bus = Rc::new(LocalBus::<Value>::new());

	let describer = Rc::clone(&dom);
	let forward = forward_selections(Rc::clone(&bus), move |node: &NodeId, meta: &SelectionMeta| {
		Some(json!({
			"cssPath": describe(&describer, *node),
			"text": describer.text_content(*node),
			"origin": meta.origin,
		}))
	});
	let selection_sink = Rc::clone(&recorder);
	let diagnostic_sink = Rc::clone(&recorder);

	let config = InspectorConfig::new(
		Rc::clone(&dom),
		Rc::new(TraceOverlay(Rc::clone(&recorder))),
		clock.scheduler(),
	)
	.debounce_window(window)
	.on_select_node(move |node, meta| {
		selection_sink.push(TraceEntry::Selection {
			at_ms: selection_sink.at_ms(),
			element: selection_sink.describe(*node),
			origin: meta.origin,
		});
		forward(node, meta);
	})
	.on_diagnostic(move |diagnostic| {
		diagnostic_sink.push(TraceEntry::Diagnostic {
			at_ms: diagnostic_sink.at_ms(),
			message: diagnostic.to_string(),
		});
	});

	let inspector = Inspector::new(config);
	let _connection = connect_json(&*bus, &inspector);
	let mut mode = inspector.mode();

	for (offset, step) in scenario.steps.iter().enumerate() {
		let index = offset + 1;
		let summary = summarize(step);
		info!(step = index, %summary, "replaying");
		recorder.push(TraceEntry::Step {
			at_ms: recorder.at_ms(),
			index,
			summary,
		});

		run_step(index, step, &dom, &inspector, &bus, &clock, &recorder).await?;

		if inspector.mode() != mode {
			mode = inspector.mode();
			recorder.push(TraceEntry::Mode {
				at_ms: recorder.at_ms(),
				mode: mode.as_str(),
			});
		}
	}

	clock.wait(window).await;
	debug!("replay settled");

	let overlay = recorder
		.visible
		.borrow()
		.as_ref()
		.map(|nodes| nodes.iter().map(|&node| recorder.describe(node)).collect());

	Ok(ReplayReport {
		window_ms: u64::try_from(window.as_millis()).unwrap_or(u64::MAX),
		realtime: options.realtime,
		trace: recorder.entries.take(),
		mode: inspector.mode().as_str(),
		listened_frames: inspector
			.listened_frames()
			.into_iter()
			.map(|frame| recorder.describe(frame))
			.collect(),
		overlay,
		posted: bus
			.take_posted()
			.into_iter()
			.map(|(channel, data)| Envelope::new(channel, data))
			.collect(),
	})
}

async fn run_step(
	index: usize,
	step: &Step,
	dom: &MemoryDom,
	inspector: &Inspector<MemoryDom>,
	bus: &LocalBus<Value>,
	clock: &Clock,
	recorder: &Recorder,
) -> Result<()> {
	match step {
		Step::Command(envelope) => {
			bus.deliver(envelope);
		}
		Step::Call { call, options } => match call {
			Call::Start => inspector.start_with(options.unwrap_or_default()),
			Call::Stop => inspector.stop(),
			Call::Clear => inspector.clear(),
		},
		Step::Event { kind, target, frame } => {
			let event = EventKind::parse(kind).ok_or_else(|| CliError::UnknownEvent {
				step: index,
				kind: kind.clone(),
			})?;
			let node = resolve(dom, index, frame, Some(target))?;
			let outcome = dom.dispatch(event, node);
			recorder.push(TraceEntry::Dispatched {
				at_ms: recorder.at_ms(),
				kind: EventKindName(event),
				target: recorder.describe(node),
				prevented: outcome.default_prevented,
				stopped: outcome.propagation_stopped,
			});
		}
		Step::Wait { ms } => clock.wait(Duration::from_millis(*ms)).await,
		Step::Navigate { frame, origin } => {
			let node = resolve(dom, index, frame, None)?;
			if !dom.is_frame(&node) {
				return Err(CliError::NotAFrame {
					step: index,
					selector: frame.to_string(),
				});
			}
			dom.navigate_frame(node, origin);
		}
	}
	Ok(())
}

fn resolve(dom: &MemoryDom, index: usize, frame: &SelectorPath, target: Option<&str>) -> Result<NodeId> {
	let mut path = frame.segments();
	path.extend(target);
	dom.resolve_path(&path).ok_or_else(|| CliError::UnresolvedTarget {
		step: index,
		selector: path.join(" >>> "),
	})
}

fn summarize(step: &Step) -> String {
	match step {
		Step::Command(envelope) if envelope.data.is_null() => format!("command {}", envelope.channel),
		Step::Command(envelope) => format!("command {} {}", envelope.channel, envelope.data),
		Step::Call {
			call,
			options: Some(options),
		} => format!(
			"call {} (stopOnClick={}, blockEvents={})",
			call.as_str(),
			options.stop_on_click,
			options.block_events
		),
		Step::Call { call, options: None } => format!("call {}", call.as_str()),
		Step::Event { kind, target, frame } if frame.is_empty() => format!("event {kind} {target}"),
		Step::Event { kind, target, frame } => format!("event {kind} {frame} >>> {target}"),
		Step::Wait { ms } => format!("wait {ms}ms"),
		Step::Navigate { frame, origin } => format!("navigate {frame} to {origin}"),
	}
}
