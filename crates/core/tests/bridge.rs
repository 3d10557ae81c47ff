mod common;

use std::rc::Rc;

use common::{Harness, ORIGIN};
use inspect::memory::{MemoryDom, NodeId};
use inspect::{
	Diagnostic, Envelope, EventKind, Inspector, InspectorConfig, LocalBus, ManualScheduler, Mode, OverlayCall,
	RecordingOverlay, SelectionMeta, channel, connect_json, forward_selections,
};
use serde_json::{Value, json};

#[test]
fn envelopes_drive_a_full_session() {
	let bus = LocalBus::<Value>::new();
	let h = Harness::new(MemoryDom::new(ORIGIN));
	let button = h.dom.append_element(h.dom.body(), "button");
	h.dom.set_attribute(button, "id", "go");
	let _connection = connect_json(&bus, &h.inspector);

	let highlight: Envelope =
		serde_json::from_value(json!({ "type": "HIGHLIGHT_ELEMENTS", "data": { "nodes": ["#go"] } })).unwrap();
	assert_eq!(bus.deliver(&highlight), 1);
	assert_eq!(h.overlay.visible(), Some(vec![button]));

	bus.deliver(&Envelope::new(channel::START_INSPECTING, Value::Null));
	assert_eq!(h.inspector.mode(), Mode::Inspecting);

	// ignored while inspecting
	bus.deliver(&Envelope::new(channel::HIGHLIGHT_ELEMENTS, json!({ "nodes": [] })));
	assert_eq!(h.overlay.visible(), Some(vec![button]));

	bus.deliver(&Envelope::new(channel::STOP_INSPECTING, Value::Null));
	assert_eq!(h.inspector.mode(), Mode::Idle);
	assert_eq!(h.overlay.last_call(), Some(OverlayCall::Hide));
}

#[test]
fn handles_travel_as_node_ids() {
	let bus = LocalBus::<Value>::new();
	let h = Harness::new(MemoryDom::new(ORIGIN));
	let first = h.dom.append_element(h.dom.body(), "p");
	let second = h.dom.append_element(h.dom.body(), "p");
	let _connection = connect_json(&bus, &h.inspector);

	bus.publish(
		channel::HIGHLIGHT_ELEMENTS,
		json!({ "nodes": [first.0, second.0], "hideAfterTimeout": true }),
	);

	assert_eq!(
		h.overlay.last_call(),
		Some(OverlayCall::Show {
			elements: vec![first, second],
			hide_after_timeout: true,
		})
	);
}

#[test]
fn bad_entries_are_dropped_and_the_rest_shown() {
	let bus = LocalBus::<Value>::new();
	let h = Harness::new(MemoryDom::new(ORIGIN));
	let submit = h.dom.append_element(h.dom.body(), "button");
	h.dom.set_attribute(submit, "id", "submit");
	let _connection = connect_json(&bus, &h.inspector);

	let expected = OverlayCall::Show {
		elements: vec![submit],
		hide_after_timeout: false,
	};

	bus.publish(channel::HIGHLIGHT_ELEMENTS, json!({ "nodes": ["#submit", null] }));
	assert_eq!(h.overlay.last_call(), Some(expected.clone()));

	h.inspector.clear();
	bus.publish(channel::HIGHLIGHT_ELEMENTS, json!({ "nodes": ["#submit", { "nodeType": 3 }] }));
	assert_eq!(h.overlay.last_call(), Some(expected));
	assert!(h.diagnostics().is_empty());
}

#[test]
fn malformed_payload_is_reported_and_hides() {
	let bus = LocalBus::<Value>::new();
	let h = Harness::new(MemoryDom::new(ORIGIN));
	let _connection = connect_json(&bus, &h.inspector);

	bus.publish(channel::HIGHLIGHT_ELEMENTS, json!("not an object"));

	assert_eq!(h.overlay.calls(), [OverlayCall::Hide]);
	assert!(matches!(
		h.diagnostics().as_slice(),
		[Diagnostic::MalformedPayload { channel, .. }] if channel == "HIGHLIGHT_ELEMENTS"
	));
}

#[test]
fn messages_after_session_drop_are_ignored() {
	let bus = LocalBus::<Value>::new();
	let dom = Rc::new(MemoryDom::new(ORIGIN));
	let overlay = Rc::new(RecordingOverlay::<NodeId>::new());
	let inspector = Inspector::new(InspectorConfig::new(
		dom.clone(),
		overlay.clone(),
		Rc::new(ManualScheduler::new()),
	));
	let connection = connect_json(&bus, &inspector);
	drop(inspector);

	assert_eq!(bus.publish(channel::START_INSPECTING, Value::Null), 1);
	assert_eq!(bus.publish(channel::CLEAR_HIGHLIGHTS, Value::Null), 1);
	assert!(overlay.calls().is_empty());
	assert_eq!(dom.total_listeners(), 0);
	drop(connection);
}

#[test]
fn dropping_connection_unsubscribes_every_channel() {
	let bus = LocalBus::<Value>::new();
	let h = Harness::new(MemoryDom::new(ORIGIN));
	let connection = connect_json(&bus, &h.inspector);
	drop(connection);

	for name in channel::INBOUND {
		assert_eq!(bus.subscriber_count(name), 0);
		assert_eq!(bus.publish(name, Value::Null), 0);
	}
	assert!(h.overlay.calls().is_empty());
}

#[test]
fn settled_selections_are_forwarded_by_origin() {
	let bus = Rc::new(LocalBus::<Value>::new());
	let dom = Rc::new(MemoryDom::new(ORIGIN));
	let form = dom.append_element(dom.body(), "form");
	dom.set_attribute(form, "id", "login");
	let input = dom.append_element(form, "input");
	let scheduler = Rc::new(ManualScheduler::new());

	let describer = Rc::clone(&dom);
	let inspector = Inspector::new(
		InspectorConfig::new(dom.clone(), Rc::new(RecordingOverlay::new()), scheduler.clone()).on_select_node(
			forward_selections(Rc::clone(&bus), move |element: &NodeId, meta: &SelectionMeta| {
				Some(json!({ "cssPath": describer.css_path(*element), "origin": meta.origin }))
			}),
		),
	);
	let _connection = connect_json(&*bus, &inspector);

	bus.publish(channel::START_INSPECTING, Value::Null);
	dom.dispatch(EventKind::PointerOver, input);
	scheduler.advance_ms(200);
	dom.dispatch(EventKind::PointerDown, input);
	dom.dispatch(EventKind::Click, input);
	scheduler.advance_ms(200);

	let posted = bus.take_posted();
	let channels: Vec<&str> = posted.iter().map(|(name, _)| name.as_str()).collect();
	assert_eq!(channels, [channel::HOVER_NODE, channel::SELECT_NODE]);
	assert_eq!(posted[1].1["cssPath"], "form#login > input");
	assert_eq!(posted[1].1["origin"], "click");
	assert_eq!(inspector.mode(), Mode::Idle);
}
