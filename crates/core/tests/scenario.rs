mod common;

use common::{Harness, ORIGIN, page_with_frame};
use inspect::{EventKind, Mode, OverlayCall, SelectionOrigin};

/// One same-origin iframe with a button: hover the frame, then the button
/// inside it, wait for the window, then click.
#[test]
fn hover_into_frame_then_click() {
	let (dom, frame, button) = page_with_frame(ORIGIN);
	let h = Harness::new(dom);
	h.inspector.start();

	h.dom.dispatch(EventKind::PointerOver, frame);
	h.scheduler.advance_ms(30);
	let inner = h.dom.dispatch(EventKind::PointerOver, button);
	assert_eq!(inner.listeners_run, 1, "listener extended into the frame");
	assert_eq!(h.overlay.visible(), Some(vec![button]));

	h.scheduler.advance_ms(199);
	assert_eq!(h.selections(), [(button, SelectionOrigin::Hover)]);

	h.dom.dispatch(EventKind::Click, button);
	assert_eq!(h.inspector.mode(), Mode::Idle);
	assert_eq!(h.overlay.last_call(), Some(OverlayCall::Hide));
	assert!(h.inspector.listened_frames().is_empty());
	assert_eq!(h.dom.total_listeners(), 0);

	h.scheduler.advance_ms(1_000);
	assert_eq!(h.selections().len(), 1);
}

#[test]
fn burst_of_hovers_settles_on_last() {
	let dom = inspect::memory::MemoryDom::new(ORIGIN);
	let a = dom.append_element(dom.body(), "li");
	let b = dom.append_element(dom.body(), "li");
	let h = Harness::new(dom);
	h.inspector.start();

	h.dom.dispatch(EventKind::PointerOver, a);
	h.scheduler.advance_ms(20);
	h.dom.dispatch(EventKind::PointerOver, a);
	h.scheduler.advance_ms(20);
	h.dom.dispatch(EventKind::PointerOver, b);
	h.scheduler.advance_ms(500);

	assert_eq!(h.selections(), [(b, SelectionOrigin::Hover)]);
}

#[test]
fn same_target_after_quiet_window_is_reported_again() {
	let dom = inspect::memory::MemoryDom::new(ORIGIN);
	let a = dom.append_element(dom.body(), "li");
	let h = Harness::new(dom);
	h.inspector.start();

	h.dom.dispatch(EventKind::PointerOver, a);
	h.scheduler.advance_ms(250);
	h.dom.dispatch(EventKind::PointerOver, a);
	h.scheduler.advance_ms(250);

	assert_eq!(h.selections().len(), 2);
}
