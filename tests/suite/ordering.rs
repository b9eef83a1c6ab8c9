//! Lightweight threads resume in the order their values arrive

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use retro::EventLoop;

use crate::common::{
    DELAYED_RESULT, SERVER_DELAY, Shown, VALUES_RESULT, display, retro_for,
    start_narrative_server,
};

#[test]
fn faster_value_is_displayed_first() {
    let event_loop = EventLoop::new().unwrap();
    let server = event_loop.block_on(start_narrative_server());
    let retro = retro_for(&server);
    let channel = retro.channel();
    let shown: Shown = Rc::new(RefCell::new(Vec::new()));

    event_loop.block_on(async {
        display(
            &event_loop,
            &shown,
            "Delayed values: ",
            channel.get_str("delayedvalues"),
        );
        display(&event_loop, &shown, "values: ", channel.get_str("values"));
    });
    event_loop.run();

    assert_eq!(
        *shown.borrow(),
        vec![
            format!("values: {VALUES_RESULT}"),
            format!("Delayed values: {DELAYED_RESULT}"),
        ]
    );
}

#[test]
fn issuing_requests_does_not_wait_for_responses() {
    let event_loop = EventLoop::new().unwrap();
    let server = event_loop.block_on(start_narrative_server());
    let retro = retro_for(&server);
    let channel = retro.channel();

    let started = Instant::now();
    let delayed = event_loop.block_on(async { channel.get_str("delayedvalues") });
    assert!(started.elapsed() < SERVER_DELAY);
    assert!(delayed.is_pending());

    let value = event_loop.block_on(delayed.read()).unwrap();
    assert_eq!(value, DELAYED_RESULT);
    assert!(started.elapsed() >= SERVER_DELAY);
}

#[test]
fn read_of_resolved_future_does_not_suspend() {
    let event_loop = EventLoop::new().unwrap();
    let server = event_loop.block_on(start_narrative_server());
    let retro = retro_for(&server);
    let channel = retro.channel();

    let values = event_loop.block_on(async {
        let values = channel.get_str("values");
        values.read().await.unwrap();
        values
    });

    assert_eq!(values.try_read(), Some(Ok(VALUES_RESULT.into())));
}
