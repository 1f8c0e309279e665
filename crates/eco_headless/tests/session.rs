//! Owner and consumer threads talking over real channels.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use eco_core::control::ControlMessage;
use eco_headless::config::HeadlessConfig;
use eco_headless::consumer::Consumer;
use eco_headless::owner::Owner;
use eco_headless::protocol::{Event, SnapshotKind};
use eco_headless::session::Session;
use eco_test_utils::fixtures::small_sim;

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    fn events(&self) -> Vec<Event> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| Event::from_json(line).unwrap())
            .collect()
    }
}

#[test]
fn test_session_runs_to_frame_limit() {
    let out = SharedBuf::default();
    let config = HeadlessConfig {
        frame_ms: 2,
        max_frames: 10,
        ..HeadlessConfig::default()
    };

    let session = Session::spawn(small_sim(1), &config, out.clone()).unwrap();
    let (owner, consumer) = session.join().unwrap();

    assert_eq!(owner.frames, 10);
    assert_eq!(consumer.applied, owner.sent);
    assert_eq!(consumer.rejected, 0);

    let events = out.events();
    let Some(Event::Snapshot(first)) = events.first() else {
        panic!("expected a snapshot first, got {events:?}");
    };
    assert_eq!(first.kind, SnapshotKind::Full);
    assert_eq!(first.populations.agents, 24);
}

#[test]
fn test_paused_session_quits_on_request() {
    let out = SharedBuf::default();
    let config = HeadlessConfig {
        frame_ms: 1,
        start_paused: true,
        ..HeadlessConfig::default()
    };

    let session = Session::spawn(small_sim(2), &config, out.clone()).unwrap();
    session.control().send(ControlMessage::Quit).unwrap();
    let (owner, _) = session.join().unwrap();

    assert_eq!(owner.steps, 0);
    assert_eq!(owner.tick, 0);
}

#[test]
fn test_lost_delta_recovers_with_full() {
    // Drive both sides by hand so the dropped message is deterministic
    let (control_tx, control_rx) = std::sync::mpsc::channel();
    let mut owner = Owner::new(small_sim(3));
    let mut consumer = Consumer::new(control_tx);
    let mut now = 0.0;
    let mut dropped = false;
    let mut kinds = Vec::new();

    for _ in 0..40 {
        now += 16.0;
        owner.drain(&control_rx);
        let (_, snapshot) = owner.frame(16.0, now);
        let Some(message) = snapshot else { continue };
        if !dropped && !message.is_full() {
            dropped = true;
            continue;
        }
        if let Some(event) = consumer.receive(&message.to_bytes().unwrap()) {
            kinds.push(event);
        }
    }

    assert!(dropped);
    assert_eq!(consumer.summary().resyncs, 1);
    let resync_at = kinds
        .iter()
        .position(|e| matches!(e, Event::Resync { .. }))
        .unwrap();
    let recovered = kinds[resync_at + 1..]
        .iter()
        .find_map(|e| match e {
            Event::Snapshot(s) => Some(s.kind),
            _ => None,
        })
        .unwrap();
    assert_eq!(recovered, SnapshotKind::Full);

    // One more delta after the rate limit brings the mirror up to date
    let (_, last) = owner.frame(0.0, now + 100.0);
    consumer.receive(&last.unwrap().to_bytes().unwrap());
    assert_eq!(
        consumer.mirror().components(),
        eco_core::snapshot::ComponentLists::capture(owner.sim().store())
    );
}
