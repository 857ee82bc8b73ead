//! Client facade tests driven through a mock engine.
//!
//! The mock stands in for libmosquitto: it counts handle creations and
//! teardowns, records every request, assigns message ids, and lets the test
//! fire engine events into the sink the client bound.

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mosq_rs::engine::{ConnectOptions, Engine, EventSink};
use mosq_rs::{
    Client, ClientSettings, Error, EventHandler, Message, MessageId, QoS, Result, Status, Topic,
};

/// Shared half of the mock engine, kept by the test to fire events and
/// inspect what the client asked for.
#[derive(Default)]
struct MockShared {
    inits: AtomicUsize,
    cleanups: AtomicUsize,
    next_mid: AtomicI32,
    fail_code: Mutex<Option<i32>>,
    requests: Mutex<Vec<String>>,
    sink: Mutex<Option<Arc<dyn EventSink>>>,
}

impl MockShared {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates one engine handle, counting it as a library init.
    fn engine(self: &Arc<Self>) -> Box<dyn Engine> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        Box::new(MockEngine {
            shared: Arc::clone(self),
        })
    }

    fn live_handles(&self) -> usize {
        self.inits.load(Ordering::SeqCst) - self.cleanups.load(Ordering::SeqCst)
    }

    /// Makes every subsequent request fail with the given engine code.
    fn fail_with(&self, code: i32) {
        *self.fail_code.lock().unwrap() = Some(code);
    }

    fn outcome(&self) -> Result<()> {
        match *self.fail_code.lock().unwrap() {
            Some(code) => Err(Error::engine(code, "mock failure")),
            None => Ok(()),
        }
    }

    fn record(&self, request: String) {
        self.requests.lock().unwrap().push(request);
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn sink(&self) -> Arc<dyn EventSink> {
        self.sink
            .lock()
            .unwrap()
            .clone()
            .expect("client never bound a sink")
    }

    fn fire_connected(&self, rc: i32) {
        self.sink().on_connected(rc);
    }

    fn fire_disconnected(&self, rc: i32) {
        self.sink().on_disconnected(rc);
    }

    fn fire_message(&self, topic: &str, payload: &[u8]) {
        self.sink()
            .on_message(Message::new(topic, payload, QoS::AtMostOnce, false, 1));
    }
}

struct MockEngine {
    shared: Arc<MockShared>,
}

impl MockEngine {
    fn next_mid(&self) -> MessageId {
        self.shared.next_mid.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Engine for MockEngine {
    fn bind(&mut self, sink: Arc<dyn EventSink>) {
        *self.shared.sink.lock().unwrap() = Some(sink);
    }

    fn connect(&mut self, options: &ConnectOptions) -> Result<()> {
        self.shared.outcome()?;
        self.shared
            .record(format!("connect {}:{}", options.address, options.port));
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.shared.outcome()?;
        self.shared.record("start".to_string());
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.shared.outcome()?;
        self.shared.record("disconnect".to_string());
        Ok(())
    }

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<MessageId> {
        self.shared.outcome()?;
        let mid = self.next_mid();
        self.shared
            .record(format!("subscribe {} qos{}", topic, qos.value()));
        Ok(mid)
    }

    fn unsubscribe(&mut self, topic: &str) -> Result<MessageId> {
        self.shared.outcome()?;
        let mid = self.next_mid();
        self.shared.record(format!("unsubscribe {}", topic));
        Ok(mid)
    }

    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<MessageId> {
        self.shared.outcome()?;
        let mid = self.next_mid();
        self.shared.record(format!(
            "publish {} {}b qos{} retain={}",
            topic,
            payload.len(),
            qos.value(),
            retain
        ));
        Ok(mid)
    }

    fn library_version(&self) -> [i32; 3] {
        [2, 0, 18]
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        self.shared.cleanups.fetch_add(1, Ordering::SeqCst);
    }
}

/// Generic handler that records every event it receives.
struct RecordingHandler {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventHandler for RecordingHandler {
    fn on_connected(&self, rc: i32) {
        self.events.lock().unwrap().push(format!("connected {}", rc));
    }

    fn on_disconnected(&self, rc: i32) {
        self.events
            .lock()
            .unwrap()
            .push(format!("disconnected {}", rc));
    }

    fn on_published(&self, mid: MessageId) {
        self.events.lock().unwrap().push(format!("published {}", mid));
    }

    fn on_subscribed(&self, mid: MessageId, granted_qos: &[i32]) {
        self.events
            .lock()
            .unwrap()
            .push(format!("subscribed {} {:?}", mid, granted_qos));
    }

    fn on_unsubscribed(&self, mid: MessageId) {
        self.events
            .lock()
            .unwrap()
            .push(format!("unsubscribed {}", mid));
    }

    fn on_message(&self, message: Message<'_>) {
        self.events.lock().unwrap().push(format!(
            "message {}:{}",
            message.topic,
            String::from_utf8_lossy(message.payload)
        ));
    }
}

fn recording_client(
    shared: &Arc<MockShared>,
    settings: ClientSettings,
) -> (Client, Arc<Mutex<Vec<String>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let handler = Box::new(RecordingHandler {
        events: events.clone(),
    });
    let client = Client::with_engine(settings, handler, |_| Ok(shared.engine()));
    (client, events)
}

fn events_of(events: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    events.lock().unwrap().clone()
}

#[test]
fn test_construction_accepts_empty_and_short_client_ids() {
    for id in ["", "a", "abcdefghijklmnopqrstuvw"] {
        let shared = MockShared::new();
        let (client, _) = recording_client(&shared, ClientSettings::new(id));
        assert_eq!(client.status(), Status::Disconnected, "id {:?}", id);
        assert!(client.last_error().is_none());
        assert_eq!(shared.live_handles(), 1);
    }
}

#[test]
fn test_construction_rejects_long_client_id() {
    let shared = MockShared::new();
    let (mut client, _) =
        recording_client(&shared, ClientSettings::new("abcdefghijklmnopqrstuvwx"));

    assert_eq!(client.status(), Status::InDefect);
    assert!(matches!(
        client.last_error(),
        Some(Error::InvalidArgument(_))
    ));
    // The engine factory never ran.
    assert_eq!(shared.inits.load(Ordering::SeqCst), 0);

    // Every engine interaction now fails fast.
    let err = client.connect(&ConnectOptions::default()).unwrap_err();
    assert!(matches!(err, Error::NotInitialized));
    let err = client
        .publish(&Topic::new("t"), "x", QoS::AtMostOnce)
        .unwrap_err();
    assert!(matches!(err, Error::NotInitialized));
}

#[test]
fn test_engine_construction_failure_leaves_client_in_defect() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let handler = Box::new(RecordingHandler {
        events: events.clone(),
    });
    let client = Client::with_engine(ClientSettings::default(), handler, |_| {
        Err(Error::EngineInitFailed("mock refused".to_string()))
    });
    assert_eq!(client.status(), Status::InDefect);
    assert!(matches!(
        client.last_error(),
        Some(Error::EngineInitFailed(_))
    ));
}

#[test]
fn test_publish_rejects_empty_topic_regardless_of_payload() {
    let shared = MockShared::new();
    let (mut client, _) = recording_client(&shared, ClientSettings::default());

    for payload in [&b""[..], &b"data"[..]] {
        let err = client
            .publish(&Topic::new(""), payload, QoS::AtLeastOnce)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
    assert!(shared.requests().is_empty());
}

#[test]
fn test_publish_accepts_empty_payload() {
    let shared = MockShared::new();
    let (mut client, _) = recording_client(&shared, ClientSettings::default());

    client
        .publish(&Topic::new("t"), b"", QoS::AtMostOnce)
        .unwrap();
    assert_eq!(shared.requests(), vec!["publish t 0b qos0 retain=false"]);
}

#[test]
fn test_publish_forwards_retain_flag_and_payload_types() {
    let shared = MockShared::new();
    let (mut client, _) = recording_client(&shared, ClientSettings::default());

    client
        .publish(&Topic::retained("status"), "online", QoS::AtLeastOnce)
        .unwrap();
    client
        .publish(&Topic::new("data"), vec![1u8, 2, 3], QoS::ExactlyOnce)
        .unwrap();
    assert_eq!(
        shared.requests(),
        vec![
            "publish status 6b qos1 retain=true",
            "publish data 3b qos2 retain=false",
        ]
    );
}

#[test]
fn test_connect_submits_request_then_starts_loop() {
    let shared = MockShared::new();
    let (mut client, _) = recording_client(&shared, ClientSettings::default());

    client
        .connect(&ConnectOptions::new("broker.local").port(8883))
        .unwrap();
    assert_eq!(shared.requests(), vec!["connect broker.local:8883", "start"]);
    // Request accepted does not mean connected.
    assert_eq!(client.status(), Status::Disconnected);
}

#[test]
fn test_connect_is_noop_when_already_connected() {
    let shared = MockShared::new();
    let (mut client, _) = recording_client(&shared, ClientSettings::default());

    client.connect(&ConnectOptions::default()).unwrap();
    shared.fire_connected(0);
    assert_eq!(client.status(), Status::Connected);

    client.connect(&ConnectOptions::default()).unwrap();
    assert_eq!(shared.requests().len(), 2);
}

#[test]
fn test_status_follows_engine_events_not_requests() {
    let shared = MockShared::new();
    let (client, _) = recording_client(&shared, ClientSettings::default());

    assert_eq!(client.status(), Status::Disconnected);
    // A refused connection leaves the status alone.
    shared.fire_connected(5);
    assert_eq!(client.status(), Status::Disconnected);
    shared.fire_connected(0);
    assert_eq!(client.status(), Status::Connected);
    shared.fire_disconnected(0);
    assert_eq!(client.status(), Status::Disconnected);
}

#[test]
fn test_connection_closure_preferred_over_handler() {
    let shared = MockShared::new();
    let (mut client, events) = recording_client(&shared, ClientSettings::default());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in_closure = seen.clone();
    client
        .connect_with(
            &ConnectOptions::default(),
            Some(Box::new(move |rc| {
                seen_in_closure.lock().unwrap().push(rc);
            })),
            None,
        )
        .unwrap();

    shared.fire_connected(0);
    assert_eq!(*seen.lock().unwrap(), vec![0]);
    assert!(events_of(&events).is_empty());
}

#[test]
fn test_disconnect_clears_stored_closures() {
    let shared = MockShared::new();
    let (mut client, events) = recording_client(&shared, ClientSettings::default());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in_closure = seen.clone();
    client
        .connect_with(
            &ConnectOptions::default(),
            Some(Box::new(move |rc| {
                seen_in_closure.lock().unwrap().push(rc);
            })),
            None,
        )
        .unwrap();

    shared.fire_connected(0);
    shared.fire_disconnected(0);
    // No disconnection closure was stored, so the handler reported it.
    assert_eq!(events_of(&events), vec!["disconnected 0"]);

    // The stale connection closure must not fire on a later reconnect.
    shared.fire_connected(0);
    assert_eq!(*seen.lock().unwrap(), vec![0]);
    assert_eq!(events_of(&events), vec!["disconnected 0", "connected 0"]);
}

#[test]
fn test_reception_callback_invoked_exactly_once_per_message() {
    let shared = MockShared::new();
    let (mut client, events) = recording_client(&shared, ClientSettings::default());

    let hits = Arc::new(AtomicUsize::new(0));
    let hits_in_callback = hits.clone();
    let mut topic = Topic::new("t");
    client
        .subscribe_with(
            &mut topic,
            QoS::AtLeastOnce,
            Box::new(move |_msg| {
                hits_in_callback.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

    shared.fire_message("t", b"payload");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(events_of(&events).is_empty());
}

#[test]
fn test_subscribe_stores_engine_assigned_id() {
    let shared = MockShared::new();
    let (mut client, _) = recording_client(&shared, ClientSettings::default());

    let mut first = Topic::new("a");
    let mut second = Topic::new("b");
    client.subscribe(&mut first, QoS::AtMostOnce).unwrap();
    client.subscribe(&mut second, QoS::AtMostOnce).unwrap();
    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);
}

#[test]
fn test_subscribe_rejects_empty_topic() {
    let shared = MockShared::new();
    let (mut client, _) = recording_client(&shared, ClientSettings::default());

    let mut topic = Topic::new("");
    let err = client.subscribe(&mut topic, QoS::AtMostOnce).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    let err = client.unsubscribe(&mut topic).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_unsubscribe_removes_reception_callback() {
    let shared = MockShared::new();
    let (mut client, events) = recording_client(&shared, ClientSettings::default());

    let mut topic = Topic::new("t");
    client
        .subscribe_with(&mut topic, QoS::AtMostOnce, Box::new(|_msg| {}))
        .unwrap();
    client.unsubscribe(&mut topic).unwrap();

    shared.fire_message("t", b"late");
    assert_eq!(events_of(&events), vec!["message t:late"]);
}

#[test]
fn test_connected_event_clears_reception_callbacks() {
    let shared = MockShared::new();
    let (mut client, events) = recording_client(&shared, ClientSettings::default());

    let hits = Arc::new(AtomicUsize::new(0));
    let hits_in_callback = hits.clone();
    let mut topic = Topic::new("t");
    client
        .subscribe_with(
            &mut topic,
            QoS::AtMostOnce,
            Box::new(move |_msg| {
                hits_in_callback.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

    // A fresh connection means the old subscription's callback is gone and
    // re-subscription is required.
    shared.fire_connected(0);
    shared.fire_message("t", b"after-reconnect");

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(
        events_of(&events),
        vec!["connected 0", "message t:after-reconnect"]
    );
}

#[test]
fn test_unregistered_topic_falls_through_to_handler_unmodified() {
    let shared = MockShared::new();
    let (_client, events) = recording_client(&shared, ClientSettings::default());

    shared.fire_message("other/topic", b"raw bytes");
    assert_eq!(events_of(&events), vec!["message other/topic:raw bytes"]);
}

#[test]
fn test_exact_match_only_no_wildcard_expansion() {
    let shared = MockShared::new();
    let (mut client, events) = recording_client(&shared, ClientSettings::default());

    let hits = Arc::new(AtomicUsize::new(0));
    let hits_in_callback = hits.clone();
    let mut filter = Topic::new("sensors/+/temperature");
    client
        .subscribe_with(
            &mut filter,
            QoS::AtMostOnce,
            Box::new(move |_msg| {
                hits_in_callback.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

    // The broker matched the filter, but the message carries its concrete
    // topic name, so dispatch falls through to the generic handler.
    shared.fire_message("sensors/kitchen/temperature", b"21.5");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(
        events_of(&events),
        vec!["message sensors/kitchen/temperature:21.5"]
    );
}

#[test]
fn test_ack_events_reach_handler() {
    let shared = MockShared::new();
    let (_client, events) = recording_client(&shared, ClientSettings::default());

    let sink = shared.sink();
    sink.on_published(4);
    sink.on_subscribed(5, &[1, 2]);
    sink.on_unsubscribed(6);
    assert_eq!(
        events_of(&events),
        vec!["published 4", "subscribed 5 [1, 2]", "unsubscribed 6"]
    );
}

#[test]
fn test_engine_errors_pass_through_verbatim() {
    let shared = MockShared::new();
    let (mut client, _) = recording_client(&shared, ClientSettings::default());

    shared.fail_with(7);
    let err = client
        .publish(&Topic::new("t"), "x", QoS::AtMostOnce)
        .unwrap_err();
    assert_eq!(err.code(), Some(7));
    assert!(matches!(
        client.last_error(),
        Some(Error::Engine { code: 7, .. })
    ));
}

#[test]
fn test_last_error_reflects_most_recent_failure() {
    let shared = MockShared::new();
    let (mut client, _) = recording_client(&shared, ClientSettings::default());

    let _ = client.publish(&Topic::new(""), "x", QoS::AtMostOnce);
    shared.fail_with(3);
    let _ = client.disconnect();
    assert!(matches!(client.last_error(), Some(Error::Engine { code: 3, .. })));
}

#[test]
fn test_handle_count_returns_to_zero_after_drops() {
    let shared = MockShared::new();

    let clients: Vec<Client> = (0..3)
        .map(|i| {
            let (client, _) = recording_client(&shared, ClientSettings::new(format!("c{}", i)));
            client
        })
        .collect();
    assert_eq!(shared.live_handles(), 3);

    drop(clients);
    assert_eq!(shared.inits.load(Ordering::SeqCst), 3);
    assert_eq!(shared.cleanups.load(Ordering::SeqCst), 3);
    assert_eq!(shared.live_handles(), 0);
}

#[test]
fn test_version_reports_engine_library() {
    let shared = MockShared::new();
    let (client, _) = recording_client(&shared, ClientSettings::default());
    let version = client.version();
    assert_eq!(version.library, [2, 0, 18]);
    assert_eq!(version.wrapper, env!("CARGO_PKG_VERSION"));
}
