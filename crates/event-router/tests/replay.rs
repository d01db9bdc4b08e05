//! End-to-end behavior of the event router: subscription gating, bounded
//! buffering, replay de-duplication and ordering across live and replayed
//! delivery.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use bidi_core_types::{BrowsingContextId, Channel, ErrorCode, Event, ProtocolError};
use bidi_event_router::{
    pending_payload, spawn_outbound_writer, EventRouter, InMemoryContextStore, OutboundSink,
};

struct CollectorSink {
    tx: mpsc::UnboundedSender<(Event, Option<Channel>)>,
}

#[async_trait]
impl OutboundSink for CollectorSink {
    async fn send_event(&self, event: Event, channel: Option<Channel>) {
        let _ = self.tx.send((event, channel));
    }
}

struct Harness {
    router: Arc<EventRouter>,
    store: Arc<InMemoryContextStore>,
    delivered: mpsc::UnboundedReceiver<(Event, Option<Channel>)>,
    _writer: JoinHandle<()>,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryContextStore::new());
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let router = Arc::new(EventRouter::new(store.clone(), out_tx));
    let (sink_tx, delivered) = mpsc::unbounded_channel();
    let writer = spawn_outbound_writer(out_rx, Arc::new(CollectorSink { tx: sink_tx }));
    Harness {
        router,
        store,
        delivered,
        _writer: writer,
    }
}

impl Harness {
    async fn next(&mut self) -> (Event, Option<Channel>) {
        timeout(Duration::from_secs(1), self.delivered.recv())
            .await
            .expect("timed out waiting for delivery")
            .expect("sink closed")
    }

    async fn drain(&mut self, n: usize) -> Vec<(Event, Option<Channel>)> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.next().await);
        }
        out
    }

    async fn assert_idle(&mut self) {
        sleep(Duration::from_millis(30)).await;
        assert!(
            self.delivered.try_recv().is_err(),
            "unexpected extra delivery"
        );
    }
}

fn ctx(id: &str) -> BrowsingContextId {
    BrowsingContextId::new(id)
}

fn log_entry(n: u64) -> Event {
    Event::new("log.entryAdded", json!({"n": n}))
}

fn entry_n(event: &Event) -> u64 {
    event.params["n"].as_u64().expect("entry payload")
}

#[tokio::test]
async fn events_reach_only_subscribed_channels() {
    let mut h = harness();

    h.router
        .subscribe(&["log.entryAdded".into()], &[None], None)
        .unwrap();

    h.router.register_event(log_entry(0), None);
    h.router
        .register_event(Event::new("script.message", json!({})), None);

    let (event, channel) = h.next().await;
    assert_eq!(event.method, "log.entryAdded");
    assert_eq!(channel, None);
    // script.message had no subscriber and is not buffer-eligible: gone.
    h.assert_idle().await;
}

#[tokio::test]
async fn live_delivery_follows_subscription_priority() {
    let mut h = harness();
    let second = Channel::new("second");
    let first = Channel::new("first");

    h.router
        .subscribe(&["log.entryAdded".into()], &[None], Some(&second))
        .unwrap();
    h.router
        .subscribe(&["log.entryAdded".into()], &[None], Some(&first))
        .unwrap();

    h.router.register_event(log_entry(1), None);

    assert_eq!(h.next().await.1, Some(second));
    assert_eq!(h.next().await.1, Some(first));
    h.assert_idle().await;
}

#[tokio::test]
async fn buffered_events_replay_in_sequence_order() {
    let mut h = harness();
    let a = ctx("A");
    h.store.add_context(a.clone());

    for n in 0..3 {
        h.router.register_event(log_entry(n), Some(a.clone()));
    }

    h.router
        .subscribe(&["log.entryAdded".into()], &[Some(a.clone())], None)
        .unwrap();

    let replayed = h.drain(3).await;
    let ns: Vec<u64> = replayed.iter().map(|(event, _)| entry_n(event)).collect();
    assert_eq!(ns, vec![0, 1, 2]);
    h.assert_idle().await;
}

#[tokio::test]
async fn module_subscription_replays_module_events() {
    let mut h = harness();
    h.router.register_event(log_entry(7), None);

    h.router.subscribe(&["log".into()], &[None], None).unwrap();

    assert_eq!(entry_n(&h.next().await.0), 7);
    h.assert_idle().await;
}

#[tokio::test]
async fn resubscribe_does_not_redeliver_seen_events() {
    let mut h = harness();
    let channel = Channel::new("ch");

    for n in 0..3 {
        h.router.register_event(log_entry(n), None);
    }
    h.router
        .subscribe(&["log.entryAdded".into()], &[None], Some(&channel))
        .unwrap();
    h.drain(3).await;

    h.router
        .unsubscribe(&["log.entryAdded".into()], &[None], Some(&channel))
        .unwrap();

    for n in 3..5 {
        h.router.register_event(log_entry(n), None);
    }

    h.router
        .subscribe(&["log.entryAdded".into()], &[None], Some(&channel))
        .unwrap();

    let replayed = h.drain(2).await;
    let ns: Vec<u64> = replayed.iter().map(|(event, _)| entry_n(event)).collect();
    assert_eq!(ns, vec![3, 4]);
    h.assert_idle().await;
}

#[tokio::test]
async fn global_replay_merges_live_contexts_and_skips_deleted_ones() {
    let mut h = harness();
    let a = ctx("A");
    let b = ctx("B");
    h.store.add_context(a.clone());
    h.store.add_context(b.clone());

    // Interleave two contexts plus one context-less event.
    h.router.register_event(log_entry(0), Some(a.clone()));
    h.router.register_event(log_entry(1), Some(b.clone()));
    h.router.register_event(log_entry(2), Some(a.clone()));
    h.router.register_event(log_entry(3), None);
    h.router.register_event(log_entry(4), Some(b.clone()));

    h.store.remove_context(&b);

    h.router
        .subscribe(&["log.entryAdded".into()], &[None], None)
        .unwrap();

    // B's events are excluded; the rest arrive in global sequence order.
    let replayed = h.drain(3).await;
    let ns: Vec<u64> = replayed.iter().map(|(event, _)| entry_n(event)).collect();
    assert_eq!(ns, vec![0, 2, 3]);
    h.assert_idle().await;
}

#[tokio::test]
async fn replay_is_bounded_by_per_context_buffer_capacity() {
    let mut h = harness();
    let a = ctx("A");
    let b = ctx("B");
    h.store.add_context(a.clone());
    h.store.add_context(b.clone());

    // 120 into A (capacity 100 -> oldest 20 evicted), 30 into B.
    for n in 0..120 {
        h.router.register_event(log_entry(n), Some(a.clone()));
    }
    for n in 1000..1030 {
        h.router.register_event(log_entry(n), Some(b.clone()));
    }

    h.router
        .subscribe(&["log.entryAdded".into()], &[None], None)
        .unwrap();

    let replayed = h.drain(130).await;
    let ns: Vec<u64> = replayed.iter().map(|(event, _)| entry_n(event)).collect();

    let mut expected: Vec<u64> = (20..120).collect();
    expected.extend(1000..1030);
    assert_eq!(ns, expected);
    h.assert_idle().await;
}

#[tokio::test]
async fn pending_events_deliver_in_registration_order() {
    let mut h = harness();
    h.router
        .subscribe(&["log.entryAdded".into()], &[None], None)
        .unwrap();

    let (resolve_tx, resolve_rx) = oneshot::channel();
    h.router.register_pending_event(
        pending_payload(async move {
            resolve_rx.await.map_err(|_| {
                ProtocolError::unknown_error("payload computation dropped", None)
            })?
        }),
        None,
        "log.entryAdded",
    );
    h.router.register_event(log_entry(1), None);

    // Nothing can be delivered until the first slot resolves.
    h.assert_idle().await;
    resolve_tx.send(Ok(log_entry(0))).unwrap();

    assert_eq!(entry_n(&h.next().await.0), 0);
    assert_eq!(entry_n(&h.next().await.0), 1);
}

#[tokio::test]
async fn failed_pending_event_consumes_its_slot() {
    let mut h = harness();
    let channel = Channel::new("ch");
    h.router
        .subscribe(&["log.entryAdded".into()], &[None], Some(&channel))
        .unwrap();

    h.router.register_pending_event(
        pending_payload(async {
            Err(ProtocolError::unknown_error("payload failed", None))
        }),
        None,
        "log.entryAdded",
    );
    // The failed payload produces no delivery.
    h.assert_idle().await;

    // But its slot was delivered: a resubscribe replays nothing.
    h.router
        .unsubscribe(&["log.entryAdded".into()], &[None], Some(&channel))
        .unwrap();
    h.router
        .subscribe(&["log.entryAdded".into()], &[None], Some(&channel))
        .unwrap();
    h.assert_idle().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registration_buffers_and_delivers_in_one_order() {
    let mut h = harness();
    let live = Channel::new("live");
    h.router
        .subscribe(&["log.entryAdded".into()], &[None], Some(&live))
        .unwrap();

    let mut tasks = Vec::new();
    for task in 0..4u64 {
        let router = h.router.clone();
        tasks.push(tokio::spawn(async move {
            for n in 0..20 {
                router.register_event(log_entry(task * 100 + n), None);
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let live_order: Vec<u64> = h
        .drain(80)
        .await
        .iter()
        .map(|(event, _)| entry_n(event))
        .collect();

    // A late subscriber replays the buffer in the same order the live
    // channel saw, regardless of how registrations interleaved.
    let late = Channel::new("late");
    h.router
        .subscribe(&["log.entryAdded".into()], &[None], Some(&late))
        .unwrap();
    let replay_order: Vec<u64> = h
        .drain(80)
        .await
        .iter()
        .map(|(event, _)| entry_n(event))
        .collect();

    assert_eq!(live_order, replay_order);
    h.assert_idle().await;
}

#[tokio::test]
async fn subscribing_to_unknown_context_fails_without_state_changes() {
    let mut h = harness();
    let a = ctx("A");
    h.store.add_context(a.clone());

    let err = h
        .router
        .subscribe(
            &["log.entryAdded".into()],
            &[Some(a.clone()), Some(ctx("ghost"))],
            None,
        )
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NoSuchFrame);

    // The valid context in the batch was not subscribed either.
    h.router.register_event(log_entry(0), Some(a));
    h.assert_idle().await;
}

#[tokio::test]
async fn unknown_event_name_fails_the_whole_batch() {
    let mut h = harness();

    let err = h
        .router
        .subscribe(
            &["log.entryAdded".into(), "log.bogus".into()],
            &[None],
            None,
        )
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidArgument);

    h.router.register_event(log_entry(0), None);
    h.assert_idle().await;
}
