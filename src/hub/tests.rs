use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tungstenite::protocol::Message as WsMessage;

use super::{Hub, HubHandle, Join, TraceEvent, Tracer, WriterTracer};
use crate::client::{Connection, ConnectionId};
use crate::config::{HubSettings, TraceTarget};
use crate::utils::Error;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Value>>,
}

impl Tracer for Recorder {
    fn trace(&self, event: &TraceEvent<'_>) {
        let value = serde_json::to_value(event).unwrap();
        self.events.lock().unwrap().push(value);
    }
}

impl Recorder {
    fn count(&self, kind: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e["event"] == kind)
            .count()
    }

    fn left_reasons(&self, id: &str) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e["event"] == "left" && e["id"] == id)
            .map(|e| e["reason"].as_str().unwrap().to_string())
            .collect()
    }
}

fn settings(echo_to_sender: bool) -> HubSettings {
    HubSettings {
        message_buffer_size: 8,
        echo_to_sender,
        trace: TraceTarget::Off,
    }
}

fn start(echo_to_sender: bool) -> (HubHandle, Arc<Recorder>, JoinHandle<()>) {
    let recorder = Arc::new(Recorder::default());
    let (hub, handle) = Hub::new(settings(echo_to_sender));
    let task = hub.with_tracer(recorder.clone()).spawn();
    (handle, recorder, task)
}

async fn wait_for_members(hub: &HubHandle, expected: usize) -> Vec<ConnectionId> {
    for _ in 0..200 {
        let members = hub.members().await.unwrap();
        if members.len() == expected {
            return members;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("hub never reached {expected} members");
}

async fn recv(rx: &mut tokio::sync::mpsc::Receiver<WsMessage>) -> Option<WsMessage> {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for outbound message")
}

#[tokio::test]
async fn test_join_and_publish_reaches_every_member() {
    let (hub, recorder, _task) = start(true);
    let (a, mut rx_a) = Connection::new(8, None);
    let (b, mut rx_b) = Connection::new(8, None);
    hub.join(a).await.unwrap();
    hub.join(b).await.unwrap();
    wait_for_members(&hub, 2).await;

    hub.publish(None, WsMessage::text("hello")).await.unwrap();

    assert_eq!(recv(&mut rx_a).await, Some(WsMessage::text("hello")));
    assert_eq!(recv(&mut rx_b).await, Some(WsMessage::text("hello")));
    assert_eq!(recorder.count("joined"), 2);
    assert_eq!(recorder.count("received"), 1);
}

#[tokio::test]
async fn test_sender_skipped_when_echo_disabled() {
    let (hub, _recorder, _task) = start(false);
    let (a, mut rx_a) = Connection::new(8, None);
    let (b, mut rx_b) = Connection::new(8, None);
    let (c, mut rx_c) = Connection::new(8, None);
    let a_id = a.id.clone();
    hub.join(a).await.unwrap();
    hub.join(b).await.unwrap();
    hub.join(c).await.unwrap();
    wait_for_members(&hub, 3).await;

    hub.publish(Some(a_id), WsMessage::text("hello"))
        .await
        .unwrap();

    assert_eq!(recv(&mut rx_b).await, Some(WsMessage::text("hello")));
    assert_eq!(recv(&mut rx_c).await, Some(WsMessage::text("hello")));
    // fan-out is done in one step, so A's copy would already be queued
    assert!(rx_a.try_recv().is_err());
    assert!(rx_b.try_recv().is_err());
    assert!(rx_c.try_recv().is_err());
}

#[tokio::test]
async fn test_sender_receives_own_message_when_echo_enabled() {
    let (hub, _recorder, _task) = start(true);
    let (a, mut rx_a) = Connection::new(8, None);
    let a_id = a.id.clone();
    hub.join(a).await.unwrap();
    wait_for_members(&hub, 1).await;

    hub.publish(Some(a_id), WsMessage::binary(vec![1u8, 2, 3]))
        .await
        .unwrap();

    assert_eq!(
        recv(&mut rx_a).await,
        Some(WsMessage::binary(vec![1u8, 2, 3]))
    );
}

#[tokio::test]
async fn test_full_queue_evicts_member() {
    let (hub, recorder, _task) = start(true);
    // B's writer never drains
    let (b, mut rx_b) = Connection::new(2, None);
    let (c, mut rx_c) = Connection::new(8, None);
    let b_id = b.id.clone();
    let c_id = c.id.clone();
    hub.join(b).await.unwrap();
    hub.join(c).await.unwrap();
    wait_for_members(&hub, 2).await;

    for text in ["m1", "m2", "m3"] {
        hub.publish(None, WsMessage::text(text)).await.unwrap();
    }

    for text in ["m1", "m2", "m3"] {
        assert_eq!(recv(&mut rx_c).await, Some(WsMessage::text(text)));
    }
    let members = wait_for_members(&hub, 1).await;
    assert_eq!(members, vec![c_id]);

    // B keeps what was queued before eviction, then sees its queue closed
    assert_eq!(recv(&mut rx_b).await, Some(WsMessage::text("m1")));
    assert_eq!(recv(&mut rx_b).await, Some(WsMessage::text("m2")));
    assert_eq!(recv(&mut rx_b).await, None);
    assert_eq!(recorder.left_reasons(&b_id), vec!["backpressure"]);

    // later messages only go to C
    hub.publish(None, WsMessage::text("m4")).await.unwrap();
    assert_eq!(recv(&mut rx_c).await, Some(WsMessage::text("m4")));
}

#[tokio::test]
async fn test_concurrent_joins_each_receive_once() {
    let (hub, _recorder, _task) = start(true);
    let mut receivers = Vec::new();
    let mut joins = Vec::new();
    for _ in 0..32 {
        let (conn, rx) = Connection::new(8, None);
        receivers.push(rx);
        let hub = hub.clone();
        joins.push(tokio::spawn(async move { hub.join(conn).await }));
    }
    for join in joins {
        join.await.unwrap().unwrap();
    }
    wait_for_members(&hub, 32).await;

    hub.publish(None, WsMessage::text("all")).await.unwrap();

    for rx in receivers.iter_mut() {
        assert_eq!(recv(rx).await, Some(WsMessage::text("all")));
        assert!(rx.try_recv().is_err());
    }
}

#[tokio::test]
async fn test_per_member_order_is_fifo() {
    let (hub, _recorder, _task) = start(true);
    let (a, mut rx_a) = Connection::new(64, None);
    hub.join(a).await.unwrap();
    wait_for_members(&hub, 1).await;

    for i in 0..20 {
        hub.publish(None, WsMessage::text(format!("msg{i}")))
            .await
            .unwrap();
    }
    for i in 0..20 {
        assert_eq!(
            recv(&mut rx_a).await,
            Some(WsMessage::text(format!("msg{i}")))
        );
    }
}

#[tokio::test]
async fn test_leave_removes_member_and_closes_queue() {
    let (hub, recorder, _task) = start(true);
    let (a, mut rx_a) = Connection::new(8, None);
    let a_id = a.id.clone();
    hub.join(a).await.unwrap();
    wait_for_members(&hub, 1).await;

    hub.leave(a_id.clone()).unwrap();
    wait_for_members(&hub, 0).await;

    assert_eq!(recv(&mut rx_a).await, None);
    assert_eq!(recorder.left_reasons(&a_id), vec!["requested"]);
}

#[tokio::test]
async fn test_repeated_or_unknown_leave_is_a_no_op() {
    let (hub, recorder, _task) = start(true);
    let (a, _rx_a) = Connection::new(8, None);
    let (b, mut rx_b) = Connection::new(8, None);
    let a_id = a.id.clone();
    hub.join(a).await.unwrap();
    hub.join(b).await.unwrap();
    wait_for_members(&hub, 2).await;

    hub.leave(a_id.clone()).unwrap();
    hub.leave(a_id.clone()).unwrap();
    hub.leave("conn-never-joined".to_string()).unwrap();
    wait_for_members(&hub, 1).await;

    // the hub is still serving the remaining member
    hub.publish(None, WsMessage::text("still here")).await.unwrap();
    assert_eq!(recv(&mut rx_b).await, Some(WsMessage::text("still here")));
    assert_eq!(recorder.left_reasons(&a_id).len(), 1);
    for _ in 0..200 {
        if recorder.count("unknown_leave") == 2 {
            break;
        }
        sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(recorder.count("unknown_leave"), 2);
}

#[tokio::test]
async fn test_dropped_writer_is_removed_on_publish() {
    let (hub, recorder, _task) = start(true);
    let (a, rx_a) = Connection::new(8, None);
    let a_id = a.id.clone();
    hub.join(a).await.unwrap();
    wait_for_members(&hub, 1).await;

    drop(rx_a);
    hub.publish(None, WsMessage::text("anyone?")).await.unwrap();

    wait_for_members(&hub, 0).await;
    assert_eq!(recorder.left_reasons(&a_id), vec!["closed"]);
}

#[tokio::test]
async fn test_leave_racing_publishes_never_leaves_a_stale_member() {
    let (hub, _recorder, _task) = start(true);
    let (a, mut rx_a) = Connection::new(1024, None);
    let (b, mut rx_b) = Connection::new(1024, None);
    let a_id = a.id.clone();
    let b_id = b.id.clone();
    hub.join(a).await.unwrap();
    hub.join(b).await.unwrap();
    wait_for_members(&hub, 2).await;

    let publisher = {
        let hub = hub.clone();
        tokio::spawn(async move {
            for i in 0..200 {
                hub.publish(None, WsMessage::text(format!("{i}")))
                    .await
                    .unwrap();
            }
        })
    };
    hub.leave(a_id.clone()).unwrap();
    publisher.await.unwrap();

    let members = wait_for_members(&hub, 1).await;
    assert_eq!(members, vec![b_id]);

    // A got some prefix of the stream and then its queue closed
    let mut seen = 0;
    while let Some(msg) = recv(&mut rx_a).await {
        assert_eq!(msg, WsMessage::text(format!("{seen}")));
        seen += 1;
    }
    assert!(seen <= 200);

    for i in 0..200 {
        assert_eq!(recv(&mut rx_b).await, Some(WsMessage::text(format!("{i}"))));
    }
}

#[tokio::test]
async fn test_shutdown_closes_member_queues_and_rejects_joins() {
    let (hub, recorder, task) = start(true);
    let (a, mut rx_a) = Connection::new(8, None);
    let (b, mut rx_b) = Connection::new(8, None);
    hub.join(a).await.unwrap();
    hub.join(b).await.unwrap();
    wait_for_members(&hub, 2).await;

    hub.shutdown().await.unwrap();
    timeout(Duration::from_secs(2), task)
        .await
        .expect("hub did not stop")
        .unwrap();

    assert_eq!(recv(&mut rx_a).await, None);
    assert_eq!(recv(&mut rx_b).await, None);
    assert!(hub.is_closed());

    let (late, _rx) = Connection::new(8, None);
    assert!(matches!(hub.join(late).await, Err(Error::HubClosed)));
    assert!(matches!(hub.members().await, Err(Error::HubClosed)));
    assert!(matches!(hub.leave("x".to_string()), Err(Error::HubClosed)));
    assert_eq!(recorder.count("stopped"), 1);
}

#[tokio::test]
async fn test_hub_stops_when_every_handle_is_dropped() {
    let (hub, _recorder, task) = start(true);
    drop(hub);
    timeout(Duration::from_secs(2), task)
        .await
        .expect("hub did not stop")
        .unwrap();
}

#[test]
fn test_writer_tracer_text_line() {
    let tracer = WriterTracer::new(Vec::new());
    tracer.trace(&TraceEvent::Joined {
        id: "conn-1",
        members: 1,
    });
    let out = String::from_utf8(tracer.into_inner()).unwrap();
    assert!(out.ends_with("member joined: conn-1 (members=1)\n"));
}

#[test]
fn test_writer_tracer_json_line() {
    let tracer = WriterTracer::json(Vec::new());
    tracer.trace(&TraceEvent::Left {
        id: "conn-1",
        reason: super::LeaveReason::Backpressure,
        members: 0,
    });
    let out = String::from_utf8(tracer.into_inner()).unwrap();
    assert_eq!(
        out,
        "{\"event\":\"left\",\"id\":\"conn-1\",\"reason\":\"backpressure\",\"members\":0}\n"
    );
}

#[tokio::test]
async fn test_leave_right_after_join_is_never_lost() {
    let (hub, recorder, _task) = start(true);
    let mut receivers = Vec::new();
    for _ in 0..200 {
        let (conn, rx) = Connection::new(8, None);
        let id = conn.id.clone();
        hub.join(conn).await.unwrap();
        hub.leave(id).unwrap();
        receivers.push(rx);
    }

    wait_for_members(&hub, 0).await;
    for rx in receivers.iter_mut() {
        assert_eq!(recv(rx).await, None);
    }
    assert_eq!(recorder.count("unknown_leave"), 0);
    assert_eq!(recorder.count("left"), 200);
}

#[tokio::test]
async fn test_publish_right_after_join_reaches_the_new_member() {
    let (hub, _recorder, _task) = start(true);
    for i in 0..100 {
        let (conn, mut rx) = Connection::new(8, None);
        let id = conn.id.clone();
        hub.join(conn).await.unwrap();
        hub.publish(Some(id.clone()), WsMessage::text(format!("{i}")))
            .await
            .unwrap();
        assert_eq!(recv(&mut rx).await, Some(WsMessage::text(format!("{i}"))));
        hub.leave(id).unwrap();
    }
}

#[tokio::test]
async fn test_join_without_waiter_is_rolled_back() {
    let (hub, recorder, _task) = start(true);
    let (conn, mut rx) = Connection::new(8, None);
    let id = conn.id.clone();
    let (ack, joined) = tokio::sync::oneshot::channel();
    drop(joined);
    hub.join_tx.send(Join { conn, ack }).await.unwrap();

    wait_for_members(&hub, 0).await;
    for _ in 0..200 {
        if !recorder.left_reasons(&id).is_empty() {
            break;
        }
        sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(recorder.left_reasons(&id), vec!["closed"]);
    assert_eq!(recv(&mut rx).await, None);
}
