// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end bridge flow: transport events -> channel -> pipeline -> store.

use accel_bridge::transport::Subscribe;
use accel_bridge::{
    bootstrap, FieldValue, InboundMessage, IngestPipeline, MemoryStore, TransportAdapter,
    TransportError, TransportEvent,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

const TOPIC: &str = "accel/data";

#[derive(Clone, Default)]
struct RecordingSubscriber {
    topics: Arc<Mutex<Vec<String>>>,
}

impl Subscribe for RecordingSubscriber {
    fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        self.topics.lock().expect("lock").push(topic.to_string());
        Ok(())
    }
}

fn reading(device: &str, x: f64, y: f64, z: f64) -> TransportEvent {
    let payload = json!({
        "device": device,
        "acceleration": {"x": x, "y": y, "z": z},
        "gyro": {"yaw": 1, "pitch": 2, "roll": 3}
    });
    TransportEvent::Message(InboundMessage::new(TOPIC, payload.to_string()))
}

struct Bridge {
    adapter: TransportAdapter<RecordingSubscriber>,
    subscriber: RecordingSubscriber,
    store: MemoryStore,
    pipeline: tokio::task::JoinHandle<IngestPipeline<MemoryStore>>,
}

async fn start_bridge(store: MemoryStore) -> Bridge {
    let database = bootstrap(&store, "treadmill2").await.expect("bootstrap");
    let pipeline = IngestPipeline::new(Arc::new(store.clone()), database);

    let (tx, rx) = mpsc::channel(16);
    let subscriber = RecordingSubscriber::default();
    let adapter = TransportAdapter::new(subscriber.clone(), TOPIC, tx);

    let pipeline = tokio::spawn(async move {
        pipeline.run(rx).await;
        pipeline
    });

    Bridge {
        adapter,
        subscriber,
        store,
        pipeline,
    }
}

impl Bridge {
    async fn feed(&self, events: Vec<TransportEvent>) {
        for event in events {
            self.adapter.handle_event(event).await.expect("handle");
        }
    }

    async fn finish(self) -> (MemoryStore, Vec<String>, IngestPipeline<MemoryStore>) {
        let Bridge {
            adapter,
            subscriber,
            store,
            pipeline,
        } = self;
        drop(adapter);
        let pipeline = pipeline.await.expect("pipeline task");
        let topics = subscriber.topics.lock().expect("lock").clone();
        (store, topics, pipeline)
    }
}

#[tokio::test]
async fn test_reference_reading_end_to_end() {
    let bridge = start_bridge(MemoryStore::new()).await;
    bridge
        .feed(vec![TransportEvent::Connected, reading("d1", 3.0, 4.0, 0.0)])
        .await;

    let (store, topics, _) = bridge.finish().await;

    assert_eq!(topics, [TOPIC]);
    let batches = store.batches();
    assert_eq!(batches.len(), 1);

    let (db, points) = &batches[0];
    assert_eq!(db, "treadmill2");

    let accel = &points[0];
    assert_eq!(accel.measurement, "acceleration");
    assert_eq!(accel.tags["device"], "d1");
    assert_eq!(accel.field_value("x"), Some(FieldValue::Float(3.0)));
    assert_eq!(accel.field_value("y"), Some(FieldValue::Float(4.0)));
    assert_eq!(accel.field_value("z"), Some(FieldValue::Float(0.0)));
    assert_eq!(accel.field_value("g"), Some(FieldValue::Float(5.0)));

    let gyro = &points[1];
    assert_eq!(gyro.measurement, "gyro");
    assert_eq!(gyro.tags["device"], "d1");
    assert_eq!(gyro.field_value("yaw"), Some(FieldValue::Integer(1)));
    assert_eq!(gyro.field_value("pitch"), Some(FieldValue::Integer(2)));
    assert_eq!(gyro.field_value("roll"), Some(FieldValue::Integer(3)));
}

#[tokio::test]
async fn test_reconnect_resubscribes_without_duplicate_writes() {
    let bridge = start_bridge(MemoryStore::new()).await;
    bridge
        .feed(vec![
            TransportEvent::Connected,
            reading("d1", 1.0, 0.0, 0.0),
            reading("d1", 0.0, 1.0, 0.0),
            TransportEvent::Disconnected("connection reset by peer".into()),
            TransportEvent::Connected,
            reading("d1", 0.0, 0.0, 1.0),
        ])
        .await;

    let (store, topics, pipeline) = bridge.finish().await;

    assert_eq!(topics, [TOPIC, TOPIC]);
    assert_eq!(store.write_calls(), 3);

    let zs: Vec<f64> = store
        .batches()
        .iter()
        .filter_map(|(_, points)| points[0].field_value("z"))
        .map(|v| v.as_f64())
        .collect();
    assert_eq!(zs, [0.0, 0.0, 1.0]);

    let stats = pipeline.stats().snapshot();
    assert_eq!(stats.messages_received, 3);
    assert_eq!(stats.batches_written, 3);
}

#[tokio::test]
async fn test_store_outage_is_isolated_per_message() {
    let store = MemoryStore::new();
    let bridge = start_bridge(store.clone()).await;
    store.fail_next_writes(2);

    bridge
        .feed(vec![
            TransportEvent::Connected,
            reading("a", 1.0, 1.0, 1.0),
            reading("b", 1.0, 1.0, 1.0),
            reading("c", 1.0, 1.0, 1.0),
        ])
        .await;

    let (store, _, pipeline) = bridge.finish().await;

    assert_eq!(store.write_calls(), 3);
    let batches = store.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].1[0].tags["device"], "c");

    let stats = pipeline.stats().snapshot();
    assert_eq!(stats.write_errors, 2);
    assert_eq!(stats.batches_written, 1);
}

#[tokio::test]
async fn test_bad_payloads_never_reach_the_store() {
    let bridge = start_bridge(MemoryStore::new()).await;
    bridge
        .feed(vec![
            TransportEvent::Connected,
            TransportEvent::Message(InboundMessage::new(TOPIC, "{\"device\": \"d1\"}")),
            TransportEvent::Message(InboundMessage::new(TOPIC, "\u{0}\u{1}")),
            reading("d2", 0.0, 0.0, 0.0),
        ])
        .await;

    let (store, _, pipeline) = bridge.finish().await;

    assert_eq!(store.write_calls(), 1);
    let batches = store.batches();
    assert_eq!(batches[0].1[0].tags["device"], "d2");
    assert_eq!(
        batches[0].1[0].field_value("g"),
        Some(FieldValue::Float(0.0))
    );

    let stats = pipeline.stats().snapshot();
    assert_eq!(stats.decode_errors, 2);
}

#[tokio::test]
async fn test_bootstrap_keeps_existing_database() {
    let store = MemoryStore::with_databases(["treadmill2"]);
    let bridge = start_bridge(store.clone()).await;
    bridge.feed(vec![reading("d1", 3.0, 4.0, 0.0)]).await;

    let (store, _, _) = bridge.finish().await;
    assert_eq!(store.create_calls(), 0);
    assert_eq!(store.batches().len(), 1);
}
