// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MQTT transport adapter.
//!
//! Drives the rumqttc event loop and turns its events into two actions:
//!
//! - on every connection acknowledgement, (re-)subscribe to the topic
//! - on every publish, forward the message to the pipeline channel
//!
//! Reconnection belongs to rumqttc: after a connection error the adapter
//! waits `reconnect_delay` and polls again, which makes rumqttc reconnect.

use crate::config::MqttConfig;
use rumqttc::{AsyncClient, ClientError, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Capacity of rumqttc's internal request queue.
const REQUEST_CAPACITY: usize = 10;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("subscribe failed: {0}")]
    Subscribe(#[from] ClientError),

    #[error("pipeline channel closed")]
    PipelineClosed,
}

/// A message received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Transport events the adapter reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection (or reconnection) acknowledged by the broker.
    Connected,
    /// A publish arrived.
    Message(InboundMessage),
    /// The connection failed or dropped.
    Disconnected(String),
}

impl TransportEvent {
    /// Map a rumqttc event. Events the adapter ignores map to `None`.
    pub fn from_mqtt(event: Event) -> Option<Self> {
        match event {
            Event::Incoming(Packet::ConnAck(_)) => Some(Self::Connected),
            Event::Incoming(Packet::Publish(publish)) => Some(Self::Message(InboundMessage {
                topic: publish.topic,
                payload: publish.payload.to_vec(),
            })),
            Event::Incoming(Packet::Disconnect) => {
                Some(Self::Disconnected("broker sent DISCONNECT".into()))
            }
            _ => None,
        }
    }
}

/// Subscription capability of the transport client.
pub trait Subscribe {
    fn subscribe(&self, topic: &str) -> Result<(), TransportError>;
}

impl Subscribe for AsyncClient {
    fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        // try_subscribe: the request queue is drained by the same task that calls this
        self.try_subscribe(topic, QoS::AtMostOnce)?;
        Ok(())
    }
}

/// Reacts to transport events on behalf of the pipeline.
pub struct TransportAdapter<C: Subscribe> {
    client: C,
    topic: String,
    tx: mpsc::Sender<InboundMessage>,
}

impl<C: Subscribe> TransportAdapter<C> {
    pub fn new(client: C, topic: impl Into<String>, tx: mpsc::Sender<InboundMessage>) -> Self {
        Self {
            client,
            topic: topic.into(),
            tx,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Handle one event.
    ///
    /// Returns `Err(PipelineClosed)` once the pipeline stops receiving; the
    /// caller should stop polling then. A failed subscribe is logged and
    /// retried on the next connection acknowledgement.
    pub async fn handle_event(&self, event: TransportEvent) -> Result<(), TransportError> {
        match event {
            TransportEvent::Connected => {
                tracing::info!("Connected to broker, subscribing to '{}'", self.topic);
                if let Err(err) = self.client.subscribe(&self.topic) {
                    tracing::error!("Subscribe to '{}' failed: {}", self.topic, err);
                }
            }
            TransportEvent::Message(msg) => {
                tracing::trace!("Received {} bytes on '{}'", msg.payload.len(), msg.topic);
                self.tx
                    .send(msg)
                    .await
                    .map_err(|_| TransportError::PipelineClosed)?;
            }
            TransportEvent::Disconnected(reason) => {
                tracing::warn!("Broker connection lost: {}", reason);
            }
        }
        Ok(())
    }

    /// Poll `eventloop` until the pipeline channel closes.
    pub async fn run(
        &self,
        mut eventloop: EventLoop,
        reconnect_delay: Duration,
    ) -> Result<(), TransportError> {
        loop {
            match eventloop.poll().await {
                Ok(event) => {
                    if let Some(event) = TransportEvent::from_mqtt(event) {
                        self.handle_event(event).await?;
                    }
                }
                Err(err) => {
                    self.handle_event(TransportEvent::Disconnected(err.to_string()))
                        .await?;
                    tokio::time::sleep(reconnect_delay).await;
                }
            }
        }
    }
}

/// Build the MQTT client and its event loop. Nothing connects until the
/// event loop is first polled.
pub fn mqtt_client(config: &MqttConfig) -> (AsyncClient, EventLoop) {
    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_keep_alive(config.keep_alive());
    options.set_clean_session(true);
    if !config.username.is_empty() {
        options.set_credentials(&config.username, &config.password);
    }
    AsyncClient::new(options, REQUEST_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::{ConnAck, ConnectReturnCode, Publish};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        subscriptions: Mutex<Vec<String>>,
    }

    impl Subscribe for &RecordingClient {
        fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
            self.subscriptions
                .lock()
                .expect("lock")
                .push(topic.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_map_connack() {
        let event = Event::Incoming(Packet::ConnAck(ConnAck::new(
            ConnectReturnCode::Success,
            false,
        )));
        assert_eq!(TransportEvent::from_mqtt(event), Some(TransportEvent::Connected));
    }

    #[test]
    fn test_map_publish() {
        let publish = Publish::new("accel/data", QoS::AtMostOnce, b"{}".to_vec());
        let event = Event::Incoming(Packet::Publish(publish));
        assert_eq!(
            TransportEvent::from_mqtt(event),
            Some(TransportEvent::Message(InboundMessage::new("accel/data", b"{}".to_vec())))
        );
    }

    #[test]
    fn test_map_ignored_events() {
        assert_eq!(TransportEvent::from_mqtt(Event::Incoming(Packet::PingResp)), None);
        assert_eq!(
            TransportEvent::from_mqtt(Event::Outgoing(rumqttc::Outgoing::PingReq)),
            None
        );
    }

    #[tokio::test]
    async fn test_every_connect_resubscribes() {
        let client = RecordingClient::default();
        let (tx, _rx) = mpsc::channel(4);
        let adapter = TransportAdapter::new(&client, "accel/data", tx);
        assert_eq!(adapter.topic(), "accel/data");

        adapter.handle_event(TransportEvent::Connected).await.expect("connect");
        adapter
            .handle_event(TransportEvent::Disconnected("io error".into()))
            .await
            .expect("disconnect");
        adapter.handle_event(TransportEvent::Connected).await.expect("reconnect");

        let subs = client.subscriptions.lock().expect("lock").clone();
        assert_eq!(subs, ["accel/data", "accel/data"]);
    }

    #[tokio::test]
    async fn test_messages_forwarded_unfiltered() {
        let client = RecordingClient::default();
        let (tx, mut rx) = mpsc::channel(4);
        let adapter = TransportAdapter::new(&client, "accel/data", tx);

        let msg = InboundMessage::new("other/topic", b"payload".to_vec());
        adapter
            .handle_event(TransportEvent::Message(msg.clone()))
            .await
            .expect("forward");

        assert_eq!(rx.recv().await, Some(msg));
    }

    #[tokio::test]
    async fn test_closed_pipeline_stops_adapter() {
        let client = RecordingClient::default();
        let (tx, rx) = mpsc::channel(1);
        let adapter = TransportAdapter::new(&client, "accel/data", tx);
        drop(rx);

        let result = adapter
            .handle_event(TransportEvent::Message(InboundMessage::new("accel/data", vec![])))
            .await;
        assert!(matches!(result, Err(TransportError::PipelineClosed)));
    }

    #[test]
    fn test_mqtt_client_builds_without_connecting() {
        let (client, _eventloop) = mqtt_client(&MqttConfig::default());
        assert!(client.try_subscribe("accel/data", QoS::AtMostOnce).is_ok());
    }
}
