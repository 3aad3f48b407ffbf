//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
//! In-memory transports.
//!
//! These transports never leave the process. [`MemoryRequestTransport`]
//! feeds request frames straight into a [`Processor`] and returns whatever it
//! writes; [`MemoryBroker`] routes published frames to subscribers through
//! bounded channels, so a slow subscriber makes publishers wait.
//!
//! Both are primarily useful for tests and benchmarks, and as reference
//! implementations of the transport traits.

use super::{
    BrokerConfig, ErrorSignal, FrameCallback, MemoryTransportConfig, PublisherTransport,
    PublisherTransportFactory, RequestTransport, SubscriberTransport, SubscriberTransportFactory,
    TransportError,
};
use crate::context::Context;
use crate::processor::Processor;
use crate::protocol::{strip_frame_prefix, OutputBuffer, ProtocolFactory};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Request transport dispatching directly into a local processor.
#[derive(Clone)]
pub struct MemoryRequestTransport {
    processor: Arc<Processor>,
    protocol: Arc<dyn ProtocolFactory>,
    config: MemoryTransportConfig,
}

impl MemoryRequestTransport {
    /// Creates a transport with the default configuration.
    #[must_use]
    pub fn new(processor: Arc<Processor>, protocol: Arc<dyn ProtocolFactory>) -> Self {
        Self::with_config(processor, protocol, MemoryTransportConfig::default())
    }

    /// Creates a transport with an explicit configuration.
    #[must_use]
    pub fn with_config(
        processor: Arc<Processor>,
        protocol: Arc<dyn ProtocolFactory>,
        config: MemoryTransportConfig,
    ) -> Self {
        Self {
            processor,
            protocol,
            config,
        }
    }

    async fn dispatch(&self, frame: Bytes) -> Result<Bytes, TransportError> {
        let limit = self.config.request_size_limit;
        if limit > 0 && frame.len() > limit {
            return Err(TransportError::RequestTooLarge {
                size: frame.len(),
                limit,
            });
        }
        let payload = strip_frame_prefix(frame)?;
        let mut input = self.protocol.reader(payload);
        let mut output = OutputBuffer::for_response(self.config.response_size_limit);
        {
            let mut writer = self.protocol.writer(&mut output);
            self.processor
                .process(&mut *input, &mut *writer)
                .await
                .map_err(|error| TransportError::InvalidFrame {
                    reason: error.to_string(),
                })?;
        }
        Ok(output.take_payload())
    }
}

#[async_trait]
impl RequestTransport for MemoryRequestTransport {
    async fn oneway(&self, ctx: &Context, frame: Bytes) -> Result<(), TransportError> {
        let transport = self.clone();
        let correlation_id = ctx.correlation_id().to_string();
        tokio::spawn(async move {
            if let Err(error) = transport.dispatch(frame).await {
                warn!(correlation_id = %correlation_id, error = %error, "oneway dispatch failed");
            }
        });
        Ok(())
    }

    async fn request(&self, ctx: &Context, frame: Bytes) -> Result<Bytes, TransportError> {
        let timeout = ctx.remaining();
        let reply = tokio::select! {
            () = ctx.cancelled() => return Err(TransportError::Cancelled),
            reply = tokio::time::timeout(timeout, self.dispatch(frame)) => {
                reply.map_err(|_| TransportError::Timeout { duration: timeout })??
            }
        };
        if reply.is_empty() {
            return Err(TransportError::NoResponse);
        }
        Ok(reply)
    }

    fn request_size_limit(&self) -> usize {
        self.config.request_size_limit
    }
}

struct Route {
    id: u64,
    sender: mpsc::Sender<Bytes>,
    errors: ErrorSignal,
}

struct BrokerInner {
    config: BrokerConfig,
    topics: Mutex<HashMap<String, Vec<Route>>>,
    next_route: AtomicU64,
}

/// In-process topic broker.
///
/// Acts as both a publisher and a subscriber transport factory.
#[derive(Clone)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

impl MemoryBroker {
    /// Creates a broker with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BrokerConfig::default())
    }

    /// Creates a broker with an explicit configuration.
    #[must_use]
    pub fn with_config(config: BrokerConfig) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                config,
                topics: Mutex::new(HashMap::new()),
                next_route: AtomicU64::new(1),
            }),
        }
    }

    /// Number of live subscriptions on `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner.topics.lock().get(topic).map_or(0, Vec::len)
    }

    /// Drops every subscription, firing each one's error signal.
    pub fn disconnect(&self, reason: &str) {
        let topics = std::mem::take(&mut *self.inner.topics.lock());
        for route in topics.into_values().flatten() {
            route.errors.fail(TransportError::Disconnected {
                reason: reason.to_string(),
            });
        }
    }

    fn add_route(&self, topic: &str, sender: mpsc::Sender<Bytes>, errors: ErrorSignal) -> u64 {
        let id = self.inner.next_route.fetch_add(1, Ordering::Relaxed);
        self.inner
            .topics
            .lock()
            .entry(topic.to_string())
            .or_default()
            .push(Route { id, sender, errors });
        id
    }

    fn remove_route(&self, topic: &str, id: u64) {
        let mut topics = self.inner.topics.lock();
        if let Some(routes) = topics.get_mut(topic) {
            routes.retain(|route| route.id != id);
            if routes.is_empty() {
                topics.remove(topic);
            }
        }
    }

    fn has_route(&self, topic: &str, id: u64) -> bool {
        self.inner
            .topics
            .lock()
            .get(topic)
            .is_some_and(|routes| routes.iter().any(|route| route.id == id))
    }

    fn senders(&self, topic: &str) -> Vec<mpsc::Sender<Bytes>> {
        self.inner
            .topics
            .lock()
            .get(topic)
            .map(|routes| routes.iter().map(|route| route.sender.clone()).collect())
            .unwrap_or_default()
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl PublisherTransportFactory for MemoryBroker {
    fn publisher(&self) -> Arc<dyn PublisherTransport> {
        Arc::new(MemoryPublisher {
            broker: self.clone(),
            open: AtomicBool::new(false),
        })
    }
}

impl SubscriberTransportFactory for MemoryBroker {
    fn subscriber(&self) -> Arc<dyn SubscriberTransport> {
        Arc::new(MemorySubscriber {
            broker: self.clone(),
            active: Mutex::new(None),
        })
    }
}

/// Publisher half of a [`MemoryBroker`].
pub struct MemoryPublisher {
    broker: MemoryBroker,
    open: AtomicBool,
}

#[async_trait]
impl PublisherTransport for MemoryPublisher {
    async fn open(&self) -> Result<(), TransportError> {
        if self.open.swap(true, Ordering::AcqRel) {
            return Err(TransportError::AlreadyOpen);
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.open.store(false, Ordering::Release);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn publish_size_limit(&self) -> usize {
        self.broker.inner.config.publish_size_limit
    }

    async fn publish(&self, topic: &str, frame: Bytes) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        let limit = self.publish_size_limit();
        if limit > 0 && frame.len() > limit {
            return Err(TransportError::RequestTooLarge {
                size: frame.len(),
                limit,
            });
        }
        for sender in self.broker.senders(topic) {
            if sender.send(frame.clone()).await.is_err() {
                debug!(topic, "subscriber went away during publish");
            }
        }
        Ok(())
    }
}

struct ActiveRoute {
    topic: String,
    id: u64,
    task: JoinHandle<()>,
}

/// Subscriber half of a [`MemoryBroker`].
pub struct MemorySubscriber {
    broker: MemoryBroker,
    active: Mutex<Option<ActiveRoute>>,
}

#[async_trait]
impl SubscriberTransport for MemorySubscriber {
    async fn subscribe(
        &self,
        topic: &str,
        callback: FrameCallback,
        errors: ErrorSignal,
    ) -> Result<(), TransportError> {
        let mut active = self.active.lock();
        if let Some(current) = active.as_ref() {
            return Err(TransportError::AlreadySubscribed {
                topic: current.topic.clone(),
            });
        }

        let (sender, mut receiver) = mpsc::channel(self.broker.inner.config.channel_capacity);
        let id = self.broker.add_route(topic, sender, errors);
        let log_topic = topic.to_string();
        let task = tokio::spawn(async move {
            while let Some(frame) = receiver.recv().await {
                match strip_frame_prefix(frame) {
                    Ok(payload) => callback(payload).await,
                    Err(error) => {
                        warn!(topic = %log_topic, error = %error, "dropping malformed frame")
                    }
                }
            }
        });
        *active = Some(ActiveRoute {
            topic: topic.to_string(),
            id,
            task,
        });
        Ok(())
    }

    async fn unsubscribe(&self) -> Result<(), TransportError> {
        let route = self.active.lock().take();
        if let Some(route) = route {
            self.broker.remove_route(&route.topic, route.id);
            route.task.abort();
        }
        Ok(())
    }

    fn is_subscribed(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|route| self.broker.has_route(&route.topic, route.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::time::Duration;

    fn frame(body: &[u8]) -> Bytes {
        let mut buffer = OutputBuffer::new(0);
        crate::protocol::OutputSink::write(&mut buffer, body).unwrap();
        buffer.take_frame()
    }

    fn collector() -> (FrameCallback, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback: FrameCallback = Arc::new(move |payload: Bytes| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(payload);
            }
            .boxed()
        });
        (callback, rx)
    }

    #[tokio::test]
    async fn test_publish_requires_open() {
        let broker = MemoryBroker::new();
        let publisher = broker.publisher();
        assert!(matches!(
            publisher.publish("t", frame(b"x")).await,
            Err(TransportError::NotOpen)
        ));
        publisher.open().await.unwrap();
        assert!(matches!(publisher.open().await, Err(TransportError::AlreadyOpen)));
        publisher.publish("t", frame(b"x")).await.unwrap();
    }

    #[tokio::test]
    async fn test_delivery_strips_frame_prefix() {
        let broker = MemoryBroker::new();
        let subscriber = broker.subscriber();
        let (callback, mut rx) = collector();
        subscriber.subscribe("news", callback, ErrorSignal::new()).await.unwrap();
        assert!(subscriber.is_subscribed());
        assert_eq!(broker.subscriber_count("news"), 1);

        let publisher = broker.publisher();
        publisher.open().await.unwrap();
        publisher.publish("news", frame(b"hello")).await.unwrap();
        publisher.publish("sports", frame(b"ignored")).await.unwrap();

        let payload = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_second_subscribe_rejected() {
        let broker = MemoryBroker::new();
        let subscriber = broker.subscriber();
        let (callback, _rx) = collector();
        subscriber
            .subscribe("a", Arc::clone(&callback), ErrorSignal::new())
            .await
            .unwrap();
        let err = subscriber.subscribe("b", callback, ErrorSignal::new()).await.unwrap_err();
        assert!(matches!(err, TransportError::AlreadySubscribed { topic } if topic == "a"));
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let broker = MemoryBroker::new();
        let subscriber = broker.subscriber();
        let (callback, _rx) = collector();
        subscriber.subscribe("a", callback, ErrorSignal::new()).await.unwrap();
        subscriber.unsubscribe().await.unwrap();
        subscriber.unsubscribe().await.unwrap();
        assert!(!subscriber.is_subscribed());
        assert_eq!(broker.subscriber_count("a"), 0);
    }

    #[tokio::test]
    async fn test_disconnect_fires_error_signal() {
        let broker = MemoryBroker::new();
        let subscriber = broker.subscriber();
        let (callback, _rx) = collector();
        let errors = ErrorSignal::new();
        subscriber.subscribe("a", callback, errors.clone()).await.unwrap();
        broker.disconnect("broker restart");
        let error = errors.fired().await;
        assert!(matches!(
            &*error,
            TransportError::Disconnected { reason } if reason == "broker restart"
        ));
        assert!(!subscriber.is_subscribed());
    }

    #[tokio::test]
    async fn test_slow_subscriber_applies_backpressure() {
        let broker = MemoryBroker::with_config(BrokerConfig::default().with_channel_capacity(1));
        let subscriber = broker.subscriber();
        let gate = Arc::new(tokio::sync::Notify::new());
        let callback: FrameCallback = {
            let gate = Arc::clone(&gate);
            Arc::new(move |_payload: Bytes| {
                let gate = Arc::clone(&gate);
                async move { gate.notified().await }.boxed()
            })
        };
        subscriber.subscribe("slow", callback, ErrorSignal::new()).await.unwrap();

        let publisher = broker.publisher();
        publisher.open().await.unwrap();
        // One frame held by the callback, one in the channel, the third waits.
        publisher.publish("slow", frame(b"1")).await.unwrap();
        tokio::task::yield_now().await;
        publisher.publish("slow", frame(b"2")).await.unwrap();
        let third = publisher.publish("slow", frame(b"3"));
        assert!(tokio::time::timeout(Duration::from_millis(50), third).await.is_err());
    }

    #[tokio::test]
    async fn test_publish_size_limit() {
        let broker = MemoryBroker::with_config(BrokerConfig::default().with_publish_size_limit(8));
        let publisher = broker.publisher();
        publisher.open().await.unwrap();
        let err = publisher.publish("t", frame(b"too many bytes")).await.unwrap_err();
        assert!(err.is_too_large());
    }
}
