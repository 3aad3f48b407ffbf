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
//! Core transport traits.

use super::TransportError;
use crate::context::Context;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::watch;

/// Request/response transport used by the client call path.
///
/// Frames handed to a transport carry the 4-byte size prefix; reply payloads
/// returned by [`RequestTransport::request`] do not.
#[async_trait]
pub trait RequestTransport: Send + Sync {
    /// Sends a frame without waiting for a reply.
    async fn oneway(&self, ctx: &Context, frame: Bytes) -> Result<(), TransportError>;

    /// Sends a frame and returns the reply payload.
    ///
    /// Implementations are expected to honor the context deadline.
    async fn request(&self, ctx: &Context, frame: Bytes) -> Result<Bytes, TransportError>;

    /// Maximum frame size accepted by this transport, zero if unbounded.
    fn request_size_limit(&self) -> usize;
}

/// Async callback receiving one frame payload per published message.
pub type FrameCallback = Arc<dyn Fn(Bytes) -> BoxFuture<'static, ()> + Send + Sync>;

/// Topic publishing transport.
#[async_trait]
pub trait PublisherTransport: Send + Sync {
    /// Opens the transport.
    async fn open(&self) -> Result<(), TransportError>;

    /// Closes the transport.
    async fn close(&self) -> Result<(), TransportError>;

    /// Returns true while open.
    fn is_open(&self) -> bool;

    /// Maximum frame size accepted by [`PublisherTransport::publish`], zero if unbounded.
    fn publish_size_limit(&self) -> usize;

    /// Publishes a frame to a topic.
    ///
    /// May wait for a slow consumer; the caller observes backpressure as a
    /// pending future rather than unbounded buffering.
    async fn publish(&self, topic: &str, frame: Bytes) -> Result<(), TransportError>;
}

/// Topic subscribing transport. Each instance carries at most one subscription.
#[async_trait]
pub trait SubscriberTransport: Send + Sync {
    /// Starts delivering frames published on `topic` to `callback`.
    ///
    /// A fatal transport failure must be reported through `errors`.
    async fn subscribe(
        &self,
        topic: &str,
        callback: FrameCallback,
        errors: ErrorSignal,
    ) -> Result<(), TransportError>;

    /// Stops delivery. Calling it twice is harmless.
    async fn unsubscribe(&self) -> Result<(), TransportError>;

    /// Returns true while subscribed.
    fn is_subscribed(&self) -> bool;
}

/// Creates publisher transports.
pub trait PublisherTransportFactory: Send + Sync {
    /// Returns a new publisher transport.
    fn publisher(&self) -> Arc<dyn PublisherTransport>;
}

/// Creates subscriber transports.
pub trait SubscriberTransportFactory: Send + Sync {
    /// Returns a new subscriber transport.
    fn subscriber(&self) -> Arc<dyn SubscriberTransport>;
}

/// One-shot channel through which a subscriber transport reports failure.
///
/// Only the first reported error is kept.
#[derive(Debug, Clone)]
pub struct ErrorSignal {
    tx: Arc<watch::Sender<Option<Arc<TransportError>>>>,
}

impl ErrorSignal {
    /// Creates an unfired signal.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Fires the signal. Returns false if it had already fired.
    pub fn fail(&self, error: TransportError) -> bool {
        let error = Arc::new(error);
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(error);
            true
        })
    }

    /// Returns the reported error, if any.
    #[must_use]
    pub fn error(&self) -> Option<Arc<TransportError>> {
        self.tx.borrow().clone()
    }

    /// Returns true once fired.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Waits until the signal fires and returns the error.
    pub async fn fired(&self) -> Arc<TransportError> {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(error) = rx.borrow_and_update().clone() {
                return error;
            }
            // The sender lives in `self`, so `changed` cannot observe a closed channel.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for ErrorSignal {
    fn default() -> Self {
        Self::new()
    }
}
