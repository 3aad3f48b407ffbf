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
//! Subscription handles.

use crate::error::FrugalError;
use crate::transport::{ErrorSignal, SubscriberTransport, TransportError};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// A live subscription.
///
/// Ends when [`Subscription::unsubscribe`] is called or the transport reports
/// an error, whichever happens first. An ended subscription is never
/// restarted; subscribe again to resume. Dropping the handle does not
/// unsubscribe.
pub struct Subscription {
    topic: String,
    transport: Arc<dyn SubscriberTransport>,
    errors: ErrorSignal,
    released: watch::Sender<bool>,
}

impl Subscription {
    pub(crate) fn new(
        topic: String,
        transport: Arc<dyn SubscriberTransport>,
        errors: ErrorSignal,
    ) -> Self {
        let (released, _) = watch::channel(false);
        Self {
            topic,
            transport,
            errors,
            released,
        }
    }

    /// The subscribed topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns true until unsubscribed or failed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !*self.released.borrow() && !self.errors.is_fired() && self.transport.is_subscribed()
    }

    /// Stops delivery. Calling it again is a no-op.
    pub async fn unsubscribe(&self) -> Result<(), FrugalError> {
        if self.released.send_replace(true) {
            return Ok(());
        }
        debug!(topic = %self.topic, "unsubscribing");
        self.transport.unsubscribe().await?;
        Ok(())
    }

    /// The transport error that ended the subscription, if any.
    #[must_use]
    pub fn error(&self) -> Option<Arc<TransportError>> {
        self.errors.error()
    }

    /// The signal fired by the transport on failure.
    #[must_use]
    pub fn error_signal(&self) -> &ErrorSignal {
        &self.errors
    }

    /// Waits until the subscription ends.
    ///
    /// Returns the transport error, or `None` after an explicit unsubscribe.
    pub async fn terminated(&self) -> Option<Arc<TransportError>> {
        if let Some(error) = self.errors.error() {
            return Some(error);
        }
        let mut released = self.released.subscribe();
        tokio::select! {
            error = self.errors.fired() => Some(error),
            _ = released.wait_for(|released| *released) => None,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("released", &*self.released.borrow())
            .field("error", &self.errors.error())
            .finish()
    }
}
