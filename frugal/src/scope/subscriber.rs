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
//! Subscribing side of a scope.

use super::{Subscription, TopicPrefix};
use crate::context::Context;
use crate::error::FrugalError;
use crate::exception::ApplicationExceptionKind;
use crate::middleware::{Method, Middleware, Payload};
use crate::observability::ScopeMetrics;
use crate::protocol::{read_request_header, Decode, Encode, MessageType, ProtocolFactory};
use crate::provider::ScopeProvider;
use crate::transport::{ErrorSignal, FrameCallback, SubscriberTransportFactory};
use bytes::Bytes;
use futures_util::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error};

/// Subscribes to the operations of one scope.
#[derive(Clone)]
pub struct ScopeSubscriber {
    scope: String,
    prefix: TopicPrefix,
    factory: Arc<dyn SubscriberTransportFactory>,
    protocol: Arc<dyn ProtocolFactory>,
    middleware: Vec<Middleware>,
    metrics: Arc<ScopeMetrics>,
}

impl ScopeSubscriber {
    /// Creates a subscriber for `scope`.
    #[must_use]
    pub fn new(provider: &ScopeProvider, scope: &str, prefix: TopicPrefix) -> Self {
        Self {
            scope: scope.to_string(),
            prefix,
            factory: provider.subscriber_factory(),
            protocol: provider.protocol(),
            middleware: provider.middleware().to_vec(),
            metrics: Arc::new(ScopeMetrics::new()),
        }
    }

    /// The scope name.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Delivery counters, shared by every subscription made here.
    #[must_use]
    pub fn metrics(&self) -> Arc<ScopeMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Subscribes `handler` to `operation` on the topic rendered from `variables`.
    ///
    /// Each subscription gets its own transport. Messages are delivered one
    /// at a time in arrival order; a frame that fails to decode or names a
    /// different operation is logged and dropped without ending the
    /// subscription. Handler errors are logged the same way.
    pub async fn subscribe<T, S, H, Fut>(
        &self,
        operation: &str,
        variables: &[S],
        handler: H,
    ) -> Result<Subscription, FrugalError>
    where
        T: Encode + Decode + Payload,
        S: AsRef<str> + Sync,
        H: Fn(Context, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), FrugalError>> + Send + 'static,
    {
        let topic = self.prefix.topic(variables, &self.scope, operation)?;
        let method = Arc::new(Method::<T, ()>::new(
            operation,
            handler,
            self.middleware.clone(),
        ));

        let callback: FrameCallback = {
            let protocol = Arc::clone(&self.protocol);
            let metrics = Arc::clone(&self.metrics);
            let topic = topic.clone();
            Arc::new(move |payload: Bytes| {
                let protocol = Arc::clone(&protocol);
                let method = Arc::clone(&method);
                let metrics = Arc::clone(&metrics);
                let topic = topic.clone();
                async move {
                    match deliver(&*protocol, &method, payload).await {
                        Ok(()) => metrics.record_delivered(),
                        Err(err) => {
                            metrics.record_delivery_error();
                            error!(
                                topic = %topic,
                                error = %err,
                                "failed to deliver published message"
                            );
                        }
                    }
                }
                .boxed()
            })
        };

        let transport = self.factory.subscriber();
        let errors = ErrorSignal::new();
        transport.subscribe(&topic, callback, errors.clone()).await?;
        debug!(topic = %topic, "subscribed");
        Ok(Subscription::new(topic, transport, errors))
    }
}

impl fmt::Debug for ScopeSubscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeSubscriber")
            .field("scope", &self.scope)
            .field("prefix", &self.prefix.template())
            .field("protocol", &self.protocol.name())
            .finish_non_exhaustive()
    }
}

/// Decodes one published frame and runs it through `method`.
async fn deliver<T>(
    protocol: &dyn ProtocolFactory,
    method: &Method<T, ()>,
    payload: Bytes,
) -> Result<(), FrugalError>
where
    T: Encode + Decode + Payload,
{
    let (ctx, message) = {
        let mut reader = protocol.reader(payload);
        let ctx = read_request_header(&mut *reader)?;
        let header = reader.read_message_begin()?;
        if header.name != method.name() {
            reader.skip(T::TTYPE)?;
            reader.read_message_end()?;
            return Err(FrugalError::application(
                ApplicationExceptionKind::UnknownMethod,
                format!("Unknown function {}", header.name),
            ));
        }
        if header.kind != MessageType::Call {
            return Err(FrugalError::application(
                ApplicationExceptionKind::InvalidMessageType,
                format!("{} failed: invalid message type {}", header.name, header.kind),
            ));
        }
        let message = T::decode(&mut *reader)?;
        reader.read_message_end()?;
        (ctx, message)
    };
    method.invoke(ctx, message).await
}
