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
//! Publishing side of a scope.

use super::TopicPrefix;
use crate::context::Context;
use crate::error::FrugalError;
use crate::middleware::{Method, Middleware, Payload};
use crate::observability::ScopeMetrics;
use crate::protocol::{
    write_request_header_with, Encode, MessageHeader, MessageType, OutputBuffer, ProtocolFactory,
};
use crate::provider::ScopeProvider;
use crate::transport::PublisherTransport;
use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

struct PublisherInner {
    scope: String,
    prefix: TopicPrefix,
    transport: Arc<dyn PublisherTransport>,
    protocol: Arc<dyn ProtocolFactory>,
    middleware: Vec<Middleware>,
    seq: AtomicI32,
    metrics: Arc<ScopeMetrics>,
}

/// Publishes the operations of one scope.
///
/// Cloning is cheap; clones share the transport and sequence counter.
#[derive(Clone)]
pub struct ScopePublisher {
    inner: Arc<PublisherInner>,
}

impl ScopePublisher {
    /// Creates a publisher for `scope` using a fresh transport from `provider`.
    #[must_use]
    pub fn new(provider: &ScopeProvider, scope: &str, prefix: TopicPrefix) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                scope: scope.to_string(),
                prefix,
                transport: provider.publisher_factory().publisher(),
                protocol: provider.protocol(),
                middleware: provider.middleware().to_vec(),
                seq: AtomicI32::new(0),
                metrics: Arc::new(ScopeMetrics::new()),
            }),
        }
    }

    /// The scope name.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.inner.scope
    }

    /// The topic prefix template.
    #[must_use]
    pub fn prefix(&self) -> &TopicPrefix {
        &self.inner.prefix
    }

    /// Publish counters.
    #[must_use]
    pub fn metrics(&self) -> Arc<ScopeMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    /// Opens the underlying transport.
    pub async fn open(&self) -> Result<(), FrugalError> {
        Ok(self.inner.transport.open().await?)
    }

    /// Closes the underlying transport.
    pub async fn close(&self) -> Result<(), FrugalError> {
        Ok(self.inner.transport.close().await?)
    }

    /// Returns true while the transport is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.transport.is_open()
    }

    /// Publishes `payload` as `operation` without running middleware.
    ///
    /// The payload is written as a bare value inside a `CALL` message. Each
    /// prefix variable is also sent as a `_topic_<variable>` request header.
    /// Waits while the transport applies backpressure.
    pub async fn publish<T, S>(
        &self,
        ctx: &Context,
        operation: &str,
        variables: &[S],
        payload: &T,
    ) -> Result<(), FrugalError>
    where
        T: Encode + Sync + ?Sized,
        S: AsRef<str> + Sync,
    {
        let result = self.send(ctx, operation, variables, payload).await;
        match &result {
            Ok(()) => self.inner.metrics.record_published(),
            Err(error) => {
                self.inner.metrics.record_publish_error();
                warn!(
                    scope = %self.inner.scope,
                    operation,
                    correlation_id = %ctx.correlation_id(),
                    error = %error,
                    "publish failed"
                );
            }
        }
        result
    }

    async fn send<T, S>(
        &self,
        ctx: &Context,
        operation: &str,
        variables: &[S],
        payload: &T,
    ) -> Result<(), FrugalError>
    where
        T: Encode + Sync + ?Sized,
        S: AsRef<str> + Sync,
    {
        let inner = &self.inner;
        let topic = inner.prefix.topic(variables, &inner.scope, operation)?;
        let op_id = ctx.assign_op_id();
        let seq = inner.seq.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let frame = {
            let mut buffer = OutputBuffer::new(inner.transport.publish_size_limit());
            {
                let mut writer = inner.protocol.writer(&mut buffer);
                write_request_header_with(&mut *writer, ctx, inner.prefix.header_pairs(variables))?;
                writer.write_message_begin(&MessageHeader::new(operation, MessageType::Call, seq))?;
                payload.encode(&mut *writer)?;
                writer.write_message_end()?;
                writer.flush()?;
            }
            buffer.take_frame()
        };
        debug!(
            topic = %topic,
            correlation_id = %ctx.correlation_id(),
            op_id,
            seq,
            bytes = frame.len(),
            "publishing"
        );
        inner.transport.publish(&topic, frame).await?;
        Ok(())
    }

    /// Binds `operation` to a typed publish call wrapped in the provider's middleware.
    #[must_use]
    pub fn operation<T>(&self, operation: &str) -> PublishOperation<T>
    where
        T: Encode + Payload + Sync,
    {
        let publisher = self.clone();
        let name: Arc<str> = Arc::from(operation);
        let op_name = Arc::clone(&name);
        let method = Method::new(
            name,
            move |ctx: Context, publication: Publication<T>| {
                let publisher = publisher.clone();
                let operation = Arc::clone(&op_name);
                async move {
                    publisher
                        .publish(
                            &ctx,
                            &operation,
                            publication.variables.as_slice(),
                            &publication.payload,
                        )
                        .await
                }
            },
            self.inner.middleware.clone(),
        );
        PublishOperation { method }
    }
}

impl fmt::Debug for ScopePublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopePublisher")
            .field("scope", &self.inner.scope)
            .field("prefix", &self.inner.prefix.template())
            .field("protocol", &self.inner.protocol.name())
            .finish_non_exhaustive()
    }
}

/// Arguments seen by middleware on a publish call.
#[derive(Debug, Clone, PartialEq)]
pub struct Publication<T> {
    /// Prefix variable values
    pub variables: Vec<String>,
    /// The message
    pub payload: T,
}

/// A typed publish call for one operation.
pub struct PublishOperation<T> {
    method: Method<Publication<T>, ()>,
}

impl<T: Encode + Payload + Sync> PublishOperation<T> {
    /// The operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.method.name()
    }

    /// Publishes `payload` through the middleware chain.
    pub async fn publish<S: AsRef<str> + Sync>(
        &self,
        ctx: &Context,
        variables: &[S],
        payload: T,
    ) -> Result<(), FrugalError> {
        let publication = Publication {
            variables: variables.iter().map(|v| v.as_ref().to_string()).collect(),
            payload,
        };
        self.method.invoke(ctx.clone(), publication).await
    }

    /// Appends a middleware to this operation.
    pub fn add_middleware(&self, middleware: Middleware) {
        self.method.add_middleware(middleware);
    }
}

impl<T> fmt::Debug for PublishOperation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishOperation")
            .field("method", &self.method)
            .finish()
    }
}
