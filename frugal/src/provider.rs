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
//! Provider bundles.
//!
//! A provider groups what generated clients, publishers and subscribers need:
//! a transport (or transport factories), a protocol and the middleware to
//! wrap every method with.

use crate::middleware::Middleware;
use crate::protocol::ProtocolFactory;
use crate::scope::{ScopePublisher, ScopeSubscriber, TopicPrefix};
use crate::transport::{PublisherTransportFactory, RequestTransport, SubscriberTransportFactory};
use std::fmt;
use std::sync::Arc;

/// Everything a service client needs.
#[derive(Clone)]
pub struct ServiceProvider {
    transport: Arc<dyn RequestTransport>,
    protocol: Arc<dyn ProtocolFactory>,
    middleware: Vec<Middleware>,
}

impl ServiceProvider {
    /// Creates a provider without middleware.
    #[must_use]
    pub fn new(transport: Arc<dyn RequestTransport>, protocol: Arc<dyn ProtocolFactory>) -> Self {
        Self {
            transport,
            protocol,
            middleware: Vec::new(),
        }
    }

    /// Appends a middleware applied to every client method.
    #[must_use]
    pub fn with_middleware(mut self, middleware: Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// The request transport.
    #[must_use]
    pub fn transport(&self) -> Arc<dyn RequestTransport> {
        Arc::clone(&self.transport)
    }

    /// The protocol factory.
    #[must_use]
    pub fn protocol(&self) -> Arc<dyn ProtocolFactory> {
        Arc::clone(&self.protocol)
    }

    /// Registered middleware, outermost first.
    #[must_use]
    pub fn middleware(&self) -> &[Middleware] {
        &self.middleware
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("protocol", &self.protocol.name())
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

/// Everything scope publishers and subscribers need.
#[derive(Clone)]
pub struct ScopeProvider {
    publishers: Arc<dyn PublisherTransportFactory>,
    subscribers: Arc<dyn SubscriberTransportFactory>,
    protocol: Arc<dyn ProtocolFactory>,
    middleware: Vec<Middleware>,
}

impl ScopeProvider {
    /// Creates a provider without middleware.
    #[must_use]
    pub fn new(
        publishers: Arc<dyn PublisherTransportFactory>,
        subscribers: Arc<dyn SubscriberTransportFactory>,
        protocol: Arc<dyn ProtocolFactory>,
    ) -> Self {
        Self {
            publishers,
            subscribers,
            protocol,
            middleware: Vec::new(),
        }
    }

    /// Appends a middleware applied to every publish and subscribe handler.
    #[must_use]
    pub fn with_middleware(mut self, middleware: Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Factory for publisher transports.
    #[must_use]
    pub fn publisher_factory(&self) -> Arc<dyn PublisherTransportFactory> {
        Arc::clone(&self.publishers)
    }

    /// Factory for subscriber transports.
    #[must_use]
    pub fn subscriber_factory(&self) -> Arc<dyn SubscriberTransportFactory> {
        Arc::clone(&self.subscribers)
    }

    /// The protocol factory.
    #[must_use]
    pub fn protocol(&self) -> Arc<dyn ProtocolFactory> {
        Arc::clone(&self.protocol)
    }

    /// Registered middleware, outermost first.
    #[must_use]
    pub fn middleware(&self) -> &[Middleware] {
        &self.middleware
    }

    /// Creates a publisher for `scope`.
    #[must_use]
    pub fn publisher(&self, scope: &str, prefix: TopicPrefix) -> ScopePublisher {
        ScopePublisher::new(self, scope, prefix)
    }

    /// Creates a subscriber for `scope`.
    #[must_use]
    pub fn subscriber(&self, scope: &str, prefix: TopicPrefix) -> ScopeSubscriber {
        ScopeSubscriber::new(self, scope, prefix)
    }
}

impl fmt::Debug for ScopeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeProvider")
            .field("protocol", &self.protocol.name())
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}
