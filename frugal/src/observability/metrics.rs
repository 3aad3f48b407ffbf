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
//! Counters for processors and pub/sub endpoints.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing inbound request processing.
#[derive(Debug, Default)]
pub struct ProcessorMetrics {
    requests: AtomicU64,
    unknown_methods: AtomicU64,
    protocol_errors: AtomicU64,
    handler_errors: AtomicU64,
    too_large_responses: AtomicU64,
}

/// Point-in-time copy of [`ProcessorMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessorMetricsSnapshot {
    /// Frames whose message header was read
    pub requests: u64,
    /// Requests naming an unregistered function
    pub unknown_methods: u64,
    /// Requests whose arguments or framing could not be decoded
    pub protocol_errors: u64,
    /// Handler failures, declared exceptions excluded
    pub handler_errors: u64,
    /// Responses replaced by a response-too-large exception
    pub too_large_responses: u64,
}

impl ProcessorMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an inbound request.
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("frugal.processor.requests").increment(1);
    }

    /// Records a request for an unregistered function.
    pub fn record_unknown_method(&self) {
        self.unknown_methods.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("frugal.processor.unknown_methods").increment(1);
    }

    /// Records a decode failure.
    pub fn record_protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("frugal.processor.errors.protocol").increment(1);
    }

    /// Records a handler failure.
    pub fn record_handler_error(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("frugal.processor.errors.handler").increment(1);
    }

    /// Records a response replaced because it was too large.
    pub fn record_too_large_response(&self) {
        self.too_large_responses.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("frugal.processor.responses.too_large").increment(1);
    }

    /// Returns the current values.
    #[must_use]
    pub fn snapshot(&self) -> ProcessorMetricsSnapshot {
        ProcessorMetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            unknown_methods: self.unknown_methods.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            too_large_responses: self.too_large_responses.load(Ordering::Relaxed),
        }
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.unknown_methods.store(0, Ordering::Relaxed);
        self.protocol_errors.store(0, Ordering::Relaxed);
        self.handler_errors.store(0, Ordering::Relaxed);
        self.too_large_responses.store(0, Ordering::Relaxed);
    }
}

/// Counters for a scope publisher or subscriber.
#[derive(Debug, Default)]
pub struct ScopeMetrics {
    published: AtomicU64,
    publish_errors: AtomicU64,
    delivered: AtomicU64,
    delivery_errors: AtomicU64,
}

/// Point-in-time copy of [`ScopeMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeMetricsSnapshot {
    /// Messages handed to the transport
    pub published: u64,
    /// Publishes that failed
    pub publish_errors: u64,
    /// Messages decoded and handed to a callback
    pub delivered: u64,
    /// Inbound frames rejected or failed in the callback
    pub delivery_errors: u64,
}

impl ScopeMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful publish.
    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("frugal.scope.published").increment(1);
    }

    /// Records a failed publish.
    pub fn record_publish_error(&self) {
        self.publish_errors.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("frugal.scope.errors.publish").increment(1);
    }

    /// Records a delivered message.
    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("frugal.scope.delivered").increment(1);
    }

    /// Records a rejected or failed delivery.
    pub fn record_delivery_error(&self) {
        self.delivery_errors.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("frugal.scope.errors.delivery").increment(1);
    }

    /// Returns the current values.
    #[must_use]
    pub fn snapshot(&self) -> ScopeMetricsSnapshot {
        ScopeMetricsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            publish_errors: self.publish_errors.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            delivery_errors: self.delivery_errors.load(Ordering::Relaxed),
        }
    }
}
