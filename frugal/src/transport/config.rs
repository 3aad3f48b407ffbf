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
//! Configuration for the in-memory transports.

/// Default size limit for frames, in bytes.
pub const DEFAULT_SIZE_LIMIT: usize = 1024 * 1024;

/// Default number of frames buffered per subscription.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Configuration for [`MemoryRequestTransport`](super::MemoryRequestTransport).
///
/// # Examples
///
/// ```rust
/// use frugal::transport::MemoryTransportConfig;
///
/// let config = MemoryTransportConfig::default()
///     .with_request_size_limit(64 * 1024)
///     .with_response_size_limit(0);
/// assert_eq!(config.request_size_limit, 64 * 1024);
/// assert_eq!(config.response_size_limit, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryTransportConfig {
    /// Largest request frame accepted, zero for unbounded.
    ///
    /// Default: 1 MiB
    pub request_size_limit: usize,

    /// Largest response frame the processor may write, zero for unbounded.
    ///
    /// Default: 1 MiB
    pub response_size_limit: usize,
}

impl Default for MemoryTransportConfig {
    fn default() -> Self {
        Self {
            request_size_limit: DEFAULT_SIZE_LIMIT,
            response_size_limit: DEFAULT_SIZE_LIMIT,
        }
    }
}

impl MemoryTransportConfig {
    /// Sets the request size limit.
    #[must_use]
    pub fn with_request_size_limit(mut self, limit: usize) -> Self {
        self.request_size_limit = limit;
        self
    }

    /// Sets the response size limit.
    #[must_use]
    pub fn with_response_size_limit(mut self, limit: usize) -> Self {
        self.response_size_limit = limit;
        self
    }
}

/// Configuration for [`MemoryBroker`](super::MemoryBroker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Frames buffered per subscription before publishers wait.
    ///
    /// Default: 64
    pub channel_capacity: usize,

    /// Largest frame accepted by publishers, zero for unbounded.
    ///
    /// Default: 1 MiB
    pub publish_size_limit: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            publish_size_limit: DEFAULT_SIZE_LIMIT,
        }
    }
}

impl BrokerConfig {
    /// Sets the per-subscription buffer.
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Sets the publish size limit.
    #[must_use]
    pub fn with_publish_size_limit(mut self, limit: usize) -> Self {
        self.publish_size_limit = limit;
        self
    }
}
