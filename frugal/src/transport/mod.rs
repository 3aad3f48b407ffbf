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

//! Transport abstractions for requests and pub/sub.
//!
//! Transports move opaque frames. A frame is a 4-byte big-endian size prefix
//! followed by the payload produced by a protocol writer; how frames travel is
//! entirely up to the implementation.
//!
//! - [`RequestTransport`]: request/response and oneway delivery for the
//!   [`Invoker`](crate::Invoker)
//! - [`PublisherTransport`] / [`SubscriberTransport`]: topic delivery for
//!   the [`scope`](crate::scope) layer, created per publisher or subscription
//!   through the factory traits
//!
//! The in-memory implementations ([`MemoryRequestTransport`] and
//! [`MemoryBroker`]) keep everything in process and are what the tests use.
//!
//! # Error signalling
//!
//! A subscriber transport that fails after `subscribe` returned reports the
//! failure through the [`ErrorSignal`] it was handed. Only the first failure is
//! kept.
//!
//! ```rust
//! use frugal::transport::{ErrorSignal, TransportError};
//!
//! let signal = ErrorSignal::new();
//! assert!(signal.fail(TransportError::Closed));
//! assert!(!signal.fail(TransportError::NotOpen));
//! assert!(matches!(*signal.error().unwrap(), TransportError::Closed));
//! ```

mod config;
mod error;
mod memory;
mod traits;

pub use config::{BrokerConfig, MemoryTransportConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_SIZE_LIMIT};
pub use error::TransportError;
pub use memory::{MemoryBroker, MemoryPublisher, MemoryRequestTransport, MemorySubscriber};
pub use traits::{
    ErrorSignal, FrameCallback, PublisherTransport, PublisherTransportFactory, RequestTransport,
    SubscriberTransport, SubscriberTransportFactory,
};
