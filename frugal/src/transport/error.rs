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
//! Transport layer error types.
//!
//! Transport errors describe failures below the protocol: the peer went away,
//! a deadline passed, or a frame did not fit in the transport's size limit.
//! Size-limit errors are special: the processor and invoker both treat them
//! as a distinct condition rather than a generic I/O failure.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by transports.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A request or published message exceeded the size limit.
    #[error("request too large: {size} bytes exceeds limit of {limit} bytes")]
    RequestTooLarge {
        /// Size the frame would have reached
        size: usize,
        /// Configured limit
        limit: usize,
    },

    /// A response exceeded the size limit.
    #[error("response too large: {message}")]
    ResponseTooLarge {
        /// Description from the side that detected it
        message: String,
    },

    /// The call did not complete before its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout {
        /// How long was waited
        duration: Duration,
    },

    /// The transport has not been opened.
    #[error("transport is not open")]
    NotOpen,

    /// The transport is already open.
    #[error("transport is already open")]
    AlreadyOpen,

    /// The transport was closed.
    #[error("transport is closed")]
    Closed,

    /// The peer disconnected.
    #[error("disconnected: {reason}")]
    Disconnected {
        /// Why the connection ended
        reason: String,
    },

    /// The subscriber transport is already subscribed.
    #[error("already subscribed to {topic}")]
    AlreadySubscribed {
        /// The current topic
        topic: String,
    },

    /// A frame was structurally invalid.
    #[error("invalid frame: {reason}")]
    InvalidFrame {
        /// Description of the problem
        reason: String,
    },

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// A request produced no reply frame.
    #[error("no response received")]
    NoResponse,

    /// I/O failure.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    /// Returns true for either too-large condition.
    #[must_use]
    pub const fn is_too_large(&self) -> bool {
        matches!(
            self,
            Self::RequestTooLarge { .. } | Self::ResponseTooLarge { .. }
        )
    }

    /// Returns true if retrying the same call could succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Disconnected { .. } | Self::NotOpen => true,
            Self::Io { source } => matches!(
                source.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Returns true if the transport can no longer be used.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Closed | Self::Disconnected { .. })
    }
}

impl From<io::Error> for TransportError {
    fn from(source: io::Error) -> Self {
        Self::Io { source }
    }
}
