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
//! Protocol error types.

use crate::transport::TransportError;
use thiserror::Error;

/// Errors raised while encoding or decoding a frame.
///
/// Every pack/unpack operation returns `Result<_, ProtocolError>`; the first
/// failure aborts the enclosing struct and is reported once by its caller.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The underlying buffer rejected a write.
    #[error("transport error during encoding: {0}")]
    Transport(#[from] TransportError),

    /// The input ended before a value was complete.
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes required by the current read
        needed: usize,
        /// Bytes left in the input
        remaining: usize,
    },

    /// A message began with an unrecognised protocol id or version.
    #[error("bad protocol version: {message}")]
    BadVersion {
        /// Description of what was found
        message: String,
    },

    /// A length or size field was negative or implausibly large.
    #[error("invalid size {size}")]
    InvalidSize {
        /// The offending size as read from the wire
        size: i64,
    },

    /// A type tag did not correspond to any known type.
    #[error("unknown type tag {tag:#04x}")]
    UnknownType {
        /// The raw type tag
        tag: u8,
    },

    /// A string field did not contain valid UTF-8.
    #[error("invalid utf-8 in string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Skip or decode recursed past the nesting limit.
    #[error("maximum nesting depth of {limit} exceeded")]
    DepthLimit {
        /// The configured limit
        limit: usize,
    },

    /// The frugal header block was malformed.
    #[error("malformed header block: {message}")]
    InvalidHeaders {
        /// Description of the problem
        message: String,
    },

    /// The data was structurally valid but semantically wrong for the target type.
    #[error("invalid data: {message}")]
    InvalidData {
        /// Description of the problem
        message: String,
    },
}

impl ProtocolError {
    /// Creates an [`ProtocolError::InvalidData`] error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Returns true if the error was caused by an output size limit.
    #[must_use]
    pub fn is_too_large(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_too_large())
    }

    /// Returns true if the error was caused by truncated input.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::UnexpectedEof { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_large_classification() {
        let error = ProtocolError::from(TransportError::RequestTooLarge {
            size: 10,
            limit: 8,
        });
        assert!(error.is_too_large());
        assert!(!ProtocolError::invalid_data("nope").is_too_large());
    }

    #[test]
    fn test_eof_display() {
        let error = ProtocolError::UnexpectedEof {
            needed: 4,
            remaining: 1,
        };
        assert!(error.is_eof());
        assert!(error.to_string().contains("needed 4 bytes"));
    }
}
