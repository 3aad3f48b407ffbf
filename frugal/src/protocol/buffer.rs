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
//! Size-limited in-memory output buffers.
//!
//! A protocol writer never talks to a socket directly. It writes into an
//! [`OutputSink`], which is usually an [`OutputBuffer`] holding exactly one
//! frame. Transports take the finished frame out of the buffer once the
//! writer has flushed.

use crate::transport::TransportError;
use bytes::{BufMut, Bytes, BytesMut};

/// Size in bytes of the big-endian frame length prefix.
pub const FRAME_SIZE_PREFIX: usize = 4;

/// Destination for encoded bytes.
///
/// Implementations that enforce a size limit must discard everything written
/// so far when they reject a write, so that a partial frame can never be
/// observed downstream.
pub trait OutputSink: Send {
    /// Appends bytes to the current frame.
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Marks the end of the current frame.
    fn flush(&mut self) -> Result<(), TransportError>;
}

/// Which side of an exchange a buffer belongs to.
///
/// Determines the too-large error reported when the limit is exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRole {
    /// Client request or published message
    Request,
    /// Server response
    Response,
}

/// An in-memory frame with an optional size limit.
///
/// The limit includes the 4-byte frame size prefix. A limit of zero means
/// unbounded.
#[derive(Debug)]
pub struct OutputBuffer {
    buf: BytesMut,
    limit: usize,
    role: BufferRole,
}

impl OutputBuffer {
    /// Creates a request buffer with the given limit.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self::with_role(limit, BufferRole::Request)
    }

    /// Creates a response buffer with the given limit.
    #[must_use]
    pub fn for_response(limit: usize) -> Self {
        Self::with_role(limit, BufferRole::Response)
    }

    /// Creates a buffer with an explicit role.
    #[must_use]
    pub fn with_role(limit: usize, role: BufferRole) -> Self {
        Self {
            buf: BytesMut::with_capacity(256),
            limit,
            role,
        }
    }

    /// Returns the configured size limit, zero if unbounded.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Number of payload bytes written, excluding the frame prefix.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Discards the current contents.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Removes and returns the payload without a frame prefix.
    pub fn take_payload(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    /// Removes and returns the payload prefixed with its 4-byte length.
    pub fn take_frame(&mut self) -> Bytes {
        let payload = self.buf.split();
        let mut frame = BytesMut::with_capacity(FRAME_SIZE_PREFIX + payload.len());
        frame.put_u32(payload.len() as u32);
        frame.extend_from_slice(&payload);
        frame.freeze()
    }

    fn too_large(&self, size: usize) -> TransportError {
        match self.role {
            BufferRole::Request => TransportError::RequestTooLarge {
                size,
                limit: self.limit,
            },
            BufferRole::Response => TransportError::ResponseTooLarge {
                message: format!(
                    "response size {size} exceeds limit of {} bytes",
                    self.limit
                ),
            },
        }
    }
}

impl OutputSink for OutputBuffer {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let size = FRAME_SIZE_PREFIX + self.buf.len() + bytes.len();
        if self.limit > 0 && size > self.limit {
            self.buf.clear();
            return Err(self.too_large(size));
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Strips the 4-byte frame size prefix from a frame.
///
/// Fails if the prefix is missing or disagrees with the frame length.
pub fn strip_frame_prefix(mut frame: Bytes) -> Result<Bytes, TransportError> {
    if frame.len() < FRAME_SIZE_PREFIX {
        return Err(TransportError::InvalidFrame {
            reason: format!("frame of {} bytes has no size prefix", frame.len()),
        });
    }
    let declared = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
    let payload = frame.split_off(FRAME_SIZE_PREFIX);
    if declared != payload.len() {
        return Err(TransportError::InvalidFrame {
            reason: format!(
                "frame declares {declared} bytes but carries {}",
                payload.len()
            ),
        });
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_prefix() {
        let mut buffer = OutputBuffer::new(0);
        buffer.write(b"hello").unwrap();
        let frame = buffer.take_frame();
        assert_eq!(&frame[..4], &[0, 0, 0, 5]);
        assert_eq!(&frame[4..], b"hello");
        assert!(buffer.is_empty());
        assert_eq!(strip_frame_prefix(frame).unwrap(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn test_limit_resets_buffer() {
        let mut buffer = OutputBuffer::new(10);
        buffer.write(b"abcd").unwrap();
        let err = buffer.write(b"efgh").unwrap_err();
        assert!(matches!(
            err,
            TransportError::RequestTooLarge { size: 12, limit: 10 }
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_response_role_reports_response_too_large() {
        let mut buffer = OutputBuffer::for_response(6);
        let err = buffer.write(b"abc").unwrap_err();
        assert!(matches!(err, TransportError::ResponseTooLarge { .. }));
        assert!(err.is_too_large());
    }

    #[test]
    fn test_strip_rejects_mismatched_prefix() {
        let frame = Bytes::from_static(&[0, 0, 0, 9, 1, 2]);
        assert!(strip_frame_prefix(frame).is_err());
        assert!(strip_frame_prefix(Bytes::from_static(&[0, 1])).is_err());
    }
}
