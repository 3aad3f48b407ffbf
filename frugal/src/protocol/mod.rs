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
//! Structured encoding capability.
//!
//! The runtime never touches wire bytes directly. Everything it writes goes
//! through a [`ProtocolWriter`] and everything it reads comes from a
//! [`ProtocolReader`]. Two encodings are provided:
//!
//! - [`CompactProtocolFactory`]: the Thrift compact protocol
//! - [`BinaryProtocolFactory`]: the Thrift strict binary protocol
//!
//! Every operation returns a `Result`; the first failure aborts the value
//! being encoded or decoded and is propagated with `?`, so a struct is
//! checked once by its caller.
//!
//! # Example
//!
//! ```rust
//! use frugal::protocol::{CompactProtocolFactory, OutputBuffer, ProtocolFactory};
//! use frugal::protocol::{MessageHeader, MessageType};
//!
//! # fn main() -> Result<(), frugal::protocol::ProtocolError> {
//! let factory = CompactProtocolFactory;
//! let mut buffer = OutputBuffer::new(0);
//! {
//!     let mut writer = factory.writer(&mut buffer);
//!     writer.write_message_begin(&MessageHeader::new("ping", MessageType::Call, 0))?;
//!     writer.write_message_end()?;
//!     writer.flush()?;
//! }
//! let mut reader = factory.reader(buffer.take_payload());
//! assert_eq!(reader.read_message_begin()?.name, "ping");
//! # Ok(())
//! # }
//! ```

mod binary;
mod buffer;
mod codec;
mod compact;
mod error;
mod headers;
mod types;

pub use binary::{BinaryProtocolFactory, BinaryProtocolReader, BinaryProtocolWriter};
pub use buffer::{strip_frame_prefix, BufferRole, OutputBuffer, OutputSink, FRAME_SIZE_PREFIX};
pub use codec::{
    read_struct, write_field, write_optional_field, write_struct, Decode, Encode,
};
pub use compact::{CompactProtocolFactory, CompactProtocolReader, CompactProtocolWriter};
pub use error::ProtocolError;
pub use headers::{
    decode_headers, encode_headers, read_request_header, read_response_header,
    write_request_header, write_response_header, HEADER_VERSION,
};
pub(crate) use headers::{write_request_header_with, write_reserved_response_header};
pub use types::{FieldHeader, ListHeader, MapHeader, MessageHeader, MessageType, TType};

use bytes::Bytes;

/// Maximum nesting depth walked by [`ProtocolReader::skip`].
pub const MAX_SKIP_DEPTH: usize = 64;

/// Encoding half of the protocol capability.
pub trait ProtocolWriter: Send {
    /// Writes the begin marker of a message frame.
    fn write_message_begin(&mut self, header: &MessageHeader) -> Result<(), ProtocolError>;
    /// Writes the end marker of a message frame.
    fn write_message_end(&mut self) -> Result<(), ProtocolError>;
    /// Writes the begin marker of a struct.
    fn write_struct_begin(&mut self, name: &str) -> Result<(), ProtocolError>;
    /// Writes the end marker of a struct.
    fn write_struct_end(&mut self) -> Result<(), ProtocolError>;
    /// Writes a field header.
    fn write_field_begin(&mut self, header: &FieldHeader) -> Result<(), ProtocolError>;
    /// Writes a field end marker.
    fn write_field_end(&mut self) -> Result<(), ProtocolError>;
    /// Terminates the field list of the current struct.
    fn write_field_stop(&mut self) -> Result<(), ProtocolError>;
    /// Writes the begin marker of a list.
    fn write_list_begin(&mut self, header: &ListHeader) -> Result<(), ProtocolError>;
    /// Writes the end marker of a list.
    fn write_list_end(&mut self) -> Result<(), ProtocolError>;
    /// Writes the begin marker of a set.
    fn write_set_begin(&mut self, header: &ListHeader) -> Result<(), ProtocolError>;
    /// Writes the end marker of a set.
    fn write_set_end(&mut self) -> Result<(), ProtocolError>;
    /// Writes the begin marker of a map.
    fn write_map_begin(&mut self, header: &MapHeader) -> Result<(), ProtocolError>;
    /// Writes the end marker of a map.
    fn write_map_end(&mut self) -> Result<(), ProtocolError>;
    /// Writes a boolean.
    fn write_bool(&mut self, value: bool) -> Result<(), ProtocolError>;
    /// Writes a signed byte.
    fn write_i8(&mut self, value: i8) -> Result<(), ProtocolError>;
    /// Writes a 16-bit integer.
    fn write_i16(&mut self, value: i16) -> Result<(), ProtocolError>;
    /// Writes a 32-bit integer.
    fn write_i32(&mut self, value: i32) -> Result<(), ProtocolError>;
    /// Writes a 64-bit integer.
    fn write_i64(&mut self, value: i64) -> Result<(), ProtocolError>;
    /// Writes a double.
    fn write_double(&mut self, value: f64) -> Result<(), ProtocolError>;
    /// Writes a UTF-8 string.
    fn write_string(&mut self, value: &str) -> Result<(), ProtocolError> {
        self.write_binary(value.as_bytes())
    }
    /// Writes opaque binary data.
    fn write_binary(&mut self, value: &[u8]) -> Result<(), ProtocolError>;
    /// Writes bytes verbatim, bypassing the encoding. Used for header blocks.
    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), ProtocolError>;
    /// Ends the current frame.
    fn flush(&mut self) -> Result<(), ProtocolError>;
}

/// Decoding half of the protocol capability.
pub trait ProtocolReader: Send {
    /// Reads the begin marker of a message frame.
    fn read_message_begin(&mut self) -> Result<MessageHeader, ProtocolError>;
    /// Reads the end marker of a message frame.
    fn read_message_end(&mut self) -> Result<(), ProtocolError>;
    /// Reads the begin marker of a struct.
    fn read_struct_begin(&mut self) -> Result<(), ProtocolError>;
    /// Reads the end marker of a struct.
    fn read_struct_end(&mut self) -> Result<(), ProtocolError>;
    /// Reads a field header; [`TType::Stop`] ends the struct.
    fn read_field_begin(&mut self) -> Result<FieldHeader, ProtocolError>;
    /// Reads a field end marker.
    fn read_field_end(&mut self) -> Result<(), ProtocolError>;
    /// Reads the begin marker of a list.
    fn read_list_begin(&mut self) -> Result<ListHeader, ProtocolError>;
    /// Reads the end marker of a list.
    fn read_list_end(&mut self) -> Result<(), ProtocolError>;
    /// Reads the begin marker of a set.
    fn read_set_begin(&mut self) -> Result<ListHeader, ProtocolError>;
    /// Reads the end marker of a set.
    fn read_set_end(&mut self) -> Result<(), ProtocolError>;
    /// Reads the begin marker of a map.
    fn read_map_begin(&mut self) -> Result<MapHeader, ProtocolError>;
    /// Reads the end marker of a map.
    fn read_map_end(&mut self) -> Result<(), ProtocolError>;
    /// Reads a boolean.
    fn read_bool(&mut self) -> Result<bool, ProtocolError>;
    /// Reads a signed byte.
    fn read_i8(&mut self) -> Result<i8, ProtocolError>;
    /// Reads a 16-bit integer.
    fn read_i16(&mut self) -> Result<i16, ProtocolError>;
    /// Reads a 32-bit integer.
    fn read_i32(&mut self) -> Result<i32, ProtocolError>;
    /// Reads a 64-bit integer.
    fn read_i64(&mut self) -> Result<i64, ProtocolError>;
    /// Reads a double.
    fn read_double(&mut self) -> Result<f64, ProtocolError>;
    /// Reads a UTF-8 string.
    fn read_string(&mut self) -> Result<String, ProtocolError> {
        let bytes = self.read_binary()?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }
    /// Reads opaque binary data.
    fn read_binary(&mut self) -> Result<Bytes, ProtocolError>;
    /// Reads exactly `len` bytes verbatim. Used for header blocks.
    fn read_raw(&mut self, len: usize) -> Result<Bytes, ProtocolError>;
    /// Number of unread input bytes.
    fn remaining(&self) -> usize;

    /// Reads and discards a value of the given type.
    fn skip(&mut self, ttype: TType) -> Result<(), ProtocolError> {
        skip_value(self, ttype, MAX_SKIP_DEPTH)
    }
}

fn skip_value<R: ProtocolReader + ?Sized>(
    reader: &mut R,
    ttype: TType,
    depth: usize,
) -> Result<(), ProtocolError> {
    if depth == 0 {
        return Err(ProtocolError::DepthLimit {
            limit: MAX_SKIP_DEPTH,
        });
    }
    match ttype {
        TType::Bool => reader.read_bool().map(drop),
        TType::Byte => reader.read_i8().map(drop),
        TType::I16 => reader.read_i16().map(drop),
        TType::I32 => reader.read_i32().map(drop),
        TType::I64 => reader.read_i64().map(drop),
        TType::Double => reader.read_double().map(drop),
        TType::String => reader.read_binary().map(drop),
        TType::Struct => {
            reader.read_struct_begin()?;
            loop {
                let field = reader.read_field_begin()?;
                if field.ttype == TType::Stop {
                    break;
                }
                skip_value(reader, field.ttype, depth - 1)?;
                reader.read_field_end()?;
            }
            reader.read_struct_end()
        }
        TType::Map => {
            let header = reader.read_map_begin()?;
            for _ in 0..header.size {
                skip_value(reader, header.key, depth - 1)?;
                skip_value(reader, header.value, depth - 1)?;
            }
            reader.read_map_end()
        }
        TType::Set => {
            let header = reader.read_set_begin()?;
            for _ in 0..header.size {
                skip_value(reader, header.element, depth - 1)?;
            }
            reader.read_set_end()
        }
        TType::List => {
            let header = reader.read_list_begin()?;
            for _ in 0..header.size {
                skip_value(reader, header.element, depth - 1)?;
            }
            reader.read_list_end()
        }
        TType::Stop | TType::Void => Err(ProtocolError::invalid_data(format!(
            "cannot skip value of type {ttype:?}"
        ))),
    }
}

/// Creates protocol readers and writers for one encoding.
///
/// Shared by clients, servers and pub/sub endpoints so that both sides of a
/// conversation agree on the wire format.
pub trait ProtocolFactory: Send + Sync + 'static {
    /// Returns a writer appending to `out`.
    fn writer<'a>(&self, out: &'a mut dyn OutputSink) -> Box<dyn ProtocolWriter + 'a>;

    /// Returns a reader over a complete frame payload.
    fn reader(&self, input: Bytes) -> Box<dyn ProtocolReader>;

    /// Returns the name of the encoding.
    fn name(&self) -> &'static str;
}
