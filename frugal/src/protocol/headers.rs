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
//! Frugal header block codec.
//!
//! Every frame starts with a header block:
//!
//! ```text
//! +---------+-------------+------------------------------------------+
//! | version | size (u32)  | (name len u32, name, value len u32, value)* |
//! +---------+-------------+------------------------------------------+
//! ```
//!
//! All integers are big-endian. Only version 0 is defined.

use super::{ProtocolError, ProtocolReader, ProtocolWriter};
use crate::context::Context;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;

/// The only supported header block version.
pub const HEADER_VERSION: u8 = 0x00;

const PREAMBLE: usize = 5;

/// Encodes a header map into a complete header block.
pub fn encode_headers(headers: &HashMap<String, String>) -> Result<Bytes, ProtocolError> {
    let body_len: usize = headers
        .iter()
        .map(|(name, value)| 8 + name.len() + value.len())
        .sum();
    let body_len = u32::try_from(body_len).map_err(|_| ProtocolError::InvalidHeaders {
        message: format!("header block of {body_len} bytes is too large"),
    })?;

    let mut block = BytesMut::with_capacity(PREAMBLE + body_len as usize);
    block.put_u8(HEADER_VERSION);
    block.put_u32(body_len);
    for (name, value) in headers {
        block.put_u32(name.len() as u32);
        block.put_slice(name.as_bytes());
        block.put_u32(value.len() as u32);
        block.put_slice(value.as_bytes());
    }
    Ok(block.freeze())
}

/// Decodes a complete header block.
pub fn decode_headers(mut block: Bytes) -> Result<HashMap<String, String>, ProtocolError> {
    if block.remaining() < PREAMBLE {
        return Err(ProtocolError::InvalidHeaders {
            message: format!("block of {} bytes is shorter than its preamble", block.len()),
        });
    }
    let version = block.get_u8();
    if version != HEADER_VERSION {
        return Err(ProtocolError::BadVersion {
            message: format!("unsupported header version {version}"),
        });
    }
    let size = block.get_u32() as usize;
    if size != block.remaining() {
        return Err(ProtocolError::InvalidHeaders {
            message: format!("declared size {size} but {} bytes follow", block.remaining()),
        });
    }

    let mut headers = HashMap::new();
    while block.has_remaining() {
        let name = read_sized_string(&mut block)?;
        let value = read_sized_string(&mut block)?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn read_sized_string(block: &mut Bytes) -> Result<String, ProtocolError> {
    if block.remaining() < 4 {
        return Err(ProtocolError::InvalidHeaders {
            message: "truncated header length".to_string(),
        });
    }
    let len = block.get_u32() as usize;
    if block.remaining() < len {
        return Err(ProtocolError::InvalidHeaders {
            message: format!("header of {len} bytes overruns block"),
        });
    }
    Ok(String::from_utf8(block.split_to(len).to_vec())?)
}

fn read_block(reader: &mut dyn ProtocolReader) -> Result<HashMap<String, String>, ProtocolError> {
    let preamble = reader.read_raw(PREAMBLE)?;
    let size = u32::from_be_bytes([preamble[1], preamble[2], preamble[3], preamble[4]]) as usize;
    if size > reader.remaining() {
        return Err(ProtocolError::InvalidHeaders {
            message: format!("declared size {size} exceeds frame"),
        });
    }
    let body = reader.read_raw(size)?;
    let mut block = BytesMut::with_capacity(PREAMBLE + size);
    block.put_slice(&preamble);
    block.put_slice(&body);
    decode_headers(block.freeze())
}

/// Writes the request headers of `ctx`. Later header additions are ignored.
pub fn write_request_header(
    writer: &mut dyn ProtocolWriter,
    ctx: &Context,
) -> Result<(), ProtocolError> {
    let block = encode_headers(&ctx.seal_request_headers())?;
    writer.write_raw(&block)
}

/// Writes the request headers of `ctx` plus `extra`, which never reach `ctx` itself.
pub(crate) fn write_request_header_with(
    writer: &mut dyn ProtocolWriter,
    ctx: &Context,
    extra: impl IntoIterator<Item = (String, String)>,
) -> Result<(), ProtocolError> {
    let mut headers = ctx.seal_request_headers();
    headers.extend(extra);
    let block = encode_headers(&headers)?;
    writer.write_raw(&block)
}

/// Reads request headers and builds the server-side context.
pub fn read_request_header(reader: &mut dyn ProtocolReader) -> Result<Context, ProtocolError> {
    let headers = read_block(reader)?;
    Ok(Context::from_request_headers(headers))
}

/// Writes the response headers of `ctx`. Later header additions are ignored.
pub fn write_response_header(
    writer: &mut dyn ProtocolWriter,
    ctx: &Context,
) -> Result<(), ProtocolError> {
    let block = encode_headers(&ctx.seal_response_headers())?;
    writer.write_raw(&block)
}

/// Writes only the correlation and operation id headers of `ctx`.
pub(crate) fn write_reserved_response_header(
    writer: &mut dyn ProtocolWriter,
    ctx: &Context,
) -> Result<(), ProtocolError> {
    let block = encode_headers(&ctx.reserved_response_headers())?;
    writer.write_raw(&block)
}

/// Reads response headers into `ctx`, preserving its correlation and operation ids.
pub fn read_response_header(
    reader: &mut dyn ProtocolReader,
    ctx: &Context,
) -> Result<(), ProtocolError> {
    let headers = read_block(reader)?;
    ctx.merge_response_headers(headers);
    Ok(())
}
