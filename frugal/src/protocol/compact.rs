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
//! Thrift compact protocol.
//!
//! Integers are zigzag varints, field ids are delta encoded against the
//! previous field of the same struct, and boolean field values are folded
//! into the field type nibble.

use super::{
    FieldHeader, ListHeader, MapHeader, MessageHeader, MessageType, OutputSink, ProtocolError,
    ProtocolFactory, ProtocolReader, ProtocolWriter, TType,
};
use bytes::{Buf, Bytes};

const PROTOCOL_ID: u8 = 0x82;
const VERSION: u8 = 1;
const VERSION_MASK: u8 = 0x1f;
const TYPE_SHIFT: u8 = 5;
const TYPE_BITS: u8 = 0x07;

const COMPACT_STOP: u8 = 0x00;
const COMPACT_BOOL_TRUE: u8 = 0x01;
const COMPACT_BOOL_FALSE: u8 = 0x02;
const COMPACT_BYTE: u8 = 0x03;
const COMPACT_I16: u8 = 0x04;
const COMPACT_I32: u8 = 0x05;
const COMPACT_I64: u8 = 0x06;
const COMPACT_DOUBLE: u8 = 0x07;
const COMPACT_BINARY: u8 = 0x08;
const COMPACT_LIST: u8 = 0x09;
const COMPACT_SET: u8 = 0x0a;
const COMPACT_MAP: u8 = 0x0b;
const COMPACT_STRUCT: u8 = 0x0c;

fn to_compact(ttype: TType) -> Result<u8, ProtocolError> {
    Ok(match ttype {
        TType::Stop => COMPACT_STOP,
        TType::Bool => COMPACT_BOOL_TRUE,
        TType::Byte => COMPACT_BYTE,
        TType::I16 => COMPACT_I16,
        TType::I32 => COMPACT_I32,
        TType::I64 => COMPACT_I64,
        TType::Double => COMPACT_DOUBLE,
        TType::String => COMPACT_BINARY,
        TType::List => COMPACT_LIST,
        TType::Set => COMPACT_SET,
        TType::Map => COMPACT_MAP,
        TType::Struct => COMPACT_STRUCT,
        TType::Void => {
            return Err(ProtocolError::invalid_data(
                "void has no compact representation",
            ))
        }
    })
}

fn from_compact(tag: u8) -> Result<TType, ProtocolError> {
    Ok(match tag & 0x0f {
        COMPACT_STOP => TType::Stop,
        COMPACT_BOOL_TRUE | COMPACT_BOOL_FALSE => TType::Bool,
        COMPACT_BYTE => TType::Byte,
        COMPACT_I16 => TType::I16,
        COMPACT_I32 => TType::I32,
        COMPACT_I64 => TType::I64,
        COMPACT_DOUBLE => TType::Double,
        COMPACT_BINARY => TType::String,
        COMPACT_LIST => TType::List,
        COMPACT_SET => TType::Set,
        COMPACT_MAP => TType::Map,
        COMPACT_STRUCT => TType::Struct,
        other => return Err(ProtocolError::UnknownType { tag: other }),
    })
}

const fn zigzag32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

const fn zigzag64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

const fn unzigzag32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

const fn unzigzag64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Creates compact protocol readers and writers.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactProtocolFactory;

impl ProtocolFactory for CompactProtocolFactory {
    fn writer<'a>(&self, out: &'a mut dyn OutputSink) -> Box<dyn ProtocolWriter + 'a> {
        Box::new(CompactProtocolWriter::new(out))
    }

    fn reader(&self, input: Bytes) -> Box<dyn ProtocolReader> {
        Box::new(CompactProtocolReader::new(input))
    }

    fn name(&self) -> &'static str {
        "compact"
    }
}

/// Compact protocol encoder.
pub struct CompactProtocolWriter<'a> {
    out: &'a mut dyn OutputSink,
    last_field_id: i16,
    field_stack: Vec<i16>,
    pending_bool_field: Option<i16>,
}

impl<'a> CompactProtocolWriter<'a> {
    /// Creates a writer appending to `out`.
    pub fn new(out: &'a mut dyn OutputSink) -> Self {
        Self {
            out,
            last_field_id: 0,
            field_stack: Vec::new(),
            pending_bool_field: None,
        }
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), ProtocolError> {
        self.out.write(&[byte])?;
        Ok(())
    }

    fn write_varint(&mut self, mut value: u64) -> Result<(), ProtocolError> {
        let mut scratch = [0u8; 10];
        let mut len = 0;
        loop {
            if value & !0x7f == 0 {
                scratch[len] = value as u8;
                len += 1;
                break;
            }
            scratch[len] = ((value & 0x7f) | 0x80) as u8;
            len += 1;
            value >>= 7;
        }
        self.out.write(&scratch[..len])?;
        Ok(())
    }

    fn write_field_header(&mut self, compact_type: u8, id: i16) -> Result<(), ProtocolError> {
        let delta = i32::from(id) - i32::from(self.last_field_id);
        if id > self.last_field_id && delta <= 15 {
            self.write_byte(((delta as u8) << 4) | compact_type)?;
        } else {
            self.write_byte(compact_type)?;
            self.write_varint(u64::from(zigzag32(i32::from(id))))?;
        }
        self.last_field_id = id;
        Ok(())
    }

    fn write_collection_begin(&mut self, element: TType, size: usize) -> Result<(), ProtocolError> {
        let element = to_compact(element)?;
        if size <= 14 {
            self.write_byte(((size as u8) << 4) | element)
        } else {
            self.write_byte(0xf0 | element)?;
            self.write_varint(size as u64)
        }
    }
}

impl ProtocolWriter for CompactProtocolWriter<'_> {
    fn write_message_begin(&mut self, header: &MessageHeader) -> Result<(), ProtocolError> {
        self.write_byte(PROTOCOL_ID)?;
        self.write_byte((VERSION & VERSION_MASK) | ((header.kind as u8) << TYPE_SHIFT))?;
        self.write_varint(u64::from(header.seq as u32))?;
        self.write_string(&header.name)
    }

    fn write_message_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_struct_begin(&mut self, _name: &str) -> Result<(), ProtocolError> {
        self.field_stack.push(self.last_field_id);
        self.last_field_id = 0;
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<(), ProtocolError> {
        self.last_field_id = self.field_stack.pop().unwrap_or(0);
        Ok(())
    }

    fn write_field_begin(&mut self, header: &FieldHeader) -> Result<(), ProtocolError> {
        if header.ttype == TType::Bool {
            self.pending_bool_field = Some(header.id);
            return Ok(());
        }
        let compact_type = to_compact(header.ttype)?;
        self.write_field_header(compact_type, header.id)
    }

    fn write_field_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_field_stop(&mut self) -> Result<(), ProtocolError> {
        self.write_byte(COMPACT_STOP)
    }

    fn write_list_begin(&mut self, header: &ListHeader) -> Result<(), ProtocolError> {
        self.write_collection_begin(header.element, header.size)
    }

    fn write_list_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_set_begin(&mut self, header: &ListHeader) -> Result<(), ProtocolError> {
        self.write_collection_begin(header.element, header.size)
    }

    fn write_set_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_map_begin(&mut self, header: &MapHeader) -> Result<(), ProtocolError> {
        if header.size == 0 {
            return self.write_byte(0);
        }
        self.write_varint(header.size as u64)?;
        let key = to_compact(header.key)?;
        let value = to_compact(header.value)?;
        self.write_byte((key << 4) | value)
    }

    fn write_map_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_bool(&mut self, value: bool) -> Result<(), ProtocolError> {
        let compact_type = if value {
            COMPACT_BOOL_TRUE
        } else {
            COMPACT_BOOL_FALSE
        };
        match self.pending_bool_field.take() {
            Some(id) => self.write_field_header(compact_type, id),
            None => self.write_byte(compact_type),
        }
    }

    fn write_i8(&mut self, value: i8) -> Result<(), ProtocolError> {
        self.write_byte(value as u8)
    }

    fn write_i16(&mut self, value: i16) -> Result<(), ProtocolError> {
        self.write_varint(u64::from(zigzag32(i32::from(value))))
    }

    fn write_i32(&mut self, value: i32) -> Result<(), ProtocolError> {
        self.write_varint(u64::from(zigzag32(value)))
    }

    fn write_i64(&mut self, value: i64) -> Result<(), ProtocolError> {
        self.write_varint(zigzag64(value))
    }

    fn write_double(&mut self, value: f64) -> Result<(), ProtocolError> {
        self.out.write(&value.to_bits().to_le_bytes())?;
        Ok(())
    }

    fn write_binary(&mut self, value: &[u8]) -> Result<(), ProtocolError> {
        self.write_varint(value.len() as u64)?;
        self.out.write(value)?;
        Ok(())
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.out.write(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ProtocolError> {
        self.out.flush()?;
        Ok(())
    }
}

/// Compact protocol decoder over one frame payload.
#[derive(Debug)]
pub struct CompactProtocolReader {
    input: Bytes,
    last_field_id: i16,
    field_stack: Vec<i16>,
    pending_bool: Option<bool>,
}

impl CompactProtocolReader {
    /// Creates a reader over `input`.
    #[must_use]
    pub fn new(input: Bytes) -> Self {
        Self {
            input,
            last_field_id: 0,
            field_stack: Vec::new(),
            pending_bool: None,
        }
    }

    fn ensure(&self, needed: usize) -> Result<(), ProtocolError> {
        if self.input.remaining() < needed {
            return Err(ProtocolError::UnexpectedEof {
                needed,
                remaining: self.input.remaining(),
            });
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, ProtocolError> {
        self.ensure(1)?;
        Ok(self.input.get_u8())
    }

    fn read_varint(&mut self) -> Result<u64, ProtocolError> {
        let mut result = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_byte()?;
            result |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift >= 64 {
                return Err(ProtocolError::invalid_data("varint exceeds 64 bits"));
            }
        }
    }

    fn read_size(&mut self) -> Result<usize, ProtocolError> {
        let size = self.read_varint()?;
        if size > self.input.remaining() as u64 {
            return Err(ProtocolError::InvalidSize { size: size as i64 });
        }
        Ok(size as usize)
    }

    fn read_collection_begin(&mut self) -> Result<ListHeader, ProtocolError> {
        let header = self.read_byte()?;
        let mut size = usize::from(header >> 4);
        if size == 15 {
            size = self.read_size()?;
        }
        let element = from_compact(header & 0x0f)?;
        Ok(ListHeader::new(element, size))
    }
}

impl ProtocolReader for CompactProtocolReader {
    fn read_message_begin(&mut self) -> Result<MessageHeader, ProtocolError> {
        let protocol_id = self.read_byte()?;
        if protocol_id != PROTOCOL_ID {
            return Err(ProtocolError::BadVersion {
                message: format!("expected protocol id {PROTOCOL_ID:#04x}, got {protocol_id:#04x}"),
            });
        }
        let version_and_type = self.read_byte()?;
        let version = version_and_type & VERSION_MASK;
        if version != VERSION {
            return Err(ProtocolError::BadVersion {
                message: format!("expected compact version {VERSION}, got {version}"),
            });
        }
        let kind = MessageType::try_from((version_and_type >> TYPE_SHIFT) & TYPE_BITS)?;
        let seq = self.read_varint()? as u32 as i32;
        let name = self.read_string()?;
        Ok(MessageHeader { name, kind, seq })
    }

    fn read_message_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_struct_begin(&mut self) -> Result<(), ProtocolError> {
        self.field_stack.push(self.last_field_id);
        self.last_field_id = 0;
        Ok(())
    }

    fn read_struct_end(&mut self) -> Result<(), ProtocolError> {
        self.last_field_id = self.field_stack.pop().unwrap_or(0);
        Ok(())
    }

    fn read_field_begin(&mut self) -> Result<FieldHeader, ProtocolError> {
        let header = self.read_byte()?;
        let compact_type = header & 0x0f;
        if compact_type == COMPACT_STOP {
            return Ok(FieldHeader::STOP);
        }
        let delta = header >> 4;
        let id = if delta == 0 {
            self.read_i16()?
        } else {
            self.last_field_id.wrapping_add(i16::from(delta))
        };
        let ttype = from_compact(compact_type)?;
        if ttype == TType::Bool {
            self.pending_bool = Some(compact_type == COMPACT_BOOL_TRUE);
        }
        self.last_field_id = id;
        Ok(FieldHeader::new(ttype, id))
    }

    fn read_field_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_list_begin(&mut self) -> Result<ListHeader, ProtocolError> {
        self.read_collection_begin()
    }

    fn read_list_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_set_begin(&mut self) -> Result<ListHeader, ProtocolError> {
        self.read_collection_begin()
    }

    fn read_set_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_map_begin(&mut self) -> Result<MapHeader, ProtocolError> {
        let size = self.read_size()?;
        if size == 0 {
            return Ok(MapHeader::new(TType::Stop, TType::Stop, 0));
        }
        let types = self.read_byte()?;
        let key = from_compact(types >> 4)?;
        let value = from_compact(types & 0x0f)?;
        Ok(MapHeader::new(key, value, size))
    }

    fn read_map_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        if let Some(value) = self.pending_bool.take() {
            return Ok(value);
        }
        Ok(self.read_byte()? == COMPACT_BOOL_TRUE)
    }

    fn read_i8(&mut self) -> Result<i8, ProtocolError> {
        Ok(self.read_byte()? as i8)
    }

    fn read_i16(&mut self) -> Result<i16, ProtocolError> {
        Ok(unzigzag32(self.read_varint()? as u32) as i16)
    }

    fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(unzigzag32(self.read_varint()? as u32))
    }

    fn read_i64(&mut self) -> Result<i64, ProtocolError> {
        Ok(unzigzag64(self.read_varint()?))
    }

    fn read_double(&mut self) -> Result<f64, ProtocolError> {
        self.ensure(8)?;
        Ok(f64::from_bits(self.input.get_u64_le()))
    }

    fn read_binary(&mut self) -> Result<Bytes, ProtocolError> {
        let len = self.read_size()?;
        Ok(self.input.split_to(len))
    }

    fn read_raw(&mut self, len: usize) -> Result<Bytes, ProtocolError> {
        self.ensure(len)?;
        Ok(self.input.split_to(len))
    }

    fn remaining(&self) -> usize {
        self.input.remaining()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::OutputBuffer;

    fn encode(
        f: impl FnOnce(&mut CompactProtocolWriter<'_>) -> Result<(), ProtocolError>,
    ) -> Bytes {
        let mut buffer = OutputBuffer::new(0);
        {
            let mut writer = CompactProtocolWriter::new(&mut buffer);
            f(&mut writer).unwrap();
        }
        buffer.take_payload()
    }

    #[test]
    fn test_zigzag() {
        assert_eq!(zigzag32(0), 0);
        assert_eq!(zigzag32(-1), 1);
        assert_eq!(zigzag32(1), 2);
        assert_eq!(zigzag64(i64::MIN), u64::MAX);
        assert_eq!(unzigzag32(zigzag32(-12345)), -12345);
        assert_eq!(unzigzag64(zigzag64(i64::MAX)), i64::MAX);
    }

    #[test]
    fn test_message_begin_layout() {
        let bytes =
            encode(|w| w.write_message_begin(&MessageHeader::new("ab", MessageType::Call, 3)));
        assert_eq!(&bytes[..], &[0x82, 0x21, 0x03, 0x02, b'a', b'b']);

        let mut reader = CompactProtocolReader::new(bytes);
        let header = reader.read_message_begin().unwrap();
        assert_eq!(header, MessageHeader::new("ab", MessageType::Call, 3));
    }

    #[test]
    fn test_field_delta_and_long_form() {
        let bytes = encode(|w| {
            w.write_struct_begin("s")?;
            w.write_field_begin(&FieldHeader::new(TType::I32, 1))?;
            w.write_i32(7)?;
            w.write_field_begin(&FieldHeader::new(TType::I32, 40))?;
            w.write_i32(-1)?;
            w.write_field_stop()?;
            w.write_struct_end()
        });
        // delta 1 short form, then long form for a jump of 39
        assert_eq!(&bytes[..], &[0x15, 0x0e, 0x05, 0x50, 0x01, 0x00]);

        let mut reader = CompactProtocolReader::new(bytes);
        reader.read_struct_begin().unwrap();
        assert_eq!(reader.read_field_begin().unwrap(), FieldHeader::new(TType::I32, 1));
        assert_eq!(reader.read_i32().unwrap(), 7);
        assert_eq!(reader.read_field_begin().unwrap(), FieldHeader::new(TType::I32, 40));
        assert_eq!(reader.read_i32().unwrap(), -1);
        assert_eq!(reader.read_field_begin().unwrap().ttype, TType::Stop);
    }

    #[test]
    fn test_bool_field_folds_value_into_type() {
        let bytes = encode(|w| {
            w.write_struct_begin("s")?;
            w.write_field_begin(&FieldHeader::new(TType::Bool, 1))?;
            w.write_bool(false)?;
            w.write_field_stop()?;
            w.write_struct_end()
        });
        assert_eq!(&bytes[..], &[0x12, 0x00]);

        let mut reader = CompactProtocolReader::new(bytes);
        reader.read_struct_begin().unwrap();
        assert_eq!(reader.read_field_begin().unwrap().ttype, TType::Bool);
        assert!(!reader.read_bool().unwrap());
    }

    #[test]
    fn test_nested_struct_restores_field_id() {
        let bytes = encode(|w| {
            w.write_struct_begin("outer")?;
            w.write_field_begin(&FieldHeader::new(TType::Struct, 2))?;
            w.write_struct_begin("inner")?;
            w.write_field_begin(&FieldHeader::new(TType::Byte, 1))?;
            w.write_i8(9)?;
            w.write_field_stop()?;
            w.write_struct_end()?;
            w.write_field_begin(&FieldHeader::new(TType::Byte, 3))?;
            w.write_i8(4)?;
            w.write_field_stop()?;
            w.write_struct_end()
        });
        let mut reader = CompactProtocolReader::new(bytes.clone());
        reader.skip(TType::Struct).unwrap();
        assert_eq!(reader.remaining(), 0);

        let mut reader = CompactProtocolReader::new(bytes);
        reader.read_struct_begin().unwrap();
        assert_eq!(reader.read_field_begin().unwrap().id, 2);
        reader.skip(TType::Struct).unwrap();
        assert_eq!(reader.read_field_begin().unwrap(), FieldHeader::new(TType::Byte, 3));
    }

    #[test]
    fn test_large_list_uses_varint_size() {
        let bytes = encode(|w| {
            w.write_list_begin(&ListHeader::new(TType::Byte, 20))?;
            for i in 0..20 {
                w.write_i8(i)?;
            }
            w.write_list_end()
        });
        assert_eq!(bytes[0], 0xf3);
        assert_eq!(bytes[1], 20);
        let mut reader = CompactProtocolReader::new(bytes);
        let header = reader.read_list_begin().unwrap();
        assert_eq!(header, ListHeader::new(TType::Byte, 20));
    }

    #[test]
    fn test_truncated_input() {
        let mut reader = CompactProtocolReader::new(Bytes::from_static(&[0x82]));
        assert!(reader.read_message_begin().unwrap_err().is_eof());

        let mut reader = CompactProtocolReader::new(Bytes::from_static(&[0x05, b'a']));
        assert!(matches!(
            reader.read_binary(),
            Err(ProtocolError::InvalidSize { size: 5 })
        ));
    }

    #[test]
    fn test_bad_protocol_id() {
        let mut reader = CompactProtocolReader::new(Bytes::from_static(&[0x80, 0x01, 0x00]));
        assert!(matches!(
            reader.read_message_begin(),
            Err(ProtocolError::BadVersion { .. })
        ));
    }
}
