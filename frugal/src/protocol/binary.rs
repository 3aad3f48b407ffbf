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
//! Thrift strict binary protocol.

use super::{
    FieldHeader, ListHeader, MapHeader, MessageHeader, MessageType, OutputSink, ProtocolError,
    ProtocolFactory, ProtocolReader, ProtocolWriter, TType,
};
use bytes::{Buf, Bytes};

const VERSION_1: u32 = 0x8001_0000;
const VERSION_MASK: u32 = 0xffff_0000;
const TYPE_MASK: u32 = 0x0000_00ff;

/// Creates binary protocol readers and writers.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryProtocolFactory;

impl ProtocolFactory for BinaryProtocolFactory {
    fn writer<'a>(&self, out: &'a mut dyn OutputSink) -> Box<dyn ProtocolWriter + 'a> {
        Box::new(BinaryProtocolWriter::new(out))
    }

    fn reader(&self, input: Bytes) -> Box<dyn ProtocolReader> {
        Box::new(BinaryProtocolReader::new(input))
    }

    fn name(&self) -> &'static str {
        "binary"
    }
}

/// Binary protocol encoder. Always writes the strict message header.
pub struct BinaryProtocolWriter<'a> {
    out: &'a mut dyn OutputSink,
}

impl<'a> BinaryProtocolWriter<'a> {
    /// Creates a writer appending to `out`.
    pub fn new(out: &'a mut dyn OutputSink) -> Self {
        Self { out }
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.out.write(bytes)?;
        Ok(())
    }

    fn write_len(&mut self, len: usize) -> Result<(), ProtocolError> {
        let len = i32::try_from(len).map_err(|_| ProtocolError::InvalidSize { size: len as i64 })?;
        self.write_i32(len)
    }
}

impl ProtocolWriter for BinaryProtocolWriter<'_> {
    fn write_message_begin(&mut self, header: &MessageHeader) -> Result<(), ProtocolError> {
        self.put(&(VERSION_1 | header.kind as u32).to_be_bytes())?;
        self.write_string(&header.name)?;
        self.write_i32(header.seq)
    }

    fn write_message_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_struct_begin(&mut self, _name: &str) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_field_begin(&mut self, header: &FieldHeader) -> Result<(), ProtocolError> {
        self.put(&[header.ttype as u8])?;
        self.write_i16(header.id)
    }

    fn write_field_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_field_stop(&mut self) -> Result<(), ProtocolError> {
        self.put(&[TType::Stop as u8])
    }

    fn write_list_begin(&mut self, header: &ListHeader) -> Result<(), ProtocolError> {
        self.put(&[header.element as u8])?;
        self.write_len(header.size)
    }

    fn write_list_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_set_begin(&mut self, header: &ListHeader) -> Result<(), ProtocolError> {
        self.write_list_begin(header)
    }

    fn write_set_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_map_begin(&mut self, header: &MapHeader) -> Result<(), ProtocolError> {
        self.put(&[header.key as u8, header.value as u8])?;
        self.write_len(header.size)
    }

    fn write_map_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_bool(&mut self, value: bool) -> Result<(), ProtocolError> {
        self.put(&[u8::from(value)])
    }

    fn write_i8(&mut self, value: i8) -> Result<(), ProtocolError> {
        self.put(&value.to_be_bytes())
    }

    fn write_i16(&mut self, value: i16) -> Result<(), ProtocolError> {
        self.put(&value.to_be_bytes())
    }

    fn write_i32(&mut self, value: i32) -> Result<(), ProtocolError> {
        self.put(&value.to_be_bytes())
    }

    fn write_i64(&mut self, value: i64) -> Result<(), ProtocolError> {
        self.put(&value.to_be_bytes())
    }

    fn write_double(&mut self, value: f64) -> Result<(), ProtocolError> {
        self.put(&value.to_bits().to_be_bytes())
    }

    fn write_binary(&mut self, value: &[u8]) -> Result<(), ProtocolError> {
        self.write_len(value.len())?;
        self.put(value)
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.put(bytes)
    }

    fn flush(&mut self) -> Result<(), ProtocolError> {
        self.out.flush()?;
        Ok(())
    }
}

/// Binary protocol decoder. Accepts both strict and legacy message headers.
#[derive(Debug)]
pub struct BinaryProtocolReader {
    input: Bytes,
}

impl BinaryProtocolReader {
    /// Creates a reader over `input`.
    #[must_use]
    pub fn new(input: Bytes) -> Self {
        Self { input }
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

    fn read_type(&mut self) -> Result<TType, ProtocolError> {
        self.ensure(1)?;
        TType::try_from(self.input.get_u8())
    }

    fn read_len(&mut self) -> Result<usize, ProtocolError> {
        let len = self.read_i32()?;
        if len < 0 || len as usize > self.input.remaining() {
            return Err(ProtocolError::InvalidSize {
                size: i64::from(len),
            });
        }
        Ok(len as usize)
    }
}

impl ProtocolReader for BinaryProtocolReader {
    fn read_message_begin(&mut self) -> Result<MessageHeader, ProtocolError> {
        let word = self.read_i32()?;
        if word < 0 {
            let word = word as u32;
            if word & VERSION_MASK != VERSION_1 {
                return Err(ProtocolError::BadVersion {
                    message: format!("unexpected binary version word {word:#010x}"),
                });
            }
            let kind = MessageType::try_from((word & TYPE_MASK) as u8)?;
            let name = self.read_string()?;
            let seq = self.read_i32()?;
            return Ok(MessageHeader { name, kind, seq });
        }
        // Legacy header: the word is the name length.
        let len = word as usize;
        let name = String::from_utf8(self.read_raw(len)?.to_vec())?;
        self.ensure(1)?;
        let kind = MessageType::try_from(self.input.get_u8())?;
        let seq = self.read_i32()?;
        Ok(MessageHeader { name, kind, seq })
    }

    fn read_message_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_struct_begin(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_struct_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_field_begin(&mut self) -> Result<FieldHeader, ProtocolError> {
        let ttype = self.read_type()?;
        if ttype == TType::Stop {
            return Ok(FieldHeader::STOP);
        }
        let id = self.read_i16()?;
        Ok(FieldHeader::new(ttype, id))
    }

    fn read_field_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_list_begin(&mut self) -> Result<ListHeader, ProtocolError> {
        let element = self.read_type()?;
        let size = self.read_len()?;
        Ok(ListHeader::new(element, size))
    }

    fn read_list_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_set_begin(&mut self) -> Result<ListHeader, ProtocolError> {
        self.read_list_begin()
    }

    fn read_set_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_map_begin(&mut self) -> Result<MapHeader, ProtocolError> {
        let key = self.read_type()?;
        let value = self.read_type()?;
        let size = self.read_len()?;
        Ok(MapHeader::new(key, value, size))
    }

    fn read_map_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.read_i8()? != 0)
    }

    fn read_i8(&mut self) -> Result<i8, ProtocolError> {
        self.ensure(1)?;
        Ok(self.input.get_i8())
    }

    fn read_i16(&mut self) -> Result<i16, ProtocolError> {
        self.ensure(2)?;
        Ok(self.input.get_i16())
    }

    fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.input.get_i32())
    }

    fn read_i64(&mut self) -> Result<i64, ProtocolError> {
        self.ensure(8)?;
        Ok(self.input.get_i64())
    }

    fn read_double(&mut self) -> Result<f64, ProtocolError> {
        self.ensure(8)?;
        Ok(f64::from_bits(self.input.get_u64()))
    }

    fn read_binary(&mut self) -> Result<Bytes, ProtocolError> {
        let len = self.read_len()?;
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

    #[test]
    fn test_strict_message_header() {
        let mut buffer = OutputBuffer::new(0);
        {
            let mut writer = BinaryProtocolWriter::new(&mut buffer);
            writer
                .write_message_begin(&MessageHeader::new("hi", MessageType::Reply, 9))
                .unwrap();
        }
        let bytes = buffer.take_payload();
        assert_eq!(&bytes[..4], &[0x80, 0x01, 0x00, 0x02]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 2]);

        let mut reader = BinaryProtocolReader::new(bytes);
        assert_eq!(
            reader.read_message_begin().unwrap(),
            MessageHeader::new("hi", MessageType::Reply, 9)
        );
    }

    #[test]
    fn test_legacy_message_header() {
        let bytes = Bytes::from_static(&[0, 0, 0, 1, b'x', 4, 0, 0, 0, 7]);
        let mut reader = BinaryProtocolReader::new(bytes);
        assert_eq!(
            reader.read_message_begin().unwrap(),
            MessageHeader::new("x", MessageType::Oneway, 7)
        );
    }

    #[test]
    fn test_skip_map_of_lists() {
        let mut buffer = OutputBuffer::new(0);
        {
            let mut w = BinaryProtocolWriter::new(&mut buffer);
            w.write_map_begin(&MapHeader::new(TType::String, TType::List, 1)).unwrap();
            w.write_string("k").unwrap();
            w.write_list_begin(&ListHeader::new(TType::Double, 2)).unwrap();
            w.write_double(1.5).unwrap();
            w.write_double(-2.0).unwrap();
            w.write_list_end().unwrap();
            w.write_map_end().unwrap();
            w.write_i8(42).unwrap();
        }
        let mut reader = BinaryProtocolReader::new(buffer.take_payload());
        reader.skip(TType::Map).unwrap();
        assert_eq!(reader.read_i8().unwrap(), 42);
    }

    #[test]
    fn test_negative_length_rejected() {
        let mut reader = BinaryProtocolReader::new(Bytes::from_static(&[0xff, 0xff, 0xff, 0xff]));
        assert!(matches!(
            reader.read_binary(),
            Err(ProtocolError::InvalidSize { size: -1 })
        ));
    }
}
