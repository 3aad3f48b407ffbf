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
//! Typed value encoding on top of the protocol capability.
//!
//! Generated bindings implement [`Encode`] and [`Decode`] for their structs
//! using [`write_struct`], [`write_field`] and [`read_struct`]. Optional
//! fields are plain `Option<T>` and are omitted from the wire when `None`.

use super::{
    FieldHeader, ListHeader, MapHeader, ProtocolError, ProtocolReader, ProtocolWriter, TType,
};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// A value that can be written with a [`ProtocolWriter`].
pub trait Encode {
    /// Wire type tag used in field and container headers.
    const TTYPE: TType;

    /// Writes the value.
    fn encode(&self, writer: &mut dyn ProtocolWriter) -> Result<(), ProtocolError>;
}

/// A value that can be read with a [`ProtocolReader`].
pub trait Decode: Sized {
    /// Reads a value.
    fn decode(reader: &mut dyn ProtocolReader) -> Result<Self, ProtocolError>;
}

/// Writes a struct: begin marker, the fields written by `fields`, stop, end marker.
pub fn write_struct<F>(
    writer: &mut dyn ProtocolWriter,
    name: &str,
    fields: F,
) -> Result<(), ProtocolError>
where
    F: FnOnce(&mut dyn ProtocolWriter) -> Result<(), ProtocolError>,
{
    writer.write_struct_begin(name)?;
    fields(writer)?;
    writer.write_field_stop()?;
    writer.write_struct_end()
}

/// Writes a single field.
pub fn write_field<T: Encode + ?Sized>(
    writer: &mut dyn ProtocolWriter,
    id: i16,
    value: &T,
) -> Result<(), ProtocolError> {
    writer.write_field_begin(&FieldHeader::new(T::TTYPE, id))?;
    value.encode(writer)?;
    writer.write_field_end()
}

/// Writes a field only when it is present.
pub fn write_optional_field<T: Encode>(
    writer: &mut dyn ProtocolWriter,
    id: i16,
    value: &Option<T>,
) -> Result<(), ProtocolError> {
    match value {
        Some(value) => write_field(writer, id, value),
        None => Ok(()),
    }
}

/// Reads a struct, calling `on_field` for every field until the stop marker.
///
/// `on_field` must consume the field value, skipping it if unrecognised.
pub fn read_struct<F>(reader: &mut dyn ProtocolReader, mut on_field: F) -> Result<(), ProtocolError>
where
    F: FnMut(&mut dyn ProtocolReader, FieldHeader) -> Result<(), ProtocolError>,
{
    reader.read_struct_begin()?;
    loop {
        let field = reader.read_field_begin()?;
        if field.ttype == TType::Stop {
            break;
        }
        on_field(reader, field)?;
        reader.read_field_end()?;
    }
    reader.read_struct_end()
}

fn capacity_hint(size: usize) -> usize {
    size.min(1024)
}

macro_rules! primitive {
    ($ty:ty, $ttype:expr, $write:ident, $read:ident) => {
        impl Encode for $ty {
            const TTYPE: TType = $ttype;

            fn encode(&self, writer: &mut dyn ProtocolWriter) -> Result<(), ProtocolError> {
                writer.$write(*self)
            }
        }

        impl Decode for $ty {
            fn decode(reader: &mut dyn ProtocolReader) -> Result<Self, ProtocolError> {
                reader.$read()
            }
        }
    };
}

primitive!(bool, TType::Bool, write_bool, read_bool);
primitive!(i8, TType::Byte, write_i8, read_i8);
primitive!(i16, TType::I16, write_i16, read_i16);
primitive!(i32, TType::I32, write_i32, read_i32);
primitive!(i64, TType::I64, write_i64, read_i64);
primitive!(f64, TType::Double, write_double, read_double);

impl Encode for str {
    const TTYPE: TType = TType::String;

    fn encode(&self, writer: &mut dyn ProtocolWriter) -> Result<(), ProtocolError> {
        writer.write_string(self)
    }
}

impl Encode for String {
    const TTYPE: TType = TType::String;

    fn encode(&self, writer: &mut dyn ProtocolWriter) -> Result<(), ProtocolError> {
        writer.write_string(self)
    }
}

impl Decode for String {
    fn decode(reader: &mut dyn ProtocolReader) -> Result<Self, ProtocolError> {
        reader.read_string()
    }
}

impl Encode for Bytes {
    const TTYPE: TType = TType::String;

    fn encode(&self, writer: &mut dyn ProtocolWriter) -> Result<(), ProtocolError> {
        writer.write_binary(self)
    }
}

impl Decode for Bytes {
    fn decode(reader: &mut dyn ProtocolReader) -> Result<Self, ProtocolError> {
        reader.read_binary()
    }
}

impl Encode for () {
    const TTYPE: TType = TType::Void;

    fn encode(&self, _writer: &mut dyn ProtocolWriter) -> Result<(), ProtocolError> {
        Ok(())
    }
}

impl Decode for () {
    fn decode(_reader: &mut dyn ProtocolReader) -> Result<Self, ProtocolError> {
        Ok(())
    }
}

impl<T: Encode> Encode for Vec<T> {
    const TTYPE: TType = TType::List;

    fn encode(&self, writer: &mut dyn ProtocolWriter) -> Result<(), ProtocolError> {
        writer.write_list_begin(&ListHeader::new(T::TTYPE, self.len()))?;
        for item in self {
            item.encode(writer)?;
        }
        writer.write_list_end()
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(reader: &mut dyn ProtocolReader) -> Result<Self, ProtocolError> {
        let header = reader.read_list_begin()?;
        let mut items = Vec::with_capacity(capacity_hint(header.size));
        for _ in 0..header.size {
            items.push(T::decode(reader)?);
        }
        reader.read_list_end()?;
        Ok(items)
    }
}

impl<T: Encode> Encode for HashSet<T> {
    const TTYPE: TType = TType::Set;

    fn encode(&self, writer: &mut dyn ProtocolWriter) -> Result<(), ProtocolError> {
        writer.write_set_begin(&ListHeader::new(T::TTYPE, self.len()))?;
        for item in self {
            item.encode(writer)?;
        }
        writer.write_set_end()
    }
}

impl<T: Decode + Eq + Hash> Decode for HashSet<T> {
    fn decode(reader: &mut dyn ProtocolReader) -> Result<Self, ProtocolError> {
        let header = reader.read_set_begin()?;
        let mut items = HashSet::with_capacity(capacity_hint(header.size));
        for _ in 0..header.size {
            items.insert(T::decode(reader)?);
        }
        reader.read_set_end()?;
        Ok(items)
    }
}

impl<K: Encode, V: Encode> Encode for HashMap<K, V> {
    const TTYPE: TType = TType::Map;

    fn encode(&self, writer: &mut dyn ProtocolWriter) -> Result<(), ProtocolError> {
        writer.write_map_begin(&MapHeader::new(K::TTYPE, V::TTYPE, self.len()))?;
        for (key, value) in self {
            key.encode(writer)?;
            value.encode(writer)?;
        }
        writer.write_map_end()
    }
}

impl<K: Decode + Eq + Hash, V: Decode> Decode for HashMap<K, V> {
    fn decode(reader: &mut dyn ProtocolReader) -> Result<Self, ProtocolError> {
        let header = reader.read_map_begin()?;
        let mut entries = HashMap::with_capacity(capacity_hint(header.size));
        for _ in 0..header.size {
            let key = K::decode(reader)?;
            let value = V::decode(reader)?;
            entries.insert(key, value);
        }
        reader.read_map_end()?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        BinaryProtocolFactory, CompactProtocolFactory, OutputBuffer, ProtocolFactory,
    };

    #[derive(Debug, Default, PartialEq)]
    struct Track {
        title: String,
        duration: f64,
        tags: Vec<String>,
        rating: Option<i32>,
        explicit: bool,
    }

    impl Encode for Track {
        const TTYPE: TType = TType::Struct;

        fn encode(&self, writer: &mut dyn ProtocolWriter) -> Result<(), ProtocolError> {
            write_struct(writer, "Track", |w| {
                write_field(w, 1, &self.title)?;
                write_field(w, 2, &self.duration)?;
                write_field(w, 3, &self.tags)?;
                write_optional_field(w, 4, &self.rating)?;
                write_field(w, 5, &self.explicit)
            })
        }
    }

    impl Decode for Track {
        fn decode(reader: &mut dyn ProtocolReader) -> Result<Self, ProtocolError> {
            let mut track = Track::default();
            read_struct(reader, |r, field| {
                match (field.id, field.ttype) {
                    (1, TType::String) => track.title = r.read_string()?,
                    (2, TType::Double) => track.duration = r.read_double()?,
                    (3, TType::List) => track.tags = Vec::decode(r)?,
                    (4, TType::I32) => track.rating = Some(r.read_i32()?),
                    (5, TType::Bool) => track.explicit = r.read_bool()?,
                    (_, ttype) => r.skip(ttype)?,
                }
                Ok(())
            })?;
            Ok(track)
        }
    }

    fn roundtrip(factory: &dyn ProtocolFactory, track: &Track) -> Track {
        let mut buffer = OutputBuffer::new(0);
        {
            let mut writer = factory.writer(&mut buffer);
            track.encode(&mut *writer).unwrap();
        }
        let mut reader = factory.reader(buffer.take_payload());
        let decoded = Track::decode(&mut *reader).unwrap();
        assert_eq!(reader.remaining(), 0);
        decoded
    }

    #[test]
    fn test_struct_with_optional_field() {
        let track = Track {
            title: "Comfortably Numb".into(),
            duration: 382.5,
            tags: vec!["rock".into(), "classic".into()],
            rating: None,
            explicit: true,
        };
        assert_eq!(roundtrip(&CompactProtocolFactory, &track), track);
        assert_eq!(roundtrip(&BinaryProtocolFactory, &track), track);

        let rated = Track {
            rating: Some(5),
            ..track
        };
        assert_eq!(roundtrip(&CompactProtocolFactory, &rated), rated);
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let factory = CompactProtocolFactory;
        let mut buffer = OutputBuffer::new(0);
        {
            let mut writer = factory.writer(&mut buffer);
            write_struct(&mut *writer, "Track", |w| {
                write_field(w, 1, "Echoes")?;
                let mut extra = HashMap::new();
                extra.insert("side".to_string(), vec![1i64, 2]);
                write_field(w, 9, &extra)?;
                write_field(w, 10, &true)
            })
            .unwrap();
        }
        let mut reader = factory.reader(buffer.take_payload());
        let track = Track::decode(&mut *reader).unwrap();
        assert_eq!(track.title, "Echoes");
        assert!(!track.explicit);
    }
}
