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
//! Wire-level type tags and begin/end marker headers.

use super::ProtocolError;
use std::fmt;

/// Thrift type tags as they appear in field and container headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TType {
    /// End of a struct's field list
    Stop = 0,
    /// No value
    Void = 1,
    /// Boolean
    Bool = 2,
    /// Signed 8-bit integer
    Byte = 3,
    /// IEEE 754 double
    Double = 4,
    /// Signed 16-bit integer
    I16 = 6,
    /// Signed 32-bit integer
    I32 = 8,
    /// Signed 64-bit integer
    I64 = 10,
    /// UTF-8 string or opaque binary
    String = 11,
    /// Nested struct
    Struct = 12,
    /// Map container
    Map = 13,
    /// Set container
    Set = 14,
    /// List container
    List = 15,
}

impl TryFrom<u8> for TType {
    type Error = ProtocolError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Ok(match tag {
            0 => Self::Stop,
            1 => Self::Void,
            2 => Self::Bool,
            3 => Self::Byte,
            4 => Self::Double,
            6 => Self::I16,
            8 => Self::I32,
            10 => Self::I64,
            11 => Self::String,
            12 => Self::Struct,
            13 => Self::Map,
            14 => Self::Set,
            15 => Self::List,
            _ => return Err(ProtocolError::UnknownType { tag }),
        })
    }
}

/// The kind of a message frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// A request expecting a reply
    Call = 1,
    /// A successful reply
    Reply = 2,
    /// An application exception reply
    Exception = 3,
    /// A request with no reply
    Oneway = 4,
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Call),
            2 => Ok(Self::Reply),
            3 => Ok(Self::Exception),
            4 => Ok(Self::Oneway),
            other => Err(ProtocolError::invalid_data(format!(
                "unknown message type {other}"
            ))),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Call => "CALL",
            Self::Reply => "REPLY",
            Self::Exception => "EXCEPTION",
            Self::Oneway => "ONEWAY",
        };
        f.write_str(name)
    }
}

/// The begin marker of a message frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    /// Method or operation name
    pub name: String,
    /// Frame kind
    pub kind: MessageType,
    /// Sequence id
    pub seq: i32,
}

impl MessageHeader {
    /// Creates a message header.
    pub fn new(name: impl Into<String>, kind: MessageType, seq: i32) -> Self {
        Self {
            name: name.into(),
            kind,
            seq,
        }
    }
}

/// The begin marker of a struct field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHeader {
    /// Field value type
    pub ttype: TType,
    /// Field id
    pub id: i16,
}

impl FieldHeader {
    /// Creates a field header.
    pub const fn new(ttype: TType, id: i16) -> Self {
        Self { ttype, id }
    }

    /// The marker terminating a struct's fields.
    pub const STOP: Self = Self::new(TType::Stop, 0);
}

/// The begin marker of a list or set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListHeader {
    /// Element type
    pub element: TType,
    /// Number of elements
    pub size: usize,
}

impl ListHeader {
    /// Creates a list or set header.
    pub const fn new(element: TType, size: usize) -> Self {
        Self { element, size }
    }
}

/// The begin marker of a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapHeader {
    /// Key type
    pub key: TType,
    /// Value type
    pub value: TType,
    /// Number of entries
    pub size: usize,
}

impl MapHeader {
    /// Creates a map header.
    pub const fn new(key: TType, value: TType, size: usize) -> Self {
        Self { key, value, size }
    }
}
