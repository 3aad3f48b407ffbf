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
//! Application exceptions.
//!
//! An [`ApplicationException`] is the framework's own failure report. The
//! processor builds one when a call cannot be completed normally, writes it as
//! an `EXCEPTION` frame, and the invoker turns it back into a typed error.

use crate::protocol::{
    read_struct, write_field, write_struct, Decode, Encode, ProtocolError, ProtocolReader,
    ProtocolWriter, TType,
};
use std::fmt;

/// Classification of an [`ApplicationException`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationExceptionKind {
    /// Unclassified
    Unknown,
    /// No function registered under the requested name
    UnknownMethod,
    /// A frame had an unexpected message type
    InvalidMessageType,
    /// A reply named a different method than the call
    WrongMethodName,
    /// A reply carried an unexpected sequence id
    BadSequenceId,
    /// A reply had no result set
    MissingResult,
    /// The handler failed with an undeclared error
    InternalError,
    /// The request could not be decoded
    ProtocolError,
    /// The response exceeded the transport's size limit
    ResponseTooLarge,
}

impl ApplicationExceptionKind {
    /// Returns the wire code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::UnknownMethod => 1,
            Self::InvalidMessageType => 2,
            Self::WrongMethodName => 3,
            Self::BadSequenceId => 4,
            Self::MissingResult => 5,
            Self::InternalError => 6,
            Self::ProtocolError => 7,
            Self::ResponseTooLarge => 100,
        }
    }

    /// Maps a wire code to a kind; unrecognised codes become [`Self::Unknown`].
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Self::UnknownMethod,
            2 => Self::InvalidMessageType,
            3 => Self::WrongMethodName,
            4 => Self::BadSequenceId,
            5 => Self::MissingResult,
            6 => Self::InternalError,
            7 => Self::ProtocolError,
            100 => Self::ResponseTooLarge,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ApplicationExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::UnknownMethod => "unknown method",
            Self::InvalidMessageType => "invalid message type",
            Self::WrongMethodName => "wrong method name",
            Self::BadSequenceId => "bad sequence id",
            Self::MissingResult => "missing result",
            Self::InternalError => "internal error",
            Self::ProtocolError => "protocol error",
            Self::ResponseTooLarge => "response too large",
        };
        f.write_str(name)
    }
}

/// A framework-level failure that survives serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationException {
    kind: ApplicationExceptionKind,
    message: String,
}

impl ApplicationException {
    /// Creates an exception.
    pub fn new(kind: ApplicationExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the kind.
    #[must_use]
    pub const fn kind(&self) -> ApplicationExceptionKind {
        self.kind
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ApplicationException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "application exception ({}): {}", self.kind, self.message)
    }
}

impl std::error::Error for ApplicationException {}

impl Encode for ApplicationException {
    const TTYPE: TType = TType::Struct;

    fn encode(&self, writer: &mut dyn ProtocolWriter) -> Result<(), ProtocolError> {
        write_struct(writer, "TApplicationException", |w| {
            write_field(w, 1, self.message.as_str())?;
            write_field(w, 2, &self.kind.code())
        })
    }
}

impl Decode for ApplicationException {
    fn decode(reader: &mut dyn ProtocolReader) -> Result<Self, ProtocolError> {
        let mut message = String::new();
        let mut kind = ApplicationExceptionKind::Unknown;
        read_struct(reader, |r, field| {
            match (field.id, field.ttype) {
                (1, TType::String) => message = r.read_string()?,
                (2, TType::I32) => kind = ApplicationExceptionKind::from_code(r.read_i32()?),
                (_, ttype) => r.skip(ttype)?,
            }
            Ok(())
        })?;
        Ok(Self { kind, message })
    }
}
