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
//! Top-level error type.
//!
//! [`FrugalError`] gathers every failure a call can end with:
//!
//! 1. **Transport**: the frame never made it, or did not fit ([`TransportError`])
//! 2. **Protocol**: malformed wire data ([`ProtocolError`])
//! 3. **Application**: a framework exception received from or sent to the
//!    peer ([`ApplicationException`])
//! 4. **Handler**: an error raised by user code, including IDL-declared
//!    exceptions before they are placed in a result envelope
//!
//! Protocol errors caused by a full output buffer are lifted to transport
//! errors on conversion, so callers see a single "too large" condition.
//!
//! # Examples
//!
//! ```rust
//! use frugal::FrugalError;
//! use frugal::transport::TransportError;
//!
//! let error: FrugalError = TransportError::Closed.into();
//! assert!(error.is_transport_error());
//! assert!(!error.is_too_large());
//! ```

use crate::context::ContextError;
use crate::exception::{ApplicationException, ApplicationExceptionKind};
use crate::protocol::ProtocolError;
use crate::scope::ScopeError;
use crate::transport::TransportError;
use std::error::Error as StdError;
use std::fmt;

/// Boxed error raised by user code.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Top-level error type for frugal operations.
#[derive(Debug)]
pub enum FrugalError {
    /// The transport failed or rejected a frame.
    Transport(TransportError),

    /// Wire data could not be encoded or decoded.
    Protocol(ProtocolError),

    /// A framework exception.
    Application(ApplicationException),

    /// The call's context was cancelled or expired.
    Context(ContextError),

    /// A topic could not be built.
    Scope(ScopeError),

    /// An error raised by a handler.
    Handler(BoxError),

    /// An invariant inside the runtime did not hold.
    Internal {
        /// Description of the failure
        message: String,
    },
}

impl FrugalError {
    /// Wraps a user error.
    pub fn handler<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Handler(Box::new(error))
    }

    /// Creates an application exception error.
    pub fn application(kind: ApplicationExceptionKind, message: impl Into<String>) -> Self {
        Self::Application(ApplicationException::new(kind, message))
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Extracts a handler error of type `E`, returning `self` unchanged otherwise.
    pub fn downcast<E>(self) -> Result<E, Self>
    where
        E: StdError + 'static,
    {
        match self {
            Self::Handler(error) => error
                .downcast::<E>()
                .map(|boxed| *boxed)
                .map_err(Self::Handler),
            other => Err(other),
        }
    }

    /// Borrows a handler error of type `E`.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        match self {
            Self::Handler(error) => error.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Returns the application exception, if this is one.
    #[must_use]
    pub const fn application_exception(&self) -> Option<&ApplicationException> {
        match self {
            Self::Application(exception) => Some(exception),
            _ => None,
        }
    }

    /// Returns true if this is a transport error.
    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if this is a protocol error.
    #[must_use]
    pub const fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }

    /// Returns true if this is an application exception.
    #[must_use]
    pub const fn is_application_exception(&self) -> bool {
        matches!(self, Self::Application(_))
    }

    /// Returns true if this error came from user code.
    #[must_use]
    pub const fn is_handler_error(&self) -> bool {
        matches!(self, Self::Handler(_))
    }

    /// Returns true for request or response size-limit failures.
    #[must_use]
    pub fn is_too_large(&self) -> bool {
        match self {
            Self::Transport(error) => error.is_too_large(),
            Self::Protocol(error) => error.is_too_large(),
            Self::Application(exception) => {
                exception.kind() == ApplicationExceptionKind::ResponseTooLarge
            }
            _ => false,
        }
    }
}

impl fmt::Display for FrugalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Protocol(e) => write!(f, "protocol error: {e}"),
            Self::Application(e) => write!(f, "{e}"),
            Self::Context(e) => write!(f, "{e}"),
            Self::Scope(e) => write!(f, "scope error: {e}"),
            Self::Handler(e) => write!(f, "{e}"),
            Self::Internal { message } => write!(f, "internal error: {message}"),
        }
    }
}

impl StdError for FrugalError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Protocol(e) => Some(e),
            Self::Application(e) => Some(e),
            Self::Context(e) => Some(e),
            Self::Scope(e) => Some(e),
            Self::Handler(e) => Some(e.as_ref()),
            Self::Internal { .. } => None,
        }
    }
}

impl From<TransportError> for FrugalError {
    fn from(error: TransportError) -> Self {
        Self::Transport(error)
    }
}

impl From<ProtocolError> for FrugalError {
    fn from(error: ProtocolError) -> Self {
        match error {
            ProtocolError::Transport(error) => Self::Transport(error),
            other => Self::Protocol(other),
        }
    }
}

impl From<ApplicationException> for FrugalError {
    fn from(exception: ApplicationException) -> Self {
        Self::Application(exception)
    }
}

impl From<ContextError> for FrugalError {
    fn from(error: ContextError) -> Self {
        Self::Context(error)
    }
}

impl From<ScopeError> for FrugalError {
    fn from(error: ScopeError) -> Self {
        Self::Scope(error)
    }
}
