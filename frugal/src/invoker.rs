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
//! Client call path.
//!
//! The [`Invoker`] turns typed arguments into a frame, hands it to a
//! [`RequestTransport`] and decodes the reply. A reply must name the method
//! that was called and be either `REPLY` or `EXCEPTION`; anything else is
//! reported as an application exception. Failures are never retried here;
//! wrap the call in a retry middleware if needed.

use crate::context::Context;
use crate::error::FrugalError;
use crate::exception::{ApplicationException, ApplicationExceptionKind};
use crate::protocol::{
    read_response_header, write_request_header, Decode, Encode, MessageHeader, MessageType,
    OutputBuffer, ProtocolFactory,
};
use crate::provider::ServiceProvider;
use crate::transport::{RequestTransport, TransportError};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Serializes calls, sends them and validates replies.
#[derive(Clone)]
pub struct Invoker {
    transport: Arc<dyn RequestTransport>,
    protocol: Arc<dyn ProtocolFactory>,
}

impl Invoker {
    /// Creates an invoker over `transport` using `protocol`.
    #[must_use]
    pub fn new(transport: Arc<dyn RequestTransport>, protocol: Arc<dyn ProtocolFactory>) -> Self {
        Self {
            transport,
            protocol,
        }
    }

    /// Creates an invoker from a service provider.
    #[must_use]
    pub fn from_provider(provider: &ServiceProvider) -> Self {
        Self::new(provider.transport(), provider.protocol())
    }

    /// Performs a call of the given kind.
    ///
    /// Returns `None` for oneway calls, which complete once the frame is sent.
    pub async fn invoke<A, R>(
        &self,
        ctx: &Context,
        method: &str,
        args: &A,
        kind: MessageType,
    ) -> Result<Option<R>, FrugalError>
    where
        A: Encode + ?Sized,
        R: Decode,
    {
        let op_id = ctx.assign_op_id();
        let frame = {
            let mut buffer = OutputBuffer::new(self.transport.request_size_limit());
            {
                let mut writer = self.protocol.writer(&mut buffer);
                write_request_header(&mut *writer, ctx)?;
                writer.write_message_begin(&MessageHeader::new(method, kind, 0))?;
                args.encode(&mut *writer)?;
                writer.write_message_end()?;
                writer.flush()?;
            }
            buffer.take_frame()
        };
        debug!(
            method,
            correlation_id = %ctx.correlation_id(),
            op_id,
            kind = %kind,
            bytes = frame.len(),
            "sending request"
        );

        if kind == MessageType::Oneway {
            self.transport.oneway(ctx, frame).await?;
            return Ok(None);
        }

        let reply = self.transport.request(ctx, frame).await?;
        let mut reader = self.protocol.reader(reply);
        read_response_header(&mut *reader, ctx)?;
        let header = reader.read_message_begin()?;
        if header.name != method {
            return Err(FrugalError::application(
                ApplicationExceptionKind::WrongMethodName,
                format!("{method} failed: wrong method name"),
            ));
        }

        match header.kind {
            MessageType::Exception => {
                let exception = ApplicationException::decode(&mut *reader)?;
                reader.read_message_end()?;
                if exception.kind() == ApplicationExceptionKind::ResponseTooLarge {
                    return Err(TransportError::ResponseTooLarge {
                        message: exception.message().to_string(),
                    }
                    .into());
                }
                Err(exception.into())
            }
            MessageType::Reply => {
                let result = R::decode(&mut *reader)?;
                reader.read_message_end()?;
                Ok(Some(result))
            }
            _ => Err(FrugalError::application(
                ApplicationExceptionKind::InvalidMessageType,
                format!("{method} failed: invalid message type"),
            )),
        }
    }

    /// Performs a request/response call and returns the decoded result envelope.
    pub async fn call<A, R>(&self, ctx: &Context, method: &str, args: &A) -> Result<R, FrugalError>
    where
        A: Encode + ?Sized,
        R: Decode,
    {
        self.invoke(ctx, method, args, MessageType::Call)
            .await?
            .ok_or_else(|| {
                FrugalError::application(
                    ApplicationExceptionKind::MissingResult,
                    format!("{method} failed: no result"),
                )
            })
    }

    /// Sends a oneway call.
    pub async fn oneway<A>(&self, ctx: &Context, method: &str, args: &A) -> Result<(), FrugalError>
    where
        A: Encode + ?Sized,
    {
        self.invoke::<A, ()>(ctx, method, args, MessageType::Oneway)
            .await
            .map(drop)
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker")
            .field("protocol", &self.protocol.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{write_response_header, CompactProtocolFactory};
    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        reply: Mutex<Option<Bytes>>,
        limit: usize,
        requests: AtomicUsize,
        oneways: AtomicUsize,
    }

    impl Scripted {
        fn new(reply: Option<Bytes>, limit: usize) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(reply),
                limit,
                requests: AtomicUsize::new(0),
                oneways: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RequestTransport for Scripted {
        async fn oneway(&self, _ctx: &Context, _frame: Bytes) -> Result<(), TransportError> {
            self.oneways.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn request(&self, _ctx: &Context, _frame: Bytes) -> Result<Bytes, TransportError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.reply.lock().take().ok_or(TransportError::NoResponse)
        }

        fn request_size_limit(&self) -> usize {
            self.limit
        }
    }

    fn reply<F>(name: &str, kind: MessageType, body: F) -> Bytes
    where
        F: FnOnce(&mut dyn crate::protocol::ProtocolWriter),
    {
        let mut buffer = OutputBuffer::for_response(0);
        {
            let mut w = CompactProtocolFactory.writer(&mut buffer);
            write_response_header(&mut *w, &Context::new()).unwrap();
            w.write_message_begin(&MessageHeader::new(name, kind, 0)).unwrap();
            body(&mut *w);
            w.write_message_end().unwrap();
        }
        buffer.take_payload()
    }

    fn invoker(transport: Arc<Scripted>) -> Invoker {
        Invoker::new(transport, Arc::new(CompactProtocolFactory))
    }

    #[tokio::test]
    async fn test_call_decodes_reply() {
        let transport = Scripted::new(
            Some(reply("double", MessageType::Reply, |w| 84i32.encode(w).unwrap())),
            0,
        );
        let result: i32 = invoker(transport).call(&Context::new(), "double", &42i32).await.unwrap();
        assert_eq!(result, 84);
    }

    #[tokio::test]
    async fn test_wrong_method_name() {
        let transport = Scripted::new(Some(reply("other", MessageType::Reply, |_| {})), 0);
        let err = invoker(transport)
            .call::<_, ()>(&Context::new(), "ping", &())
            .await
            .unwrap_err();
        let exception = err.application_exception().unwrap();
        assert_eq!(exception.kind(), ApplicationExceptionKind::WrongMethodName);
        assert_eq!(exception.message(), "ping failed: wrong method name");
    }

    #[tokio::test]
    async fn test_invalid_message_type() {
        let transport = Scripted::new(Some(reply("ping", MessageType::Call, |_| {})), 0);
        let err = invoker(transport)
            .call::<_, ()>(&Context::new(), "ping", &())
            .await
            .unwrap_err();
        assert_eq!(
            err.application_exception().map(ApplicationException::kind),
            Some(ApplicationExceptionKind::InvalidMessageType)
        );
    }

    #[tokio::test]
    async fn test_response_too_large_maps_to_transport_error() {
        let exception = ApplicationException::new(
            ApplicationExceptionKind::ResponseTooLarge,
            "response for function ping is too large",
        );
        let transport = Scripted::new(
            Some(reply("ping", MessageType::Exception, |w| exception.encode(w).unwrap())),
            0,
        );
        let err = invoker(transport)
            .call::<_, ()>(&Context::new(), "ping", &())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FrugalError::Transport(TransportError::ResponseTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_other_exceptions_pass_through() {
        let exception = ApplicationException::new(
            ApplicationExceptionKind::UnknownMethod,
            "Unknown function ping",
        );
        let transport = Scripted::new(
            Some(reply("ping", MessageType::Exception, |w| exception.encode(w).unwrap())),
            0,
        );
        let err = invoker(transport)
            .call::<_, ()>(&Context::new(), "ping", &())
            .await
            .unwrap_err();
        assert_eq!(err.application_exception(), Some(&exception));
    }

    #[tokio::test]
    async fn test_oneway_never_waits_for_reply() {
        let transport = Scripted::new(None, 0);
        invoker(Arc::clone(&transport))
            .oneway(&Context::new(), "notify", &7i32)
            .await
            .unwrap();
        assert_eq!(transport.oneways.load(Ordering::SeqCst), 1);
        assert_eq!(transport.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_request_too_large_is_not_sent() {
        let transport = Scripted::new(None, 32);
        let err = invoker(Arc::clone(&transport))
            .call::<_, ()>(&Context::new(), "upload", &"x".repeat(256))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FrugalError::Transport(TransportError::RequestTooLarge { limit: 32, .. })
        ));
        assert_eq!(transport.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_each_call_gets_a_new_op_id() {
        let ctx = Context::new();
        let transport = Scripted::new(None, 0);
        let invoker = invoker(transport);
        invoker.oneway(&ctx, "a", &()).await.unwrap();
        let first = ctx.op_id();
        invoker.oneway(&ctx, "b", &()).await.unwrap();
        assert_ne!(ctx.op_id(), first);
    }
}
