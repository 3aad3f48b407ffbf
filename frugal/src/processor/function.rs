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
//! Per-method request handling.

use crate::context::Context;
use crate::error::FrugalError;
use crate::exception::{ApplicationException, ApplicationExceptionKind};
use crate::middleware::{Method, Middleware, Payload};
use crate::observability::ProcessorMetrics;
use crate::protocol::{
    write_reserved_response_header, write_response_header, Decode, Encode, MessageHeader,
    MessageType, ProtocolError, ProtocolReader, ProtocolWriter,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Handles one inbound call for a single method.
///
/// The processor has already read the request header and the message
/// begin marker; an implementation reads the arguments and message end, runs
/// the handler and writes the response while holding the processor's write
/// lock.
#[async_trait]
pub trait ProcessorFunction: Send + Sync {
    /// Processes one call.
    async fn process(
        &self,
        ctx: Context,
        input: &mut dyn ProtocolReader,
        output: &mut dyn ProtocolWriter,
    ) -> Result<(), FrugalError>;

    /// Appends a middleware to this function's chain.
    fn add_middleware(&self, middleware: Middleware);

    /// Returns a copy with its own middleware chain, sharing the handler and
    /// write lock.
    fn fork(&self) -> Arc<dyn ProcessorFunction>;
}

/// The result struct of a method: a success value or one declared exception.
///
/// Generated bindings implement this for their `<method>_result` structs.
pub trait ResultEnvelope: Encode + Send + Sync + Sized + 'static {
    /// Value returned by a successful handler.
    type Success: Payload;

    /// Wraps a successful return value.
    fn success(value: Self::Success) -> Self;

    /// Wraps a declared exception, handing back any error that is not declared.
    fn declared(error: FrugalError) -> Result<Self, FrugalError>;
}

impl ResultEnvelope for () {
    type Success = ();

    fn success(_value: ()) -> Self {}

    fn declared(error: FrugalError) -> Result<Self, FrugalError> {
        Err(error)
    }
}

/// Writes one complete response frame, checking every step.
pub(crate) fn write_response_frame(
    output: &mut dyn ProtocolWriter,
    ctx: &Context,
    header: &MessageHeader,
    body: &dyn Fn(&mut dyn ProtocolWriter) -> Result<(), ProtocolError>,
) -> Result<(), ProtocolError> {
    write_response_header(output, ctx)?;
    write_message(output, header, body)
}

fn write_message(
    output: &mut dyn ProtocolWriter,
    header: &MessageHeader,
    body: &dyn Fn(&mut dyn ProtocolWriter) -> Result<(), ProtocolError>,
) -> Result<(), ProtocolError> {
    output.write_message_begin(header)?;
    body(output)?;
    output.write_message_end()?;
    output.flush()
}

/// Writes an `EXCEPTION` frame. The caller must hold the write lock.
pub(crate) fn write_exception(
    output: &mut dyn ProtocolWriter,
    ctx: &Context,
    method: &str,
    exception: &ApplicationException,
) -> Result<(), ProtocolError> {
    let header = MessageHeader::new(method, MessageType::Exception, 0);
    write_response_frame(output, ctx, &header, &|w| exception.encode(w))
}

/// [`ProcessorFunction`] binding a typed [`Method`] to the wire.
///
/// `A` is the generated `<method>_args` struct and `E` the matching result
/// envelope. Oneway methods use `()` as the envelope and never write.
pub struct MethodProcessor<A, E: ResultEnvelope> {
    method: Method<A, E::Success>,
    write_lock: Arc<Mutex<()>>,
    metrics: Arc<ProcessorMetrics>,
    oneway: bool,
}

impl<A, E> MethodProcessor<A, E>
where
    A: Decode + Payload,
    E: ResultEnvelope,
{
    /// Creates a request/response function sharing `write_lock`.
    #[must_use]
    pub fn new(
        method: Method<A, E::Success>,
        write_lock: Arc<Mutex<()>>,
        metrics: Arc<ProcessorMetrics>,
    ) -> Self {
        Self {
            method,
            write_lock,
            metrics,
            oneway: false,
        }
    }

    fn name(&self) -> &str {
        self.method.name()
    }

    async fn write_reply(
        &self,
        ctx: &Context,
        output: &mut dyn ProtocolWriter,
        envelope: &E,
    ) -> Result<(), FrugalError> {
        let _guard = self.write_lock.lock().await;
        let header = MessageHeader::new(self.name(), MessageType::Reply, 0);
        match write_response_frame(output, ctx, &header, &|w| envelope.encode(w)) {
            Err(err) if err.is_too_large() => self.replace_too_large(ctx, output, err),
            other => other.map_err(FrugalError::from),
        }
    }

    async fn write_failure(
        &self,
        ctx: &Context,
        output: &mut dyn ProtocolWriter,
        exception: &ApplicationException,
    ) -> Result<(), FrugalError> {
        let _guard = self.write_lock.lock().await;
        match write_exception(output, ctx, self.name(), exception) {
            Err(err) if err.is_too_large() => self.replace_too_large(ctx, output, err),
            other => other.map_err(FrugalError::from),
        }
    }

    // Called with the write lock held. The output buffer has already
    // discarded the partial frame. User response headers may be what
    // overflowed, so only the reserved ones are written.
    fn replace_too_large(
        &self,
        ctx: &Context,
        output: &mut dyn ProtocolWriter,
        cause: ProtocolError,
    ) -> Result<(), FrugalError> {
        self.metrics.record_too_large_response();
        debug!(
            method = %self.name(),
            correlation_id = %ctx.correlation_id(),
            cause = %cause,
            "response exceeded size limit"
        );
        let exception = ApplicationException::new(
            ApplicationExceptionKind::ResponseTooLarge,
            format!("response for function {} is too large", self.name()),
        );
        let header = MessageHeader::new(self.name(), MessageType::Exception, 0);
        write_reserved_response_header(output, ctx)?;
        write_message(output, &header, &|w| exception.encode(w))?;
        Ok(())
    }
}

impl<A> MethodProcessor<A, ()>
where
    A: Decode + Payload,
{
    /// Creates a oneway function. It never writes to the output.
    #[must_use]
    pub fn oneway(
        method: Method<A, ()>,
        write_lock: Arc<Mutex<()>>,
        metrics: Arc<ProcessorMetrics>,
    ) -> Self {
        Self {
            method,
            write_lock,
            metrics,
            oneway: true,
        }
    }
}

#[async_trait]
impl<A, E> ProcessorFunction for MethodProcessor<A, E>
where
    A: Decode + Payload,
    E: ResultEnvelope,
{
    async fn process(
        &self,
        ctx: Context,
        input: &mut dyn ProtocolReader,
        output: &mut dyn ProtocolWriter,
    ) -> Result<(), FrugalError> {
        let args = match A::decode(input).and_then(|args| input.read_message_end().map(|()| args)) {
            Ok(args) => args,
            Err(err) => {
                // Best effort: the frame is already malformed.
                let _ = input.read_message_end();
                self.metrics.record_protocol_error();
                if !self.oneway {
                    let exception = ApplicationException::new(
                        ApplicationExceptionKind::ProtocolError,
                        err.to_string(),
                    );
                    self.write_failure(&ctx, output, &exception).await?;
                }
                return Err(err.into());
            }
        };

        let outcome = self.method.invoke(ctx.clone(), args).await;
        if self.oneway {
            return outcome.map(drop);
        }

        let envelope = match outcome {
            Ok(value) => E::success(value),
            Err(FrugalError::Application(exception)) => {
                self.write_failure(&ctx, output, &exception).await?;
                return Ok(());
            }
            Err(err) => match E::declared(err) {
                Ok(envelope) => envelope,
                Err(undeclared) => {
                    let exception = ApplicationException::new(
                        ApplicationExceptionKind::InternalError,
                        format!("Internal error processing {}: {}", self.name(), undeclared),
                    );
                    if let Err(write_err) = self.write_failure(&ctx, output, &exception).await {
                        error!(
                            method = %self.name(),
                            correlation_id = %ctx.correlation_id(),
                            error = %write_err,
                            "failed to write internal error response"
                        );
                    }
                    return Err(undeclared);
                }
            },
        };

        self.write_reply(&ctx, output, &envelope).await
    }

    fn add_middleware(&self, middleware: Middleware) {
        self.method.add_middleware(middleware);
    }

    fn fork(&self) -> Arc<dyn ProcessorFunction> {
        Arc::new(Self {
            method: self.method.fork(),
            write_lock: Arc::clone(&self.write_lock),
            metrics: Arc::clone(&self.metrics),
            oneway: self.oneway,
        })
    }
}
