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
//! Server-side dispatch.
//!
//! A [`Processor`] maps method names to [`ProcessorFunction`]s. For every
//! inbound frame it reads the request header and message begin marker, looks
//! up the function and hands over the rest of the frame. Names with no
//! registration are answered with an `unknown-method` exception after the
//! arguments are skipped, so the input stays framed for the next request.
//!
//! All response writes are serialized by one write lock owned by the
//! processor and shared with each function and with any processor that
//! extends it. Handlers run outside the lock.
//!
//! # Example
//!
//! ```rust
//! use frugal::middleware::Method;
//! use frugal::processor::Processor;
//! use frugal::{Context, FrugalError};
//!
//! let mut processor = Processor::new();
//! processor.register_oneway(Method::new(
//!     "log",
//!     |_ctx: Context, line: String| async move {
//!         println!("{line}");
//!         Ok::<_, FrugalError>(())
//!     },
//!     Vec::new(),
//! ));
//! processor.annotate("log", "deprecated", "use logV2");
//! assert!(processor.has_function("log"));
//! ```

mod function;

pub use function::{MethodProcessor, ProcessorFunction, ResultEnvelope};

pub(crate) use function::write_exception;

use crate::error::FrugalError;
use crate::exception::{ApplicationException, ApplicationExceptionKind};
use crate::middleware::{Method, Middleware, Payload};
use crate::observability::ProcessorMetrics;
use crate::protocol::{
    read_request_header, Decode, MessageType, ProtocolReader, ProtocolWriter, TType,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, warn};

/// Annotation key marking a method as deprecated; the value is the notice.
pub const DEPRECATED_ANNOTATION: &str = "deprecated";

/// Name-keyed dispatch table with a shared write lock.
///
/// Registration and middleware changes must finish before the processor
/// starts serving; dispatch only reads the table.
pub struct Processor {
    write_lock: Arc<Mutex<()>>,
    functions: HashMap<String, Arc<dyn ProcessorFunction>>,
    annotations: HashMap<String, HashMap<String, String>>,
    metrics: Arc<ProcessorMetrics>,
}

impl Processor {
    /// Creates an empty processor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            write_lock: Arc::new(Mutex::new(())),
            functions: HashMap::new(),
            annotations: HashMap::new(),
            metrics: Arc::new(ProcessorMetrics::new()),
        }
    }

    /// Creates a processor for a service extending `base`.
    ///
    /// The new processor starts with the base's functions and annotations and
    /// shares its write lock and metrics. Each inherited function gets its own
    /// middleware chain, so [`add_middleware`](Self::add_middleware) on the
    /// new processor leaves `base` untouched.
    #[must_use]
    pub fn extend(base: &Processor) -> Self {
        let functions = base
            .functions
            .iter()
            .map(|(name, function)| (name.clone(), function.fork()))
            .collect();
        Self {
            write_lock: Arc::clone(&base.write_lock),
            functions,
            annotations: base.annotations.clone(),
            metrics: Arc::clone(&base.metrics),
        }
    }

    /// Returns the write lock shared by every function of this processor.
    #[must_use]
    pub fn write_lock(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.write_lock)
    }

    /// Returns the processing counters.
    #[must_use]
    pub fn metrics(&self) -> Arc<ProcessorMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Registers a function under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, function: Arc<dyn ProcessorFunction>) {
        self.functions.insert(name.into(), function);
    }

    /// Registers a request/response method using result envelope `E`.
    pub fn register_method<A, E>(&mut self, method: Method<A, E::Success>)
    where
        A: Decode + Payload,
        E: ResultEnvelope,
    {
        let name = method.name().to_string();
        let function = MethodProcessor::<A, E>::new(method, self.write_lock(), self.metrics());
        self.register(name, Arc::new(function));
    }

    /// Registers a oneway method.
    pub fn register_oneway<A>(&mut self, method: Method<A, ()>)
    where
        A: Decode + Payload,
    {
        let name = method.name().to_string();
        let function = MethodProcessor::<A, ()>::oneway(method, self.write_lock(), self.metrics());
        self.register(name, Arc::new(function));
    }

    /// Attaches an annotation to a method.
    pub fn annotate(
        &mut self,
        method: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.annotations
            .entry(method.into())
            .or_default()
            .insert(key.into(), value.into());
    }

    /// Returns a copy of every method's annotations.
    #[must_use]
    pub fn annotations(&self) -> HashMap<String, HashMap<String, String>> {
        self.annotations.clone()
    }

    /// Returns true if a function is registered under `name`.
    #[must_use]
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Returns the registered method names.
    #[must_use]
    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Appends a middleware to every registered function.
    pub fn add_middleware(&self, middleware: Middleware) {
        for function in self.functions.values() {
            function.add_middleware(Arc::clone(&middleware));
        }
    }

    /// Processes one inbound frame.
    ///
    /// Handler failures are logged and answered on the wire; they do not
    /// fail this call. An error is returned only when the frame itself could
    /// not be read or the unknown-method response could not be written.
    pub async fn process(
        &self,
        input: &mut dyn ProtocolReader,
        output: &mut dyn ProtocolWriter,
    ) -> Result<(), FrugalError> {
        let ctx = read_request_header(input)?;
        let header = input.read_message_begin()?;
        self.metrics.record_request();

        let Some(function) = self.functions.get(&header.name) else {
            self.metrics.record_unknown_method();
            warn!(
                method = %header.name,
                correlation_id = %ctx.correlation_id(),
                "client invoked unknown function"
            );
            input.skip(TType::Struct)?;
            input.read_message_end()?;
            if header.kind == MessageType::Oneway {
                return Ok(());
            }
            let exception = ApplicationException::new(
                ApplicationExceptionKind::UnknownMethod,
                format!("Unknown function {}", header.name),
            );
            let _guard = self.write_lock.lock().await;
            write_exception(output, &ctx, &header.name, &exception)?;
            return Ok(());
        };

        if let Some(notice) = self
            .annotations
            .get(&header.name)
            .and_then(|annotations| annotations.get(DEPRECATED_ANNOTATION))
        {
            warn!(method = %header.name, notice = %notice, "deprecated function invoked");
        }

        if let Err(err) = function.process(ctx.clone(), input, output).await {
            match &err {
                FrugalError::Handler(_) | FrugalError::Internal { .. } => {
                    self.metrics.record_handler_error();
                    error!(
                        method = %header.name,
                        correlation_id = %ctx.correlation_id(),
                        error = %err,
                        "user handler code returned unhandled error"
                    );
                }
                _ => error!(
                    method = %header.name,
                    correlation_id = %ctx.correlation_id(),
                    error = %err,
                    "error occurred while processing request"
                ),
            }
        }
        Ok(())
    }
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("functions", &self.function_names())
            .field("annotations", &self.annotations)
            .finish_non_exhaustive()
    }
}
