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

#![allow(clippy::module_inception)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! # Frugal
//!
//! An RPC and publish/subscribe runtime layered on the Thrift compact and
//! binary protocols. Generated service bindings build on four pieces:
//!
//! - **[`Invoker`]**: the client call path. Serializes arguments with the
//!   request headers, sends the frame and validates the reply.
//! - **[`Processor`]**: the server dispatch table. Reads a frame, routes it to
//!   a [`ProcessorFunction`](processor::ProcessorFunction) and writes the
//!   result, exception or nothing (for oneway calls).
//! - **[`middleware`]**: composable wrappers around every method invocation on
//!   either side.
//! - **[`scope`]**: topic publishers and subscribers sharing the same wire
//!   format and middleware.
//!
//! Every call carries a [`Context`] with a correlation id, an operation id, a
//! timeout and free-form headers, all of which travel in the frame header.
//!
//! ## Architecture
//!
//! - **[`protocol`]**: Thrift encoders, the header block and output buffers
//! - **[`transport`]**: transport traits plus in-memory implementations
//! - **[`context`]**: per-call metadata and cancellation
//! - **[`provider`]**: bundles of transport, protocol and middleware
//! - **[`observability`]**: counters, optionally exported through `metrics`
//!
//! ## Quick Start
//!
//! ```rust
//! use frugal::middleware::Method;
//! use frugal::protocol::CompactProtocolFactory;
//! use frugal::transport::MemoryRequestTransport;
//! use frugal::{Context, Invoker, Processor};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), frugal::FrugalError> {
//! let mut processor = Processor::new();
//! let ping = Method::new("ping", |_ctx: Context, (): ()| async { Ok(()) }, Vec::new());
//! processor.register_method::<(), ()>(ping);
//!
//! let protocol = Arc::new(CompactProtocolFactory);
//! let transport = MemoryRequestTransport::new(Arc::new(processor), protocol.clone());
//! let invoker = Invoker::new(Arc::new(transport), protocol);
//!
//! let ctx = Context::new();
//! let () = invoker.call(&ctx, "ping", &()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`FrugalError`], which separates transport,
//! protocol, application-exception and handler failures. See [`error`].

pub mod context;
pub mod error;
pub mod exception;
pub mod invoker;
pub mod middleware;
pub mod observability;
pub mod processor;
pub mod protocol;
pub mod provider;
pub mod scope;
pub mod transport;

pub use context::Context;
pub use error::FrugalError;
pub use exception::{ApplicationException, ApplicationExceptionKind};
pub use invoker::Invoker;
pub use processor::Processor;
pub use provider::{ScopeProvider, ServiceProvider};
