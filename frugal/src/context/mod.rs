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
//! Per-call metadata.
//!
//! A [`Context`] travels with every call. It carries the correlation id used
//! to tie log lines together across processes, the operation id used by
//! transports to match replies, a timeout, a cooperative cancellation signal
//! and two header maps: request headers written by the caller and response
//! headers written by the callee.
//!
//! Headers are copied into the frame when it is serialized. Adding a header
//! after that point is silently ignored.
//!
//! # Example
//!
//! ```rust
//! use frugal::Context;
//! use std::time::Duration;
//!
//! let ctx = Context::new().with_timeout(Duration::from_millis(250));
//! ctx.add_request_header("user", "alice");
//! assert_eq!(ctx.request_header("user").as_deref(), Some("alice"));
//! assert_eq!(ctx.timeout(), Duration::from_millis(250));
//! ```

mod cancel;
mod op_id;

pub use op_id::OpIdGenerator;

use cancel::CancelToken;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Header carrying the correlation id.
pub const CID_HEADER: &str = "_cid";
/// Header carrying the operation id.
pub const OPID_HEADER: &str = "_opid";
/// Header carrying the timeout in milliseconds.
pub const TIMEOUT_HEADER: &str = "_timeout";
/// Timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const RESERVED_HEADERS: [&str; 3] = [CID_HEADER, OPID_HEADER, TIMEOUT_HEADER];

static OP_IDS: OpIdGenerator = OpIdGenerator::new();

/// Why a context is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// `cancel` was called on this context or an ancestor.
    #[error("context cancelled")]
    Cancelled,
    /// The deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Default, Clone)]
struct HeaderMap {
    entries: HashMap<String, String>,
    sealed: bool,
}

impl HeaderMap {
    fn insert(&mut self, name: String, value: String) -> bool {
        if self.sealed {
            return false;
        }
        self.entries.insert(name, value);
        true
    }

    fn unsealed_copy(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            sealed: false,
        }
    }
}

struct ContextInner {
    correlation_id: String,
    op_id: AtomicU64,
    timeout: Duration,
    deadline: Option<Instant>,
    cancel: CancelToken,
    request_headers: RwLock<HeaderMap>,
    response_headers: RwLock<HeaderMap>,
}

/// Per-call metadata carrier.
///
/// Cloning a `Context` is cheap and yields a handle to the same call; use
/// [`Context::with_timeout`] or [`Context::with_deadline`] to derive a new one.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Creates a context with a fresh correlation id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_correlation_id(generate_correlation_id())
    }

    /// Creates a context with the given correlation id.
    #[must_use]
    pub fn with_correlation_id(correlation_id: impl Into<String>) -> Self {
        Self::build(
            correlation_id.into(),
            DEFAULT_TIMEOUT,
            None,
            CancelToken::new(),
            HeaderMap::default(),
            HeaderMap::default(),
        )
    }

    fn build(
        correlation_id: String,
        timeout: Duration,
        deadline: Option<Instant>,
        cancel: CancelToken,
        request_headers: HeaderMap,
        response_headers: HeaderMap,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                correlation_id,
                op_id: AtomicU64::new(0),
                timeout,
                deadline,
                cancel,
                request_headers: RwLock::new(request_headers),
                response_headers: RwLock::new(response_headers),
            }),
        }
    }

    fn derive(&self, timeout: Duration, deadline: Instant) -> Self {
        Self::build(
            self.inner.correlation_id.clone(),
            timeout,
            Some(deadline),
            self.inner.cancel.child(),
            self.inner.request_headers.read().unsealed_copy(),
            self.inner.response_headers.read().unsealed_copy(),
        )
    }

    /// Returns the correlation id.
    #[must_use]
    pub fn correlation_id(&self) -> &str {
        &self.inner.correlation_id
    }

    /// Returns the operation id of the most recent call, 0 if none.
    #[must_use]
    pub fn op_id(&self) -> u64 {
        self.inner.op_id.load(Ordering::Acquire)
    }

    /// Assigns a fresh operation id and returns it.
    pub(crate) fn assign_op_id(&self) -> u64 {
        let op_id = OP_IDS.next();
        self.inner.op_id.store(op_id, Ordering::Release);
        op_id
    }

    /// Returns the configured timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Returns the absolute deadline, if one is set.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline, or the timeout if there is no deadline.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        match self.inner.deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => self.inner.timeout,
        }
    }

    /// Derives a context whose deadline is `timeout` from now.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.derive(timeout, Instant::now() + timeout)
    }

    /// Derives a context that is done at `deadline`.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let timeout = deadline.saturating_duration_since(Instant::now());
        self.derive(timeout, deadline)
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    /// Returns true once [`Context::cancel`] has been called here or on an ancestor.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Completes when the context is cancelled.
    pub async fn cancelled(&self) {
        self.inner.cancel.cancelled().await;
    }

    /// Completes when the context is cancelled or its deadline passes.
    pub async fn done(&self) {
        match self.inner.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.inner.cancel.cancelled() => {}
                    () = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.inner.cancel.cancelled().await,
        }
    }

    /// Returns why the context is done, or `None` while it is still live.
    #[must_use]
    pub fn err(&self) -> Option<ContextError> {
        if self.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.inner.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Adds a request header. Ignored for reserved names or once the request is sent.
    pub fn add_request_header(&self, name: impl Into<String>, value: impl Into<String>) -> &Self {
        let name = name.into();
        if is_reserved(&name) {
            tracing::debug!(header = %name, "ignoring reserved request header");
            return self;
        }
        if !self.inner.request_headers.write().insert(name, value.into()) {
            tracing::debug!(
                correlation_id = %self.correlation_id(),
                "request already sent, header dropped"
            );
        }
        self
    }

    /// Adds a response header. Ignored for reserved names or once the response is sent.
    pub fn add_response_header(&self, name: impl Into<String>, value: impl Into<String>) -> &Self {
        let name = name.into();
        if is_reserved(&name) {
            tracing::debug!(header = %name, "ignoring reserved response header");
            return self;
        }
        if !self.inner.response_headers.write().insert(name, value.into()) {
            tracing::debug!(
                correlation_id = %self.correlation_id(),
                "response already sent, header dropped"
            );
        }
        self
    }

    /// Returns one request header.
    #[must_use]
    pub fn request_header(&self, name: &str) -> Option<String> {
        self.request_headers().remove(name)
    }

    /// Returns one response header.
    #[must_use]
    pub fn response_header(&self, name: &str) -> Option<String> {
        self.response_headers().remove(name)
    }

    /// Returns a copy of the request headers, including reserved ones.
    #[must_use]
    pub fn request_headers(&self) -> HashMap<String, String> {
        let mut headers = self.inner.request_headers.read().entries.clone();
        headers.insert(CID_HEADER.to_string(), self.inner.correlation_id.clone());
        headers.insert(OPID_HEADER.to_string(), self.op_id().to_string());
        headers.insert(
            TIMEOUT_HEADER.to_string(),
            self.remaining().as_millis().to_string(),
        );
        headers
    }

    /// Returns a copy of the response headers, including reserved ones.
    #[must_use]
    pub fn response_headers(&self) -> HashMap<String, String> {
        let mut headers = self.inner.response_headers.read().entries.clone();
        headers.insert(CID_HEADER.to_string(), self.inner.correlation_id.clone());
        headers.insert(OPID_HEADER.to_string(), self.op_id().to_string());
        headers
    }

    /// Snapshot of the request headers for serialization; later adds are dropped.
    pub(crate) fn seal_request_headers(&self) -> HashMap<String, String> {
        self.inner.request_headers.write().sealed = true;
        self.request_headers()
    }

    /// Snapshot of the response headers for serialization; later adds are dropped.
    pub(crate) fn seal_response_headers(&self) -> HashMap<String, String> {
        self.inner.response_headers.write().sealed = true;
        self.response_headers()
    }

    /// The correlation and operation id headers alone, for replacement frames.
    pub(crate) fn reserved_response_headers(&self) -> HashMap<String, String> {
        HashMap::from([
            (CID_HEADER.to_string(), self.inner.correlation_id.clone()),
            (OPID_HEADER.to_string(), self.op_id().to_string()),
        ])
    }

    /// Rebuilds the server-side context from the headers of an inbound frame.
    pub(crate) fn from_request_headers(mut headers: HashMap<String, String>) -> Self {
        let correlation_id = headers
            .remove(CID_HEADER)
            .filter(|cid| !cid.is_empty())
            .unwrap_or_else(generate_correlation_id);
        let op_id = headers
            .remove(OPID_HEADER)
            .and_then(|op_id| op_id.parse::<u64>().ok())
            .unwrap_or(0);
        let timeout = headers
            .remove(TIMEOUT_HEADER)
            .and_then(|ms| ms.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT);

        let ctx = Self::build(
            correlation_id,
            timeout,
            Some(Instant::now() + timeout),
            CancelToken::new(),
            HeaderMap {
                entries: headers,
                sealed: true,
            },
            HeaderMap::default(),
        );
        ctx.inner.op_id.store(op_id, Ordering::Release);
        ctx
    }

    /// Merges headers from a reply into the response headers.
    ///
    /// The reply cannot change this context's correlation or operation id.
    pub(crate) fn merge_response_headers(&self, headers: HashMap<String, String>) {
        let mut response = self.inner.response_headers.write();
        for (name, value) in headers {
            if is_reserved(&name) {
                continue;
            }
            response.entries.insert(name, value);
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("correlation_id", &self.inner.correlation_id)
            .field("op_id", &self.op_id())
            .field("timeout", &self.inner.timeout)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

fn is_reserved(name: &str) -> bool {
    RESERVED_HEADERS.contains(&name)
}

fn generate_correlation_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_correlation_ids() {
        let a = Context::new();
        let b = Context::new();
        assert_ne!(a.correlation_id(), b.correlation_id());
        assert_eq!(a.correlation_id().len(), 32);
        assert_eq!(a.timeout(), DEFAULT_TIMEOUT);
        assert!(a.deadline().is_none());
    }

    #[test]
    fn test_headers_sealed_after_serialization() {
        let ctx = Context::new();
        ctx.add_request_header("a", "1");
        let sent = ctx.seal_request_headers();
        assert_eq!(sent.get("a").map(String::as_str), Some("1"));
        ctx.add_request_header("b", "2");
        assert!(ctx.request_header("b").is_none());

        ctx.add_response_header("c", "3");
        ctx.seal_response_headers();
        ctx.add_response_header("d", "4");
        assert_eq!(ctx.response_header("c").as_deref(), Some("3"));
        assert!(ctx.response_header("d").is_none());
    }

    #[test]
    fn test_reserved_headers_protected() {
        let ctx = Context::with_correlation_id("abc");
        ctx.add_request_header(CID_HEADER, "evil");
        assert_eq!(ctx.request_header(CID_HEADER).as_deref(), Some("abc"));

        let mut reply = HashMap::new();
        reply.insert(CID_HEADER.to_string(), "other".to_string());
        reply.insert("x".to_string(), "y".to_string());
        ctx.merge_response_headers(reply);
        assert_eq!(ctx.correlation_id(), "abc");
        assert_eq!(ctx.response_header("x").as_deref(), Some("y"));
    }

    #[test]
    fn test_from_request_headers() {
        let mut headers = HashMap::new();
        headers.insert(CID_HEADER.to_string(), "cid-1".to_string());
        headers.insert(OPID_HEADER.to_string(), "77".to_string());
        headers.insert(TIMEOUT_HEADER.to_string(), "1500".to_string());
        headers.insert("user".to_string(), "bob".to_string());

        let ctx = Context::from_request_headers(headers);
        assert_eq!(ctx.correlation_id(), "cid-1");
        assert_eq!(ctx.op_id(), 77);
        assert_eq!(ctx.timeout(), Duration::from_millis(1500));
        assert_eq!(ctx.request_header("user").as_deref(), Some("bob"));
        assert_eq!(ctx.response_header(OPID_HEADER).as_deref(), Some("77"));
    }

    #[test]
    fn test_derived_context_keeps_correlation_id() {
        let ctx = Context::new();
        ctx.add_request_header("k", "v");
        ctx.seal_request_headers();
        let derived = ctx.with_timeout(Duration::from_secs(1));
        assert_eq!(derived.correlation_id(), ctx.correlation_id());
        derived.add_request_header("k2", "v2");
        assert_eq!(derived.request_header("k2").as_deref(), Some("v2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_fires_at_deadline() {
        let ctx = Context::new().with_timeout(Duration::from_millis(100));
        assert!(ctx.err().is_none());
        ctx.done().await;
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_done_fires_on_cancel_before_deadline() {
        let parent = Context::new();
        let ctx = parent.with_timeout(Duration::from_secs(3600));
        let waiter = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.done().await })
        };
        parent.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ctx.err(), Some(ContextError::Cancelled));
    }
}
