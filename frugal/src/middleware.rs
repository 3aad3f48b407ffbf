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
//! Middleware composition.
//!
//! A method call is an [`Invocation`]: an async function from a [`Context`]
//! and type-erased [`Arguments`] to type-erased [`Results`]. A [`Middleware`]
//! turns one invocation into another, typically by doing something before
//! and after calling the one it wraps.
//!
//! [`compose`] applies middleware in registration order with the first one
//! outermost: for `[A, B]` around a handler `H` the call runs
//! A-enter, B-enter, H, B-exit, A-exit.
//!
//! ```rust
//! use frugal::middleware::{around, Method};
//! use frugal::{Context, FrugalError};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), FrugalError> {
//! let double = Method::new(
//!     "double",
//!     |_ctx: Context, n: i32| async move { Ok::<_, FrugalError>(n * 2) },
//!     vec![around(|ctx, args, next| async move {
//!         tracing::info!(method = args.method(), "calling");
//!         next(ctx, args).await
//!     })],
//! );
//! assert_eq!(double.invoke(Context::new(), 21).await?, 42);
//! # Ok(())
//! # }
//! ```

use crate::context::Context;
use crate::error::FrugalError;
use futures_util::future::{self, BoxFuture, FutureExt};
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// A value that can pass through a middleware chain.
pub trait Payload: Any + Send + fmt::Debug {
    /// Converts the boxed value into `Any` for downcasting.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
    /// Borrows the value as `Any`.
    fn as_any(&self) -> &dyn Any;
    /// Mutably borrows the value as `Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any + Send + fmt::Debug> Payload for T {
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Arguments of one method call.
#[derive(Debug)]
pub struct Arguments {
    method: Arc<str>,
    values: Box<dyn Payload>,
}

impl Arguments {
    /// Wraps typed arguments.
    pub fn new<A: Payload>(method: Arc<str>, values: A) -> Self {
        Self {
            method,
            values: Box::new(values),
        }
    }

    /// Name of the method being called.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Borrows the arguments as `A`.
    #[must_use]
    pub fn get<A: Payload>(&self) -> Option<&A> {
        self.values.as_any().downcast_ref::<A>()
    }

    /// Mutably borrows the arguments as `A`.
    pub fn get_mut<A: Payload>(&mut self) -> Option<&mut A> {
        self.values.as_any_mut().downcast_mut::<A>()
    }

    /// Extracts the arguments as `A`.
    pub fn downcast<A: Payload>(self) -> Result<A, FrugalError> {
        let method = self.method;
        self.values
            .into_any()
            .downcast::<A>()
            .map(|boxed| *boxed)
            .map_err(|_| {
                FrugalError::internal(format!(
                    "middleware replaced the arguments of {method} with another type"
                ))
            })
    }
}

/// Return value of one method call.
#[derive(Debug)]
pub struct Results {
    values: Box<dyn Payload>,
}

impl Results {
    /// Wraps a typed return value.
    pub fn new<R: Payload>(values: R) -> Self {
        Self {
            values: Box::new(values),
        }
    }

    /// Borrows the return value as `R`.
    #[must_use]
    pub fn get<R: Payload>(&self) -> Option<&R> {
        self.values.as_any().downcast_ref::<R>()
    }

    /// Extracts the return value as `R`.
    pub fn downcast<R: Payload>(self) -> Result<R, FrugalError> {
        self.values
            .into_any()
            .downcast::<R>()
            .map(|boxed| *boxed)
            .map_err(|_| FrugalError::internal("middleware replaced a result with another type"))
    }
}

/// A type-erased method call.
pub type Invocation = Arc<
    dyn Fn(Context, Arguments) -> BoxFuture<'static, Result<Results, FrugalError>> + Send + Sync,
>;

/// Wraps an invocation in another.
pub type Middleware = Arc<dyn Fn(Invocation) -> Invocation + Send + Sync>;

/// Wraps `base` in `middleware`, the first element outermost.
#[must_use]
pub fn compose(base: Invocation, middleware: &[Middleware]) -> Invocation {
    middleware
        .iter()
        .rev()
        .fold(base, |next, wrap| wrap(next))
}

/// Builds a middleware from an async function receiving the wrapped invocation.
pub fn around<F, Fut>(f: F) -> Middleware
where
    F: Fn(Context, Arguments, Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Results, FrugalError>> + Send + 'static,
{
    let f = Arc::new(f);
    Arc::new(move |next: Invocation| {
        let f = Arc::clone(&f);
        Arc::new(move |ctx: Context, args: Arguments| f(ctx, args, Arc::clone(&next)).boxed())
            as Invocation
    })
}

/// Middleware logging every call with its correlation id and duration.
#[must_use]
pub fn logging() -> Middleware {
    around(|ctx, args, next| async move {
        let method = args.method().to_string();
        let started = Instant::now();
        debug!(method = %method, correlation_id = %ctx.correlation_id(), "invoking");
        let result = next(ctx.clone(), args).await;
        let elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        match &result {
            Ok(_) => debug!(
                method = %method,
                correlation_id = %ctx.correlation_id(),
                elapsed_us,
                "completed"
            ),
            Err(error) => warn!(
                method = %method,
                correlation_id = %ctx.correlation_id(),
                elapsed_us,
                error = %error,
                "failed"
            ),
        }
        result
    })
}

/// A typed method wrapped in middleware.
///
/// Used on both sides of a call: servers wrap user handlers, clients wrap
/// the call into the invoker.
pub struct Method<A, R> {
    name: Arc<str>,
    base: Invocation,
    middleware: RwLock<Vec<Middleware>>,
    composed: RwLock<Invocation>,
    _marker: PhantomData<fn(A) -> R>,
}

impl<A: Payload, R: Payload> Method<A, R> {
    /// Binds `handler` under `name` and composes `middleware` around it.
    pub fn new<H, Fut>(name: impl Into<Arc<str>>, handler: H, middleware: Vec<Middleware>) -> Self
    where
        H: Fn(Context, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, FrugalError>> + Send + 'static,
    {
        let base: Invocation = Arc::new(move |ctx: Context, args: Arguments| {
            match args.downcast::<A>() {
                Ok(args) => handler(ctx, args).map(|result| result.map(Results::new)).boxed(),
                Err(error) => future::ready(Err(error)).boxed(),
            }
        });
        let composed = compose(Arc::clone(&base), &middleware);
        Self {
            name: name.into(),
            base,
            middleware: RwLock::new(middleware),
            composed: RwLock::new(composed),
            _marker: PhantomData,
        }
    }

    /// Returns the method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calls the method through its middleware.
    pub async fn invoke(&self, ctx: Context, args: A) -> Result<R, FrugalError> {
        let invocation = Arc::clone(&*self.composed.read());
        let results = invocation(ctx, Arguments::new(Arc::clone(&self.name), args)).await?;
        results.downcast::<R>()
    }

    /// Appends a middleware, innermost, and recomposes the chain.
    ///
    /// Must complete before the method starts serving calls.
    pub fn add_middleware(&self, middleware: Middleware) {
        let mut registered = self.middleware.write();
        registered.push(middleware);
        *self.composed.write() = compose(Arc::clone(&self.base), &registered);
    }

    /// Copies the method with a separate middleware list.
    ///
    /// Middleware added to the copy does not reach the original.
    #[must_use]
    pub fn fork(&self) -> Self {
        let middleware = self.middleware.read().clone();
        let composed = compose(Arc::clone(&self.base), &middleware);
        Self {
            name: Arc::clone(&self.name),
            base: Arc::clone(&self.base),
            middleware: RwLock::new(middleware),
            composed: RwLock::new(composed),
            _marker: PhantomData,
        }
    }
}

impl<A, R> fmt::Debug for Method<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("middleware", &self.middleware.read().len())
            .finish()
    }
}
