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
//! Observability support.
//!
//! Every processor and scope endpoint keeps atomic counters describing what
//! it has done. With the `observability` feature enabled the same events are
//! also reported through the [`metrics`](https://docs.rs/metrics) facade so
//! they reach whatever recorder the application installs.
//!
//! Logging goes through [`tracing`]; the library never installs a subscriber.
//!
//! ```rust
//! use frugal::observability::ProcessorMetrics;
//!
//! let metrics = ProcessorMetrics::new();
//! metrics.record_request();
//! metrics.record_unknown_method();
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.requests, 1);
//! assert_eq!(snapshot.unknown_methods, 1);
//! ```

mod metrics;

pub use self::metrics::{
    ProcessorMetrics, ProcessorMetricsSnapshot, ScopeMetrics, ScopeMetricsSnapshot,
};
