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
//! Topic-based publish/subscribe.
//!
//! A scope groups pub/sub operations under one topic prefix. A
//! [`ScopePublisher`] serializes each message as a `CALL` frame and sends it
//! to `prefix + Scope + "." + operation`; a [`ScopeSubscriber`] registers a
//! callback on the same topic and hands decoded messages to a typed handler.
//! Both run through the middleware configured on the [`ScopeProvider`].
//!
//! [`ScopeProvider`]: crate::provider::ScopeProvider

mod error;
mod publisher;
mod subscriber;
mod subscription;
mod topic;

pub use error::ScopeError;
pub use publisher::{Publication, PublishOperation, ScopePublisher};
pub use subscriber::ScopeSubscriber;
pub use subscription::Subscription;
pub use topic::{scope_name, TopicPrefix, TOPIC_DELIMITER};
