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
//! Operation id generation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out operation ids for outgoing calls.
///
/// IDs start at 1 and increment monotonically; 0 means "not assigned".
#[derive(Debug)]
pub struct OpIdGenerator {
    next_id: AtomicU64,
}

impl OpIdGenerator {
    /// Creates a generator starting at 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns the next operation id.
    #[must_use]
    pub fn next(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for OpIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
