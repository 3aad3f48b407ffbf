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
//! Pub/sub error types.

use thiserror::Error;

/// Errors raised while building topics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// Wrong number of prefix variable values.
    #[error("topic prefix expects {expected} variable values, got {actual}")]
    VariableCount {
        /// Variables declared by the template
        expected: usize,
        /// Values supplied
        actual: usize,
    },

    /// A variable value contains the topic delimiter.
    #[error("value {value:?} for prefix variable {variable} contains the topic delimiter")]
    DelimiterInValue {
        /// Variable name
        variable: String,
        /// Offending value
        value: String,
    },

    /// A `{` without a matching `}`.
    #[error("unterminated variable in topic prefix {template:?}")]
    UnterminatedVariable {
        /// The template being parsed
        template: String,
    },

    /// A `{}` placeholder.
    #[error("empty variable name in topic prefix {template:?}")]
    EmptyVariable {
        /// The template being parsed
        template: String,
    },

    /// A scope or operation name is empty or contains the delimiter.
    #[error("invalid {what} name {name:?}")]
    InvalidName {
        /// `scope` or `operation`
        what: &'static str,
        /// Offending name
        name: String,
    },
}
