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
//! Topic templates.
//!
//! A topic is `prefix + Scope + "." + operation`, where the prefix is a
//! template such as `region.{region}` rendered with one value per variable
//! and followed by the delimiter. Publishers and subscribers must render
//! with the same template and values or their topics will not meet.
//!
//! ```rust
//! use frugal::scope::TopicPrefix;
//!
//! let prefix = TopicPrefix::parse("region.{region}").unwrap();
//! assert_eq!(prefix.variables(), ["region"]);
//! let topic = prefix.topic(&["us-east"], "orders", "place").unwrap();
//! assert_eq!(topic, "region.us-east.Orders.place");
//! ```

use super::ScopeError;
use std::fmt;

/// Separator between topic segments.
pub const TOPIC_DELIMITER: char = '.';

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A parsed topic prefix template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicPrefix {
    template: String,
    segments: Vec<Segment>,
    variables: Vec<String>,
}

impl TopicPrefix {
    /// Parses a template with `{variable}` placeholders.
    pub fn parse(template: &str) -> Result<Self, ScopeError> {
        let mut segments = Vec::new();
        let mut variables = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| ScopeError::UnterminatedVariable {
                    template: template.to_string(),
                })?;
            let name = after[..close].trim();
            if name.is_empty() {
                return Err(ScopeError::EmptyVariable {
                    template: template.to_string(),
                });
            }
            segments.push(Segment::Variable(name.to_string()));
            variables.push(name.to_string());
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Ok(Self {
            template: template.to_string(),
            segments,
            variables,
        })
    }

    /// A prefix with no segments; topics become `Scope.operation`.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The template as parsed.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Variable names in template order.
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Renders the prefix including its trailing delimiter.
    ///
    /// An empty template renders as the empty string.
    pub fn render<S: AsRef<str>>(&self, values: &[S]) -> Result<String, ScopeError> {
        if values.len() != self.variables.len() {
            return Err(ScopeError::VariableCount {
                expected: self.variables.len(),
                actual: values.len(),
            });
        }
        if self.segments.is_empty() {
            return Ok(String::new());
        }

        let mut rendered = String::with_capacity(self.template.len() + 16);
        let mut values = values.iter();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Variable(variable) => {
                    // Lengths were checked above.
                    let Some(value) = values.next() else { break };
                    let value = value.as_ref();
                    if value.contains(TOPIC_DELIMITER) {
                        return Err(ScopeError::DelimiterInValue {
                            variable: variable.clone(),
                            value: value.to_string(),
                        });
                    }
                    rendered.push_str(value);
                }
            }
        }
        rendered.push(TOPIC_DELIMITER);
        Ok(rendered)
    }

    /// Renders the full topic for `operation` on `scope`.
    pub fn topic<S: AsRef<str>>(
        &self,
        values: &[S],
        scope: &str,
        operation: &str,
    ) -> Result<String, ScopeError> {
        check_name("scope", scope)?;
        check_name("operation", operation)?;
        let mut topic = self.render(values)?;
        topic.push_str(&scope_name(scope));
        topic.push(TOPIC_DELIMITER);
        topic.push_str(operation);
        Ok(topic)
    }

    /// Pairs each variable with its value, for the `_topic_<variable>` headers.
    pub(crate) fn header_pairs<S: AsRef<str>>(&self, values: &[S]) -> Vec<(String, String)> {
        self.variables
            .iter()
            .zip(values)
            .map(|(variable, value)| (format!("_topic_{variable}"), value.as_ref().to_string()))
            .collect()
    }
}

impl fmt::Display for TopicPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// Title-cases a scope name.
#[must_use]
pub fn scope_name(scope: &str) -> String {
    let mut chars = scope.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn check_name(what: &'static str, name: &str) -> Result<(), ScopeError> {
    if name.is_empty() || name.contains(TOPIC_DELIMITER) {
        return Err(ScopeError::InvalidName {
            what,
            name: name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_variables() {
        let prefix = TopicPrefix::parse("tenant.{tenant}.region.{region}").unwrap();
        assert_eq!(prefix.variables(), ["tenant", "region"]);
        assert_eq!(
            prefix.render(&["acme", "eu"]).unwrap(),
            "tenant.acme.region.eu."
        );
    }

    #[test]
    fn test_literal_prefix() {
        let prefix = TopicPrefix::parse("music").unwrap();
        assert!(prefix.variables().is_empty());
        let empty: [&str; 0] = [];
        assert_eq!(
            prefix.topic(&empty, "store", "winners").unwrap(),
            "music.Store.winners"
        );
    }

    #[test]
    fn test_empty_prefix() {
        let empty: [&str; 0] = [];
        assert_eq!(
            TopicPrefix::empty().topic(&empty, "Orders", "place").unwrap(),
            "Orders.place"
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            TopicPrefix::parse("region.{region"),
            Err(ScopeError::UnterminatedVariable { .. })
        ));
        assert!(matches!(
            TopicPrefix::parse("region.{}"),
            Err(ScopeError::EmptyVariable { .. })
        ));
    }

    #[test]
    fn test_render_rejects_bad_values() {
        let prefix = TopicPrefix::parse("region.{region}").unwrap();
        assert_eq!(
            prefix.render(&["a", "b"]),
            Err(ScopeError::VariableCount {
                expected: 1,
                actual: 2
            })
        );
        assert!(matches!(
            prefix.render(&["us.east"]),
            Err(ScopeError::DelimiterInValue { variable, .. }) if variable == "region"
        ));
    }

    #[test]
    fn test_invalid_names() {
        let empty: [&str; 0] = [];
        let prefix = TopicPrefix::empty();
        assert!(prefix.topic(&empty, "", "op").is_err());
        assert!(prefix.topic(&empty, "Scope", "a.b").is_err());
    }

    #[test]
    fn test_scope_name() {
        assert_eq!(scope_name("orders"), "Orders");
        assert_eq!(scope_name("Orders"), "Orders");
        assert_eq!(scope_name("élan"), "Élan");
        assert_eq!(scope_name(""), "");
    }

    #[test]
    fn test_header_pairs() {
        let prefix = TopicPrefix::parse("{a}.{b}").unwrap();
        assert_eq!(
            prefix.header_pairs(&["1", "2"]),
            vec![
                ("_topic_a".to_string(), "1".to_string()),
                ("_topic_b".to_string(), "2".to_string())
            ]
        );
    }

    proptest! {
        #[test]
        fn prop_topic_is_deterministic(
            region in "[a-z0-9-]{1,12}",
            scope in "[a-zA-Z]{1,10}",
            op in "[a-zA-Z]{1,10}",
        ) {
            let prefix = TopicPrefix::parse("region.{region}").unwrap();
            let published = prefix.topic(&[region.as_str()], &scope, &op).unwrap();
            let subscribed = TopicPrefix::parse("region.{region}")
                .unwrap()
                .topic(&[region.clone()], &scope, &op)
                .unwrap();
            prop_assert_eq!(&published, &subscribed);
            prop_assert_eq!(published, format!("region.{}.{}.{}", region, scope_name(&scope), op));
        }

        #[test]
        fn prop_delimiter_in_value_is_rejected(left in "[a-z]{0,5}", right in "[a-z]{0,5}") {
            let prefix = TopicPrefix::parse("{v}").unwrap();
            let value = format!("{left}.{right}");
            let rejected = matches!(
                prefix.render(&[value]),
                Err(ScopeError::DelimiterInValue { .. })
            );
            prop_assert!(rejected);
        }
    }
}
