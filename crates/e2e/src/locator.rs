//! Structural element queries
//!
//! Elements on the form page have no stable ids, so every lookup is expressed
//! as a structural predicate (tag, text, attribute substring, role) and
//! rendered to XPath at the driver boundary. A query evaluated under a
//! previously resolved element is rendered relative to it (`.//`).

use std::fmt;
use tracing::debug;

use crate::driver::Driver;
use crate::error::E2eResult;

/// A structural description of the element to find
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Element of `tag` whose text equals `text` exactly
    Text { tag: String, text: String },

    /// Any element whose `attribute` contains `needle`
    AttributeContains { attribute: String, needle: String },

    /// Element of `tag` carrying every listed attribute with the exact value
    Tag {
        tag: String,
        attributes: Vec<(String, String)>,
    },

    /// Element of `tag` with `role` whose descendants contain any of `labels`
    RoleWithLabel {
        tag: String,
        role: String,
        labels: Vec<String>,
    },
}

impl Query {
    pub fn text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Query::Text {
            tag: tag.into(),
            text: text.into(),
        }
    }

    pub fn attribute_contains(attribute: impl Into<String>, needle: impl Into<String>) -> Self {
        Query::AttributeContains {
            attribute: attribute.into(),
            needle: needle.into(),
        }
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Query::Tag {
            tag: tag.into(),
            attributes: Vec::new(),
        }
    }

    /// Add an exact attribute match to a `Tag` query; other queries are unchanged
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Query::Tag { attributes, .. } = &mut self {
            attributes.push((name.into(), value.into()));
        }
        self
    }

    pub fn role_with_label<S: AsRef<str>>(
        tag: impl Into<String>,
        role: impl Into<String>,
        labels: &[S],
    ) -> Self {
        Query::RoleWithLabel {
            tag: tag.into(),
            role: role.into(),
            labels: labels.iter().map(|l| l.as_ref().to_string()).collect(),
        }
    }

    /// Render as an XPath expression, relative when `scoped`
    pub fn xpath(&self, scoped: bool) -> String {
        let prefix = if scoped { ".//" } else { "//" };
        let body = match self {
            Query::Text { tag, text } => format!("{}[text() = {}]", tag, literal(text)),
            Query::AttributeContains { attribute, needle } => {
                format!("*[contains(@{}, {})]", attribute, literal(needle))
            }
            Query::Tag { tag, attributes } if attributes.is_empty() => tag.clone(),
            Query::Tag { tag, attributes } => {
                let preds: Vec<String> = attributes
                    .iter()
                    .map(|(name, value)| format!("@{}={}", name, literal(value)))
                    .collect();
                format!("{}[{}]", tag, preds.join(" and "))
            }
            Query::RoleWithLabel { tag, role, labels } => {
                let any: Vec<String> = labels
                    .iter()
                    .map(|l| format!("contains(text(), {})", literal(l)))
                    .collect();
                format!(
                    "{}[@role={} and .//*[{}]]",
                    tag,
                    literal(role),
                    any.join(" or ")
                )
            }
        };
        format!("{}{}", prefix, body)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.xpath(false))
    }
}

/// Quote a string as an XPath 1.0 literal.
///
/// XPath has no escape sequences, so a value holding both quote kinds is
/// spliced together with `concat()`.
fn literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{}'", value)
    } else if !value.contains('"') {
        format!("\"{}\"", value)
    } else {
        let parts: Vec<String> = value
            .split('\'')
            .map(|part| format!("'{}'", part))
            .collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Resolve the first element matching `query`, under `scope` when given.
///
/// Never waits: an element that is not rendered yet is `NotFound`.
pub async fn find<D: Driver>(
    driver: &D,
    scope: Option<&D::Element>,
    query: &Query,
) -> E2eResult<D::Element> {
    debug!("find {}{}", if scope.is_some() { "(scoped) " } else { "" }, query);
    driver.find(scope, query).await
}
