//! Filter expressions understood by the search index.
//!
//! Rendered in the hosted index's filter syntax (keywords are upper-case,
//! `AND` binds tighter than `OR`, values with spaces or parentheses are
//! double quoted):
//!
//! ```text
//! expr   := and ("OR" and)*
//! and    := unary ("AND" unary)*
//! unary  := "NOT" unary | "(" expr ")" | term
//! term   := attribute ":" value
//! ```
//!
//! Examples: `objectID:b1 OR objectID:b2`, `members:u1 AND NOT ownerId:u1`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Term { attribute: String, value: String },
    Not(Box<Filter>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

/// Something a filter can be evaluated against.
pub trait FilterTarget {
    /// All values of `attribute`; a term matches when any of them is equal.
    fn attribute_values(&self, attribute: &str) -> Vec<&str>;
}

impl Filter {
    pub fn term(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Term {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn negate(self) -> Self {
        Filter::Not(Box::new(self))
    }

    /// `objectID:<a> OR objectID:<b> ...`, or `None` for an empty id list.
    ///
    /// An empty filter would match the whole index, so callers must skip the
    /// query instead of sending it.
    pub fn any_object_id<I, S>(ids: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut terms: Vec<Filter> = ids
            .into_iter()
            .map(|id| Filter::term("objectID", id))
            .collect();
        match terms.len() {
            0 => None,
            1 => terms.pop(),
            _ => Some(Filter::Or(terms)),
        }
    }

    /// Boards where `user_id` is a member but not the owner.
    pub fn shared_with(user_id: &str) -> Self {
        Filter::And(vec![
            Filter::term("members", user_id),
            Filter::term("ownerId", user_id).negate(),
        ])
    }

    pub fn matches<T: FilterTarget + ?Sized>(&self, target: &T) -> bool {
        match self {
            Filter::Term { attribute, value } => target
                .attribute_values(attribute)
                .iter()
                .any(|v| v == value),
            Filter::Not(inner) => !inner.matches(target),
            Filter::And(items) => items.iter().all(|f| f.matches(target)),
            Filter::Or(items) => items.iter().any(|f| f.matches(target)),
        }
    }
}

fn needs_quotes(value: &str) -> bool {
    value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '"' | '\\'))
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Term { attribute, value } => {
                if needs_quotes(value) {
                    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                    write!(f, "{}:\"{}\"", attribute, escaped)
                } else {
                    write!(f, "{}:{}", attribute, value)
                }
            }
            Filter::Not(inner) => match inner.as_ref() {
                Filter::And(_) | Filter::Or(_) => write!(f, "NOT ({})", inner),
                _ => write!(f, "NOT {}", inner),
            },
            Filter::And(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " AND ")?;
                    }
                    match item {
                        Filter::Or(_) => write!(f, "({})", item)?,
                        _ => write!(f, "{}", item)?,
                    }
                }
                Ok(())
            }
            Filter::Or(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " OR ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}
