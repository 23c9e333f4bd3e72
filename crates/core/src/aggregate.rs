//! Combining independent failures into one reportable error.

use std::fmt;

use miette::Diagnostic;

use crate::error::HostError;

/// Several failures reported together.
///
/// Built by [`combine`] or from a single error, so it is never empty and
/// never holds another aggregate: nested aggregates are flattened into their
/// leaves.
#[derive(Debug, Diagnostic)]
#[diagnostic(code(hookhost::aggregate))]
pub struct AggregateError {
    #[related]
    errors: Vec<HostError>,
}

/// Combines zero or more errors into one.
///
/// Returns `None` when there is nothing to report. Inputs that are themselves
/// aggregates contribute their leaves in order.
///
/// ```
/// use hookhost_core::{combine, HostError};
///
/// assert!(combine(Vec::<HostError>::new()).is_none());
///
/// let err = combine(vec![HostError::PluginNotFound("a".into())]).unwrap();
/// assert_eq!(err.to_string(), "(1 errors): [plugin 'a' not found]");
/// ```
pub fn combine<I>(errors: I) -> Option<AggregateError>
where
    I: IntoIterator<Item = HostError>,
{
    let mut leaves = Vec::new();
    for error in errors {
        match error {
            HostError::Aggregate(inner) => leaves.extend(inner.errors),
            other => leaves.push(other),
        }
    }

    if leaves.is_empty() {
        None
    } else {
        Some(AggregateError { errors: leaves })
    }
}

impl AggregateError {
    /// Returns the leaf errors in the order they were collected.
    pub fn errors(&self) -> &[HostError] {
        &self.errors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HostError> {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<HostError> {
        self.errors
    }
}

/// Renders `(N errors): [a, b, ...]`.
pub(crate) fn format_aggregate<I, S>(count: usize, messages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = messages
        .into_iter()
        .map(|m| m.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("({} errors): [{}]", count, joined)
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = format_aggregate(
            self.errors.len(),
            self.errors.iter().map(|e| e.to_string()),
        );
        f.write_str(&rendered)
    }
}

impl std::error::Error for AggregateError {}

impl From<HostError> for AggregateError {
    /// Wraps a single error, or unwraps it if it already is an aggregate.
    fn from(error: HostError) -> Self {
        match error {
            HostError::Aggregate(inner) => inner,
            other => AggregateError {
                errors: vec![other],
            },
        }
    }
}

impl<'a> IntoIterator for &'a AggregateError {
    type Item = &'a HostError;
    type IntoIter = std::slice::Iter<'a, HostError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl IntoIterator for AggregateError {
    type Item = HostError;
    type IntoIter = std::vec::IntoIter<HostError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}
