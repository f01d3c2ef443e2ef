//! Criteria evaluation and path manipulation for in-memory documents.
//!
//! Criteria are equality documents. Keys may be dotted paths into embedded documents
//! and arrays (`address.zip`, `tags.0`). A key naming an array also matches when one
//! of its elements equals the expected value.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use docmapper_core::error::{DocumentStoreError, DocumentStoreResult};

/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64. Values without a natural ordering (binary,
/// regular expressions, ...) only compare for equality.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value (all integers and floats normalized to f64)
    Number(f64),
    /// DateTime value
    DateTime(DateTime),
    /// String value
    String(&'a str),
    /// ObjectId value
    ObjectId(ObjectId),
    /// Array of comparable values
    Array(Vec<Comparable<'a>>),
    /// Map/Object of comparable values
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Any other value, compared by equality only
    Raw(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            other => Comparable::Raw(other),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Raw(a), Comparable::Raw(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Null, _) => Some(Ordering::Less),
            (_, Comparable::Null) => Some(Ordering::Greater),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Follows a dotted path through embedded documents and array indexes.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Writes `value` at a dotted path, creating missing intermediate documents.
pub(crate) fn assign(target: &mut Bson, path: &str, value: Bson) -> DocumentStoreResult<()> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };

    match target {
        Bson::Document(document) => match rest {
            None => {
                document.insert(head, value);
                Ok(())
            }
            Some(rest) => {
                if !document.contains_key(head) {
                    document.insert(head, Document::new());
                }

                let child = document
                    .get_mut(head)
                    .ok_or_else(|| DocumentStoreError::InvalidDocument(format!("cannot set {path}")))?;

                assign(child, rest, value)
            }
        },
        Bson::Array(items) => {
            let item = head
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get_mut(index))
                .ok_or_else(|| DocumentStoreError::InvalidDocument(format!("no array element {head}")))?;

            match rest {
                None => {
                    *item = value;
                    Ok(())
                }
                Some(rest) => assign(item, rest, value),
            }
        }
        _ => Err(DocumentStoreError::InvalidDocument(format!(
            "cannot set {path}: {head} is not traversable"
        ))),
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Whether the document satisfies every key of `criteria`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`] for operator keys (`$...`), which
    /// the in-memory store does not evaluate.
    pub fn matches(&self, criteria: &Document) -> DocumentStoreResult<bool> {
        for (path, expected) in criteria {
            if path.starts_with('$') {
                return Err(DocumentStoreError::InvalidDocument(format!("unsupported query operator {path}")));
            }

            if !self.matches_field(path, expected) {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn matches_field(&self, path: &str, expected: &Bson) -> bool {
        let expected = Comparable::from(expected);

        match lookup(self.document, path) {
            Some(actual) => match Comparable::from(actual) {
                Comparable::Array(items) if !matches!(expected, Comparable::Array(_)) => items
                    .iter()
                    .any(|item| item == &expected),
                actual => actual == expected,
            },
            None => expected == Comparable::Null,
        }
    }

    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Document>,
        criteria: &Document,
    ) -> DocumentStoreResult<Vec<Document>> {
        let mut matched = Vec::new();

        for document in documents {
            if DocumentEvaluator::new(document).matches(criteria)? {
                matched.push(document.clone());
            }
        }

        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn sample() -> Document {
        doc! {
            "name": "Ada",
            "age": 36,
            "address": { "city": "London", "zip": "N1" },
            "tags": ["math", "engines"],
        }
    }

    #[test]
    fn equality_matches_across_numeric_widths() {
        let document = sample();

        assert!(DocumentEvaluator::new(&document).matches(&doc! { "age": 36i64 }).unwrap());
        assert!(!DocumentEvaluator::new(&document).matches(&doc! { "age": 37 }).unwrap());
    }

    #[test]
    fn dotted_paths_and_array_membership() {
        let document = sample();
        let evaluator = DocumentEvaluator::new(&document);

        assert!(evaluator.matches(&doc! { "address.city": "London" }).unwrap());
        assert!(evaluator.matches(&doc! { "tags": "engines" }).unwrap());
        assert!(evaluator.matches(&doc! { "tags.0": "math" }).unwrap());
        assert!(evaluator.matches(&doc! { "missing": null }).unwrap());
        assert!(!evaluator.matches(&doc! { "tags": "poetry" }).unwrap());
    }

    #[test]
    fn operators_are_rejected() {
        let document = sample();

        let err = DocumentEvaluator::new(&document)
            .matches(&doc! { "$or": [] })
            .unwrap_err();

        assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));
    }

    #[test]
    fn assign_creates_intermediate_documents() {
        let mut target = Bson::Document(sample());

        assign(&mut target, "address.zip", Bson::from("N7")).unwrap();
        assign(&mut target, "phone.home", Bson::from("555")).unwrap();
        assign(&mut target, "tags.1", Bson::from("looms")).unwrap();

        let document = target.as_document().unwrap();
        assert_eq!(lookup(document, "address.zip"), Some(&Bson::from("N7")));
        assert_eq!(lookup(document, "address.city"), Some(&Bson::from("London")));
        assert_eq!(lookup(document, "phone.home"), Some(&Bson::from("555")));
        assert_eq!(lookup(document, "tags.1"), Some(&Bson::from("looms")));
    }

    #[test]
    fn assign_through_a_scalar_fails() {
        let mut target = Bson::Document(sample());

        assert!(assign(&mut target, "name.first", Bson::from("A")).is_err());
    }
}
