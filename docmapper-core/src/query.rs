//! Options for multi-document lookups.
//!
//! Criteria are plain BSON documents (`{field: value}`, dotted paths allowed). The
//! options here shape the result set:
//!
//! ```ignore
//! use docmapper::query::{FindOptions, SortDirection};
//!
//! let options = FindOptions::builder()
//!     .sort("createdDate", SortDirection::Desc)
//!     .skip(20)
//!     .limit(10)
//!     .build();
//! ```

use serde::{Deserialize, Serialize};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    #[default]
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// Sort specification for query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    /// The field name to sort by. Dotted paths address embedded fields.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Sort, skip and limit applied to a `find`.
///
/// Without a sort, documents come back in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindOptions {
    /// Sort specification for results.
    pub sort: Option<Sort>,
    /// Number of documents to skip.
    pub skip: Option<usize>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
}

impl FindOptions {
    /// Options that return every match in insertion order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new options builder for fluent construction.
    pub fn builder() -> FindOptionsBuilder {
        FindOptionsBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FindOptionsBuilder {
    options: FindOptions,
}

impl FindOptionsBuilder {
    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.options.limit = Some(limit);
        self
    }

    /// Sets the number of documents to skip.
    pub fn skip(mut self, skip: usize) -> Self {
        self.options.skip = Some(skip);
        self
    }

    /// Sets the sort specification for the results.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.options.sort = Some(Sort { field: field.into(), direction });
        self
    }

    pub fn build(self) -> FindOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_deserialize_from_config() {
        let options: FindOptions = serde_json::from_str(
            r#"{"sort": {"field": "zip", "direction": "desc"}, "skip": null, "limit": 5}"#,
        )
        .unwrap();

        assert_eq!(
            options,
            FindOptions::builder()
                .sort("zip", SortDirection::Desc)
                .limit(5)
                .build(),
        );
    }
}
