// src/lib.rs
//! Count coded records (diagnosis codes and the like) against named
//! categories, one chunk at a time.
//!
//! A [`Counter`] is configured once with category definitions, either as
//! exact code sets or as code prefixes. Each call to [`Counter::update`]
//! folds one [`Chunk`] of `(subject, code[, date])` records into a running
//! [`Table`] holding, per subject and category, the number of matching
//! records and optionally the first and last date a match was seen.
//!
//! ```rust
//! use code_tally::{Chunk, Counter, CounterConfig};
//!
//! let config = CounterConfig::new()
//!     .with_full("group1", ["12345", "54321"])
//!     .with_initial("group2", ["44", "323"]);
//! let mut counter: Counter<u32> = Counter::new(config)?;
//!
//! counter.update(&Chunk::from_pairs([(1, "12345"), (2, "441")]), None)?;
//! counter.update(&Chunk::from_pairs([(1, "54321")]), None)?;
//!
//! assert_eq!(counter.table().count(&1, "group1"), Some(2.0));
//! assert_eq!(counter.table().count(&2, "group2"), Some(1.0));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod chunk;
pub mod config;
pub mod counter;
pub mod matcher;
pub mod shared;
pub mod table;

#[cfg(feature = "tokio")]
pub mod feed;

pub use chunk::{Chunk, ChunkColumn, ChunkError};
pub use config::{ConfigError, CounterConfig, DateTracking};
pub use counter::{Counter, CounterError};
pub use matcher::{Category, Matcher, Rule};
pub use shared::SharedCounter;
pub use table::{Column, ColumnKind, Row, Table};

#[cfg(feature = "tokio")]
pub use feed::{spawn_consumer, ChunkSender, FeedError};

/// One observation: a subject, the code recorded for it and, optionally, the
/// date it was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record<S, D = NaiveDate>(S, String, Option<D>);

impl<S, D> Record<S, D> {
    pub fn new(subject: S, code: impl Into<String>, date: D) -> Self {
        Self(subject, code.into(), Some(date))
    }

    pub fn undated(subject: S, code: impl Into<String>) -> Self {
        Self(subject, code.into(), None)
    }

    pub fn subject(&self) -> &S {
        &self.0
    }

    pub fn code(&self) -> &str {
        &self.1
    }

    pub fn date(&self) -> Option<&D> {
        self.2.as_ref()
    }

    pub(crate) fn into_parts(self) -> (S, String, Option<D>) {
        (self.0, self.1, self.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::dated(
        r#"[7,"4019","2024-01-15"]"#,
        Record::new(7u32, "4019", NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
    )]
    #[case::undated(r#"[7,"4019",null]"#, Record::undated(7u32, "4019"))]
    fn deserialize(#[case] serialized: &str, #[case] expected: Record<u32>) {
        let actual: Record<u32> = serde_json::from_str(serialized).unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn accessors() {
        let record = Record::new("p1", "25000", 3i64);
        assert_eq!(record.subject(), &"p1");
        assert_eq!(record.code(), "25000");
        assert_eq!(record.date(), Some(&3));
    }
}
