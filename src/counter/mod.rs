mod reduce;


use crate::{
    chunk::Chunk,
    config::{ConfigError, CounterConfig, DateTracking},
    matcher::Matcher,
    table::Table,
};
use chrono::NaiveDate;
use std::hash::Hash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Dates are tracked but no date field was given")]
    MissingDateField,

    #[error("Date field {0} was given but date tracking is off")]
    UnexpectedDateField(String),

    #[error("Date field {found} does not match the configured field {expected}")]
    DateFieldMismatch { expected: String, found: String },

    #[error("Chunk has no date column named {0}")]
    MissingDateColumn(String),

    #[error("Chunk must have exactly one code column besides the date column, found {found}")]
    CodeColumnCount { found: usize },
}

/// Counts matches between subject-associated codes and code categories,
/// one chunk at a time.
///
/// The counter owns a [`Table`] that only grows: every subject seen in any
/// chunk gets a row, and each row holds per-category match counts (and
/// first/last match dates when date tracking is configured). Chunks may
/// arrive in any order; counts add up and dates widen regardless.
///
/// The counter does no locking of its own. Share it through a
/// [`SharedCounter`](crate::SharedCounter) or feed it from a single consumer
/// when chunks come from several producers.
///
/// # Examples
///
/// ```rust
/// use code_tally::{Chunk, Counter, CounterConfig, Record};
/// use chrono::NaiveDate;
///
/// let config = CounterConfig::new()
///     .with_initial("hypertension", ["401"])
///     .track_dates("seen");
/// let mut counter: Counter<&str> = Counter::new(config)?;
///
/// let day = |d| NaiveDate::from_ymd_opt(2024, 5, d).unwrap();
/// let chunk = Chunk::from_records(
///     vec![
///         Record::new("p1", "4019", day(9)),
///         Record::new("p1", "4011", day(2)),
///         Record::new("p2", "25000", day(3)),
///     ],
///     "seen",
/// )?;
/// counter.update(&chunk, Some("seen"))?;
///
/// let table = counter.table();
/// assert_eq!(table.count(&"p1", "hypertension"), Some(2.0));
/// assert_eq!(table.first(&"p1", "hypertension"), Some(&day(2)));
/// assert_eq!(table.last(&"p1", "hypertension"), Some(&day(9)));
/// assert_eq!(table.count(&"p2", "hypertension"), Some(0.0));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Counter<S, D = NaiveDate> {
    config: CounterConfig,
    matcher: Matcher,
    table: Table<S, D>,
    updates: u64,
}

impl<S, D> Counter<S, D>
where
    S: Eq + Hash + Clone,
    D: Ord + Clone,
{
    pub fn new(config: CounterConfig) -> Result<Self, CounterError> {
        config.validate()?;

        let matcher = Matcher::from_config(&config);
        let table = Table::new(
            matcher.category_names(),
            config.date_tracking.is_enabled(),
        );
        tracing::debug!(
            categories = matcher.categories().len(),
            columns = table.columns().len(),
            date_field = config.date_tracking.date_field(),
            "counter created"
        );

        Ok(Self {
            config,
            matcher,
            table,
            updates: 0,
        })
    }

    /// Fold one chunk into the table.
    ///
    /// `date_field` must be `None` when dates are not tracked. When they are,
    /// it must name the chunk's date column and match the configured field if
    /// one is fixed. The chunk must then carry exactly one code column next to
    /// that date column. Any violation is reported before the table is touched.
    ///
    /// Codes matching no category are ignored. Repeated records each count.
    pub fn update(
        &mut self,
        chunk: &Chunk<S, D>,
        date_field: Option<&str>,
    ) -> Result<(), CounterError> {
        let (codes, dates) = self.resolve_columns(chunk, date_field)?;

        let rows_added = self.table.ensure_subjects(chunk.subjects());
        let partials = reduce::by_category(&self.matcher, chunk.subjects(), codes, dates);

        let mut matched_subjects = 0;
        for (category, partial) in partials.into_iter().enumerate() {
            tracing::trace!(
                category = self.table.categories()[category].as_str(),
                subjects = partial.len(),
                "merging category"
            );
            matched_subjects += partial.len();
            self.table.merge_category(category, partial);
        }
        self.updates += 1;

        tracing::debug!(
            update = self.updates,
            records = chunk.len(),
            rows_added,
            matched_subjects,
            rows = self.table.len(),
            "chunk applied"
        );
        Ok(())
    }

    /// Pick the code column and, when tracking, the date column out of
    /// `chunk`, checking them against the configuration.
    fn resolve_columns<'c>(
        &self,
        chunk: &'c Chunk<S, D>,
        date_field: Option<&str>,
    ) -> Result<(&'c [String], Option<&'c [Option<D>]>), CounterError> {
        let dates = match (&self.config.date_tracking, date_field) {
            (DateTracking::Off, None) => None,
            (DateTracking::Off, Some(found)) => {
                return Err(CounterError::UnexpectedDateField(found.to_string()));
            }
            (_, None) => return Err(CounterError::MissingDateField),
            (DateTracking::Field(expected), Some(found)) if expected != found => {
                return Err(CounterError::DateFieldMismatch {
                    expected: expected.clone(),
                    found: found.to_string(),
                });
            }
            (_, Some(field)) => {
                let dates = chunk
                    .date_columns()
                    .find(|(name, _)| *name == field)
                    .map(|(_, dates)| dates)
                    .ok_or_else(|| CounterError::MissingDateColumn(field.to_string()))?;

                let others = chunk.column_names().filter(|name| *name != field).count();
                if others != 1 {
                    return Err(CounterError::CodeColumnCount { found: others });
                }
                Some(dates)
            }
        };

        let mut code_columns = chunk.code_columns();
        match (code_columns.next(), code_columns.next()) {
            (Some((_, codes)), None) => Ok((codes, dates)),
            (None, _) => Err(CounterError::CodeColumnCount { found: 0 }),
            (Some(_), Some(_)) => Err(CounterError::CodeColumnCount {
                found: chunk.code_columns().count(),
            }),
        }
    }

    pub fn table(&self) -> &Table<S, D> {
        &self.table
    }

    pub fn into_table(self) -> Table<S, D> {
        self.table
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Whether at least one chunk has been applied.
    pub fn is_accumulating(&self) -> bool {
        self.updates > 0
    }
}
