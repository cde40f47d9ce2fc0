use crate::Record;
use chrono::NaiveDate;
use thiserror::Error;

/// Name of the code column created by [`Chunk::from_pairs`] and
/// [`Chunk::from_records`].
pub const CODE_COLUMN: &str = "code";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Column {column} has {found} values but the chunk has {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Column {0} is defined more than once")]
    DuplicateColumn(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChunkColumn<D> {
    Codes(Vec<String>),
    /// A `None` date still counts as a match but never becomes a first or
    /// last date.
    Dates(Vec<Option<D>>),
}

impl<D> ChunkColumn<D> {
    pub fn len(&self) -> usize {
        match self {
            ChunkColumn::Codes(values) => values.len(),
            ChunkColumn::Dates(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One batch of records, stored column-wise: a subject index and named
/// columns of equal length.
///
/// Subjects may repeat within a chunk; each row is a separate occurrence.
///
/// # Examples
///
/// ```rust
/// use code_tally::Chunk;
/// use chrono::NaiveDate;
///
/// let day = |d| NaiveDate::from_ymd_opt(2024, 3, d);
/// let chunk: Chunk<u32> = Chunk::new(vec![1, 1, 2])
///     .with_codes("dx", ["4019", "25000", "4019"])?
///     .with_dates("seen", [day(1), day(4), None])?;
///
/// assert_eq!(chunk.len(), 3);
/// assert_eq!(chunk.code_columns().count(), 1);
/// # Ok::<(), code_tally::ChunkError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk<S, D = NaiveDate> {
    index: Vec<S>,
    columns: Vec<(String, ChunkColumn<D>)>,
}

impl<S, D> Chunk<S, D> {
    /// An empty-columned chunk over `index`; add columns with
    /// [`with_codes`](Self::with_codes) and [`with_dates`](Self::with_dates).
    pub fn new(index: Vec<S>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// A chunk of subject → code pairs with a single code column and no dates.
    pub fn from_pairs<I, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, C)>,
        C: Into<String>,
    {
        let (index, codes): (Vec<S>, Vec<String>) = pairs
            .into_iter()
            .map(|(subject, code)| (subject, code.into()))
            .unzip();

        Self {
            index,
            columns: vec![(CODE_COLUMN.to_string(), ChunkColumn::Codes(codes))],
        }
    }

    /// A chunk with a [`CODE_COLUMN`] and a date column named `date_field`.
    ///
    /// The date column is always present; undated records leave `None` in it.
    pub fn from_records<I>(records: I, date_field: impl Into<String>) -> Result<Self, ChunkError>
    where
        I: IntoIterator<Item = Record<S, D>>,
    {
        let records = records.into_iter();
        let (lower, _) = records.size_hint();
        let mut index = Vec::with_capacity(lower);
        let mut codes = Vec::with_capacity(lower);
        let mut dates = Vec::with_capacity(lower);

        for record in records {
            let (subject, code, date) = record.into_parts();
            index.push(subject);
            codes.push(code);
            dates.push(date);
        }

        Self::new(index)
            .with_column(CODE_COLUMN.to_string(), ChunkColumn::Codes(codes))?
            .with_column(date_field.into(), ChunkColumn::Dates(dates))
    }

    pub fn with_codes<I, C>(self, name: impl Into<String>, codes: I) -> Result<Self, ChunkError>
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let codes = codes.into_iter().map(Into::into).collect();
        self.with_column(name.into(), ChunkColumn::Codes(codes))
    }

    pub fn with_dates<I>(self, name: impl Into<String>, dates: I) -> Result<Self, ChunkError>
    where
        I: IntoIterator<Item = Option<D>>,
    {
        self.with_column(name.into(), ChunkColumn::Dates(dates.into_iter().collect()))
    }

    fn with_column(mut self, name: String, column: ChunkColumn<D>) -> Result<Self, ChunkError> {
        if self.columns.iter().any(|(existing, _)| *existing == name) {
            return Err(ChunkError::DuplicateColumn(name));
        }
        if column.len() != self.index.len() {
            return Err(ChunkError::LengthMismatch {
                column: name,
                expected: self.index.len(),
                found: column.len(),
            });
        }
        self.columns.push((name, column));
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn subjects(&self) -> &[S] {
        &self.index
    }

    pub fn column(&self, name: &str) -> Option<&ChunkColumn<D>> {
        self.columns
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, column)| column)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn code_columns(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.columns.iter().filter_map(|(name, column)| match column {
            ChunkColumn::Codes(codes) => Some((name.as_str(), codes.as_slice())),
            ChunkColumn::Dates(_) => None,
        })
    }

    pub fn date_columns(&self) -> impl Iterator<Item = (&str, &[Option<D>])> {
        self.columns.iter().filter_map(|(name, column)| match column {
            ChunkColumn::Dates(dates) => Some((name.as_str(), dates.as_slice())),
            ChunkColumn::Codes(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn from_pairs_keeps_repeated_subjects() {
        let chunk: Chunk<u32> = Chunk::from_pairs([(6, "441"), (6, "54321"), (2, "440")]);

        assert_eq!(chunk.len(), 3);
        assert_eq!(chunk.subjects(), &[6, 6, 2]);
        assert_eq!(
            chunk.column(CODE_COLUMN),
            Some(&ChunkColumn::Codes(vec![
                "441".to_string(),
                "54321".to_string(),
                "440".to_string()
            ]))
        );
        assert_eq!(chunk.date_columns().count(), 0);
    }

    #[test]
    fn from_records_splits_columns() {
        let records = vec![
            Record::new("a", "4019", day(2)),
            Record::undated("b", "25000"),
        ];

        let chunk = Chunk::from_records(records, "seen").unwrap();

        let names: Vec<_> = chunk.column_names().collect();
        assert_eq!(names, vec![CODE_COLUMN, "seen"]);
        assert_eq!(
            chunk.column("seen"),
            Some(&ChunkColumn::Dates(vec![Some(day(2)), None]))
        );
    }

    #[test]
    fn from_records_keeps_date_column_when_all_undated() {
        let chunk: Chunk<&str> =
            Chunk::from_records(vec![Record::undated("a", "4019")], "seen").unwrap();

        assert_eq!(
            chunk.column("seen"),
            Some(&ChunkColumn::Dates(vec![None]))
        );
    }

    #[test]
    fn from_records_rejects_date_field_named_code() {
        let result = Chunk::from_records(vec![Record::new(1, "1", day(1))], CODE_COLUMN);
        assert_eq!(
            result.unwrap_err(),
            ChunkError::DuplicateColumn(CODE_COLUMN.to_string())
        );
    }

    #[test]
    fn length_mismatch_rejected() {
        let result = Chunk::<u32>::new(vec![1, 2]).with_codes("dx", ["1"]);
        assert_eq!(
            result.unwrap_err(),
            ChunkError::LengthMismatch {
                column: "dx".to_string(),
                expected: 2,
                found: 1,
            }
        );
    }

    #[test]
    fn duplicate_column_rejected() {
        let result = Chunk::<u32>::new(vec![1])
            .with_codes("dx", ["1"])
            .and_then(|c| c.with_dates("dx", [Some(day(1))]));
        assert_eq!(
            result.unwrap_err(),
            ChunkError::DuplicateColumn("dx".to_string())
        );
    }

    #[test]
    fn empty_chunk() {
        let chunk: Chunk<u32> = Chunk::from_pairs(Vec::<(u32, String)>::new());
        assert!(chunk.is_empty());
        assert_eq!(chunk.code_columns().count(), 1);
    }
}
