use chrono::NaiveDate;
use serde::{ser::SerializeMap, ser::SerializeSeq, Serialize, Serializer};
use std::{collections::HashMap, fmt, hash::Hash};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Count,
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    category: String,
    kind: ColumnKind,
}

impl Column {
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    /// `<category> [N]`, `<category> [first]` or `<category> [last]`.
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.kind {
            ColumnKind::Count => "N",
            ColumnKind::First => "first",
            ColumnKind::Last => "last",
        };
        write!(f, "{} [{}]", self.category, suffix)
    }
}

/// One chunk's contribution for a single subject and category.
#[derive(Debug, Clone, PartialEq)]
pub struct Partial<D> {
    pub count: f64,
    pub first: Option<D>,
    pub last: Option<D>,
}

impl<D> Default for Partial<D> {
    fn default() -> Self {
        Self {
            count: 0.0,
            first: None,
            last: None,
        }
    }
}

impl<D: Ord + Clone> Partial<D> {
    /// Record one matching occurrence.
    pub fn observe(&mut self, date: Option<&D>) {
        self.count += 1.0;
        if let Some(date) = date {
            self.first = earliest(self.first.take(), Some(date.clone()));
            self.last = latest(self.last.take(), Some(date.clone()));
        }
    }
}

fn earliest<D: Ord>(a: Option<D>, b: Option<D>) -> Option<D> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn latest<D: Ord>(a: Option<D>, b: Option<D>) -> Option<D> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// Per-subject, per-category match counts and, optionally, first and last
/// match dates.
///
/// Rows are only ever added, in the order their subjects were first seen;
/// new subjects within one chunk are not sorted. Columns are fixed at
/// construction: categories are sorted by name and each contributes a count
/// column followed, when dates are tracked, by a first and a last column.
///
/// Counts are `f64` so that the table can be handed to numeric code as is.
#[derive(Debug, Clone)]
pub struct Table<S, D = NaiveDate> {
    index: HashMap<S, usize>,
    subjects: Vec<S>,
    categories: Vec<String>,
    columns: Vec<Column>,
    track_dates: bool,
    counts: Vec<Vec<f64>>,
    first: Vec<Vec<Option<D>>>,
    last: Vec<Vec<Option<D>>>,
}

impl<S, D> Table<S, D>
where
    S: Eq + Hash + Clone,
    D: Ord + Clone,
{
    pub fn new<I, C>(categories: I, track_dates: bool) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let mut categories: Vec<String> = categories.into_iter().map(Into::into).collect();
        categories.sort_unstable();
        categories.dedup();

        let kinds: &[ColumnKind] = if track_dates {
            &[ColumnKind::Count, ColumnKind::First, ColumnKind::Last]
        } else {
            &[ColumnKind::Count]
        };
        let columns = categories
            .iter()
            .flat_map(|category| {
                kinds.iter().map(move |&kind| Column {
                    category: category.clone(),
                    kind,
                })
            })
            .collect();

        let date_vecs = if track_dates { categories.len() } else { 0 };

        Self {
            index: HashMap::new(),
            subjects: Vec::new(),
            columns,
            track_dates,
            counts: vec![Vec::new(); categories.len()],
            first: vec![Vec::new(); date_vecs],
            last: vec![Vec::new(); date_vecs],
            categories,
        }
    }

    /// Add a zeroed row for every subject not yet present. Returns the number
    /// of rows added.
    pub fn ensure_subjects<'a, I>(&mut self, subjects: I) -> usize
    where
        I: IntoIterator<Item = &'a S>,
        S: 'a,
    {
        let before = self.subjects.len();
        for subject in subjects {
            self.row_index_or_insert(subject);
        }
        self.subjects.len() - before
    }

    fn row_index_or_insert(&mut self, subject: &S) -> usize {
        if let Some(&row) = self.index.get(subject) {
            return row;
        }

        let row = self.subjects.len();
        self.index.insert(subject.clone(), row);
        self.subjects.push(subject.clone());
        for counts in &mut self.counts {
            counts.push(0.0);
        }
        for dates in self.first.iter_mut().chain(self.last.iter_mut()) {
            dates.push(None);
        }
        row
    }

    /// Fold per-subject partials for one category into the table.
    ///
    /// Counts are added. First dates take the minimum and last dates the
    /// maximum, with absent values never winning a comparison. Subjects not
    /// yet present get a row first. Dates are ignored when the table does
    /// not track them.
    ///
    /// # Panics
    ///
    /// If `category` is not a valid category index.
    pub fn merge_category<'a, I>(&mut self, category: usize, partials: I)
    where
        I: IntoIterator<Item = (&'a S, Partial<D>)>,
        S: 'a,
    {
        for (subject, partial) in partials {
            let row = self.row_index_or_insert(subject);
            self.counts[category][row] += partial.count;

            if self.track_dates {
                let first = &mut self.first[category][row];
                *first = earliest(first.take(), partial.first);
                let last = &mut self.last[category][row];
                *last = latest(last.take(), partial.last);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn tracks_dates(&self) -> bool {
        self.track_dates
    }

    /// Subjects in the order they were first seen.
    pub fn subjects(&self) -> &[S] {
        &self.subjects
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn category_position(&self, category: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(category))
            .ok()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn contains(&self, subject: &S) -> bool {
        self.index.contains_key(subject)
    }

    /// `None` when either the subject or the category is unknown.
    pub fn count(&self, subject: &S, category: &str) -> Option<f64> {
        self.row(subject)?.count(category)
    }

    pub fn first(&self, subject: &S, category: &str) -> Option<&D> {
        self.row(subject)?.first(category)
    }

    pub fn last(&self, subject: &S, category: &str) -> Option<&D> {
        self.row(subject)?.last(category)
    }

    pub fn row(&self, subject: &S) -> Option<Row<'_, S, D>> {
        let row = *self.index.get(subject)?;
        Some(Row { table: self, row })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_, S, D>> {
        (0..self.subjects.len()).map(move |row| Row { table: self, row })
    }
}

impl<S, D> PartialEq for Table<S, D>
where
    S: PartialEq,
    D: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.subjects == other.subjects
            && self.columns == other.columns
            && self.counts == other.counts
            && self.first == other.first
            && self.last == other.last
    }
}

/// A borrowed view of one subject's row.
#[derive(Debug)]
pub struct Row<'a, S, D> {
    table: &'a Table<S, D>,
    row: usize,
}

impl<S, D> Clone for Row<'_, S, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, D> Copy for Row<'_, S, D> {}

impl<'a, S, D> Row<'a, S, D>
where
    S: Eq + Hash + Clone,
    D: Ord + Clone,
{
    pub fn subject(&self) -> &'a S {
        &self.table.subjects[self.row]
    }

    pub fn count(&self, category: &str) -> Option<f64> {
        let c = self.table.category_position(category)?;
        Some(self.table.counts[c][self.row])
    }

    pub fn first(&self, category: &str) -> Option<&'a D> {
        let c = self.table.category_position(category)?;
        self.table.first.get(c)?[self.row].as_ref()
    }

    pub fn last(&self, category: &str) -> Option<&'a D> {
        let c = self.table.category_position(category)?;
        self.table.last.get(c)?[self.row].as_ref()
    }

    /// Counts in column order.
    pub fn counts(&self) -> impl Iterator<Item = f64> + 'a {
        let (table, row) = (self.table, self.row);
        table.counts.iter().map(move |counts| counts[row])
    }
}

/// Serialized as a map of `subject` plus one entry per column, keyed by
/// column name.
impl<S, D> Serialize for Row<'_, S, D>
where
    S: Serialize,
    D: Serialize,
{
    fn serialize<Z: Serializer>(&self, serializer: Z) -> Result<Z::Ok, Z::Error> {
        let table = self.table;
        let mut map = serializer.serialize_map(Some(table.columns.len() + 1))?;
        map.serialize_entry("subject", &table.subjects[self.row])?;
        for (c, category) in table.categories.iter().enumerate() {
            map.serialize_entry(&format!("{category} [N]"), &table.counts[c][self.row])?;
            if table.track_dates {
                map.serialize_entry(&format!("{category} [first]"), &table.first[c][self.row])?;
                map.serialize_entry(&format!("{category} [last]"), &table.last[c][self.row])?;
            }
        }
        map.end()
    }
}

/// Serialized as a sequence of rows in first-seen order.
impl<S, D> Serialize for Table<S, D>
where
    S: Serialize,
    D: Serialize,
{
    fn serialize<Z: Serializer>(&self, serializer: Z) -> Result<Z::Ok, Z::Error> {
        let mut seq = serializer.serialize_seq(Some(self.subjects.len()))?;
        for row in 0..self.subjects.len() {
            seq.serialize_element(&Row { table: self, row })?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn partial(count: f64, first: Option<i32>, last: Option<i32>) -> Partial<i32> {
        Partial { count, first, last }
    }

    #[rstest]
    #[case::counts_only(false, vec!["a [N]", "b [N]"])]
    #[case::with_dates(true, vec![
        "a [N]", "a [first]", "a [last]",
        "b [N]", "b [first]", "b [last]",
    ])]
    fn column_layout_is_sorted(#[case] track_dates: bool, #[case] expected: Vec<&str>) {
        let table: Table<u32, i32> = Table::new(["b", "a", "b"], track_dates);
        assert_eq!(table.column_names(), expected);
        assert!(table.is_empty());
    }

    #[test]
    fn ensure_subjects_is_idempotent() {
        let mut table: Table<u32, i32> = Table::new(["a"], false);

        assert_eq!(table.ensure_subjects(&[1, 2, 2]), 2);
        table.merge_category(0, [(&1, partial(3.0, None, None))]);
        assert_eq!(table.ensure_subjects(&[2, 1, 3]), 1);

        assert_eq!(table.subjects(), &[1, 2, 3]);
        assert_eq!(table.count(&1, "a"), Some(3.0));
        assert_eq!(table.count(&3, "a"), Some(0.0));
    }

    #[test]
    fn new_rows_have_absent_dates() {
        let mut table: Table<u32, i32> = Table::new(["a"], true);
        table.ensure_subjects(&[9]);

        assert_eq!(table.count(&9, "a"), Some(0.0));
        assert_eq!(table.first(&9, "a"), None);
        assert_eq!(table.last(&9, "a"), None);
    }

    #[test]
    fn merge_adds_counts_and_widens_dates() {
        let mut table: Table<u32, i32> = Table::new(["a"], true);
        table.merge_category(0, [(&1, partial(2.0, Some(5), Some(8)))]);
        table.merge_category(0, [(&1, partial(1.0, Some(3), Some(6)))]);
        table.merge_category(0, [(&1, partial(1.0, Some(7), Some(11)))]);

        assert_eq!(table.count(&1, "a"), Some(4.0));
        assert_eq!(table.first(&1, "a"), Some(&3));
        assert_eq!(table.last(&1, "a"), Some(&11));
    }

    #[test]
    fn undated_partial_leaves_dates_alone() {
        let mut table: Table<u32, i32> = Table::new(["a"], true);
        table.merge_category(0, [(&1, partial(1.0, Some(4), Some(4)))]);
        table.merge_category(0, [(&1, partial(2.0, None, None))]);

        assert_eq!(table.count(&1, "a"), Some(3.0));
        assert_eq!(table.first(&1, "a"), Some(&4));
        assert_eq!(table.last(&1, "a"), Some(&4));
    }

    #[test]
    fn dates_ignored_without_tracking() {
        let mut table: Table<u32, i32> = Table::new(["a"], false);
        table.merge_category(0, [(&1, partial(1.0, Some(4), Some(4)))]);

        assert_eq!(table.count(&1, "a"), Some(1.0));
        assert_eq!(table.first(&1, "a"), None);
    }

    #[test]
    fn partial_observe_tracks_bounds() {
        let mut p = Partial::default();
        p.observe(Some(&5));
        p.observe(None);
        p.observe(Some(&2));
        p.observe(Some(&9));

        assert_eq!(p, partial(4.0, Some(2), Some(9)));
    }

    #[test]
    fn unknown_lookups_are_none() {
        let mut table: Table<u32, i32> = Table::new(["a"], false);
        table.ensure_subjects(&[1]);

        assert_eq!(table.count(&2, "a"), None);
        assert_eq!(table.count(&1, "b"), None);
        assert!(table.contains(&1));
        assert!(!table.contains(&2));
    }

    #[test]
    fn rows_iterate_in_first_seen_order() {
        let mut table: Table<&str, i32> = Table::new(["a", "b"], false);
        table.ensure_subjects(&["x", "y"]);
        table.merge_category(1, [(&"y", partial(2.0, None, None))]);

        let rows: Vec<_> = table
            .rows()
            .map(|row| (*row.subject(), row.counts().collect::<Vec<_>>()))
            .collect();
        assert_eq!(rows, vec![("x", vec![0.0, 0.0]), ("y", vec![0.0, 2.0])]);

        table.ensure_subjects(&["z", "w", "x"]);
        assert_eq!(table.subjects(), &["x", "y", "z", "w"]);
    }

    #[test]
    fn serializes_rows_by_column_name() {
        let mut table: Table<u32, NaiveDate> = Table::new(["dm"], true);
        let day = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        table.merge_category(
            0,
            [(
                &4,
                Partial {
                    count: 1.0,
                    first: Some(day),
                    last: Some(day),
                },
            )],
        );

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "subject": 4,
                "dm [N]": 1.0,
                "dm [first]": "2024-02-01",
                "dm [last]": "2024-02-01",
            }])
        );
    }
}
