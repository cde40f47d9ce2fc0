//! Per-chunk reduction: group matching records by subject, once per category.

use crate::{matcher::Matcher, table::Partial};
use std::{collections::HashMap, hash::Hash};

/// One map per category (in matcher order) from subject to that subject's
/// partial aggregate for this chunk. Subjects without a match are absent.
pub(crate) fn by_category<'a, S, D>(
    matcher: &Matcher,
    subjects: &'a [S],
    codes: &[String],
    dates: Option<&'a [Option<D>]>,
) -> Vec<HashMap<&'a S, Partial<D>>>
where
    S: Eq + Hash,
    D: Ord + Clone,
{
    let mut groups: Vec<HashMap<&'a S, Partial<D>>> = matcher
        .categories()
        .iter()
        .map(|_| HashMap::new())
        .collect();

    for (row, (subject, code)) in subjects.iter().zip(codes).enumerate() {
        let date = dates.and_then(|dates| dates[row].as_ref());
        for category in matcher.classify(code) {
            groups[category].entry(subject).or_default().observe(date);
        }
    }

    groups
}
