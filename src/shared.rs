use crate::{
    chunk::Chunk,
    config::CounterConfig,
    counter::{Counter, CounterError},
    table::Table,
};
use chrono::NaiveDate;
use parking_lot::RwLock;
use std::{hash::Hash, sync::Arc};

/// A cloneable handle that serializes updates to one [`Counter`].
///
/// Updates take the write lock, so chunks from several threads are applied
/// one at a time. Readers share the read lock and see the table between
/// whole updates, never halfway through one.
///
/// # Examples
///
/// ```rust
/// use code_tally::{Chunk, CounterConfig, SharedCounter};
/// use std::thread;
///
/// let shared: SharedCounter<u32> =
///     SharedCounter::new(CounterConfig::single_initial("circulatory", ["39", "4"]))?;
///
/// let handles: Vec<_> = (0..4)
///     .map(|worker| {
///         let shared = shared.clone();
///         thread::spawn(move || {
///             let chunk = Chunk::from_pairs([(worker, "4019"), (worker, "390")]);
///             shared.update(&chunk, None)
///         })
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap()?;
/// }
///
/// assert_eq!(shared.read(|table| table.len()), 4);
/// assert_eq!(shared.read(|table| table.count(&2, "circulatory")), Some(2.0));
/// # Ok::<(), code_tally::CounterError>(())
/// ```
#[derive(Debug)]
pub struct SharedCounter<S, D = NaiveDate> {
    inner: Arc<RwLock<Counter<S, D>>>,
}

impl<S, D> Clone for SharedCounter<S, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, D> SharedCounter<S, D>
where
    S: Eq + Hash + Clone,
    D: Ord + Clone,
{
    pub fn new(config: CounterConfig) -> Result<Self, CounterError> {
        Ok(Self::from_counter(Counter::new(config)?))
    }

    pub fn from_counter(counter: Counter<S, D>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(counter)),
        }
    }

    /// Apply one chunk under the write lock. See [`Counter::update`].
    pub fn update(
        &self,
        chunk: &Chunk<S, D>,
        date_field: Option<&str>,
    ) -> Result<(), CounterError> {
        self.inner.write().update(chunk, date_field)
    }

    /// Run `f` against the table under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&Table<S, D>) -> R) -> R {
        f(self.inner.read().table())
    }

    /// A copy of the table as of the last completed update.
    pub fn snapshot(&self) -> Table<S, D> {
        self.inner.read().table().clone()
    }

    /// Recover the counter if this is the last handle.
    pub fn try_unwrap(self) -> Result<Counter<S, D>, Self> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| Self { inner })
    }
}
