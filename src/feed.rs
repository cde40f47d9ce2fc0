// Queue-fed ingestion: many producers, one consumer applying chunks in order.

use crate::{
    chunk::Chunk,
    config::DateTracking,
    counter::{Counter, CounterError},
};
use chrono::NaiveDate;
use std::hash::Hash;
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Chunk consumer has stopped")]
    Closed,
}

/// Producer side of a chunk queue created by [`spawn_consumer`].
#[derive(Debug)]
pub struct ChunkSender<S, D = NaiveDate> {
    tx: mpsc::Sender<Chunk<S, D>>,
}

impl<S, D> Clone for ChunkSender<S, D> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S, D> ChunkSender<S, D> {
    /// Queue a chunk, waiting while the queue is full.
    pub async fn send(&self, chunk: Chunk<S, D>) -> Result<(), FeedError> {
        self.tx.send(chunk).await.map_err(|_| FeedError::Closed)
    }
}

/// Spawn a task that owns `counter` and applies queued chunks one at a time,
/// using the counter's configured date field. When tracking is on without a
/// fixed field, each chunk's first date column is used.
///
/// The task ends when every [`ChunkSender`] is dropped and yields the counter,
/// or stops at the first rejected chunk and yields that error; later sends
/// then fail with [`FeedError::Closed`].
///
/// # Examples
///
/// ```rust
/// use code_tally::{spawn_consumer, Chunk, Counter, CounterConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let counter: Counter<u32> = Counter::new(CounterConfig::single_full("dm", ["25000"]))?;
/// let (sender, consumer) = spawn_consumer(counter, 16);
///
/// sender.send(Chunk::from_pairs([(1, "25000")])).await?;
/// sender.send(Chunk::from_pairs([(1, "25000"), (2, "4019")])).await?;
/// drop(sender);
///
/// let counter = consumer.await??;
/// assert_eq!(counter.table().count(&1, "dm"), Some(2.0));
/// # Ok(())
/// # }
/// ```
pub fn spawn_consumer<S, D>(
    counter: Counter<S, D>,
    capacity: usize,
) -> (ChunkSender<S, D>, JoinHandle<Result<Counter<S, D>, CounterError>>)
where
    S: Eq + Hash + Clone + Send + 'static,
    D: Ord + Clone + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Chunk<S, D>>(capacity.max(1));

    let handle = tokio::spawn(async move {
        let mut counter = counter;
        let tracking = counter.config().date_tracking.clone();

        while let Some(chunk) = rx.recv().await {
            let date_field = match &tracking {
                DateTracking::Off => None,
                DateTracking::On => chunk.date_columns().next().map(|(name, _)| name),
                DateTracking::Field(name) => Some(name.as_str()),
            };
            if let Err(e) = counter.update(&chunk, date_field) {
                tracing::warn!(error = %e, "chunk rejected, stopping consumer");
                return Err(e);
            }
        }

        tracing::debug!(rows = counter.table().len(), "chunk queue drained");
        Ok(counter)
    });

    (ChunkSender { tx }, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::CounterConfig, Record};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[tokio::test]
    async fn producers_feed_single_consumer() {
        let counter: Counter<u32> = Counter::new(
            CounterConfig::new()
                .with_full("group1", ["12345", "54321"])
                .with_initial("group2", ["44", "323"]),
        )
        .unwrap();
        let (sender, consumer) = spawn_consumer(counter, 2);

        let producers: Vec<_> = (0..4u32)
            .map(|p| {
                let sender = sender.clone();
                tokio::spawn(async move {
                    for _ in 0..10 {
                        let chunk = Chunk::from_pairs([(p, "12345"), (p, "440")]);
                        sender.send(chunk).await.unwrap();
                    }
                })
            })
            .collect();
        drop(sender);
        for producer in producers {
            producer.await.unwrap();
        }

        let counter = consumer.await.unwrap().unwrap();
        let table = counter.table();
        assert_eq!(table.len(), 4);
        for p in 0..4 {
            assert_eq!(table.count(&p, "group1"), Some(10.0));
            assert_eq!(table.count(&p, "group2"), Some(10.0));
        }
    }

    #[tokio::test]
    async fn consumer_uses_configured_date_field() {
        let counter: Counter<&str> =
            Counter::new(CounterConfig::single_initial("htn", ["401"]).track_dates("seen"))
                .unwrap();
        let (sender, consumer) = spawn_consumer(counter, 4);

        let chunk = Chunk::from_records(
            vec![Record::new("a", "4019", day(5)), Record::new("a", "4011", day(2))],
            "seen",
        )
        .unwrap();
        sender.send(chunk).await.unwrap();
        drop(sender);

        let counter = consumer.await.unwrap().unwrap();
        assert_eq!(counter.table().first(&"a", "htn"), Some(&day(2)));
        assert_eq!(counter.table().last(&"a", "htn"), Some(&day(5)));
    }

    #[tokio::test]
    async fn consumer_picks_chunk_date_column_when_unfixed() {
        let config: CounterConfig = CounterConfig::from_json_str(
            r#"{"codes_initial": {"htn": ["401"]}, "date_tracking": true}"#,
        )
        .unwrap();
        let counter: Counter<&str> = Counter::new(config).unwrap();
        let (sender, consumer) = spawn_consumer(counter, 4);

        let seen = Chunk::from_records(vec![Record::new("a", "4019", day(5))], "seen").unwrap();
        let visited = Chunk::from_records(vec![Record::new("a", "4011", day(2))], "visit").unwrap();
        sender.send(seen).await.unwrap();
        sender.send(visited).await.unwrap();
        drop(sender);

        let counter = consumer.await.unwrap().unwrap();
        assert_eq!(counter.table().count(&"a", "htn"), Some(2.0));
        assert_eq!(counter.table().first(&"a", "htn"), Some(&day(2)));
        assert_eq!(counter.table().last(&"a", "htn"), Some(&day(5)));
    }

    #[tokio::test]
    async fn rejected_chunk_stops_consumer() {
        let counter: Counter<&str> =
            Counter::new(CounterConfig::single_initial("htn", ["401"]).track_dates("seen"))
                .unwrap();
        let (sender, consumer) = spawn_consumer(counter, 1);

        sender
            .send(Chunk::from_pairs([("a", "4019")]))
            .await
            .unwrap();

        let result = consumer.await.unwrap();
        assert!(matches!(result, Err(CounterError::MissingDateColumn(_))));
        assert!(matches!(
            sender.send(Chunk::from_pairs([("a", "4019")])).await,
            Err(FeedError::Closed)
        ));
    }
}
