//! Several producers feeding one counter through a queue
//!
//! Run with: cargo run --example async_feed --features tokio

use code_tally::{spawn_consumer, Chunk, Counter, CounterConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let counter: Counter<u32> = Counter::new(
        CounterConfig::new()
            .with_initial("circulatory", ["39", "40", "41", "42"])
            .with_initial("respiratory", ["46", "47", "48", "49"]),
    )?;
    let (sender, consumer) = spawn_consumer(counter, 8);

    let producers: Vec<_> = (0..3u32)
        .map(|producer| {
            let sender = sender.clone();
            tokio::spawn(async move {
                for i in 0..5u32 {
                    let subject = producer * 10 + i;
                    let chunk = Chunk::from_pairs([(subject, "4019"), (subject, "486")]);
                    sender.send(chunk).await?;
                }
                Ok::<_, code_tally::FeedError>(())
            })
        })
        .collect();
    drop(sender);

    for producer in producers {
        producer.await??;
    }

    let counter = consumer.await??;
    println!("{}", serde_json::to_string_pretty(counter.table())?);

    Ok(())
}
