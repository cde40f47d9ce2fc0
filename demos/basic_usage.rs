//! Count codes per subject across two chunks and derive a simple score
//!
//! Run with: cargo run --example basic_usage

use code_tally::{Chunk, Counter, CounterConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = CounterConfig::new()
        .with_full("group1", ["12345", "54321"])
        .with_initial("group2", ["44", "323"]);
    let mut counter: Counter<u32> = Counter::new(config)?;

    // Chunks would normally be read piecewise from a larger source
    counter.update(
        &Chunk::from_pairs([
            (1, "12345"),
            (2, "12345"),
            (3, "32"),
            (4, "441"),
            (5, "54321"),
        ]),
        None,
    )?;
    counter.update(
        &Chunk::from_pairs([
            (1, "12345"),
            (2, "440"),
            (5, "32"),
            (6, "441"),
            (6, "54321"),
        ]),
        None,
    )?;

    let table = counter.table();
    println!("subject\t{}", table.column_names().join("\t"));
    for row in table.rows() {
        let counts: Vec<String> = row.counts().map(|c| c.to_string()).collect();
        println!("{}\t{}", row.subject(), counts.join("\t"));
    }

    // Number of categories with at least one match, per subject
    println!("\nCategories present:");
    for row in table.rows() {
        let present = row.counts().filter(|&c| c > 0.0).count();
        println!("  {}: {}", row.subject(), present);
    }

    Ok(())
}
