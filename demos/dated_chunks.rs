//! Track first and last diagnosis dates while streaming records
//!
//! Run with: cargo run --example dated_chunks

use chrono::NaiveDate;
use code_tally::{Chunk, Counter, CounterConfig, Record};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = CounterConfig::from_json_str(
        r#"{
            "codes_full": { "diabetes": ["25000", "25001", "25002"] },
            "codes_initial": { "hypertension": ["401", "402", "403"] },
            "date_tracking": "visit_date"
        }"#,
    )?;
    let mut counter: Counter<String> = Counter::new(config)?;

    let visits = [
        ("anna", "4019", "2023-11-02"),
        ("anna", "25000", "2024-01-15"),
        ("ben", "4011", "2024-02-01"),
        ("anna", "4020", "2023-06-30"),
        ("ben", "7999", "2024-02-01"),
        ("carl", "25002", "2024-03-12"),
    ];

    // Two records per chunk, arriving out of date order
    for batch in visits.chunks(2) {
        let mut records = Vec::with_capacity(batch.len());
        for (subject, code, date) in batch {
            let date: NaiveDate = date.parse()?;
            records.push(Record::new(subject.to_string(), *code, date));
        }
        let chunk = Chunk::from_records(records, "visit_date")?;
        counter.update(&chunk, Some("visit_date"))?;
    }

    println!("{}", serde_json::to_string_pretty(counter.table())?);

    Ok(())
}
