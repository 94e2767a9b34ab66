//! Decode a JTL file and print a short summary of its samples.
//!
//! Usage: `cargo run --example summarize -- results.jtl`

use chrono::TimeDelta;
use jtl_parser::{create_decoder, DecoderOptions};

fn main() -> Result<(), jtl_parser::Error> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "results.jtl".to_string());

    let decoder = create_decoder(&path, &DecoderOptions::default())?;

    println!("Format: {:?}", decoder.format());
    if let Some(version) = decoder.version() {
        println!("Version: {}", version);
    }

    let mut count = 0i64;
    let mut failures = 0;
    let mut elapsed = TimeDelta::zero();

    for sample in decoder.records() {
        let sample = sample?;
        count += 1;
        if !sample.success {
            failures += 1;
        }
        elapsed += sample.elapsed_time;
    }

    println!("Read {} samples, {} failed", count, failures);
    if count > 0 {
        println!("Average elapsed: {} ms", elapsed.num_milliseconds() / count);
    }

    Ok(())
}
