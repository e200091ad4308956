//! Basic Demos Example
//!
//! Walks through the tickerkit library: moving averages over a short close
//! series, the column max/min ratio and the city × company presence matrix.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tickerkit::prelude::*;

fn main() -> anyhow::Result<()> {
    tickerkit::init_logger()?;

    println!("Basic Demos Example");
    println!("{}", "=".repeat(60));

    // Example 1: moving averages over a handful of closes
    println!("\nExample 1: Moving averages");
    let closes = [101.0, 102.5, 101.8, 103.2, 104.0, 103.1, 105.6, 106.2];
    for series in moving_averages(&closes, &[3, 5])? {
        let defined: Vec<String> = series
            .defined_points()
            .map(|(idx, value)| format!("#{}={:.2}", idx, value))
            .collect();
        println!("   {}: {}", series.label(), defined.join(" "));
    }

    // Example 2: both ratio implementations agree
    println!("\nExample 2: Column max/min ratio");
    let sample = sample_matrix();
    println!("{}", sample);
    println!("   direct: {:?}", max_by_min(&sample)?);
    println!("   apply:  {:?}", max_by_min_apply(&sample)?);

    let mut rng = StdRng::seed_from_u64(7);
    let random = random_matrix(5, 3, 1, 10, &mut rng)?;
    println!("{}", random);
    println!("   ratios: {:?}", max_by_min(&random)?);

    // Example 3: presence matrix
    println!("\nExample 3: Presence matrix");
    let table = CityCompanyTable::sample();
    let presence = presence_matrix(&table);
    println!("{}", presence);
    println!("   total pairs: {}", presence.total());

    Ok(())
}
