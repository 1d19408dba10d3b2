use std::path::PathBuf;

use anyhow::{Context, Result};
use btl_core::calculations::StampDutyCalculator;
use btl_core::coerce_decimal;
use btl_data::RateTableLoader;
use chrono::NaiveDate;
use clap::Parser;

/// Check a stamp-duty rate table CSV and print the bands it defines.
///
/// The CSV file should have the following columns:
/// - country: england or wales
/// - category: first, next or additional
/// - kind: bands or relief
/// - upper_bound: the band's upper price bound (empty for unbounded)
/// - rate: the marginal rate as a fraction (e.g., 0.05)
#[derive(Parser, Debug)]
#[command(name = "btl-rates")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV file containing the rate table
    #[arg(short, long)]
    file: PathBuf,

    /// Date from which the table applies (YYYY-MM-DD)
    #[arg(short, long, default_value = "2025-04-01")]
    effective_from: NaiveDate,

    /// Also print the tax due at this price for every country and category
    #[arg(short, long)]
    price: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let name = args
        .file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "custom".to_string());

    println!("Loading rate table from: {}", args.file.display());

    let table = RateTableLoader::load_from_path(&args.file, &name, args.effective_from)
        .with_context(|| format!("Failed to load rate table: {}", args.file.display()))?;

    for (country, category, rule) in table.iter() {
        println!("{} / {}", country.label(), category.label());
        for band in &rule.bands {
            match band.upper_bound {
                Some(upper) => println!("  up to {upper:>10}  {}", band.rate),
                None => println!("  above           {}", band.rate),
            }
        }
        if let Some(relief) = &rule.relief {
            for band in relief {
                if let Some(upper) = band.upper_bound {
                    println!("  relief {upper:>9}  {}", band.rate);
                }
            }
        }
    }

    let missing = table.missing_rules();
    if !missing.is_empty() {
        println!("Warning: {} country/category pairs have no rule:", missing.len());
        for (country, category) in missing {
            println!("  {country}/{category}");
        }
    }

    if let Some(price) = &args.price {
        let price = coerce_decimal(price);
        let calculator = StampDutyCalculator::new(&table);
        println!("Tax due at {price}:");
        for (country, category, _) in table.iter() {
            let tax = calculator
                .calculate(price, country, category)
                .with_context(|| format!("Failed to compute tax for {country}/{category}"))?;
            println!("  {country}/{category}: {}", tax.round_dp(2));
        }
    }

    println!("Rate table '{}' is valid.", table.name);

    Ok(())
}
