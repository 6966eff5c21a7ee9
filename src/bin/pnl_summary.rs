//! PnL summary CLI.
//!
//! Reads the PnL CSV artifact (spec.md §6 "Persisted artifacts") and prints
//! aggregate realized performance, per spec.md §6's peripheral CLI surface.
//!
//! Usage:
//!   pnl-summary [path/to/pnl.csv]

use std::env;
use std::fs;
use std::process::ExitCode;
use std::str::FromStr;

use meridian_arb::config::Config;
use rust_decimal::Decimal;

fn parse_row(line: &str) -> Option<(Decimal, Decimal, Decimal)> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 13 {
        return None;
    }
    let gross_pnl = Decimal::from_str(fields[8]).ok()?;
    let net_pnl = Decimal::from_str(fields[9]).ok()?;
    let net_pnl_bps = Decimal::from_str(fields[10]).ok()?;
    Some((gross_pnl, net_pnl, net_pnl_bps))
}

fn main() -> ExitCode {
    env_logger::init();

    let config = Config::from_env().ok();
    let args: Vec<String> = env::args().collect();
    let path = args
        .get(1)
        .cloned()
        .or_else(|| config.and_then(|c| c.pnl_csv_path))
        .unwrap_or_else(|| "pnl.csv".to_string());

    let contents = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to read {path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut lines = contents.lines();
    lines.next(); // header

    let mut count = 0u64;
    let mut wins = 0u64;
    let mut total_gross = Decimal::ZERO;
    let mut total_net = Decimal::ZERO;
    let mut total_bps = Decimal::ZERO;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let Some((gross, net, bps)) = parse_row(line) else {
            eprintln!("skipping malformed row: {line}");
            continue;
        };
        count += 1;
        total_gross += gross;
        total_net += net;
        total_bps += bps;
        if net > Decimal::ZERO {
            wins += 1;
        }
    }

    if count == 0 {
        println!("no records in {path}");
        return ExitCode::SUCCESS;
    }

    let win_rate = Decimal::from(wins) / Decimal::from(count) * Decimal::new(100, 0);
    let avg_net_bps = total_bps / Decimal::from(count);

    println!("records:        {count}");
    println!("gross PnL:      {total_gross}");
    println!("net PnL:        {total_net}");
    println!("avg net bps:    {avg_net_bps}");
    println!("win rate:       {win_rate}%");

    ExitCode::SUCCESS
}
