use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::record::ArbRecord;

/// Appends `ArbRecord`s to a single CSV file in insertion order, writing the
/// header once. Hand-rolled rather than built on the `csv` crate, following
/// the sibling example `strongca22-cpu-dexarb`'s `tax/csv_logger.rs`.
pub struct PnlCsvWriter {
    path: PathBuf,
    header_written: bool,
}

const HEADERS: &[&str] = &[
    "id",
    "timestamp",
    "buy_venue",
    "sell_venue",
    "symbol",
    "buy_price",
    "sell_price",
    "amount",
    "gross_pnl",
    "net_pnl",
    "net_pnl_bps",
    "fees",
    "gas_cost",
];

impl PnlCsvWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(PnlCsvWriter {
            header_written: path.exists(),
            path,
        })
    }

    pub fn write(&mut self, record: &ArbRecord) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        if !self.header_written {
            writeln!(file, "{}", HEADERS.join(","))?;
            self.header_written = true;
        }
        let fields = vec![
            escape_csv_field(&record.id),
            record.timestamp.to_rfc3339(),
            escape_csv_field(&record.buy_venue),
            escape_csv_field(&record.sell_venue),
            escape_csv_field(&record.symbol),
            record.buy_price.to_string(),
            record.sell_price.to_string(),
            record.amount.to_string(),
            record.gross_pnl().to_string(),
            record.net_pnl().to_string(),
            record.net_pnl_bps().to_string(),
            record.total_fees().to_string(),
            record.gas_cost.to_string(),
        ];
        writeln!(file, "{}", fields.join(","))
    }
}

fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::env;

    fn record() -> ArbRecord {
        ArbRecord {
            id: "sig-1".to_string(),
            timestamp: Utc::now(),
            symbol: "ETH/USDC".to_string(),
            buy_venue: "binance".to_string(),
            sell_venue: "wallet".to_string(),
            buy_price: Decimal::from(2000),
            sell_price: Decimal::from(2010),
            amount: Decimal::ONE,
            fee_buy: Decimal::new(8, 1),
            fee_sell: Decimal::new(8, 1),
            gas_cost: Decimal::new(5, 1),
        }
    }

    #[test]
    fn writes_header_once_then_appends_rows() {
        let path = env::temp_dir().join(format!("meridian_arb_pnl_test_{}.csv", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let mut writer = PnlCsvWriter::new(&path).unwrap();
        writer.write(&record()).unwrap();
        writer.write(&record()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3, "header + 2 rows");
        assert_eq!(lines[0], HEADERS.join(","));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn escapes_fields_containing_commas() {
        assert_eq!(escape_csv_field("simple"), "simple");
        assert_eq!(escape_csv_field("has,comma"), "\"has,comma\"");
    }
}
