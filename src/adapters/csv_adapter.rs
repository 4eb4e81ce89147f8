//! CSV transaction journal adapter.

use crate::domain::error::LedgerError;
use crate::domain::transaction::{HEADERS, TransactionRecord};
use crate::ports::transaction_port::{TransactionJournal, TransactionSource};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TransactionSource for CsvAdapter {
    /// Read every row in file order. A missing file is an empty journal.
    fn load_records(&self) -> Result<Vec<TransactionRecord>, LedgerError> {
        if !self.path.exists() {
            log::warn!("transaction file not found: {}", self.path.display());
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| LedgerError::Source {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers = rdr.headers()?.clone();
        log::debug!("transaction file headers: {:?}", headers);

        let mut records = Vec::new();
        for result in rdr.records() {
            let row = result.map_err(|e| LedgerError::Source {
                reason: format!("CSV parse error in {}: {}", self.path.display(), e),
            })?;
            records.push(TransactionRecord::from_pairs(headers.iter().zip(row.iter())));
        }

        log::info!("read {} rows from {}", records.len(), self.path.display());
        Ok(records)
    }
}

impl TransactionJournal for CsvAdapter {
    /// Append one row, writing the header first when the file is new.
    fn append_record(&self, record: &TransactionRecord) -> Result<(), LedgerError> {
        let is_new = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(HEADERS)?;
        }
        writer.write_record(record.to_row())?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const JOURNAL: &str = "\u{feff}Acct,Ticker,Currency,Margin %,Date,Trans Type,Shares,Strike/Price,Expiry,Net Gains,Notes\n\
        A,XYZ,USD,0%,2024-01-10,Stk,100,0,9999-12-31,\"-5,000.00\",\n\
        A,XYZ,USD,0%,2024-03-01,Put,-1,50,2024-06-21,150.00,opening put\n";

    fn setup_journal(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transactions.csv");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn load_records_maps_columns_by_header() {
        let (_dir, path) = setup_journal(JOURNAL);
        let records = CsvAdapter::new(path).load_records().unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].account.as_deref(), Some("A"));
        assert_eq!(records[0].net_gains.as_deref(), Some("-5,000.00"));
        assert_eq!(records[1].trans_type.as_deref(), Some("Put"));
        assert_eq!(records[1].notes.as_deref(), Some("opening put"));
    }

    #[test]
    fn missing_file_is_empty_journal() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvAdapter::new(dir.path().join("absent.csv"));
        assert!(adapter.load_records().unwrap().is_empty());
    }

    #[test]
    fn short_rows_leave_trailing_columns_absent() {
        let (_dir, path) = setup_journal("Acct,Ticker,Currency\nA,XYZ\n");
        let records = CsvAdapter::new(path).load_records().unwrap();
        assert_eq!(records[0].ticker.as_deref(), Some("XYZ"));
        assert_eq!(records[0].currency, None);
    }

    #[test]
    fn append_creates_header_then_rows() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvAdapter::new(dir.path().join("new.csv"));
        let record = TransactionRecord::from_pairs([
            ("Acct", "A"),
            ("Ticker", "XYZ"),
            ("Net Gains", "-4,000.00"),
        ]);

        adapter.append_record(&record).unwrap();
        adapter.append_record(&record).unwrap();

        let content = fs::read_to_string(adapter.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Acct,Ticker,Currency,Margin %"));
        assert_eq!(lines[1], "A,XYZ,,,,,,,,\"-4,000.00\",");

        let read_back = adapter.load_records().unwrap();
        assert_eq!(read_back.len(), 2);
        assert_eq!(read_back[0].net_gains.as_deref(), Some("-4,000.00"));
    }
}
