#![allow(dead_code)]

use chrono::NaiveDate;
use std::sync::Arc;
use std::sync::Mutex;
use tradeledger::domain::error::LedgerError;
use tradeledger::domain::ledger::{Ledger, LocState};
use tradeledger::domain::transaction::TransactionRecord;
use tradeledger::ports::clock_port::{Clock, FixedClock};
use tradeledger::ports::transaction_port::{TransactionJournal, TransactionSource};

/// In-memory journal standing in for the CSV file.
pub struct MockJournal {
    pub records: Mutex<Vec<TransactionRecord>>,
}

impl MockJournal {
    pub fn new(records: Vec<TransactionRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

impl TransactionSource for MockJournal {
    fn load_records(&self) -> Result<Vec<TransactionRecord>, LedgerError> {
        Ok(self.records.lock().unwrap().clone())
    }
}

impl TransactionJournal for MockJournal {
    fn append_record(&self, record: &TransactionRecord) -> Result<(), LedgerError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn clock_on(today: NaiveDate) -> Arc<dyn Clock> {
    Arc::new(FixedClock::on(today))
}

pub fn ledger_on(today: NaiveDate) -> Ledger {
    Ledger::new(LocState::default(), clock_on(today))
}

#[allow(clippy::too_many_arguments)]
pub fn make_record(
    account: &str,
    ticker: &str,
    trans_type: &str,
    day: &str,
    shares: &str,
    strike: &str,
    expiry: &str,
    net: &str,
    notes: &str,
) -> TransactionRecord {
    TransactionRecord::from_pairs([
        ("Acct", account),
        ("Ticker", ticker),
        ("Currency", "USD"),
        ("Margin %", "0%"),
        ("Date", day),
        ("Trans Type", trans_type),
        ("Shares", shares),
        ("Strike/Price", strike),
        ("Expiry", expiry),
        ("Net Gains", net),
        ("Notes", notes),
    ])
}

pub fn stock(account: &str, ticker: &str, day: &str, shares: &str, net: &str) -> TransactionRecord {
    make_record(account, ticker, "Stk", day, shares, "0", "9999-12-31", net, "")
}

pub fn put(
    account: &str,
    ticker: &str,
    day: &str,
    contracts: &str,
    strike: &str,
    expiry: &str,
    net: &str,
) -> TransactionRecord {
    make_record(account, ticker, "Put", day, contracts, strike, expiry, net, "")
}

pub fn call(
    account: &str,
    ticker: &str,
    day: &str,
    contracts: &str,
    strike: &str,
    expiry: &str,
    net: &str,
) -> TransactionRecord {
    make_record(account, ticker, "Call", day, contracts, strike, expiry, net, "")
}

pub fn cash(account: &str, day: &str, net: &str, notes: &str) -> TransactionRecord {
    make_record(account, "", "Cash", day, "0", "0", "9999-12-31", net, notes)
}

pub fn dividend(account: &str, ticker: &str, day: &str, net: &str) -> TransactionRecord {
    make_record(account, ticker, "Div", day, "0", "0", "9999-12-31", net, "")
}

/// A mixed journal spanning two accounts and both stock and options.
pub fn sample_journal() -> Vec<TransactionRecord> {
    vec![
        cash("A", "2024-01-02", "$20,000.00", "Invest pre convert"),
        stock("A", "XYZ", "2024-01-10", "100", "-5,000.00"),
        put("A", "XYZ", "2024-03-01", "-1", "50", "2024-06-21", "150.00"),
        cash("B", "2024-01-05", "5,000.00", "margin cover"),
        call("B", "ABC", "2024-02-15", "-2", "30", "2024-04-19", "80.00"),
        dividend("A", "XYZ", "2024-02-20", "12.50"),
        stock("A", "XYZ", "2024-02-01", "-40", "2,200.00"),
    ]
}
