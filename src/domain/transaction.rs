//! Transaction log rows: the raw field-mapped record and its parsed form.

use chrono::NaiveDate;
use std::fmt;

pub const COL_ACCOUNT: &str = "Acct";
pub const COL_TICKER: &str = "Ticker";
pub const COL_CURRENCY: &str = "Currency";
pub const COL_MARGIN: &str = "Margin %";
pub const COL_DATE: &str = "Date";
pub const COL_TYPE: &str = "Trans Type";
pub const COL_SHARES: &str = "Shares";
pub const COL_STRIKE: &str = "Strike/Price";
pub const COL_EXPIRY: &str = "Expiry";
pub const COL_NET: &str = "Net Gains";
pub const COL_NOTES: &str = "Notes";

/// Column order of the transaction journal.
pub const HEADERS: [&str; 11] = [
    COL_ACCOUNT,
    COL_TICKER,
    COL_CURRENCY,
    COL_MARGIN,
    COL_DATE,
    COL_TYPE,
    COL_SHARES,
    COL_STRIKE,
    COL_EXPIRY,
    COL_NET,
    COL_NOTES,
];

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Expiry used for instruments that never expire (stock, cash).
pub fn non_expiring() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}

/// One row of the journal as text, before any validation.
///
/// `None` means the column was absent from the source, which is distinct
/// from a present-but-empty cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionRecord {
    pub account: Option<String>,
    pub ticker: Option<String>,
    pub currency: Option<String>,
    pub margin: Option<String>,
    pub date: Option<String>,
    pub trans_type: Option<String>,
    pub shares: Option<String>,
    pub strike: Option<String>,
    pub expiry: Option<String>,
    pub net_gains: Option<String>,
    pub notes: Option<String>,
}

impl TransactionRecord {
    /// Build a record from `(column name, value)` pairs. Unknown columns are
    /// ignored; a leading byte-order mark on a column name is stripped.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut record = TransactionRecord::default();
        for (name, value) in pairs {
            let name = name.as_ref().trim_start_matches('\u{feff}');
            let slot = match name {
                COL_ACCOUNT => &mut record.account,
                COL_TICKER => &mut record.ticker,
                COL_CURRENCY => &mut record.currency,
                COL_MARGIN => &mut record.margin,
                COL_DATE => &mut record.date,
                COL_TYPE => &mut record.trans_type,
                COL_SHARES => &mut record.shares,
                COL_STRIKE => &mut record.strike,
                COL_EXPIRY => &mut record.expiry,
                COL_NET => &mut record.net_gains,
                COL_NOTES => &mut record.notes,
                _ => continue,
            };
            *slot = Some(value.into());
        }
        record
    }

    /// Cells in [`HEADERS`] order, with absent columns written empty.
    pub fn to_row(&self) -> [&str; 11] {
        [
            &self.account,
            &self.ticker,
            &self.currency,
            &self.margin,
            &self.date,
            &self.trans_type,
            &self.shares,
            &self.strike,
            &self.expiry,
            &self.net_gains,
            &self.notes,
        ]
        .map(|cell| cell.as_deref().unwrap_or(""))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransactionType {
    Stock,
    Put,
    Call,
    Cash,
    CapitalGains,
    Dividend,
    InterestTax,
    /// Any other label. Still moves cash, touches no other category.
    Other(String),
}

impl TransactionType {
    pub fn parse(label: &str) -> Self {
        match label.trim() {
            "Stk" | "Stock" => TransactionType::Stock,
            "Put" => TransactionType::Put,
            "Call" => TransactionType::Call,
            "Cash" => TransactionType::Cash,
            "Cap Gains" => TransactionType::CapitalGains,
            "Div" => TransactionType::Dividend,
            "Int / Tax" => TransactionType::InterestTax,
            other => TransactionType::Other(other.to_string()),
        }
    }

    /// Journal label, as written in the `Trans Type` column.
    pub fn label(&self) -> &str {
        match self {
            TransactionType::Stock => "Stk",
            TransactionType::Put => "Put",
            TransactionType::Call => "Call",
            TransactionType::Cash => "Cash",
            TransactionType::CapitalGains => "Cap Gains",
            TransactionType::Dividend => "Div",
            TransactionType::InterestTax => "Int / Tax",
            TransactionType::Other(label) => label,
        }
    }

    pub fn is_option(&self) -> bool {
        matches!(self, TransactionType::Put | TransactionType::Call)
    }

    /// Types whose net amount counts as earned revenue.
    pub fn is_revenue(&self) -> bool {
        matches!(
            self,
            TransactionType::Put
                | TransactionType::Call
                | TransactionType::CapitalGains
                | TransactionType::Dividend
                | TransactionType::InterestTax
        )
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A validated journal row.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Position in ingestion order, counted across `load` and `append`.
    pub row: usize,
    pub account: String,
    pub ticker: String,
    pub currency: String,
    pub margin: String,
    pub date: NaiveDate,
    pub kind: TransactionType,
    pub shares: f64,
    pub strike: f64,
    pub expiry: NaiveDate,
    pub net_amount: f64,
    pub notes: String,
}
