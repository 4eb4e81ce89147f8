//! Balance categories and their composite keys.
//!
//! Each category keys its series on a different set of dimensions. Rather
//! than a variable-length tuple, every shape is its own record and
//! [`BalanceKey`] tags which one a series uses.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::LedgerError;
use crate::domain::transaction::TransactionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BalanceCategory {
    Investments,
    Revenue,
    OptionPositions,
    OptionNotional,
    StockShares,
    StockNotional,
    CashBalances,
}

impl BalanceCategory {
    pub const ALL: [BalanceCategory; 7] = [
        BalanceCategory::Investments,
        BalanceCategory::Revenue,
        BalanceCategory::OptionPositions,
        BalanceCategory::OptionNotional,
        BalanceCategory::StockShares,
        BalanceCategory::StockNotional,
        BalanceCategory::CashBalances,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BalanceCategory::Investments => "investments",
            BalanceCategory::Revenue => "revenue",
            BalanceCategory::OptionPositions => "opt_positions",
            BalanceCategory::OptionNotional => "opt_notional",
            BalanceCategory::StockShares => "stk_shares",
            BalanceCategory::StockNotional => "stk_notional",
            BalanceCategory::CashBalances => "cash_balances",
        }
    }
}

impl fmt::Display for BalanceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BalanceCategory {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BalanceCategory::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| LedgerError::InvalidCategory { name: s.to_string() })
    }
}

/// Which investment bucket a cash movement funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InvestmentBucket {
    Regular,
    Temp,
}

impl InvestmentBucket {
    pub fn name(self) -> &'static str {
        match self {
            InvestmentBucket::Regular => "regular",
            InvestmentBucket::Temp => "temp",
        }
    }
}

impl FromStr for InvestmentBucket {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" => Ok(InvestmentBucket::Regular),
            "temp" => Ok(InvestmentBucket::Temp),
            other => Err(LedgerError::InvalidInvestmentType {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for InvestmentBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionType {
    Put,
    Call,
}

impl OptionType {
    pub fn from_transaction_type(kind: &TransactionType) -> Option<Self> {
        match kind {
            TransactionType::Put => Some(OptionType::Put),
            TransactionType::Call => Some(OptionType::Call),
            _ => None,
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Put => f.write_str("Put"),
            OptionType::Call => f.write_str("Call"),
        }
    }
}

/// Strike price held in thousandths so that option keys hash and order exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Strike(i64);

impl Strike {
    pub fn from_price(price: f64) -> Self {
        Strike((price * 1000.0).round() as i64)
    }

    pub fn price(self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

impl fmt::Display for Strike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.price())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CashKey {
    pub account: String,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InvestmentKey {
    pub account: String,
    pub currency: String,
    pub bucket: InvestmentBucket,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RevenueKey {
    pub account: String,
    pub currency: String,
    pub ticker: String,
    pub kind: TransactionType,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StockKey {
    pub account: String,
    pub currency: String,
    pub margin: String,
    pub ticker: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OptionKey {
    pub account: String,
    pub currency: String,
    pub margin: String,
    pub ticker: String,
    pub option_type: OptionType,
    pub strike: Strike,
    pub expiry: NaiveDate,
}

/// Composite key of one balance series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BalanceKey {
    Cash(CashKey),
    Investment(InvestmentKey),
    Revenue(RevenueKey),
    Stock(StockKey),
    Option(OptionKey),
}

impl BalanceKey {
    pub fn account(&self) -> &str {
        match self {
            BalanceKey::Cash(k) => &k.account,
            BalanceKey::Investment(k) => &k.account,
            BalanceKey::Revenue(k) => &k.account,
            BalanceKey::Stock(k) => &k.account,
            BalanceKey::Option(k) => &k.account,
        }
    }

    pub fn currency(&self) -> &str {
        match self {
            BalanceKey::Cash(k) => &k.currency,
            BalanceKey::Investment(k) => &k.currency,
            BalanceKey::Revenue(k) => &k.currency,
            BalanceKey::Stock(k) => &k.currency,
            BalanceKey::Option(k) => &k.currency,
        }
    }

    /// Ticker dimension, for the shapes that carry one.
    pub fn ticker(&self) -> Option<&str> {
        match self {
            BalanceKey::Revenue(k) => Some(&k.ticker),
            BalanceKey::Stock(k) => Some(&k.ticker),
            BalanceKey::Option(k) => Some(&k.ticker),
            BalanceKey::Cash(_) | BalanceKey::Investment(_) => None,
        }
    }

    pub fn margin(&self) -> Option<&str> {
        match self {
            BalanceKey::Stock(k) => Some(&k.margin),
            BalanceKey::Option(k) => Some(&k.margin),
            _ => None,
        }
    }

    pub fn bucket(&self) -> Option<InvestmentBucket> {
        match self {
            BalanceKey::Investment(k) => Some(k.bucket),
            _ => None,
        }
    }

    /// Whether this key shape belongs to `category`.
    pub fn fits(&self, category: BalanceCategory) -> bool {
        matches!(
            (category, self),
            (BalanceCategory::CashBalances, BalanceKey::Cash(_))
                | (BalanceCategory::Investments, BalanceKey::Investment(_))
                | (BalanceCategory::Revenue, BalanceKey::Revenue(_))
                | (BalanceCategory::StockShares, BalanceKey::Stock(_))
                | (BalanceCategory::StockNotional, BalanceKey::Stock(_))
                | (BalanceCategory::OptionPositions, BalanceKey::Option(_))
                | (BalanceCategory::OptionNotional, BalanceKey::Option(_))
        )
    }
}

impl fmt::Display for BalanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BalanceKey::Cash(k) => write!(f, "{}/{}", k.account, k.currency),
            BalanceKey::Investment(k) => write!(f, "{}/{}/{}", k.account, k.currency, k.bucket),
            BalanceKey::Revenue(k) => {
                write!(f, "{}/{}/{}/{}", k.account, k.currency, k.ticker, k.kind)
            }
            BalanceKey::Stock(k) => {
                write!(f, "{}/{}/{}/{}", k.account, k.currency, k.margin, k.ticker)
            }
            BalanceKey::Option(k) => write!(
                f,
                "{}/{}/{}/{}/{}/{}/{}",
                k.account, k.currency, k.margin, k.ticker, k.option_type, k.strike, k.expiry
            ),
        }
    }
}
