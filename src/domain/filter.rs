//! Filter predicates for balance queries.

use crate::domain::category::{BalanceKey, InvestmentBucket};

/// Restricts a balance query to matching keys. `None` leaves a dimension
/// unconstrained, and a dimension the key shape does not carry is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceFilter {
    pub account: Option<String>,
    pub currency: Option<String>,
    pub tickers: Option<Vec<String>>,
    pub margin: Option<String>,
    pub investment_type: Option<InvestmentBucket>,
}

impl BalanceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn ticker(self, ticker: impl Into<String>) -> Self {
        self.tickers([ticker])
    }

    pub fn tickers<I, S>(mut self, tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tickers = Some(tickers.into_iter().map(Into::into).collect());
        self
    }

    pub fn margin(mut self, margin: impl Into<String>) -> Self {
        self.margin = Some(margin.into());
        self
    }

    pub fn investment_type(mut self, bucket: InvestmentBucket) -> Self {
        self.investment_type = Some(bucket);
        self
    }

    pub fn matches(&self, key: &BalanceKey) -> bool {
        if let Some(account) = &self.account {
            if key.account() != account {
                return false;
            }
        }
        if let Some(currency) = &self.currency {
            if key.currency() != currency {
                return false;
            }
        }
        if let (Some(tickers), Some(ticker)) = (&self.tickers, key.ticker()) {
            if !tickers.iter().any(|t| t == ticker) {
                return false;
            }
        }
        if let (Some(margin), Some(key_margin)) = (&self.margin, key.margin()) {
            if key_margin != margin {
                return false;
            }
        }
        if let (Some(bucket), Some(key_bucket)) = (self.investment_type, key.bucket()) {
            if key_bucket != bucket {
                return false;
            }
        }
        true
    }
}
