//! Journal rows that close all or part of an open position.
//!
//! `net` is always the cash the close moves, in journal sign: positive when
//! cash comes in (selling long stock, selling a long option), negative when
//! it goes out (buying back a short).

use chrono::NaiveDate;

use crate::domain::error::LedgerError;
use crate::domain::ledger::{OptionPosition, StockPosition};
use crate::domain::transaction::{DATE_FORMAT, TransactionRecord, TransactionType, non_expiring};

const QUANTITY_EPSILON: f64 = 1e-9;

/// `quantity` must be positive and no larger than the open amount.
fn check_quantity(quantity: f64, open: f64) -> Result<(), LedgerError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(LedgerError::InvalidClose {
            reason: format!("quantity must be positive, got {quantity}"),
        });
    }
    if quantity > open.abs() + QUANTITY_EPSILON {
        return Err(LedgerError::InvalidClose {
            reason: format!("cannot close {quantity} of an open position of {open}"),
        });
    }
    Ok(())
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

impl StockPosition {
    /// Rows closing `shares` of this position.
    ///
    /// The `Stk` row releases the closed fraction of the cost basis, so what
    /// remains of `stk_notional` is still carried at cost. The `Cap Gains`
    /// row books the rest of `net` as realised gain.
    pub fn closing_records(
        &self,
        date: NaiveDate,
        shares: f64,
        net: f64,
        notes: &str,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        check_quantity(shares, self.shares)?;
        let basis = self.notional * shares / self.shares.abs();
        let key = &self.key;
        let row = |kind: TransactionType, qty: f64, amount: f64, notes: &str| TransactionRecord {
            account: Some(key.account.clone()),
            ticker: Some(key.ticker.clone()),
            currency: Some(key.currency.clone()),
            margin: Some(key.margin.clone()),
            date: Some(date.format(DATE_FORMAT).to_string()),
            trans_type: Some(kind.label().to_string()),
            shares: Some(qty.to_string()),
            strike: Some("0".to_string()),
            expiry: Some(non_expiring().format(DATE_FORMAT).to_string()),
            net_gains: Some(money(amount)),
            notes: Some(notes.to_string()),
        };

        Ok(vec![
            row(
                TransactionType::Stock,
                -shares * self.shares.signum(),
                basis,
                notes,
            ),
            row(TransactionType::CapitalGains, 0.0, net - basis, ""),
        ])
    }
}

impl OptionPosition {
    /// Row closing `contracts` of this position.
    pub fn closing_record(
        &self,
        date: NaiveDate,
        contracts: f64,
        net: f64,
        notes: &str,
    ) -> Result<TransactionRecord, LedgerError> {
        check_quantity(contracts, self.contracts)?;
        let key = &self.key;
        Ok(TransactionRecord {
            account: Some(key.account.clone()),
            ticker: Some(key.ticker.clone()),
            currency: Some(key.currency.clone()),
            margin: Some(key.margin.clone()),
            date: Some(date.format(DATE_FORMAT).to_string()),
            trans_type: Some(key.option_type.to_string()),
            shares: Some((-contracts * self.contracts.signum()).to_string()),
            strike: Some(key.strike.to_string()),
            expiry: Some(key.expiry.format(DATE_FORMAT).to_string()),
            net_gains: Some(money(net)),
            notes: Some(notes.to_string()),
        })
    }
}
