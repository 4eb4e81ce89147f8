//! Transaction validation and classification into balance updates.

use chrono::NaiveDate;

use crate::domain::amount::parse_amount;
use crate::domain::category::{
    BalanceCategory, BalanceKey, CashKey, InvestmentBucket, InvestmentKey, OptionKey, OptionType,
    RevenueKey, StockKey, Strike,
};
use crate::domain::error::RowError;
use crate::domain::transaction::{
    COL_ACCOUNT, COL_CURRENCY, COL_DATE, COL_EXPIRY, COL_MARGIN, COL_NET, COL_SHARES, COL_TICKER,
    COL_TYPE, DATE_FORMAT, Transaction, TransactionRecord, TransactionType, non_expiring,
};

const PERMANENT_MARKERS: [&str; 2] = ["invest", "pre convert"];
const TEMP_MARKERS: [&str; 2] = ["margin cover", "short term juicing"];
const WITHDRAWAL_MARKER: &str = "personal withdraw";

/// One delta to apply to one series from a given date onwards.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceUpdate {
    pub category: BalanceCategory,
    pub key: BalanceKey,
    pub date: NaiveDate,
    pub delta: f64,
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, RowError> {
    value.as_deref().ok_or(RowError::MissingField { field })
}

fn parse_date(value: &str, field: &'static str) -> Result<NaiveDate, RowError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| RowError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

/// Validate a raw record. Fails on a missing account or any column the
/// row's type depends on, and on unparseable dates. Amounts that are not
/// numeric degrade to zero.
pub fn parse_record(record: &TransactionRecord, row: usize) -> Result<Transaction, RowError> {
    let account = required(&record.account, COL_ACCOUNT)?.trim();
    if account.is_empty() {
        return Err(RowError::MissingField { field: COL_ACCOUNT });
    }

    let date = parse_date(required(&record.date, COL_DATE)?, COL_DATE)?;
    let currency = required(&record.currency, COL_CURRENCY)?;
    let margin = required(&record.margin, COL_MARGIN)?;
    let kind = TransactionType::parse(required(&record.trans_type, COL_TYPE)?);
    let net_amount = parse_amount(required(&record.net_gains, COL_NET)?);
    let ticker = required(&record.ticker, COL_TICKER)?;

    let (shares, strike, expiry) = match kind {
        TransactionType::Put | TransactionType::Call => {
            let shares = parse_amount(required(&record.shares, COL_SHARES)?);
            let strike = record.strike.as_deref().map(parse_amount).unwrap_or(0.0);
            let expiry = parse_date(required(&record.expiry, COL_EXPIRY)?, COL_EXPIRY)?;
            (shares, strike, expiry)
        }
        TransactionType::Stock => {
            let shares = parse_amount(required(&record.shares, COL_SHARES)?);
            (shares, 0.0, non_expiring())
        }
        _ => (0.0, 0.0, non_expiring()),
    };

    Ok(Transaction {
        row,
        account: account.to_string(),
        ticker: ticker.trim().to_string(),
        currency: currency.trim().to_string(),
        margin: margin.trim().to_string(),
        date,
        kind,
        shares,
        strike,
        expiry,
        net_amount,
        notes: record.notes.clone().unwrap_or_default(),
    })
}

fn investment_bucket(notes: &str) -> Option<InvestmentBucket> {
    let notes = notes.to_lowercase();
    if PERMANENT_MARKERS.iter().all(|m| notes.contains(m)) {
        Some(InvestmentBucket::Regular)
    } else if TEMP_MARKERS.iter().any(|m| notes.contains(m)) {
        Some(InvestmentBucket::Temp)
    } else if notes.contains(WITHDRAWAL_MARKER) {
        Some(InvestmentBucket::Regular)
    } else {
        None
    }
}

/// Every balance update a transaction implies.
pub fn classify(tx: &Transaction) -> Vec<BalanceUpdate> {
    let update = |category, key, delta| BalanceUpdate {
        category,
        key,
        date: tx.date,
        delta,
    };
    let mut updates = Vec::with_capacity(3);

    updates.push(update(
        BalanceCategory::CashBalances,
        BalanceKey::Cash(CashKey {
            account: tx.account.clone(),
            currency: tx.currency.clone(),
        }),
        tx.net_amount,
    ));

    if tx.kind == TransactionType::Cash {
        if let Some(bucket) = investment_bucket(&tx.notes) {
            updates.push(update(
                BalanceCategory::Investments,
                BalanceKey::Investment(InvestmentKey {
                    account: tx.account.clone(),
                    currency: tx.currency.clone(),
                    bucket,
                }),
                tx.net_amount,
            ));
        }
    }

    if tx.kind.is_revenue() {
        updates.push(update(
            BalanceCategory::Revenue,
            BalanceKey::Revenue(RevenueKey {
                account: tx.account.clone(),
                currency: tx.currency.clone(),
                ticker: tx.ticker.clone(),
                kind: tx.kind.clone(),
            }),
            tx.net_amount,
        ));
    }

    if let Some(option_type) = OptionType::from_transaction_type(&tx.kind) {
        let key = BalanceKey::Option(OptionKey {
            account: tx.account.clone(),
            currency: tx.currency.clone(),
            margin: tx.margin.clone(),
            ticker: tx.ticker.clone(),
            option_type,
            strike: Strike::from_price(tx.strike),
            expiry: tx.expiry,
        });
        updates.push(update(BalanceCategory::OptionPositions, key.clone(), tx.shares));
        updates.push(update(BalanceCategory::OptionNotional, key, tx.shares * tx.strike));
    }

    if tx.kind == TransactionType::Stock {
        let key = BalanceKey::Stock(StockKey {
            account: tx.account.clone(),
            currency: tx.currency.clone(),
            margin: tx.margin.clone(),
            ticker: tx.ticker.clone(),
        });
        updates.push(update(BalanceCategory::StockShares, key.clone(), tx.shares));
        // purchases carry negative net gains but positive exposure
        updates.push(update(BalanceCategory::StockNotional, key, -tx.net_amount));
    }

    updates
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn record(pairs: &[(&str, &str)]) -> TransactionRecord {
        let mut base: Vec<(&str, &str)> = vec![
            ("Acct", "A"),
            ("Ticker", "XYZ"),
            ("Currency", "USD"),
            ("Margin %", "0%"),
            ("Date", "2024-01-10"),
            ("Trans Type", "Cash"),
            ("Shares", "0"),
            ("Strike/Price", "0"),
            ("Expiry", "9999-12-31"),
            ("Net Gains", "0"),
            ("Notes", ""),
        ];
        for (name, value) in pairs {
            match base.iter_mut().find(|(n, _)| n == name) {
                Some(slot) => slot.1 = *value,
                None => base.push((*name, *value)),
            }
        }
        TransactionRecord::from_pairs(base)
    }

    fn categories(updates: &[BalanceUpdate]) -> Vec<BalanceCategory> {
        updates.iter().map(|u| u.category).collect()
    }

    #[test]
    fn missing_account_is_rejected() {
        let mut rec = record(&[]);
        rec.account = None;
        assert_eq!(
            parse_record(&rec, 0),
            Err(RowError::MissingField { field: "Acct" })
        );
        let blank = record(&[("Acct", "  ")]);
        assert!(parse_record(&blank, 0).is_err());
    }

    #[test]
    fn bad_date_is_rejected() {
        let rec = record(&[("Date", "10/01/2024")]);
        assert!(matches!(
            parse_record(&rec, 3),
            Err(RowError::InvalidDate { field: "Date", .. })
        ));
    }

    #[test]
    fn option_needs_parseable_expiry() {
        let rec = record(&[("Trans Type", "Put"), ("Expiry", "")]);
        assert!(matches!(
            parse_record(&rec, 0),
            Err(RowError::InvalidDate { field: "Expiry", .. })
        ));
        // stock rows never read the expiry column
        let stock = record(&[("Trans Type", "Stk"), ("Expiry", "")]);
        assert!(parse_record(&stock, 0).is_ok());
    }

    #[test]
    fn unparseable_net_amount_degrades_to_zero() {
        let tx = parse_record(&record(&[("Net Gains", "oops")]), 0).unwrap();
        assert_eq!(tx.net_amount, 0.0);
    }

    #[test]
    fn plain_cash_touches_only_cash() {
        let tx = parse_record(&record(&[("Net Gains", "$1,000.00")]), 0).unwrap();
        let updates = classify(&tx);
        assert_eq!(categories(&updates), vec![BalanceCategory::CashBalances]);
        assert_abs_diff_eq!(updates[0].delta, 1000.0);
    }

    #[test]
    fn cash_notes_select_investment_bucket() {
        let cases = [
            ("Invest - pre convert", Some(InvestmentBucket::Regular)),
            ("MARGIN COVER for week", Some(InvestmentBucket::Temp)),
            ("short term juicing", Some(InvestmentBucket::Temp)),
            ("Personal withdrawal", Some(InvestmentBucket::Regular)),
            ("invest", None),
            ("fee", None),
        ];
        for (notes, expected) in cases {
            let tx = parse_record(&record(&[("Notes", notes), ("Net Gains", "500")]), 0).unwrap();
            let bucket = classify(&tx).iter().find_map(|u| u.key.bucket());
            assert_eq!(bucket, expected, "notes {notes:?}");
        }
    }

    #[test]
    fn investment_markers_ignored_for_non_cash() {
        let tx = parse_record(
            &record(&[("Trans Type", "Div"), ("Notes", "margin cover")]),
            0,
        )
        .unwrap();
        let cats = categories(&classify(&tx));
        assert_eq!(
            cats,
            vec![BalanceCategory::CashBalances, BalanceCategory::Revenue]
        );
    }

    #[test]
    fn put_updates_revenue_positions_and_notional() {
        let tx = parse_record(
            &record(&[
                ("Trans Type", "Put"),
                ("Shares", "-1"),
                ("Strike/Price", "50"),
                ("Expiry", "2024-06-21"),
                ("Net Gains", "150.00"),
            ]),
            0,
        )
        .unwrap();
        let updates = classify(&tx);
        assert_eq!(
            categories(&updates),
            vec![
                BalanceCategory::CashBalances,
                BalanceCategory::Revenue,
                BalanceCategory::OptionPositions,
                BalanceCategory::OptionNotional,
            ]
        );
        assert_abs_diff_eq!(updates[1].delta, 150.0);
        assert_abs_diff_eq!(updates[2].delta, -1.0);
        assert_abs_diff_eq!(updates[3].delta, -50.0);
        match &updates[2].key {
            BalanceKey::Option(key) => {
                assert_eq!(key.option_type, OptionType::Put);
                assert_eq!(key.strike, Strike::from_price(50.0));
                assert_eq!(key.expiry, NaiveDate::from_ymd_opt(2024, 6, 21).unwrap());
            }
            other => panic!("unexpected key {other:?}"),
        }
    }

    #[test]
    fn option_without_strike_column_uses_zero() {
        let mut rec = record(&[("Trans Type", "Call"), ("Shares", "2"), ("Expiry", "2024-06-21")]);
        rec.strike = None;
        let tx = parse_record(&rec, 0).unwrap();
        assert_eq!(tx.strike, 0.0);
    }

    #[test]
    fn stock_notional_is_negated_net() {
        let tx = parse_record(
            &record(&[
                ("Trans Type", "Stk"),
                ("Shares", "100"),
                ("Net Gains", "-5,000.00"),
            ]),
            0,
        )
        .unwrap();
        let updates = classify(&tx);
        assert_eq!(
            categories(&updates),
            vec![
                BalanceCategory::CashBalances,
                BalanceCategory::StockShares,
                BalanceCategory::StockNotional,
            ]
        );
        assert_abs_diff_eq!(updates[0].delta, -5000.0);
        assert_abs_diff_eq!(updates[1].delta, 100.0);
        assert_abs_diff_eq!(updates[2].delta, 5000.0);
    }

    #[test]
    fn unknown_type_moves_cash_only() {
        let tx = parse_record(&record(&[("Trans Type", "Assignment"), ("Net Gains", "-10")]), 0)
            .unwrap();
        assert_eq!(categories(&classify(&tx)), vec![BalanceCategory::CashBalances]);
    }
}
