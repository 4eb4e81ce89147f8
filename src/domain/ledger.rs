//! The ledger aggregate: transaction log, derived balances, LOC state.
//!
//! All balance state is a pure function of the accepted rows. `load` and
//! `append` share one ingestion path, so replaying a journal row by row
//! converges to the same balances as loading it in one batch.

use chrono::{Days, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::balance_store::DailyBalanceStore;
use crate::domain::category::{BalanceCategory, BalanceKey, OptionKey, StockKey};
use crate::domain::classifier::{classify, parse_record};
use crate::domain::error::{LedgerError, RowRejection};
use crate::domain::filter::BalanceFilter;
use crate::domain::transaction::{Transaction, TransactionRecord};
use crate::ports::clock_port::Clock;

/// Positions smaller than this are treated as closed.
const POSITION_EPSILON: f64 = 1e-9;

/// Line-of-credit limit and usage. Configured externally, never derived
/// from transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocState {
    pub limit: f64,
    pub usage: f64,
}

impl LocState {
    pub fn new(limit: f64, usage: f64) -> Self {
        Self { limit, usage }
    }

    pub fn available(&self) -> f64 {
        self.limit - self.usage
    }
}

/// Result of a balance query: the total and the per-key values it sums.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceSnapshot {
    pub total: f64,
    pub breakdown: BTreeMap<BalanceKey, f64>,
}

impl BalanceSnapshot {
    fn from_breakdown(breakdown: BTreeMap<BalanceKey, f64>) -> Self {
        let total = breakdown.values().sum();
        Self { total, breakdown }
    }

    pub fn get(&self, key: &BalanceKey) -> f64 {
        self.breakdown.get(key).copied().unwrap_or(0.0)
    }
}

/// Outcome of ingesting a batch of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub applied: usize,
    pub rejected: Vec<RowRejection>,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.applied + self.rejected.len()
    }
}

/// Distinct dimension values observed in the ledger, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dimensions {
    pub accounts: Vec<String>,
    pub currencies: Vec<String>,
    pub tickers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockPosition {
    pub key: StockKey,
    pub shares: f64,
    pub notional: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionPosition {
    pub key: OptionKey,
    pub contracts: f64,
    pub notional: f64,
}

/// Revenue earned over a window against the average capital deployed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NotionalReturn {
    pub revenue: f64,
    pub average_notional: f64,
}

impl NotionalReturn {
    /// Revenue as a percentage of average notional, or zero when nothing
    /// was deployed.
    pub fn percent(&self) -> f64 {
        if self.average_notional.abs() < POSITION_EPSILON {
            0.0
        } else {
            self.revenue / self.average_notional * 100.0
        }
    }
}

/// Open stock and option positions on one date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Positions {
    pub stocks: Vec<StockPosition>,
    pub options: Vec<OptionPosition>,
}

#[derive(Debug)]
pub struct Ledger {
    transactions: Vec<Transaction>,
    store: DailyBalanceStore,
    first_transaction_date: Option<NaiveDate>,
    last_refresh: Option<NaiveDateTime>,
    loc: LocState,
    rows_seen: usize,
    generation: u64,
    dimensions: Mutex<Option<(u64, Arc<Dimensions>)>>,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    pub fn new(loc: LocState, clock: Arc<dyn Clock>) -> Self {
        Ledger {
            transactions: Vec::new(),
            store: DailyBalanceStore::new(),
            first_transaction_date: None,
            last_refresh: None,
            loc,
            rows_seen: 0,
            generation: 0,
            dimensions: Mutex::new(None),
            clock,
        }
    }

    /// Build a ledger from a full journal.
    pub fn from_records(
        records: &[TransactionRecord],
        loc: LocState,
        clock: Arc<dyn Clock>,
    ) -> (Self, IngestReport) {
        let mut ledger = Ledger::new(loc, clock);
        let report = ledger.load(records);
        (ledger, report)
    }

    /// Ingest rows in order. A bad row is skipped and reported; it never
    /// aborts the batch.
    pub fn load(&mut self, records: &[TransactionRecord]) -> IngestReport {
        let mut report = IngestReport::default();
        for record in records {
            match self.ingest(record) {
                Ok(()) => report.applied += 1,
                Err(rejection) => report.rejected.push(rejection),
            }
        }
        self.store.advance_horizon(self.clock.today());
        self.last_refresh = Some(self.clock.now());
        log::info!(
            "loaded {} transactions ({} rejected), {} accounts, {} tickers",
            report.applied,
            report.rejected.len(),
            self.dimensions().accounts.len(),
            self.dimensions().tickers.len()
        );
        report
    }

    /// Ingest one newly confirmed row.
    pub fn append(&mut self, record: &TransactionRecord) -> Result<&Transaction, RowRejection> {
        self.ingest(record)?;
        self.store.advance_horizon(self.clock.today());
        Ok(&self.transactions[self.transactions.len() - 1])
    }

    fn ingest(&mut self, record: &TransactionRecord) -> Result<(), RowRejection> {
        let row = self.rows_seen;
        self.rows_seen += 1;

        let tx = parse_record(record, row).map_err(|error| {
            let rejection = RowRejection { row, error };
            log::warn!("skipping transaction {rejection}: {record:?}");
            rejection
        })?;

        let today = self.clock.today();
        for update in classify(&tx) {
            log::debug!(
                "row {row}: {} {} {:+} from {}",
                update.category,
                update.key,
                update.delta,
                update.date
            );
            self.store
                .update(update.category, update.key, update.date, update.delta, today);
        }

        self.first_transaction_date = Some(
            self.first_transaction_date
                .map_or(tx.date, |first| first.min(tx.date)),
        );
        self.transactions.push(tx);
        self.generation += 1;
        Ok(())
    }

    /// Balance of every series in `category` matching `filter` on `date`.
    pub fn get_spot_balance(
        &self,
        date: NaiveDate,
        category: BalanceCategory,
        filter: &BalanceFilter,
    ) -> BalanceSnapshot {
        let breakdown = self
            .store
            .values_on(category, date)
            .filter(|(key, _)| filter.matches(key))
            .map(|(key, value)| (key.clone(), value))
            .collect();
        BalanceSnapshot::from_breakdown(breakdown)
    }

    /// Mean daily balance over the closed range `[start, end]`, for the total
    /// and for each key. Keys absent on some days count as zero on those days.
    pub fn get_average_balance(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        category: BalanceCategory,
        filter: &BalanceFilter,
    ) -> Result<BalanceSnapshot, LedgerError> {
        if start > end {
            return Err(LedgerError::InvalidDateRange { start, end });
        }

        let day_count = (end - start).num_days() + 1;
        let mut sums: BTreeMap<BalanceKey, f64> = BTreeMap::new();
        for day in start.iter_days().take_while(|d| *d <= end) {
            for (key, value) in self.get_spot_balance(day, category, filter).breakdown {
                *sums.entry(key).or_insert(0.0) += value;
            }
        }

        let averages = sums
            .into_iter()
            .map(|(key, sum)| (key, sum / day_count as f64))
            .collect();
        Ok(BalanceSnapshot::from_breakdown(averages))
    }

    /// [`Ledger::get_spot_balance`] with the category given by name.
    pub fn spot_balance_by_name(
        &self,
        date: NaiveDate,
        category: &str,
        filter: &BalanceFilter,
    ) -> Result<BalanceSnapshot, LedgerError> {
        Ok(self.get_spot_balance(date, category.parse()?, filter))
    }

    /// [`Ledger::get_average_balance`] with the category given by name.
    pub fn average_balance_by_name(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        category: &str,
        filter: &BalanceFilter,
    ) -> Result<BalanceSnapshot, LedgerError> {
        self.get_average_balance(start, end, category.parse()?, filter)
    }

    /// Revenue earned inside `[start, end]`: the balance at `end` less the
    /// balance on the day before `start`.
    pub fn revenue_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        filter: &BalanceFilter,
    ) -> Result<BalanceSnapshot, LedgerError> {
        if start > end {
            return Err(LedgerError::InvalidDateRange { start, end });
        }
        let mut earned = self
            .get_spot_balance(end, BalanceCategory::Revenue, filter)
            .breakdown;
        if let Some(before) = start.checked_sub_days(Days::new(1)) {
            let opening = self.get_spot_balance(before, BalanceCategory::Revenue, filter);
            for (key, value) in opening.breakdown {
                *earned.entry(key).or_insert(0.0) -= value;
            }
        }
        Ok(BalanceSnapshot::from_breakdown(earned))
    }

    /// Non-zero stock and option positions on `date`.
    pub fn positions(&self, date: NaiveDate, filter: &BalanceFilter) -> Positions {
        let shares = self.get_spot_balance(date, BalanceCategory::StockShares, filter);
        let stock_notional = self.get_spot_balance(date, BalanceCategory::StockNotional, filter);
        let contracts = self.get_spot_balance(date, BalanceCategory::OptionPositions, filter);
        let option_notional = self.get_spot_balance(date, BalanceCategory::OptionNotional, filter);

        let stocks = shares
            .breakdown
            .iter()
            .filter(|(_, qty)| qty.abs() > POSITION_EPSILON)
            .filter_map(|(key, qty)| match key {
                BalanceKey::Stock(stock) => Some(StockPosition {
                    key: stock.clone(),
                    shares: *qty,
                    notional: stock_notional.get(key),
                }),
                _ => None,
            })
            .collect();

        let options = contracts
            .breakdown
            .iter()
            .filter(|(_, qty)| qty.abs() > POSITION_EPSILON)
            .filter_map(|(key, qty)| match key {
                BalanceKey::Option(option) => Some(OptionPosition {
                    key: option.clone(),
                    contracts: *qty,
                    notional: option_notional.get(key),
                }),
                _ => None,
            })
            .collect();

        Positions { stocks, options }
    }

    /// Revenue over `[start, end]` and the average of stock plus option
    /// notional over the same days.
    pub fn return_on_notional(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        filter: &BalanceFilter,
    ) -> Result<NotionalReturn, LedgerError> {
        let revenue = self.revenue_between(start, end, filter)?.total;
        let average_notional = [BalanceCategory::StockNotional, BalanceCategory::OptionNotional]
            .into_iter()
            .map(|category| {
                self.get_average_balance(start, end, category, filter)
                    .map(|avg| avg.total)
            })
            .sum::<Result<f64, LedgerError>>()?;
        Ok(NotionalReturn {
            revenue,
            average_notional,
        })
    }

    /// Journal rows closing `quantity` of the position under `key` as it
    /// stands on `date`. `net` is the cash the close moves.
    pub fn closing_records(
        &self,
        key: &BalanceKey,
        date: NaiveDate,
        quantity: f64,
        net: f64,
        notes: &str,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        let filter = BalanceFilter::new()
            .account(key.account())
            .currency(key.currency());
        let open = self.positions(date, &filter);
        let not_open = || LedgerError::InvalidClose {
            reason: format!("no open position {key} on {date}"),
        };

        match key {
            BalanceKey::Stock(stock) => open
                .stocks
                .iter()
                .find(|p| &p.key == stock)
                .ok_or_else(not_open)?
                .closing_records(date, quantity, net, notes),
            BalanceKey::Option(option) => open
                .options
                .iter()
                .find(|p| &p.key == option)
                .ok_or_else(not_open)?
                .closing_record(date, quantity, net, notes)
                .map(|record| vec![record]),
            other => Err(LedgerError::InvalidClose {
                reason: format!("{other} is not a stock or option position"),
            }),
        }
    }

    /// Distinct accounts, currencies and tickers, recomputed only when the
    /// ledger has changed since the last call.
    pub fn dimensions(&self) -> Arc<Dimensions> {
        let mut cached = self
            .dimensions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some((generation, dims)) = cached.as_ref() {
            if *generation == self.generation {
                return Arc::clone(dims);
            }
        }
        let dims = Arc::new(self.compute_dimensions());
        *cached = Some((self.generation, Arc::clone(&dims)));
        dims
    }

    fn compute_dimensions(&self) -> Dimensions {
        let mut accounts = BTreeSet::new();
        let mut currencies = BTreeSet::new();
        for key in self.store.keys(BalanceCategory::CashBalances) {
            accounts.insert(key.account().to_string());
            currencies.insert(key.currency().to_string());
        }

        let tickers: BTreeSet<String> = [
            BalanceCategory::Revenue,
            BalanceCategory::OptionPositions,
            BalanceCategory::StockShares,
            BalanceCategory::StockNotional,
        ]
        .into_iter()
        .flat_map(|category| self.store.keys(category))
        .filter_map(|key| key.ticker())
        .map(str::to_string)
        .collect();

        Dimensions {
            accounts: accounts.into_iter().collect(),
            currencies: currencies.into_iter().collect(),
            tickers: tickers.into_iter().collect(),
        }
    }

    pub fn get_accounts(&self) -> Vec<String> {
        self.dimensions().accounts.clone()
    }

    pub fn get_currencies(&self) -> Vec<String> {
        self.dimensions().currencies.clone()
    }

    pub fn get_tickers(&self) -> Vec<String> {
        self.dimensions().tickers.clone()
    }

    pub fn get_loc_info(&self) -> LocState {
        self.loc
    }

    pub fn set_loc_info(&mut self, limit: f64, usage: f64) {
        self.loc = LocState::new(limit, usage);
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn first_transaction_date(&self) -> Option<NaiveDate> {
        self.first_transaction_date
    }

    pub fn last_refresh(&self) -> Option<NaiveDateTime> {
        self.last_refresh
    }

    /// Last date the balances are filled through.
    pub fn as_of(&self) -> Option<NaiveDate> {
        self.store.horizon()
    }

    /// Bumped on every accepted row.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
