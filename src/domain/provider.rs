//! Shared access to the current ledger.
//!
//! Readers share the lock; `append` and LOC updates take it
//! exclusively, so no reader sees a half-applied row. `refresh` rebuilds a
//! fresh ledger from the journal without holding the lock and swaps it in
//! at the end. When refreshes overlap, the one started last wins and any
//! older result that finishes afterwards is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::error::{LedgerError, RowRejection};
use crate::domain::ledger::{IngestReport, Ledger, LocState};
use crate::domain::transaction::{Transaction, TransactionRecord};
use crate::ports::clock_port::Clock;
use crate::ports::transaction_port::TransactionSource;

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Published(IngestReport),
    /// A newer refresh had already been published.
    Superseded,
}

#[derive(Debug)]
pub struct LedgerProvider {
    current: RwLock<Ledger>,
    clock: Arc<dyn Clock>,
    next_ticket: AtomicU64,
    published_ticket: AtomicU64,
}

impl LedgerProvider {
    pub fn new(ledger: Ledger, clock: Arc<dyn Clock>) -> Self {
        Self {
            current: RwLock::new(ledger),
            clock,
            next_ticket: AtomicU64::new(0),
            published_ticket: AtomicU64::new(0),
        }
    }

    /// Build the initial ledger from `source`.
    pub fn open(
        source: &dyn TransactionSource,
        loc: LocState,
        clock: Arc<dyn Clock>,
    ) -> Result<(Self, IngestReport), LedgerError> {
        let records = source.load_records()?;
        let (ledger, report) = Ledger::from_records(&records, loc, Arc::clone(&clock));
        Ok((Self::new(ledger, clock), report))
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, Ledger> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Ledger> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a query against the current ledger.
    pub fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&self.read_guard())
    }

    pub fn append(&self, record: &TransactionRecord) -> Result<Transaction, RowRejection> {
        self.write_guard().append(record).cloned()
    }

    pub fn loc_info(&self) -> LocState {
        self.read_guard().get_loc_info()
    }

    /// Replace both LOC fields under one exclusive lock.
    pub fn set_loc_info(&self, limit: f64, usage: f64) {
        self.write_guard().set_loc_info(limit, usage);
    }

    /// Rebuild the ledger from `source` and publish it. The LOC state of the
    /// ledger being replaced carries over.
    pub fn refresh(&self, source: &dyn TransactionSource) -> Result<RefreshOutcome, LedgerError> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let records = source.load_records()?;
        let (mut fresh, report) =
            Ledger::from_records(&records, LocState::default(), Arc::clone(&self.clock));

        let mut current = self.write_guard();
        if ticket < self.published_ticket.load(Ordering::SeqCst) {
            log::info!("discarding refresh {ticket}, a newer ledger is already published");
            return Ok(RefreshOutcome::Superseded);
        }
        let loc = current.get_loc_info();
        fresh.set_loc_info(loc.limit, loc.usage);
        *current = fresh;
        self.published_ticket.store(ticket, Ordering::SeqCst);
        log::info!(
            "refresh {ticket} published: {} transactions, {} rejected",
            report.applied,
            report.rejected.len()
        );
        Ok(RefreshOutcome::Published(report))
    }
}
