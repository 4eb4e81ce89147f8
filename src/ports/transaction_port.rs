//! Transaction journal ports.

use crate::domain::error::LedgerError;
use crate::domain::transaction::TransactionRecord;

/// Supplies the full journal, in row order.
pub trait TransactionSource {
    fn load_records(&self) -> Result<Vec<TransactionRecord>, LedgerError>;
}

/// Persists a newly confirmed transaction at the end of the journal.
pub trait TransactionJournal {
    fn append_record(&self, record: &TransactionRecord) -> Result<(), LedgerError>;
}
