//! Core ledger types and logic.

pub mod amount;
pub mod balance_store;
pub mod category;
pub mod classifier;
pub mod closing;
pub mod error;
pub mod filter;
pub mod ledger;
pub mod provider;
pub mod transaction;
