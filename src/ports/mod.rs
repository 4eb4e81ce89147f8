//! Port traits (interfaces) for the hexagonal architecture.

pub mod clock_port;
pub mod config_port;
pub mod transaction_port;
