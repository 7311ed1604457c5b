// Ledger arithmetic
pub mod amount;

// Counterparty management
pub mod counterparties;

// Ledger writes
pub mod payments;
pub mod transactions;

// Ledger reads
pub mod hisab;
pub mod summary;

// External services
pub mod gstin;
