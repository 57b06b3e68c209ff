// ============================================================================
// Transaction Management Module
// ============================================================================
//
// Connection-scoped transactions for the in-memory record store, backed by
// an undo log of reversible row changes.
//
// ============================================================================

pub mod change;
pub mod state;

pub use change::Change;
pub use state::{Transaction, TransactionId, TransactionState};
