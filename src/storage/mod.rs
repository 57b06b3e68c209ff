pub mod memory;
pub mod predicate;
pub mod table;

pub use memory::MemoryStore;
pub use predicate::Predicate;
pub use table::MemTable;

use crate::core::{Record, Result, TableSchema};
use crate::transaction::TransactionId;
use async_trait::async_trait;

/// The relational capability the meta layer is built on.
///
/// Transactions are connection-scoped: statements issued between
/// `begin_transaction` and `commit`/`rollback` on the same handle belong to
/// that transaction. Table creation is not part of any transaction.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Starts a transaction on this handle.
    async fn begin_transaction(&self) -> Result<TransactionId>;
    /// Commits the open transaction.
    async fn commit(&self, transaction_id: TransactionId) -> Result<()>;
    /// Discards every write made since `begin_transaction`.
    async fn rollback(&self, transaction_id: TransactionId) -> Result<()>;

    /// Inserts one row and returns the generated primary key (0 if none).
    async fn insert(&self, table: &str, record: Record) -> Result<i64>;
    /// Applies `values` to every row matching `predicate`; returns the count.
    async fn update(&self, table: &str, values: Record, predicate: &Predicate) -> Result<usize>;
    /// Deletes every row matching `predicate`; returns the count.
    async fn delete(&self, table: &str, predicate: &Predicate) -> Result<usize>;
    async fn select(&self, table: &str, predicate: &Predicate) -> Result<Vec<Record>>;

    /// Schema lookup; `None` when the table does not exist.
    async fn table_schema(&self, name: &str) -> Result<Option<TableSchema>>;
    async fn create_table(&self, schema: TableSchema) -> Result<()>;

    async fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.table_schema(name).await?.is_some())
    }
}
