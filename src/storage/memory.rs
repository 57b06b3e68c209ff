use super::{MemTable, Predicate, RecordStore};
use crate::core::{MetaError, Record, Result, TableSchema};
use crate::transaction::{Change, Transaction, TransactionId};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct StoreState {
    tables: HashMap<String, MemTable>,
    transaction: Option<Transaction>,
}

impl StoreState {
    fn table(&self, name: &str) -> Result<&MemTable> {
        self.tables
            .get(name)
            .ok_or_else(|| MetaError::TableNotFound(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut MemTable> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| MetaError::TableNotFound(name.to_string()))
    }

    fn record(&mut self, change: Change) -> Result<()> {
        match self.transaction.as_mut() {
            Some(txn) => txn.record_change(change),
            None => Ok(()),
        }
    }

    fn check_transaction(&self, transaction_id: TransactionId) -> Result<()> {
        match &self.transaction {
            Some(txn) if txn.id() == transaction_id => Ok(()),
            Some(txn) => Err(MetaError::TransactionError(format!(
                "{} is not the open transaction ({})",
                transaction_id,
                txn.id()
            ))),
            None => Err(MetaError::TransactionError("No active transaction".into())),
        }
    }

    fn undo(&mut self, change: Change) {
        let Some(table) = self.tables.get_mut(change.table_name()) else {
            return;
        };
        match change {
            Change::InsertRow { row_id, .. } => {
                table.delete(row_id);
            }
            Change::UpdateRow { row_id, old_row, .. } | Change::DeleteRow { row_id, old_row, .. } => {
                table.restore(row_id, old_row);
            }
        }
    }
}

/// In-process [`RecordStore`] with unique indexes and undo-log transactions.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn in_transaction(&self) -> bool {
        self.state.lock().await.transaction.is_some()
    }

    pub async fn row_count(&self, table: &str) -> Result<usize> {
        let state = self.state.lock().await;
        Ok(state.table(table)?.row_count())
    }

    pub async fn table_names(&self) -> Vec<String> {
        let state = self.state.lock().await;
        let mut names: Vec<String> = state.tables.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn begin_transaction(&self) -> Result<TransactionId> {
        let mut state = self.state.lock().await;
        if let Some(txn) = &state.transaction {
            return Err(MetaError::TransactionError(format!(
                "Transaction {} already active",
                txn.id()
            )));
        }
        let txn = Transaction::new(TransactionId::new());
        let id = txn.id();
        state.transaction = Some(txn);
        Ok(id)
    }

    async fn commit(&self, transaction_id: TransactionId) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check_transaction(transaction_id)?;
        if let Some(mut txn) = state.transaction.take() {
            txn.commit()?;
        }
        Ok(())
    }

    async fn rollback(&self, transaction_id: TransactionId) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check_transaction(transaction_id)?;
        if let Some(mut txn) = state.transaction.take() {
            for change in txn.rollback()? {
                state.undo(change);
            }
        }
        Ok(())
    }

    async fn insert(&self, table: &str, record: Record) -> Result<i64> {
        let mut state = self.state.lock().await;
        let (row_id, key) = state.table_mut(table)?.insert(&record)?;
        state.record(Change::InsertRow {
            table: table.to_string(),
            row_id,
        })?;
        Ok(key)
    }

    async fn update(&self, table: &str, values: Record, predicate: &Predicate) -> Result<usize> {
        let mut state = self.state.lock().await;
        let mem_table = state.table_mut(table)?;
        let ids = mem_table.matching_ids(predicate)?;

        let mut applied = Vec::with_capacity(ids.len());
        for row_id in ids {
            match mem_table.update(row_id, &values) {
                Ok(old_row) => applied.push((row_id, old_row)),
                Err(err) => {
                    // a statement is all-or-nothing
                    for (row_id, old_row) in applied.into_iter().rev() {
                        mem_table.restore(row_id, old_row);
                    }
                    return Err(err);
                }
            }
        }

        let count = applied.len();
        for (row_id, old_row) in applied {
            state.record(Change::UpdateRow {
                table: table.to_string(),
                row_id,
                old_row,
            })?;
        }
        Ok(count)
    }

    async fn delete(&self, table: &str, predicate: &Predicate) -> Result<usize> {
        let mut state = self.state.lock().await;
        let mem_table = state.table_mut(table)?;
        let ids = mem_table.matching_ids(predicate)?;

        let removed: Vec<(i64, Record)> = ids
            .into_iter()
            .filter_map(|row_id| mem_table.delete(row_id).map(|row| (row_id, row)))
            .collect();

        let count = removed.len();
        for (row_id, old_row) in removed {
            state.record(Change::DeleteRow {
                table: table.to_string(),
                row_id,
                old_row,
            })?;
        }
        Ok(count)
    }

    async fn select(&self, table: &str, predicate: &Predicate) -> Result<Vec<Record>> {
        let state = self.state.lock().await;
        state.table(table)?.scan(predicate)
    }

    async fn table_schema(&self, name: &str) -> Result<Option<TableSchema>> {
        let state = self.state.lock().await;
        Ok(state.tables.get(name).map(|t| t.schema().clone()))
    }

    async fn create_table(&self, schema: TableSchema) -> Result<()> {
        let mut state = self.state.lock().await;
        let name = schema.name().to_string();
        if state.tables.contains_key(&name) {
            return Err(MetaError::TableExists(name));
        }
        for index in &schema.indexes {
            for column in &index.columns {
                if schema.get_column(column).is_none() {
                    return Err(MetaError::ColumnNotFound(column.clone(), name));
                }
            }
        }
        state.tables.insert(name, MemTable::new(schema));
        Ok(())
    }
}
