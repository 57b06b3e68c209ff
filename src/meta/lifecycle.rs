// ============================================================================
// Save / delete coordination across the primary row and the side table
// ============================================================================
//
// Idle ─> PrimarySaving ─> MetaFlushing ─> Committed
//              │                 │
//              └───────┬─────────┘
//                      v
//                 RolledBack
//
// The post-save queue flush runs after commit, outside any transaction, and
// never fails the save. The delete purge likewise runs after the primary
// delete and is not atomic with it.
//
// ============================================================================

use super::cache::MetaValues;
use super::entity::MetaEntity;
use super::record::PrimaryRecord;
use crate::core::{MetaError, Result};
use crate::transaction::TransactionId;
use log::{debug, warn};
use tracing::Instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStage {
    Idle,
    PrimarySaving,
    MetaFlushing,
    Committed,
    RolledBack,
}

/// Outcome of the post-save queue flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Queued updates written to the side table
    pub flushed: usize,
    /// Queued updates whose write failed and were dropped
    pub dropped: Vec<String>,
}

impl<R: PrimaryRecord> MetaEntity<R> {
    /// Saves the primary record and its meta attributes.
    ///
    /// In write-through mode an existing record only saves its primary row
    /// here; otherwise the primary row and every cached meta value are
    /// written in one transaction. Either way the update queue is flushed
    /// afterwards.
    pub async fn save(&mut self) -> Result<SaveReport> {
        let span = tracing::info_span!(
            "meta_save",
            table = %self.model.table_name(),
            key = ?self.record.primary_key()
        );
        async move {
            self.stage = SaveStage::Idle;
            if self.model.config().write_through && !self.record.is_new_record() {
                self.save_primary_only().await?;
            } else {
                self.save_in_transaction().await?;
            }
            Ok(self.flush_update_queue().await)
        }
        .instrument(span)
        .await
    }

    /// Deletes the primary record, then purges its meta rows when the model
    /// has auto-delete enabled.
    ///
    /// Returns `Ok(false)` when the primary record refused the delete.
    pub async fn delete(&mut self) -> Result<bool> {
        let key = self.record.primary_key();
        if !self.record.delete(self.store.as_ref()).await? {
            return Ok(false);
        }

        if self.model.config().auto_delete
            && let Some(key) = key
        {
            let purged = self.side_table.purge(self.store.as_ref(), key).await?;
            debug!(
                "Purged {} meta row(s) of '{}' #{}",
                purged,
                self.model.table_name(),
                key
            );
        }
        self.cache.reset();
        Ok(true)
    }

    async fn save_primary_only(&mut self) -> Result<()> {
        self.stage = SaveStage::PrimarySaving;
        match self.save_primary().await {
            Ok(()) => {
                self.stage = SaveStage::Committed;
                Ok(())
            }
            Err(err) => {
                self.stage = SaveStage::RolledBack;
                self.cache.clear_queue();
                Err(err)
            }
        }
    }

    async fn save_in_transaction(&mut self) -> Result<()> {
        let record_before = self.record.clone();
        let persisted_before = self.cache.persisted_snapshot();

        let transaction_id = self.store.begin_transaction().await?;
        match self.run_transactional_phase().await {
            Ok(()) => match self.store.commit(transaction_id).await {
                Ok(()) => {
                    self.stage = SaveStage::Committed;
                    Ok(())
                }
                Err(err) => {
                    self.abort(transaction_id, record_before, persisted_before)
                        .await;
                    Err(err)
                }
            },
            Err(err) => {
                self.abort(transaction_id, record_before, persisted_before)
                    .await;
                Err(err)
            }
        }
    }

    async fn run_transactional_phase(&mut self) -> Result<()> {
        self.stage = SaveStage::PrimarySaving;
        self.save_primary().await?;

        self.stage = SaveStage::MetaFlushing;
        for (name, value) in self.cache.entries() {
            self.save_meta_attribute(&name, value)
                .await
                .map_err(|err| MetaError::meta_write_failed(&name, err))?;
        }
        Ok(())
    }

    async fn save_primary(&mut self) -> Result<()> {
        let table = self.model.table_name().to_string();
        let saved = self
            .record
            .save(self.store.as_ref())
            .await
            .map_err(|err| MetaError::primary_save_failed(&table, err))?;
        if !saved {
            return Err(MetaError::primary_save_failed(
                &table,
                MetaError::ExecutionError("record rejected the save".to_string()),
            ));
        }
        if self.record.primary_key().is_none() {
            return Err(MetaError::primary_save_failed(
                &table,
                MetaError::ExecutionError("no primary key after save".to_string()),
            ));
        }
        Ok(())
    }

    /// Failure edge: purge this record's meta rows, roll back, and restore the
    /// in-memory state the rollback invalidated. Errors here are only logged.
    async fn abort(
        &mut self,
        transaction_id: TransactionId,
        record_before: R,
        persisted_before: Option<MetaValues>,
    ) {
        if let Some(key) = self.record.primary_key()
            && let Err(err) = self.side_table.purge(self.store.as_ref(), key).await
        {
            warn!(
                "Meta cleanup for '{}' #{} failed: {}",
                self.model.table_name(),
                key,
                err
            );
        }
        if let Err(err) = self.store.rollback(transaction_id).await {
            warn!(
                "Rollback of {} for '{}' failed: {}",
                transaction_id,
                self.model.table_name(),
                err
            );
        }

        self.record = record_before;
        self.cache.restore_persisted(persisted_before);
        self.cache.clear_queue();
        self.stage = SaveStage::RolledBack;
    }

    async fn flush_update_queue(&mut self) -> SaveReport {
        let mut report = SaveReport::default();
        for (name, value) in self.cache.take_queue() {
            match self.save_meta_attribute(&name, value).await {
                Ok(()) => report.flushed += 1,
                Err(err) => {
                    warn!("{}", MetaError::meta_flush_failed(&name, err));
                    report.dropped.push(name);
                }
            }
        }
        report
    }
}
