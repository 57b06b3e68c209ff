// ============================================================================
// Transaction Change Tracking
// ============================================================================
//
// Each Change records enough of a row write to reverse it on rollback.
//
// ============================================================================

use crate::core::Record;

#[derive(Debug, Clone)]
pub enum Change {
    InsertRow { table: String, row_id: i64 },

    UpdateRow {
        table: String,
        row_id: i64,
        old_row: Record,
    },

    DeleteRow {
        table: String,
        row_id: i64,
        old_row: Record,
    },
}

impl Change {
    pub fn table_name(&self) -> &str {
        match self {
            Change::InsertRow { table, .. } => table,
            Change::UpdateRow { table, .. } => table,
            Change::DeleteRow { table, .. } => table,
        }
    }

    pub fn row_id(&self) -> i64 {
        match self {
            Change::InsertRow { row_id, .. }
            | Change::UpdateRow { row_id, .. }
            | Change::DeleteRow { row_id, .. } => *row_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_accessors() {
        let change = Change::UpdateRow {
            table: "users".to_string(),
            row_id: 3,
            old_row: Record::new(),
        };
        assert_eq!(change.table_name(), "users");
        assert_eq!(change.row_id(), 3);
    }
}
