//! Batch mutations over sets of tasks

use crate::{
    database::{core::placeholders, date_utils::now_iso, execute_on, SqlValue, TaskTreeDatabase},
    error::{Result as TaskTreeResult, TaskTreeError},
    models::{BatchOperation, BatchResult},
    observability::OperationTimer,
};
use std::collections::HashSet;
use tracing::{info, instrument};

/// Trim ids, drop blanks and duplicates, keep first-seen order
fn dedupe_ids(task_ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    task_ids
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .map(str::to_string)
        .collect()
}

impl TaskTreeDatabase {
    /// Apply `complete`, `incomplete` or `delete` to a set of tasks
    ///
    /// `complete` and `incomplete` also apply to the direct children of the
    /// listed tasks; grandchildren are left alone. `delete` removes the listed
    /// tasks and, through the foreign key cascade, everything beneath them.
    /// All statements run in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown operation or an empty id
    /// list (before the database is touched), or a database error, in which
    /// case nothing is changed
    #[instrument(skip(self, task_ids), fields(count = task_ids.len()))]
    pub async fn apply_batch(
        &self,
        operation: &str,
        task_ids: &[String],
    ) -> TaskTreeResult<BatchResult> {
        let parsed = operation.parse::<BatchOperation>();
        let label = match &parsed {
            Ok(op) => format!("batch_{op}"),
            Err(_) => "batch_invalid".to_string(),
        };
        let timer = OperationTimer::start(self.recorder.as_ref(), label);
        let result = match parsed {
            Ok(op) => self.run_batch(op, task_ids).await,
            Err(e) => Err(e),
        };
        timer.finish(result, |r| r.affected_count)
    }

    async fn run_batch(
        &self,
        operation: BatchOperation,
        task_ids: &[String],
    ) -> TaskTreeResult<BatchResult> {
        let ids = dedupe_ids(task_ids);
        if ids.is_empty() {
            return Err(TaskTreeError::validation("task_ids must not be empty"));
        }

        let in_list = placeholders(ids.len());
        let id_params: Vec<SqlValue> = ids.iter().map(SqlValue::from).collect();
        let mut tx = self.begin().await?;

        let affected_count = match operation {
            BatchOperation::Delete => {
                execute_on(
                    &mut *tx,
                    &format!("DELETE FROM tasks WHERE id IN ({in_list})"),
                    &id_params,
                )
                .await?
            }
            BatchOperation::Complete | BatchOperation::Incomplete => {
                let now = now_iso();
                let (set_clause, mut leading) = if operation == BatchOperation::Complete {
                    (
                        "completed = 1, completion_date = ?, updated_at = ?",
                        vec![SqlValue::from(&now), SqlValue::from(&now)],
                    )
                } else {
                    (
                        "completed = 0, completion_date = NULL, updated_at = ?",
                        vec![SqlValue::from(&now)],
                    )
                };
                leading.extend(id_params.iter().cloned());
                let listed = execute_on(
                    &mut *tx,
                    &format!("UPDATE tasks SET {set_clause} WHERE id IN ({in_list})"),
                    &leading,
                )
                .await?;

                // Children of the listed tasks, excluding ones already counted
                leading.extend(id_params.iter().cloned());
                let children = execute_on(
                    &mut *tx,
                    &format!(
                        "UPDATE tasks SET {set_clause} \
                         WHERE parent_id IN ({in_list}) AND id NOT IN ({in_list})"
                    ),
                    &leading,
                )
                .await?;
                listed + children
            }
        };

        tx.commit().await?;
        info!(
            operation = %operation,
            affected_count,
            "Batch operation completed"
        );

        Ok(BatchResult {
            success: true,
            operation: operation.as_str().to_string(),
            affected_count,
            task_ids: ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::dedupe_ids;

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let ids = vec![
            " t2 ".to_string(),
            "t1".to_string(),
            String::new(),
            "t2".to_string(),
            "  ".to_string(),
        ];
        assert_eq!(dedupe_ids(&ids), vec!["t2", "t1"]);
    }
}
