//! Builder for dynamic UPDATE statements
//!
//! Column names come only from fixed allow-lists; values are always bound as
//! parameters.

use crate::database::SqlValue;

/// Task columns an update may touch
pub const TASK_MUTABLE_FIELDS: &[&str] = &[
    "name",
    "project_id",
    "parent_id",
    "completed",
    "start_date",
    "due_date",
    "completion_date",
    "notes",
    "assignee",
    "level",
    "collapsed",
];

/// Project columns an update may touch
pub const PROJECT_MUTABLE_FIELDS: &[&str] = &["name", "color", "collapsed"];

/// Builder for `UPDATE <table> SET ... WHERE id = ?`
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    table: &'static str,
    allowed: &'static [&'static str],
    updates: Vec<(&'static str, SqlValue)>,
}

impl UpdateBuilder {
    /// Builder for the `tasks` table
    #[must_use]
    pub fn tasks() -> Self {
        Self {
            table: "tasks",
            allowed: TASK_MUTABLE_FIELDS,
            updates: Vec::new(),
        }
    }

    /// Builder for the `projects` table
    #[must_use]
    pub fn projects() -> Self {
        Self {
            table: "projects",
            allowed: PROJECT_MUTABLE_FIELDS,
            updates: Vec::new(),
        }
    }

    /// Set a column; columns outside the allow-list are ignored
    #[must_use]
    pub fn set(mut self, field: &str, value: impl Into<SqlValue>) -> Self {
        let allowed = self.allowed;
        if let Some(column) = allowed.iter().copied().find(|c| *c == field) {
            self.updates.retain(|(existing, _)| *existing != column);
            self.updates.push((column, value.into()));
        }
        self
    }

    /// Set a column only when a value is present
    #[must_use]
    pub fn set_opt<T: Into<SqlValue>>(self, field: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.set(field, value),
            None => self,
        }
    }

    /// Check if any fields have been set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Get the number of fields being updated
    #[must_use]
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// Get the field names being updated (for logging)
    #[must_use]
    pub fn fields(&self) -> Vec<&'static str> {
        self.updates.iter().map(|(column, _)| *column).collect()
    }

    /// Build the statement and its parameters
    ///
    /// `updated_at` is always refreshed; the id is the last parameter.
    #[must_use]
    pub fn build(&self, id: &str, updated_at: &str) -> (String, Vec<SqlValue>) {
        let mut assignments: Vec<String> = self
            .updates
            .iter()
            .map(|(column, _)| format!("{column} = ?"))
            .collect();
        assignments.push("updated_at = ?".to_string());

        let mut params: Vec<SqlValue> = self.updates.iter().map(|(_, v)| v.clone()).collect();
        params.push(updated_at.into());
        params.push(id.into());

        (
            format!(
                "UPDATE {} SET {} WHERE id = ?",
                self.table,
                assignments.join(", ")
            ),
            params,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_builder_still_touches_updated_at() {
        let builder = UpdateBuilder::tasks();
        assert!(builder.is_empty());

        let (sql, params) = builder.build("t1", "now");
        assert_eq!(sql, "UPDATE tasks SET updated_at = ? WHERE id = ?");
        assert_eq!(params, vec![SqlValue::from("now"), SqlValue::from("t1")]);
    }

    #[test]
    fn test_builds_in_insertion_order() {
        let builder = UpdateBuilder::tasks()
            .set("name", "Renamed")
            .set("completed", true)
            .set_opt("notes", None::<String>);

        assert_eq!(builder.len(), 2);
        assert_eq!(builder.fields(), vec!["name", "completed"]);

        let (sql, params) = builder.build("t1", "now");
        assert_eq!(
            sql,
            "UPDATE tasks SET name = ?, completed = ?, updated_at = ? WHERE id = ?"
        );
        assert_eq!(params.len(), 4);
        assert_eq!(params[1], SqlValue::Bool(true));
    }

    #[test]
    fn test_unknown_columns_are_ignored() {
        let builder = UpdateBuilder::projects()
            .set("id", "p-evil")
            .set("created_at", "never")
            .set("name; DROP TABLE projects", "x");
        assert!(builder.is_empty());
    }

    #[test]
    fn test_repeated_field_keeps_last_value() {
        let builder = UpdateBuilder::projects()
            .set("color", "#000000")
            .set("color", "#FFFFFF");
        let (_, params) = builder.build("p1", "now");
        assert_eq!(params[0], SqlValue::from("#FFFFFF"));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_null_values_are_bound() {
        let builder = UpdateBuilder::tasks().set("parent_id", None::<String>);
        let (sql, params) = builder.build("t1", "now");
        assert!(sql.contains("parent_id = ?"));
        assert_eq!(params[0], SqlValue::Null);
    }
}
