//! Delete rule table.
//!
//! Every foreign key in the schema has exactly one row here. The cascade
//! engine consults this table instead of schema-level ON DELETE actions.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Every persisted table, including many-to-many link tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Authority,
    User,
    Address,
    Client,
    EmailAddress,
    Company,
    CompanyAddress,
    CompanyClient,
    StatusGroup,
    Status,
    Project,
    Staff,
    Todo,
    Job,
    Task,
    WorkDay,
    ScheduledTodo,
}

impl EntityKind {
    pub fn table(self) -> &'static str {
        match self {
            Self::Authority => "authorities",
            Self::User => "users",
            Self::Address => "addresses",
            Self::Client => "clients",
            Self::EmailAddress => "email_addresses",
            Self::Company => "companies",
            Self::CompanyAddress => "company_addresses",
            Self::CompanyClient => "company_clients",
            Self::StatusGroup => "status_groups",
            Self::Status => "statuses",
            Self::Project => "projects",
            Self::Staff => "staff",
            Self::Todo => "todos",
            Self::Job => "jobs",
            Self::Task => "tasks",
            Self::WorkDay => "work_days",
            Self::ScheduledTodo => "scheduled_todos",
        }
    }

    /// Single-column primary key, `None` for composite-key link tables.
    pub fn primary_key(self) -> Option<&'static str> {
        match self {
            Self::CompanyAddress | Self::CompanyClient => None,
            Self::Staff => Some("user_uuid"),
            Self::Job | Self::Task | Self::ScheduledTodo => Some("todo_uuid"),
            _ => Some("uuid"),
        }
    }

    /// Whether rows carry an `authority_uuid` column.
    pub fn is_scoped(self) -> bool {
        !matches!(
            self,
            Self::Authority | Self::User | Self::CompanyAddress | Self::CompanyClient
        )
    }

    /// Whether rows carry `created_at`/`updated_at` columns.
    pub fn has_timestamps(self) -> bool {
        !matches!(
            self,
            Self::Authority
                | Self::CompanyAddress
                | Self::CompanyClient
                | Self::Job
                | Self::Task
                | Self::ScheduledTodo
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authority => "authority",
            Self::User => "user",
            Self::Address => "address",
            Self::Client => "client",
            Self::EmailAddress => "email_address",
            Self::Company => "company",
            Self::CompanyAddress => "company_address",
            Self::CompanyClient => "company_client",
            Self::StatusGroup => "status_group",
            Self::Status => "status",
            Self::Project => "project",
            Self::Staff => "staff",
            Self::Todo => "todo",
            Self::Job => "job",
            Self::Task => "task",
            Self::WorkDay => "work_day",
            Self::ScheduledTodo => "scheduled_todo",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action applied to dependents when the parent row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Delete dependents (and, transitively, their dependents).
    Cascade,
    /// Clear the referencing column.
    Nullify,
    /// Refuse the delete while dependents exist.
    Restrict,
}

/// `dependent.column` references `parent`'s primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteRule {
    pub parent: EntityKind,
    pub dependent: EntityKind,
    pub column: &'static str,
    pub action: OnDelete,
}

const fn rule(
    parent: EntityKind,
    dependent: EntityKind,
    column: &'static str,
    action: OnDelete,
) -> DeleteRule {
    DeleteRule {
        parent,
        dependent,
        column,
        action,
    }
}

use EntityKind::*;
use OnDelete::*;

/// The ledger's delete rules.
pub const DELETE_RULES: &[DeleteRule] = &[
    rule(Authority, Address, "authority_uuid", Cascade),
    rule(Authority, Client, "authority_uuid", Cascade),
    rule(Authority, EmailAddress, "authority_uuid", Cascade),
    rule(Authority, Company, "authority_uuid", Cascade),
    rule(Authority, StatusGroup, "authority_uuid", Cascade),
    rule(Authority, Status, "authority_uuid", Cascade),
    rule(Authority, Project, "authority_uuid", Cascade),
    rule(Authority, Staff, "authority_uuid", Cascade),
    rule(Authority, Todo, "authority_uuid", Cascade),
    rule(Authority, Job, "authority_uuid", Cascade),
    rule(Authority, Task, "authority_uuid", Cascade),
    rule(Authority, WorkDay, "authority_uuid", Cascade),
    rule(Authority, ScheduledTodo, "authority_uuid", Cascade),
    rule(User, Staff, "user_uuid", Cascade),
    rule(Address, CompanyAddress, "address_uuid", Cascade),
    rule(Client, EmailAddress, "client_uuid", Nullify),
    rule(Client, CompanyClient, "client_uuid", Cascade),
    rule(Company, CompanyAddress, "company_uuid", Cascade),
    rule(Company, CompanyClient, "company_uuid", Cascade),
    rule(Company, Project, "company_uuid", Nullify),
    rule(StatusGroup, Status, "status_group_uuid", Cascade),
    rule(StatusGroup, Project, "status_group_uuid", Nullify),
    rule(Status, Todo, "status_uuid", Nullify),
    rule(Project, Job, "project_uuid", Cascade),
    rule(Staff, Todo, "assigned_to", Nullify),
    rule(Staff, WorkDay, "staff_uuid", Cascade),
    rule(Todo, Job, "todo_uuid", Cascade),
    rule(Todo, Task, "todo_uuid", Cascade),
    rule(Todo, ScheduledTodo, "todo_uuid", Cascade),
    rule(Job, Task, "job_uuid", Cascade),
    rule(WorkDay, ScheduledTodo, "work_day_uuid", Cascade),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_db_in_memory;
    use std::collections::HashSet;

    fn foreign_keys(conn: &rusqlite::Connection, table: &str) -> Vec<(String, String)> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA foreign_key_list({table});"))
            .unwrap();
        let mut rows = stmt.query([]).unwrap();
        let mut keys = Vec::new();
        while let Some(row) = rows.next().unwrap() {
            let parent_table: String = row.get(2).unwrap();
            let column: String = row.get(3).unwrap();
            keys.push((parent_table, column));
        }
        keys
    }

    #[test]
    fn every_schema_foreign_key_has_exactly_one_rule() {
        let conn = open_db_in_memory().unwrap();
        let kinds = [
            Authority, User, Address, Client, EmailAddress, Company, CompanyAddress,
            CompanyClient, StatusGroup, Status, Project, Staff, Todo, Job, Task, WorkDay,
            ScheduledTodo,
        ];

        let mut schema_edges = HashSet::new();
        for dependent in kinds {
            for (parent_table, column) in foreign_keys(&conn, dependent.table()) {
                let parent = kinds
                    .into_iter()
                    .find(|kind| kind.table() == parent_table)
                    .unwrap();
                schema_edges.insert((parent, dependent, column));
            }
        }

        let rule_edges: HashSet<_> = DELETE_RULES
            .iter()
            .map(|rule| (rule.parent, rule.dependent, rule.column.to_string()))
            .collect();
        assert_eq!(rule_edges.len(), DELETE_RULES.len());
        assert_eq!(schema_edges, rule_edges);
    }

    #[test]
    fn nullify_rules_only_target_nullable_columns() {
        let conn = open_db_in_memory().unwrap();
        for rule in DELETE_RULES.iter().filter(|rule| rule.action == Nullify) {
            let mut stmt = conn
                .prepare(&format!("PRAGMA table_info({});", rule.dependent.table()))
                .unwrap();
            let mut rows = stmt.query([]).unwrap();
            let mut not_null = None;
            while let Some(row) = rows.next().unwrap() {
                let name: String = row.get(1).unwrap();
                if name == rule.column {
                    not_null = Some(row.get::<_, i64>(3).unwrap() == 1);
                }
            }
            assert_eq!(not_null, Some(false), "{}.{}", rule.dependent, rule.column);
        }
    }
}
