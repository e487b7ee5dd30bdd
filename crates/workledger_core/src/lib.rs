//! Core data-access layer for WorkLedger.
//!
//! Tenant-scoped records for clients, companies, projects, staff, work
//! items and schedules, with the delete/reference integrity rules that
//! keep one authority's tree consistent. HTTP and auth layers call in
//! through the repository traits and services exported here.

pub mod db;
pub mod integrity;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use integrity::cascade::{delete_entity, delete_with_rules, DeleteReport};
pub use integrity::rules::{DeleteRule, EntityKind, OnDelete, DELETE_RULES};
pub use integrity::scope::Scope;
pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use model::authority::{Authority, AuthorityId};
pub use model::validation::ValidationError;
pub use repo::authority_repo::{AuthorityRepository, SqliteAuthorityRepository};
pub use repo::directory_repo::{
    DirectoryRepository, EmailAddressListQuery, SqliteDirectoryRepository,
};
pub use repo::project_repo::{ProjectListQuery, ProjectRepository, SqliteProjectRepository};
pub use repo::schedule_repo::{
    ScheduleRepository, ScheduledTodoListQuery, SqliteScheduleRepository, WorkDayListQuery,
};
pub use repo::staff_repo::{
    SqliteStaffRepository, SqliteUserRepository, StaffRepository, UserRepository,
};
pub use repo::status_repo::{SqliteStatusRepository, StatusListQuery, StatusRepository};
pub use repo::work_repo::{
    JobListQuery, SqliteWorkRepository, TaskListQuery, TodoListQuery, WorkRepository,
};
pub use repo::{RepoError, RepoResult};
pub use service::authority_service::AuthorityService;
pub use service::schedule_service::ScheduleService;
pub use service::work_service::WorkService;

/// Minimal health-check API for integration smoke tests.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
