//! Project registry repository.

use crate::integrity::cascade::DeleteReport;
use crate::integrity::rules::EntityKind;
use crate::integrity::scope::{ensure_optional_reference, require_writable, Scope};
use crate::model::directory::CompanyId;
use crate::model::project::{Project, ProjectDraft, ProjectId};
use crate::model::status::StatusGroupId;
use crate::repo::{
    delete_scoped, ensure_connection_ready, push_uuid_filter, read_optional_uuid,
    read_timestamps, read_uuid, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const PROJECT_SELECT_SQL: &str = "SELECT
    uuid,
    reference_code,
    title,
    company_uuid,
    status_group_uuid,
    authority_uuid,
    created_at,
    updated_at
FROM projects";

/// Exact-match filters for project listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectListQuery {
    pub company_uuid: Option<CompanyId>,
    pub status_group_uuid: Option<StatusGroupId>,
}

pub trait ProjectRepository {
    fn create_project(&self, scope: &Scope, draft: &ProjectDraft) -> RepoResult<Project>;
    fn get_project(&self, scope: &Scope, id: ProjectId) -> RepoResult<Project>;
    fn list_projects(&self, scope: &Scope, query: &ProjectListQuery) -> RepoResult<Vec<Project>>;
    fn update_project(
        &self,
        scope: &Scope,
        id: ProjectId,
        draft: &ProjectDraft,
    ) -> RepoResult<Project>;
    /// Jobs of the project (and their tasks) are deleted with it.
    fn delete_project(&self, scope: &Scope, id: ProjectId) -> RepoResult<DeleteReport>;
}

pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn ensure_references(&self, scope: &Scope, draft: &ProjectDraft) -> RepoResult<()> {
        ensure_optional_reference(
            self.conn,
            scope,
            EntityKind::Project,
            EntityKind::Company,
            draft.company_uuid,
        )?;
        ensure_optional_reference(
            self.conn,
            scope,
            EntityKind::Project,
            EntityKind::StatusGroup,
            draft.status_group_uuid,
        )
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, scope: &Scope, draft: &ProjectDraft) -> RepoResult<Project> {
        draft.validate()?;
        require_writable(self.conn, scope)?;
        self.ensure_references(scope, draft)?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO projects (
                uuid,
                reference_code,
                title,
                company_uuid,
                status_group_uuid,
                authority_uuid
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                id.to_string(),
                draft.reference_code.as_str(),
                draft.title.as_str(),
                draft.company_uuid.map(|value| value.to_string()),
                draft.status_group_uuid.map(|value| value.to_string()),
                scope.authority_uuid().to_string(),
            ],
        )?;
        self.get_project(scope, id)
    }

    fn get_project(&self, scope: &Scope, id: ProjectId) -> RepoResult<Project> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL} WHERE uuid = ?1 AND authority_uuid = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), scope.authority_uuid().to_string()])?;
        match rows.next()? {
            Some(row) => parse_project_row(row),
            None => Err(RepoError::not_found(EntityKind::Project, id)),
        }
    }

    fn list_projects(&self, scope: &Scope, query: &ProjectListQuery) -> RepoResult<Vec<Project>> {
        let mut sql = format!("{PROJECT_SELECT_SQL} WHERE authority_uuid = ?");
        let mut bind_values = vec![Value::Text(scope.authority_uuid().to_string())];
        push_uuid_filter(&mut sql, &mut bind_values, "company_uuid", query.company_uuid);
        push_uuid_filter(
            &mut sql,
            &mut bind_values,
            "status_group_uuid",
            query.status_group_uuid,
        );
        sql.push_str(" ORDER BY reference_code ASC, rowid ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn update_project(
        &self,
        scope: &Scope,
        id: ProjectId,
        draft: &ProjectDraft,
    ) -> RepoResult<Project> {
        draft.validate()?;
        require_writable(self.conn, scope)?;
        self.get_project(scope, id)?;
        self.ensure_references(scope, draft)?;

        self.conn.execute(
            "UPDATE projects
             SET
                reference_code = ?3,
                title = ?4,
                company_uuid = ?5,
                status_group_uuid = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND authority_uuid = ?2;",
            params![
                id.to_string(),
                scope.authority_uuid().to_string(),
                draft.reference_code.as_str(),
                draft.title.as_str(),
                draft.company_uuid.map(|value| value.to_string()),
                draft.status_group_uuid.map(|value| value.to_string()),
            ],
        )?;
        self.get_project(scope, id)
    }

    fn delete_project(&self, scope: &Scope, id: ProjectId) -> RepoResult<DeleteReport> {
        delete_scoped(self.conn, scope, EntityKind::Project, id)
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    Ok(Project {
        uuid: read_uuid(row, "uuid")?,
        reference_code: row.get("reference_code")?,
        title: row.get("title")?,
        company_uuid: read_optional_uuid(row, "company_uuid")?,
        status_group_uuid: read_optional_uuid(row, "status_group_uuid")?,
        authority_uuid: read_uuid(row, "authority_uuid")?,
        timestamps: read_timestamps(row)?,
    })
}
