mod common;

use common::{day, fixture, staff_member, tenant, today};
use workledger_core::model::directory::{ClientDraft, CompanyDraft};
use workledger_core::model::project::ProjectDraft;
use workledger_core::model::work::TodoDraft;
use workledger_core::{
    AuthorityRepository, AuthorityService, DirectoryRepository, EntityKind, ProjectRepository,
    RepoError, Scope, SqliteAuthorityRepository, SqliteDirectoryRepository,
    SqliteProjectRepository, SqliteWorkRepository, ValidationError, WorkService,
};

#[test]
fn register_get_and_list_authorities() {
    let conn = fixture();
    let service = AuthorityService::new(SqliteAuthorityRepository::try_new(&conn).unwrap());

    let first = service.register(day(2027, 6, 30), true).unwrap();
    let second = service.register(day(2026, 1, 1), false).unwrap();

    assert_eq!(service.get(first.uuid).unwrap(), first);
    assert!(!second.is_active);

    let listed = service.list().unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.contains(&first));
    assert!(listed.contains(&second));
}

#[test]
fn validity_includes_expiry_day() {
    let conn = fixture();
    let service = AuthorityService::new(SqliteAuthorityRepository::try_new(&conn).unwrap());
    let authority = service.register(day(2026, 3, 15), true).unwrap();

    assert!(service.is_valid(authority.uuid, day(2026, 3, 15)).unwrap());
    assert!(!service.is_valid(authority.uuid, day(2026, 3, 16)).unwrap());
}

#[test]
fn inactive_authority_rejects_writes_but_allows_reads() {
    let conn = fixture();
    let scope = tenant(&conn);
    let directory = SqliteDirectoryRepository::try_new(&conn).unwrap();
    let client = directory
        .create_client(&scope, &ClientDraft::new("Acme Corp"))
        .unwrap();

    let service = AuthorityService::new(SqliteAuthorityRepository::try_new(&conn).unwrap());
    service.deactivate(scope.authority_uuid()).unwrap();

    let err = directory
        .create_client(&scope, &ClientDraft::new("Other"))
        .unwrap_err();
    match err {
        RepoError::Validation(ValidationError::AuthorityNotValid(id)) => {
            assert_eq!(id, scope.authority_uuid());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        directory.delete_client(&scope, client.uuid),
        Err(RepoError::Validation(ValidationError::AuthorityNotValid(_)))
    ));
    assert_eq!(directory.get_client(&scope, client.uuid).unwrap(), client);

    let renewed = service
        .renew(scope.authority_uuid(), day(2031, 1, 1))
        .unwrap();
    assert!(renewed.is_active);
    directory
        .create_client(&scope, &ClientDraft::new("Other"))
        .unwrap();
}

#[test]
fn expired_authority_rejects_writes() {
    let conn = fixture();
    let service = AuthorityService::new(SqliteAuthorityRepository::try_new(&conn).unwrap());
    let authority = service.register(day(2026, 3, 14), true).unwrap();
    let scope = service.open_scope(authority.uuid, today()).unwrap();

    let directory = SqliteDirectoryRepository::try_new(&conn).unwrap();
    let err = directory
        .create_company(&scope, &CompanyDraft::new("Acme", ""))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::AuthorityNotValid(_))
    ));
    assert!(err.is_client_error());
}

#[test]
fn writes_under_unknown_authority_are_not_found() {
    let conn = fixture();
    let scope = Scope::as_of(uuid::Uuid::new_v4(), today());
    let directory = SqliteDirectoryRepository::try_new(&conn).unwrap();

    match directory
        .create_client(&scope, &ClientDraft::new("Acme Corp"))
        .unwrap_err()
    {
        RepoError::NotFound { entity, id } => {
            assert_eq!(entity, EntityKind::Authority);
            assert_eq!(id, scope.authority_uuid());
        }
        other => panic!("unexpected error: {other}"),
    }

    let service = AuthorityService::new(SqliteAuthorityRepository::try_new(&conn).unwrap());
    assert!(matches!(
        service.open_scope(scope.authority_uuid(), today()),
        Err(RepoError::NotFound { .. })
    ));
}

#[test]
fn deleting_authority_removes_whole_tenant_tree() {
    let conn = fixture();
    let scope = tenant(&conn);
    let other = tenant(&conn);

    let directory = SqliteDirectoryRepository::try_new(&conn).unwrap();
    let projects = SqliteProjectRepository::try_new(&conn).unwrap();
    let work = WorkService::new(SqliteWorkRepository::try_new(&conn).unwrap());

    let company = directory
        .create_company(&scope, &CompanyDraft::new("Acme", "https://acme.test"))
        .unwrap();
    let mut draft = ProjectDraft::new("P1", "Launch");
    draft.company_uuid = Some(company.uuid);
    let project = projects.create_project(&scope, &draft).unwrap();
    let job = work
        .create_job(&scope, &TodoDraft::new("J1", "Plan"), project.uuid)
        .unwrap();
    staff_member(&conn, &scope, "ada");

    let kept = directory
        .create_client(&other, &ClientDraft::new("Survivor"))
        .unwrap();

    let repo = SqliteAuthorityRepository::try_new(&conn).unwrap();
    let report = repo.delete_authority(scope.authority_uuid()).unwrap();
    assert_eq!(report.deleted_count(EntityKind::Authority), 1);
    assert_eq!(report.deleted_count(EntityKind::Company), 1);
    assert_eq!(report.deleted_count(EntityKind::Project), 1);
    assert_eq!(report.deleted_count(EntityKind::Job), 1);
    assert_eq!(report.deleted_count(EntityKind::Todo), 1);
    assert_eq!(report.deleted_count(EntityKind::Staff), 1);

    assert!(matches!(
        projects.get_project(&scope, project.uuid),
        Err(RepoError::NotFound { .. })
    ));
    assert!(matches!(
        work_repo_get(&conn, &scope, job.todo.uuid),
        Err(RepoError::NotFound { .. })
    ));
    assert_eq!(directory.get_client(&other, kept.uuid).unwrap(), kept);

    match repo.delete_authority(scope.authority_uuid()).unwrap_err() {
        RepoError::NotFound { entity, .. } => assert_eq!(entity, EntityKind::Authority),
        other => panic!("unexpected error: {other}"),
    }
}

fn work_repo_get(
    conn: &rusqlite::Connection,
    scope: &Scope,
    todo: uuid::Uuid,
) -> Result<workledger_core::model::work::Todo, RepoError> {
    use workledger_core::WorkRepository;
    SqliteWorkRepository::try_new(conn).unwrap().get_todo(scope, todo)
}
