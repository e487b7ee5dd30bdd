mod common;

use common::{day, fixture, staff_member, tenant};
use workledger_core::model::directory::{ClientDraft, CompanyDraft, EmailAddressDraft};
use workledger_core::model::project::ProjectDraft;
use workledger_core::model::schedule::WorkDayDraft;
use workledger_core::model::staff::UserDraft;
use workledger_core::model::status::{StatusDraft, StatusGroupDraft};
use workledger_core::model::work::TodoDraft;
use workledger_core::{
    DirectoryRepository, EntityKind, ProjectRepository, RepoError, ScheduleRepository,
    ScheduleService, SqliteDirectoryRepository, SqliteProjectRepository,
    SqliteScheduleRepository, SqliteStaffRepository, SqliteStatusRepository,
    SqliteUserRepository, SqliteWorkRepository, StaffRepository, StatusListQuery,
    StatusRepository, TaskListQuery, UserRepository, WorkRepository,
};

#[test]
fn deleting_company_nullifies_project_and_keeps_client() {
    let conn = fixture();
    let scope = tenant(&conn);
    let directory = SqliteDirectoryRepository::try_new(&conn).unwrap();
    let projects = SqliteProjectRepository::try_new(&conn).unwrap();

    let client = directory
        .create_client(&scope, &ClientDraft::new("Acme Corp"))
        .unwrap();
    let company = directory
        .create_company(&scope, &CompanyDraft::new("Acme", "https://acme.test"))
        .unwrap();
    directory
        .link_client(&scope, company.uuid, client.uuid)
        .unwrap();
    let mut draft = ProjectDraft::new("P1", "Launch");
    draft.company_uuid = Some(company.uuid);
    let project = projects.create_project(&scope, &draft).unwrap();

    let report = directory.delete_company(&scope, company.uuid).unwrap();
    assert_eq!(report.deleted_count(EntityKind::Company), 1);
    assert_eq!(report.deleted_count(EntityKind::CompanyClient), 1);
    assert_eq!(report.nullified, 1);

    let project = projects.get_project(&scope, project.uuid).unwrap();
    assert_eq!(project.company_uuid, None);
    assert_eq!(directory.get_client(&scope, client.uuid).unwrap(), client);
    assert!(directory
        .list_client_companies(&scope, client.uuid)
        .unwrap()
        .is_empty());
}

#[test]
fn deleting_staff_cascades_work_days_and_schedule() {
    let conn = fixture();
    let scope = tenant(&conn);
    let staff_id = staff_member(&conn, &scope, "ada");
    let work = SqliteWorkRepository::try_new(&conn).unwrap();
    let schedule = SqliteScheduleRepository::try_new(&conn).unwrap();

    let mut todo_draft = TodoDraft::new("T1", "Draft report");
    todo_draft.assigned_to = Some(staff_id);
    let todo = work.create_todo(&scope, &todo_draft).unwrap();
    let work_day = schedule
        .create_work_day(&scope, &WorkDayDraft::new(staff_id, day(2026, 3, 16), 8.0))
        .unwrap();
    ScheduleService::new(SqliteScheduleRepository::try_new(&conn).unwrap())
        .schedule_todo(&scope, todo.uuid, work_day.uuid, 4.0)
        .unwrap();

    let staff = SqliteStaffRepository::try_new(&conn).unwrap();
    let report = staff.delete_staff(&scope, staff_id).unwrap();
    assert_eq!(report.deleted_count(EntityKind::Staff), 1);
    assert_eq!(report.deleted_count(EntityKind::WorkDay), 1);
    assert_eq!(report.deleted_count(EntityKind::ScheduledTodo), 1);

    assert!(matches!(
        schedule.get_scheduled_todo(&scope, todo.uuid),
        Err(RepoError::NotFound { .. })
    ));
    assert!(matches!(
        schedule.get_work_day(&scope, work_day.uuid),
        Err(RepoError::NotFound { .. })
    ));
    let todo = work.get_todo(&scope, todo.uuid).unwrap();
    assert_eq!(todo.assigned_to, None);

    let users = SqliteUserRepository::try_new(&conn).unwrap();
    assert_eq!(users.get_user(staff_id).unwrap().username, "ada");
}

#[test]
fn deleting_todo_removes_its_one_to_one_dependents() {
    let conn = fixture();
    let scope = tenant(&conn);
    let staff_id = staff_member(&conn, &scope, "ada");
    let projects = SqliteProjectRepository::try_new(&conn).unwrap();
    let work = SqliteWorkRepository::try_new(&conn).unwrap();
    let schedule = SqliteScheduleRepository::try_new(&conn).unwrap();

    let project = projects
        .create_project(&scope, &ProjectDraft::new("P1", "Launch"))
        .unwrap();
    let job = work
        .create_job_with_todo(&scope, &TodoDraft::new("J1", "Plan"), project.uuid)
        .unwrap();
    let task = work
        .create_task_with_todo(&scope, &TodoDraft::new("K1", "Outline"), job.todo.uuid)
        .unwrap();
    let work_day = schedule
        .create_work_day(&scope, &WorkDayDraft::new(staff_id, day(2026, 3, 16), 8.0))
        .unwrap();
    ScheduleService::new(SqliteScheduleRepository::try_new(&conn).unwrap())
        .schedule_todo(&scope, job.todo.uuid, work_day.uuid, 2.0)
        .unwrap();

    let report = work.delete_todo(&scope, job.todo.uuid).unwrap();
    assert_eq!(report.deleted_count(EntityKind::Todo), 1);
    assert_eq!(report.deleted_count(EntityKind::Job), 1);
    assert_eq!(report.deleted_count(EntityKind::Task), 1);
    assert_eq!(report.deleted_count(EntityKind::ScheduledTodo), 1);

    assert!(matches!(
        work.get_job(&scope, job.todo.uuid),
        Err(RepoError::NotFound { .. })
    ));
    assert!(matches!(
        work.get_task(&scope, task.todo.uuid),
        Err(RepoError::NotFound { .. })
    ));
    // The task's own todo is a separate record and survives.
    assert_eq!(work.get_todo(&scope, task.todo.uuid).unwrap(), task.todo);
    assert_eq!(schedule.allocated_hours(&scope, work_day.uuid).unwrap(), 0.0);
}

#[test]
fn deleting_project_cascades_jobs_and_their_tasks() {
    let conn = fixture();
    let scope = tenant(&conn);
    let projects = SqliteProjectRepository::try_new(&conn).unwrap();
    let work = SqliteWorkRepository::try_new(&conn).unwrap();

    let project = projects
        .create_project(&scope, &ProjectDraft::new("P1", "Launch"))
        .unwrap();
    let job = work
        .create_job_with_todo(&scope, &TodoDraft::new("J1", "Plan"), project.uuid)
        .unwrap();
    work.create_task_with_todo(&scope, &TodoDraft::new("K1", "Outline"), job.todo.uuid)
        .unwrap();

    let report = projects.delete_project(&scope, project.uuid).unwrap();
    assert_eq!(report.deleted_count(EntityKind::Project), 1);
    assert_eq!(report.deleted_count(EntityKind::Job), 1);
    assert_eq!(report.deleted_count(EntityKind::Task), 1);
    assert_eq!(report.deleted_count(EntityKind::Todo), 0);

    assert!(work
        .list_tasks(&scope, &TaskListQuery::default())
        .unwrap()
        .is_empty());
    assert_eq!(work.get_todo(&scope, job.todo.uuid).unwrap(), job.todo);
}

#[test]
fn deleting_status_group_cascades_statuses_and_nullifies_references() {
    let conn = fixture();
    let scope = tenant(&conn);
    let statuses = SqliteStatusRepository::try_new(&conn).unwrap();
    let projects = SqliteProjectRepository::try_new(&conn).unwrap();
    let work = SqliteWorkRepository::try_new(&conn).unwrap();

    let group = statuses
        .create_status_group(&scope, &StatusGroupDraft::new("Delivery"))
        .unwrap();
    let open = statuses
        .create_status(&scope, &StatusDraft::new("Open", group.uuid))
        .unwrap();
    statuses
        .create_status(&scope, &StatusDraft::new("Done", group.uuid))
        .unwrap();

    let mut project_draft = ProjectDraft::new("P1", "Launch");
    project_draft.status_group_uuid = Some(group.uuid);
    let project = projects.create_project(&scope, &project_draft).unwrap();
    let mut todo_draft = TodoDraft::new("T1", "Ship");
    todo_draft.status_uuid = Some(open.uuid);
    let todo = work.create_todo(&scope, &todo_draft).unwrap();

    let report = statuses.delete_status_group(&scope, group.uuid).unwrap();
    assert_eq!(report.deleted_count(EntityKind::StatusGroup), 1);
    assert_eq!(report.deleted_count(EntityKind::Status), 2);
    assert_eq!(report.nullified, 2);

    assert!(statuses
        .list_statuses(&scope, &StatusListQuery::default())
        .unwrap()
        .is_empty());
    assert_eq!(
        projects
            .get_project(&scope, project.uuid)
            .unwrap()
            .status_group_uuid,
        None
    );
    assert_eq!(work.get_todo(&scope, todo.uuid).unwrap().status_uuid, None);
}

#[test]
fn deleting_client_nullifies_email_and_drops_links() {
    let conn = fixture();
    let scope = tenant(&conn);
    let directory = SqliteDirectoryRepository::try_new(&conn).unwrap();

    let client = directory
        .create_client(&scope, &ClientDraft::new("Acme Corp"))
        .unwrap();
    let email = directory
        .create_email_address(
            &scope,
            &EmailAddressDraft::new("billing@acme.test", Some(client.uuid)),
        )
        .unwrap();
    let company = directory
        .create_company(&scope, &CompanyDraft::new("Acme", ""))
        .unwrap();
    directory
        .link_client(&scope, company.uuid, client.uuid)
        .unwrap();

    directory.delete_client(&scope, client.uuid).unwrap();

    let email = directory.get_email_address(&scope, email.uuid).unwrap();
    assert_eq!(email.client_uuid, None);
    assert!(directory
        .list_company_clients(&scope, company.uuid)
        .unwrap()
        .is_empty());
}

#[test]
fn deleting_user_removes_staff_record() {
    let conn = fixture();
    let scope = tenant(&conn);
    let staff_id = staff_member(&conn, &scope, "ada");
    let users = SqliteUserRepository::try_new(&conn).unwrap();
    let staff = SqliteStaffRepository::try_new(&conn).unwrap();

    let report = users.delete_user(staff_id).unwrap();
    assert_eq!(report.deleted_count(EntityKind::User), 1);
    assert_eq!(report.deleted_count(EntityKind::Staff), 1);
    assert!(matches!(
        staff.get_staff(&scope, staff_id),
        Err(RepoError::NotFound { .. })
    ));
    assert!(users.find_user_by_username("ada").unwrap().is_none());
}

#[test]
fn deleting_twice_reports_not_found() {
    let conn = fixture();
    let scope = tenant(&conn);
    let users = SqliteUserRepository::try_new(&conn).unwrap();
    let user = users.create_user(&UserDraft::new("grace")).unwrap();

    users.delete_user(user.uuid).unwrap();
    assert!(matches!(
        users.delete_user(user.uuid),
        Err(RepoError::NotFound {
            entity: EntityKind::User,
            ..
        })
    ));

    let directory = SqliteDirectoryRepository::try_new(&conn).unwrap();
    let client = directory
        .create_client(&scope, &ClientDraft::new("Acme Corp"))
        .unwrap();
    directory.delete_client(&scope, client.uuid).unwrap();
    assert!(matches!(
        directory.delete_client(&scope, client.uuid),
        Err(RepoError::NotFound { .. })
    ));
}
