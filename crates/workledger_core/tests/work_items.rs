mod common;

use common::{fixture, staff_member, tenant};
use workledger_core::model::project::ProjectDraft;
use workledger_core::model::status::{StatusDraft, StatusGroupDraft};
use workledger_core::model::work::{JobDraft, TaskDraft, TodoDraft};
use workledger_core::{
    EntityKind, JobListQuery, ProjectRepository, RepoError, SqliteProjectRepository,
    SqliteStatusRepository, SqliteWorkRepository, StatusRepository, TodoListQuery,
    ValidationError, WorkRepository, WorkService,
};

#[test]
fn job_and_task_are_created_with_their_todo() {
    let conn = fixture();
    let scope = tenant(&conn);
    let project = SqliteProjectRepository::try_new(&conn)
        .unwrap()
        .create_project(&scope, &ProjectDraft::new("P1", "Launch"))
        .unwrap();
    let service = WorkService::new(SqliteWorkRepository::try_new(&conn).unwrap());

    let mut draft = TodoDraft::new("J1", "Plan launch");
    draft.estimated_time = 12.0;
    let job = service.create_job(&scope, &draft, project.uuid).unwrap();
    assert_eq!(job.job.todo_uuid, job.todo.uuid);
    assert_eq!(job.job.project_uuid, project.uuid);
    assert_eq!(job.todo.estimated_time, 12.0);
    assert_eq!(job.todo.to_string(), "J1: Plan launch");

    let task = service
        .create_task(&scope, &TodoDraft::new("K1", "Book venue"), job.todo.uuid)
        .unwrap();
    assert_eq!(task.task.job_uuid, job.todo.uuid);
    assert_eq!(task.task.authority_uuid, scope.authority_uuid());
}

#[test]
fn second_job_for_same_todo_is_conflict() {
    let conn = fixture();
    let scope = tenant(&conn);
    let projects = SqliteProjectRepository::try_new(&conn).unwrap();
    let first = projects
        .create_project(&scope, &ProjectDraft::new("P1", "Launch"))
        .unwrap();
    let second = projects
        .create_project(&scope, &ProjectDraft::new("P2", "Follow-up"))
        .unwrap();
    let work = SqliteWorkRepository::try_new(&conn).unwrap();

    let todo = work
        .create_todo(&scope, &TodoDraft::new("T1", "Plan"))
        .unwrap();
    work.create_job(
        &scope,
        &JobDraft {
            todo_uuid: todo.uuid,
            project_uuid: first.uuid,
        },
    )
    .unwrap();

    let err = work
        .create_job(
            &scope,
            &JobDraft {
                todo_uuid: todo.uuid,
                project_uuid: second.uuid,
            },
        )
        .unwrap_err();
    match &err {
        RepoError::Conflict { entity, id } => {
            assert_eq!(*entity, EntityKind::Job);
            assert_eq!(*id, todo.uuid);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_client_error());
    assert_eq!(work.get_job(&scope, todo.uuid).unwrap().project_uuid, first.uuid);

    let moved = work
        .update_job(
            &scope,
            &JobDraft {
                todo_uuid: todo.uuid,
                project_uuid: second.uuid,
            },
        )
        .unwrap();
    assert_eq!(moved.project_uuid, second.uuid);
    assert_eq!(
        work.list_jobs(
            &scope,
            &JobListQuery {
                project_uuid: Some(first.uuid)
            }
        )
        .unwrap(),
        vec![]
    );
}

#[test]
fn failed_composite_create_leaves_no_todo_behind() {
    let conn = fixture();
    let scope = tenant(&conn);
    let work = SqliteWorkRepository::try_new(&conn).unwrap();

    let missing_project = uuid::Uuid::new_v4();
    assert!(matches!(
        work.create_job_with_todo(&scope, &TodoDraft::new("J1", "Plan"), missing_project),
        Err(RepoError::NotFound {
            entity: EntityKind::Project,
            ..
        })
    ));
    assert!(work
        .list_todos(&scope, &TodoListQuery::default())
        .unwrap()
        .is_empty());

    let second_task_target = work
        .create_todo(&scope, &TodoDraft::new("T1", "Not a job"))
        .unwrap();
    assert!(matches!(
        work.create_task(
            &scope,
            &TaskDraft {
                todo_uuid: second_task_target.uuid,
                job_uuid: second_task_target.uuid,
            }
        ),
        Err(RepoError::NotFound {
            entity: EntityKind::Job,
            ..
        })
    ));
}

#[test]
fn log_time_accumulates_and_never_goes_negative() {
    let conn = fixture();
    let scope = tenant(&conn);
    let service = WorkService::new(SqliteWorkRepository::try_new(&conn).unwrap());
    let work = SqliteWorkRepository::try_new(&conn).unwrap();
    let todo = work
        .create_todo(&scope, &TodoDraft::new("T1", "Write report"))
        .unwrap();

    service.log_time(&scope, todo.uuid, 1.5).unwrap();
    let todo = service.log_time(&scope, todo.uuid, 2.0).unwrap();
    assert_eq!(todo.logged_time, 3.5);

    let corrected = service.log_time(&scope, todo.uuid, -0.5).unwrap();
    assert_eq!(corrected.logged_time, 3.0);

    assert!(matches!(
        service.log_time(&scope, todo.uuid, -5.0),
        Err(RepoError::Validation(ValidationError::NegativeOrNonFinite(
            "logged_time"
        )))
    ));
    assert_eq!(work.get_todo(&scope, todo.uuid).unwrap().logged_time, 3.0);
}

#[test]
fn negative_estimate_is_rejected() {
    let conn = fixture();
    let scope = tenant(&conn);
    let work = SqliteWorkRepository::try_new(&conn).unwrap();

    let mut draft = TodoDraft::new("T1", "Write report");
    draft.estimated_time = -1.0;
    assert!(matches!(
        work.create_todo(&scope, &draft),
        Err(RepoError::Validation(ValidationError::NegativeOrNonFinite(
            "estimated_time"
        )))
    ));
}

#[test]
fn assign_and_set_status_keep_other_fields() {
    let conn = fixture();
    let scope = tenant(&conn);
    let staff_id = staff_member(&conn, &scope, "ada");
    let statuses = SqliteStatusRepository::try_new(&conn).unwrap();
    let group = statuses
        .create_status_group(&scope, &StatusGroupDraft::new("Delivery"))
        .unwrap();
    let open = statuses
        .create_status(&scope, &StatusDraft::new("Open", group.uuid))
        .unwrap();

    let work = SqliteWorkRepository::try_new(&conn).unwrap();
    let service = WorkService::new(SqliteWorkRepository::try_new(&conn).unwrap());
    let todo = work
        .create_todo(&scope, &TodoDraft::new("T1", "Write report"))
        .unwrap();
    service.log_time(&scope, todo.uuid, 2.0).unwrap();

    let assigned = service.assign(&scope, todo.uuid, Some(staff_id)).unwrap();
    assert_eq!(assigned.assigned_to, Some(staff_id));
    assert_eq!(assigned.logged_time, 2.0);

    let with_status = service
        .set_status(&scope, todo.uuid, Some(open.uuid))
        .unwrap();
    assert_eq!(with_status.status_uuid, Some(open.uuid));
    assert_eq!(with_status.assigned_to, Some(staff_id));

    let filtered = work
        .list_todos(
            &scope,
            &TodoListQuery {
                assigned_to: Some(staff_id),
                status_uuid: Some(open.uuid),
            },
        )
        .unwrap();
    assert_eq!(filtered, vec![with_status]);

    let unassigned = service.assign(&scope, todo.uuid, None).unwrap();
    assert_eq!(unassigned.assigned_to, None);
}

#[test]
fn todo_serializes_with_flat_timestamps_and_null_references() {
    let conn = fixture();
    let scope = tenant(&conn);
    let work = SqliteWorkRepository::try_new(&conn).unwrap();
    let todo = work
        .create_todo(&scope, &TodoDraft::new("T1", "Write report"))
        .unwrap();

    let value = serde_json::to_value(&todo).unwrap();
    assert_eq!(value["reference_code"], "T1");
    assert!(value["assigned_to"].is_null());
    assert!(value["status_uuid"].is_null());
    assert!(value["created_at"].is_i64());
    assert!(value["updated_at"].is_i64());
    assert!(value.get("timestamps").is_none());
}
