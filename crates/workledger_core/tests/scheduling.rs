mod common;

use common::{day, fixture, staff_member, tenant};
use workledger_core::model::schedule::{ScheduledTodoDraft, WorkDayDraft, NO_REPEAT};
use workledger_core::model::work::TodoDraft;
use workledger_core::{
    EntityKind, RepoError, ScheduleRepository, ScheduleService, ScheduledTodoListQuery,
    SqliteScheduleRepository, SqliteWorkRepository, ValidationError, WorkDayListQuery,
    WorkRepository,
};

struct Ledger<'conn> {
    schedule: SqliteScheduleRepository<'conn>,
    work: SqliteWorkRepository<'conn>,
}

fn ledger(conn: &rusqlite::Connection) -> Ledger<'_> {
    Ledger {
        schedule: SqliteScheduleRepository::try_new(conn).unwrap(),
        work: SqliteWorkRepository::try_new(conn).unwrap(),
    }
}

#[test]
fn work_days_are_listed_by_staff_and_date() {
    let conn = fixture();
    let scope = tenant(&conn);
    let ada = staff_member(&conn, &scope, "ada");
    let grace = staff_member(&conn, &scope, "grace");
    let ledger = ledger(&conn);

    let monday = ledger
        .schedule
        .create_work_day(&scope, &WorkDayDraft::new(ada, day(2026, 3, 16), 8.0))
        .unwrap();
    let tuesday = ledger
        .schedule
        .create_work_day(&scope, &WorkDayDraft::new(ada, day(2026, 3, 17), 6.0))
        .unwrap();
    let other = ledger
        .schedule
        .create_work_day(&scope, &WorkDayDraft::new(grace, day(2026, 3, 16), 4.0))
        .unwrap();
    assert_eq!(monday.repeat, NO_REPEAT);

    let of_ada = ledger
        .schedule
        .list_work_days(
            &scope,
            &WorkDayListQuery {
                staff_uuid: Some(ada),
                date: None,
            },
        )
        .unwrap();
    assert_eq!(of_ada, vec![monday.clone(), tuesday]);

    let on_monday = ledger
        .schedule
        .list_work_days(
            &scope,
            &WorkDayListQuery {
                staff_uuid: None,
                date: Some(day(2026, 3, 16)),
            },
        )
        .unwrap();
    assert_eq!(on_monday, vec![monday, other]);
}

#[test]
fn allocations_cannot_exceed_day_hours() {
    let conn = fixture();
    let scope = tenant(&conn);
    let ada = staff_member(&conn, &scope, "ada");
    let ledger = ledger(&conn);
    let service = ScheduleService::new(SqliteScheduleRepository::try_new(&conn).unwrap());

    let work_day = ledger
        .schedule
        .create_work_day(&scope, &WorkDayDraft::new(ada, day(2026, 3, 16), 8.0))
        .unwrap();
    let first = ledger
        .work
        .create_todo(&scope, &TodoDraft::new("T1", "Draft"))
        .unwrap();
    let second = ledger
        .work
        .create_todo(&scope, &TodoDraft::new("T2", "Review"))
        .unwrap();

    service
        .schedule_todo(&scope, first.uuid, work_day.uuid, 5.0)
        .unwrap();
    assert_eq!(service.remaining_hours(&scope, work_day.uuid).unwrap(), 3.0);

    match service
        .schedule_todo(&scope, second.uuid, work_day.uuid, 4.0)
        .unwrap_err()
    {
        RepoError::Validation(ValidationError::OverAllocated {
            work_day: id,
            available_hours,
            requested_hours,
        }) => {
            assert_eq!(id, work_day.uuid);
            assert_eq!(available_hours, 3.0);
            assert_eq!(requested_hours, 4.0);
        }
        other => panic!("unexpected error: {other}"),
    }

    service
        .schedule_todo(&scope, second.uuid, work_day.uuid, 3.0)
        .unwrap();
    assert_eq!(service.remaining_hours(&scope, work_day.uuid).unwrap(), 0.0);
}

#[test]
fn resizing_in_place_counts_only_the_difference() {
    let conn = fixture();
    let scope = tenant(&conn);
    let ada = staff_member(&conn, &scope, "ada");
    let ledger = ledger(&conn);

    let work_day = ledger
        .schedule
        .create_work_day(&scope, &WorkDayDraft::new(ada, day(2026, 3, 16), 8.0))
        .unwrap();
    let todo = ledger
        .work
        .create_todo(&scope, &TodoDraft::new("T1", "Draft"))
        .unwrap();
    let mut draft = ScheduledTodoDraft {
        todo_uuid: todo.uuid,
        work_day_uuid: work_day.uuid,
        allocated_hours: 6.0,
    };
    ledger.schedule.create_scheduled_todo(&scope, &draft).unwrap();

    draft.allocated_hours = 8.0;
    let resized = ledger.schedule.update_scheduled_todo(&scope, &draft).unwrap();
    assert_eq!(resized.allocated_hours, 8.0);

    draft.allocated_hours = 8.5;
    assert!(matches!(
        ledger.schedule.update_scheduled_todo(&scope, &draft),
        Err(RepoError::Validation(ValidationError::OverAllocated { .. }))
    ));
}

#[test]
fn scheduling_same_todo_twice_is_conflict() {
    let conn = fixture();
    let scope = tenant(&conn);
    let ada = staff_member(&conn, &scope, "ada");
    let ledger = ledger(&conn);
    let service = ScheduleService::new(SqliteScheduleRepository::try_new(&conn).unwrap());

    let monday = ledger
        .schedule
        .create_work_day(&scope, &WorkDayDraft::new(ada, day(2026, 3, 16), 8.0))
        .unwrap();
    let tuesday = ledger
        .schedule
        .create_work_day(&scope, &WorkDayDraft::new(ada, day(2026, 3, 17), 8.0))
        .unwrap();
    let todo = ledger
        .work
        .create_todo(&scope, &TodoDraft::new("T1", "Draft"))
        .unwrap();

    service
        .schedule_todo(&scope, todo.uuid, monday.uuid, 2.0)
        .unwrap();
    assert!(matches!(
        service.schedule_todo(&scope, todo.uuid, tuesday.uuid, 2.0),
        Err(RepoError::Conflict {
            entity: EntityKind::ScheduledTodo,
            ..
        })
    ));

    let moved = service.reschedule(&scope, todo.uuid, tuesday.uuid).unwrap();
    assert_eq!(moved.work_day_uuid, tuesday.uuid);
    assert_eq!(moved.allocated_hours, 2.0);
    assert!(ledger
        .schedule
        .list_scheduled_todos(
            &scope,
            &ScheduledTodoListQuery {
                work_day_uuid: Some(monday.uuid),
            },
        )
        .unwrap()
        .is_empty());

    service.unschedule(&scope, todo.uuid).unwrap();
    assert_eq!(service.remaining_hours(&scope, tuesday.uuid).unwrap(), 8.0);
}

#[test]
fn shrinking_work_day_below_allocation_is_rejected() {
    let conn = fixture();
    let scope = tenant(&conn);
    let ada = staff_member(&conn, &scope, "ada");
    let ledger = ledger(&conn);

    let draft = WorkDayDraft::new(ada, day(2026, 3, 16), 8.0);
    let work_day = ledger.schedule.create_work_day(&scope, &draft).unwrap();
    let todo = ledger
        .work
        .create_todo(&scope, &TodoDraft::new("T1", "Draft"))
        .unwrap();
    ledger
        .schedule
        .create_scheduled_todo(
            &scope,
            &ScheduledTodoDraft {
                todo_uuid: todo.uuid,
                work_day_uuid: work_day.uuid,
                allocated_hours: 6.0,
            },
        )
        .unwrap();

    let mut shrunk = draft.clone();
    shrunk.hours = 5.0;
    assert!(matches!(
        ledger.schedule.update_work_day(&scope, work_day.uuid, &shrunk),
        Err(RepoError::Validation(ValidationError::OverAllocated { .. }))
    ));

    shrunk.hours = 6.0;
    shrunk.repeat = 7;
    let updated = ledger
        .schedule
        .update_work_day(&scope, work_day.uuid, &shrunk)
        .unwrap();
    assert_eq!(updated.hours, 6.0);
    assert_eq!(updated.repeat, 7);
}

#[test]
fn negative_hours_are_rejected() {
    let conn = fixture();
    let scope = tenant(&conn);
    let ada = staff_member(&conn, &scope, "ada");
    let ledger = ledger(&conn);

    assert!(matches!(
        ledger
            .schedule
            .create_work_day(&scope, &WorkDayDraft::new(ada, day(2026, 3, 16), -1.0)),
        Err(RepoError::Validation(ValidationError::NegativeOrNonFinite(
            "hours"
        )))
    ));
}

#[test]
fn fractional_allocations_can_fill_a_day_exactly() {
    let conn = fixture();
    let scope = tenant(&conn);
    let ada = staff_member(&conn, &scope, "ada");
    let ledger = ledger(&conn);
    let service = ScheduleService::new(SqliteScheduleRepository::try_new(&conn).unwrap());

    let work_day = ledger
        .schedule
        .create_work_day(&scope, &WorkDayDraft::new(ada, day(2026, 3, 16), 8.0))
        .unwrap();
    for (code, hours) in [("T1", 2.7), ("T2", 2.7), ("T3", 2.6)] {
        let todo = ledger
            .work
            .create_todo(&scope, &TodoDraft::new(code, "Split work"))
            .unwrap();
        service
            .schedule_todo(&scope, todo.uuid, work_day.uuid, hours)
            .unwrap();
    }
    assert!(service.remaining_hours(&scope, work_day.uuid).unwrap().abs() < 1e-9);

    let extra = ledger
        .work
        .create_todo(&scope, &TodoDraft::new("T4", "One too many"))
        .unwrap();
    assert!(matches!(
        service.schedule_todo(&scope, extra.uuid, work_day.uuid, 0.1),
        Err(RepoError::Validation(ValidationError::OverAllocated { .. }))
    ));
}

#[test]
fn work_day_can_shrink_to_its_fractional_allocation_total() {
    let conn = fixture();
    let scope = tenant(&conn);
    let ada = staff_member(&conn, &scope, "ada");
    let ledger = ledger(&conn);
    let service = ScheduleService::new(SqliteScheduleRepository::try_new(&conn).unwrap());

    let draft = WorkDayDraft::new(ada, day(2026, 3, 16), 1.0);
    let work_day = ledger.schedule.create_work_day(&scope, &draft).unwrap();
    for (code, hours) in [("T1", 0.1), ("T2", 0.2)] {
        let todo = ledger
            .work
            .create_todo(&scope, &TodoDraft::new(code, "Small task"))
            .unwrap();
        service
            .schedule_todo(&scope, todo.uuid, work_day.uuid, hours)
            .unwrap();
    }

    let mut shrunk = draft.clone();
    shrunk.hours = 0.3;
    let updated = ledger
        .schedule
        .update_work_day(&scope, work_day.uuid, &shrunk)
        .unwrap();
    assert_eq!(updated.hours, 0.3);

    shrunk.hours = 0.29;
    assert!(matches!(
        ledger.schedule.update_work_day(&scope, work_day.uuid, &shrunk),
        Err(RepoError::Validation(ValidationError::OverAllocated { .. }))
    ));
}
