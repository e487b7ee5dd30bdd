#![allow(dead_code)]

use chrono::NaiveDate;
use rusqlite::Connection;
use workledger_core::db::open_db_in_memory;
use workledger_core::model::staff::{StaffDraft, UserDraft, UserId};
use workledger_core::{
    Authority, AuthorityRepository, Scope, SqliteAuthorityRepository, SqliteStaffRepository,
    SqliteUserRepository, StaffRepository, UserRepository,
};

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Reference date used by every test scope.
pub fn today() -> NaiveDate {
    day(2026, 3, 15)
}

pub fn fixture() -> Connection {
    open_db_in_memory().unwrap()
}

/// Registers an active authority expiring well after `today()`.
pub fn tenant(conn: &Connection) -> Scope {
    tenant_with(conn, day(2030, 12, 31), true)
}

pub fn tenant_with(conn: &Connection, expires_at: NaiveDate, is_active: bool) -> Scope {
    let repo = SqliteAuthorityRepository::try_new(conn).unwrap();
    let id = repo
        .create_authority(&Authority::new(expires_at, is_active))
        .unwrap();
    Scope::as_of(id, today())
}

/// Creates a user and its staff record under `scope`.
pub fn staff_member(conn: &Connection, scope: &Scope, username: &str) -> UserId {
    let users = SqliteUserRepository::try_new(conn).unwrap();
    let user = users.create_user(&UserDraft::new(username)).unwrap();
    let staff = SqliteStaffRepository::try_new(conn).unwrap();
    staff
        .create_staff(scope, &StaffDraft::new(user.uuid, 42.5))
        .unwrap();
    user.uuid
}
