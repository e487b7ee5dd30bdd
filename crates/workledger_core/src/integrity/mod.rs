//! Referential integrity and tenant scoping.
//!
//! # Responsibility
//! - Declare what happens to dependents when a record is deleted
//!   (`rules`), and execute it transitively and atomically (`cascade`).
//! - Enforce authority validity on writes and same-tenant references
//!   (`scope`).
//!
//! # Invariants
//! - A delete either removes/clears its whole dependency graph or nothing.
//! - A scoped record never references a record of another authority.

pub mod cascade;
pub mod rules;
pub mod scope;
