//! Authority registry use-case service.
//!
//! # Responsibility
//! - Register, renew, deactivate and remove tenant roots.
//! - Hand out `Scope` values for existing authorities.
//!
//! # Invariants
//! - A scope is only opened for an authority that exists.
//! - Opening a scope does not require a valid authority; writes through
//!   it are checked by the repositories.

use crate::integrity::cascade::DeleteReport;
use crate::integrity::scope::Scope;
use crate::model::authority::{Authority, AuthorityId};
use crate::repo::authority_repo::AuthorityRepository;
use crate::repo::RepoResult;
use chrono::NaiveDate;
use log::info;

/// Use-case service wrapper for the authority registry.
pub struct AuthorityService<R: AuthorityRepository> {
    repo: R,
}

impl<R: AuthorityRepository> AuthorityService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new authority and returns the stored record.
    pub fn register(&self, expires_at: NaiveDate, is_active: bool) -> RepoResult<Authority> {
        let authority = Authority::new(expires_at, is_active);
        let id = self.repo.create_authority(&authority)?;
        info!(
            "event=authority_register module=service status=ok authority={} expires_at={} is_active={}",
            id, expires_at, is_active
        );
        self.repo.get_authority(id)
    }

    pub fn get(&self, id: AuthorityId) -> RepoResult<Authority> {
        self.repo.get_authority(id)
    }

    pub fn list(&self) -> RepoResult<Vec<Authority>> {
        self.repo.list_authorities()
    }

    /// Returns whether writes under `id` are permitted at `at`.
    pub fn is_valid(&self, id: AuthorityId, at: NaiveDate) -> RepoResult<bool> {
        Ok(self.repo.get_authority(id)?.is_valid(at))
    }

    /// Clears the active flag; the expiry date is kept.
    pub fn deactivate(&self, id: AuthorityId) -> RepoResult<Authority> {
        let mut authority = self.repo.get_authority(id)?;
        authority.is_active = false;
        self.repo.update_authority(&authority)?;
        Ok(authority)
    }

    /// Moves the expiry date and reactivates the authority.
    pub fn renew(&self, id: AuthorityId, expires_at: NaiveDate) -> RepoResult<Authority> {
        let mut authority = self.repo.get_authority(id)?;
        authority.expires_at = expires_at;
        authority.is_active = true;
        self.repo.update_authority(&authority)?;
        Ok(authority)
    }

    /// Deletes the authority together with its whole tenant tree.
    pub fn remove(&self, id: AuthorityId) -> RepoResult<DeleteReport> {
        self.repo.delete_authority(id)
    }

    /// Opens a scope whose writes are checked against `as_of`.
    ///
    /// # Errors
    /// - `NotFound` when the authority does not exist.
    pub fn open_scope(&self, id: AuthorityId, as_of: NaiveDate) -> RepoResult<Scope> {
        self.repo.get_authority(id)?;
        Ok(Scope::as_of(id, as_of))
    }
}
