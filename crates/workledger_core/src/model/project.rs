//! Project registry model.
//!
//! # Invariants
//! - `company_uuid` and `status_group_uuid` are optional and are cleared,
//!   not cascaded, when the referenced record is deleted.

use crate::model::authority::AuthorityId;
use crate::model::directory::CompanyId;
use crate::model::status::StatusGroupId;
use crate::model::validation::{require_text, ValidationError};
use crate::model::Timestamps;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ProjectId = Uuid;

const REFERENCE_CODE_MAX: usize = 20;
const TITLE_MAX: usize = 120;

/// Top-level unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub uuid: ProjectId,
    pub reference_code: String,
    pub title: String,
    pub company_uuid: Option<CompanyId>,
    pub status_group_uuid: Option<StatusGroupId>,
    pub authority_uuid: AuthorityId,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

/// Create/update attributes for [`Project`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub reference_code: String,
    pub title: String,
    pub company_uuid: Option<CompanyId>,
    pub status_group_uuid: Option<StatusGroupId>,
}

impl ProjectDraft {
    pub fn new(reference_code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            reference_code: reference_code.into(),
            title: title.into(),
            company_uuid: None,
            status_group_uuid: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("reference_code", &self.reference_code, REFERENCE_CODE_MAX)?;
        require_text("title", &self.title, TITLE_MAX)
    }
}

impl Display for Project {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reference_code)
    }
}
