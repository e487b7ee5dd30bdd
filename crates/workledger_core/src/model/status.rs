//! Status taxonomy: groups of statuses used to categorize work items.

use crate::model::authority::AuthorityId;
use crate::model::validation::{require_text, ValidationError};
use crate::model::Timestamps;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type StatusGroupId = Uuid;
pub type StatusId = Uuid;

const TITLE_MAX: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusGroup {
    pub uuid: StatusGroupId,
    pub title: String,
    pub authority_uuid: AuthorityId,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusGroupDraft {
    pub title: String,
}

impl StatusGroupDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title, TITLE_MAX)
    }
}

/// One status inside a group; deleted together with its group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub uuid: StatusId,
    pub title: String,
    pub status_group_uuid: StatusGroupId,
    pub authority_uuid: AuthorityId,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDraft {
    pub title: String,
    pub status_group_uuid: StatusGroupId,
}

impl StatusDraft {
    pub fn new(title: impl Into<String>, status_group_uuid: StatusGroupId) -> Self {
        Self {
            title: title.into(),
            status_group_uuid,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title, TITLE_MAX)
    }
}

impl Display for StatusGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title)
    }
}
