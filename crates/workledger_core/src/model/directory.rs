//! Contact/party records: addresses, clients, email addresses, companies.
//!
//! # Invariants
//! - Companies link to addresses and clients many-to-many; a link never owns
//!   the linked record.
//! - An email address may outlive its client (the reference is cleared).

use crate::model::authority::AuthorityId;
use crate::model::validation::{optional_text, require_text, validate_email, ValidationError};
use crate::model::Timestamps;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type AddressId = Uuid;
pub type ClientId = Uuid;
pub type EmailAddressId = Uuid;
pub type CompanyId = Uuid;

const ADDRESS_LINE_MAX: usize = 120;
const POST_CODE_MAX: usize = 10;
const CLIENT_NAME_MAX: usize = 80;
const COMPANY_NAME_MAX: usize = 255;
const WEBSITE_MAX: usize = 120;

/// Postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub uuid: AddressId,
    pub first_line: String,
    pub second_line: Option<String>,
    pub city: String,
    pub county: Option<String>,
    pub country: Option<String>,
    pub post_code: String,
    pub authority_uuid: AuthorityId,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

/// Create/update attributes for [`Address`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressDraft {
    pub first_line: String,
    pub second_line: Option<String>,
    pub city: String,
    pub county: Option<String>,
    pub country: Option<String>,
    pub post_code: String,
}

impl AddressDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("first_line", &self.first_line, ADDRESS_LINE_MAX)?;
        optional_text("second_line", self.second_line.as_deref(), ADDRESS_LINE_MAX)?;
        require_text("city", &self.city, ADDRESS_LINE_MAX)?;
        optional_text("county", self.county.as_deref(), ADDRESS_LINE_MAX)?;
        optional_text("country", self.country.as_deref(), ADDRESS_LINE_MAX)?;
        require_text("post_code", &self.post_code, POST_CODE_MAX)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.first_line)
    }
}

/// Person the tenant works for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub uuid: ClientId,
    pub fullname: String,
    pub authority_uuid: AuthorityId,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

/// Create/update attributes for [`Client`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDraft {
    pub fullname: String,
}

impl ClientDraft {
    pub fn new(fullname: impl Into<String>) -> Self {
        Self {
            fullname: fullname.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("fullname", &self.fullname, CLIENT_NAME_MAX)
    }
}

impl Display for Client {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fullname)
    }
}

/// Email address, optionally owned by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub uuid: EmailAddressId,
    pub email: String,
    /// Cleared when the client is deleted.
    pub client_uuid: Option<ClientId>,
    pub authority_uuid: AuthorityId,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

/// Create/update attributes for [`EmailAddress`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddressDraft {
    pub email: String,
    pub client_uuid: Option<ClientId>,
}

impl EmailAddressDraft {
    pub fn new(email: impl Into<String>, client_uuid: Option<ClientId>) -> Self {
        Self {
            email: email.into(),
            client_uuid,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_email(&self.email)
    }
}

/// Company with linked addresses and clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub uuid: CompanyId,
    pub name: String,
    pub website: String,
    pub authority_uuid: AuthorityId,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

/// Create/update attributes for [`Company`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyDraft {
    pub name: String,
    pub website: String,
}

impl CompanyDraft {
    pub fn new(name: impl Into<String>, website: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            website: website.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, COMPANY_NAME_MAX)?;
        optional_text("website", Some(self.website.as_str()), WEBSITE_MAX)
    }
}

impl Display for Company {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_requires_first_line_city_and_post_code() {
        let mut draft = AddressDraft {
            first_line: "1 High Street".to_string(),
            city: "Leeds".to_string(),
            post_code: "LS1 1AA".to_string(),
            ..AddressDraft::default()
        };
        assert!(draft.validate().is_ok());

        draft.post_code = "LS1 1AA EXTRA".to_string();
        assert_eq!(
            draft.validate(),
            Err(ValidationError::TooLong {
                field: "post_code",
                max_chars: 10
            })
        );

        draft.post_code = "LS1".to_string();
        draft.city = " ".to_string();
        assert_eq!(draft.validate(), Err(ValidationError::BlankField("city")));
    }

    #[test]
    fn company_website_may_be_empty() {
        assert!(CompanyDraft::new("Acme", "").validate().is_ok());
        assert!(CompanyDraft::new("", "acme.example").validate().is_err());
    }

    #[test]
    fn email_draft_rejects_malformed_email() {
        let draft = EmailAddressDraft::new("not-an-email", None);
        assert_eq!(draft.validate(), Err(ValidationError::InvalidEmail));
    }
}
