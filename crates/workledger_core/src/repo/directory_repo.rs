//! Directory repository: addresses, clients, email addresses, companies and
//! the company link tables.
//!
//! # Invariants
//! - Company links only join records of the same authority.
//! - Removing a link never removes the linked record.

use crate::integrity::cascade::DeleteReport;
use crate::integrity::rules::EntityKind;
use crate::integrity::scope::{
    ensure_in_scope, ensure_optional_reference, ensure_reference, require_writable, Scope,
};
use crate::model::directory::{
    Address, AddressDraft, AddressId, Client, ClientDraft, ClientId, Company, CompanyDraft,
    CompanyId, EmailAddress, EmailAddressDraft, EmailAddressId,
};
use crate::repo::{
    delete_scoped, ensure_connection_ready, push_uuid_filter, read_optional_uuid,
    read_timestamps, read_uuid, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const ADDRESS_COLUMNS: &str = "addresses.uuid AS uuid, first_line, second_line, city, county, \
     country, post_code, addresses.authority_uuid AS authority_uuid, \
     addresses.created_at AS created_at, addresses.updated_at AS updated_at";
const CLIENT_COLUMNS: &str = "clients.uuid AS uuid, fullname, \
     clients.authority_uuid AS authority_uuid, clients.created_at AS created_at, \
     clients.updated_at AS updated_at";
const EMAIL_COLUMNS: &str =
    "uuid, email, client_uuid, authority_uuid, created_at, updated_at";
const COMPANY_COLUMNS: &str = "companies.uuid AS uuid, name, website, \
     companies.authority_uuid AS authority_uuid, companies.created_at AS created_at, \
     companies.updated_at AS updated_at";

/// Exact-match filters for email address listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailAddressListQuery {
    pub client_uuid: Option<ClientId>,
}

/// Repository interface for contact/party records.
pub trait DirectoryRepository {
    fn create_address(&self, scope: &Scope, draft: &AddressDraft) -> RepoResult<Address>;
    fn get_address(&self, scope: &Scope, id: AddressId) -> RepoResult<Address>;
    fn list_addresses(&self, scope: &Scope) -> RepoResult<Vec<Address>>;
    fn update_address(
        &self,
        scope: &Scope,
        id: AddressId,
        draft: &AddressDraft,
    ) -> RepoResult<Address>;
    fn delete_address(&self, scope: &Scope, id: AddressId) -> RepoResult<DeleteReport>;

    fn create_client(&self, scope: &Scope, draft: &ClientDraft) -> RepoResult<Client>;
    fn get_client(&self, scope: &Scope, id: ClientId) -> RepoResult<Client>;
    fn list_clients(&self, scope: &Scope) -> RepoResult<Vec<Client>>;
    fn update_client(&self, scope: &Scope, id: ClientId, draft: &ClientDraft)
        -> RepoResult<Client>;
    /// Email addresses of the client survive with `client_uuid` cleared.
    fn delete_client(&self, scope: &Scope, id: ClientId) -> RepoResult<DeleteReport>;

    fn create_email_address(
        &self,
        scope: &Scope,
        draft: &EmailAddressDraft,
    ) -> RepoResult<EmailAddress>;
    fn get_email_address(&self, scope: &Scope, id: EmailAddressId) -> RepoResult<EmailAddress>;
    fn list_email_addresses(
        &self,
        scope: &Scope,
        query: &EmailAddressListQuery,
    ) -> RepoResult<Vec<EmailAddress>>;
    fn update_email_address(
        &self,
        scope: &Scope,
        id: EmailAddressId,
        draft: &EmailAddressDraft,
    ) -> RepoResult<EmailAddress>;
    fn delete_email_address(&self, scope: &Scope, id: EmailAddressId)
        -> RepoResult<DeleteReport>;

    fn create_company(&self, scope: &Scope, draft: &CompanyDraft) -> RepoResult<Company>;
    fn get_company(&self, scope: &Scope, id: CompanyId) -> RepoResult<Company>;
    fn list_companies(&self, scope: &Scope) -> RepoResult<Vec<Company>>;
    fn update_company(
        &self,
        scope: &Scope,
        id: CompanyId,
        draft: &CompanyDraft,
    ) -> RepoResult<Company>;
    /// Links are removed and projects lose their company reference.
    fn delete_company(&self, scope: &Scope, id: CompanyId) -> RepoResult<DeleteReport>;

    /// Links an address to a company. Linking twice is a no-op.
    fn link_address(&self, scope: &Scope, company: CompanyId, address: AddressId)
        -> RepoResult<()>;
    /// Returns whether a link was removed.
    fn unlink_address(
        &self,
        scope: &Scope,
        company: CompanyId,
        address: AddressId,
    ) -> RepoResult<bool>;
    fn list_company_addresses(&self, scope: &Scope, company: CompanyId)
        -> RepoResult<Vec<Address>>;
    /// Links a client to a company. Linking twice is a no-op.
    fn link_client(&self, scope: &Scope, company: CompanyId, client: ClientId) -> RepoResult<()>;
    /// Returns whether a link was removed.
    fn unlink_client(&self, scope: &Scope, company: CompanyId, client: ClientId)
        -> RepoResult<bool>;
    fn list_company_clients(&self, scope: &Scope, company: CompanyId) -> RepoResult<Vec<Client>>;
    fn list_client_companies(&self, scope: &Scope, client: ClientId) -> RepoResult<Vec<Company>>;
}

/// SQLite-backed directory repository.
pub struct SqliteDirectoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDirectoryRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_address(&self, scope: &Scope, id: AddressId) -> RepoResult<Address> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE uuid = ?1 AND authority_uuid = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), scope.authority_uuid().to_string()])?;
        match rows.next()? {
            Some(row) => parse_address_row(row),
            None => Err(RepoError::not_found(EntityKind::Address, id)),
        }
    }

    fn load_client(&self, scope: &Scope, id: ClientId) -> RepoResult<Client> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE uuid = ?1 AND authority_uuid = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), scope.authority_uuid().to_string()])?;
        match rows.next()? {
            Some(row) => parse_client_row(row),
            None => Err(RepoError::not_found(EntityKind::Client, id)),
        }
    }

    fn load_email_address(&self, scope: &Scope, id: EmailAddressId) -> RepoResult<EmailAddress> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EMAIL_COLUMNS} FROM email_addresses WHERE uuid = ?1 AND authority_uuid = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), scope.authority_uuid().to_string()])?;
        match rows.next()? {
            Some(row) => parse_email_row(row),
            None => Err(RepoError::not_found(EntityKind::EmailAddress, id)),
        }
    }

    fn load_company(&self, scope: &Scope, id: CompanyId) -> RepoResult<Company> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies WHERE uuid = ?1 AND authority_uuid = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), scope.authority_uuid().to_string()])?;
        match rows.next()? {
            Some(row) => parse_company_row(row),
            None => Err(RepoError::not_found(EntityKind::Company, id)),
        }
    }

    fn query_list<T>(
        &self,
        sql: &str,
        bind_values: Vec<Value>,
        parse: fn(&Row<'_>) -> RepoResult<T>,
    ) -> RepoResult<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse(row)?);
        }
        Ok(items)
    }
}

impl DirectoryRepository for SqliteDirectoryRepository<'_> {
    fn create_address(&self, scope: &Scope, draft: &AddressDraft) -> RepoResult<Address> {
        draft.validate()?;
        require_writable(self.conn, scope)?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO addresses (
                uuid,
                first_line,
                second_line,
                city,
                county,
                country,
                post_code,
                authority_uuid
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                id.to_string(),
                draft.first_line.as_str(),
                draft.second_line.as_deref(),
                draft.city.as_str(),
                draft.county.as_deref(),
                draft.country.as_deref(),
                draft.post_code.as_str(),
                scope.authority_uuid().to_string(),
            ],
        )?;
        self.load_address(scope, id)
    }

    fn get_address(&self, scope: &Scope, id: AddressId) -> RepoResult<Address> {
        self.load_address(scope, id)
    }

    fn list_addresses(&self, scope: &Scope) -> RepoResult<Vec<Address>> {
        self.query_list(
            &format!(
                "SELECT {ADDRESS_COLUMNS} FROM addresses
                 WHERE authority_uuid = ?
                 ORDER BY created_at ASC, addresses.rowid ASC;"
            ),
            vec![Value::Text(scope.authority_uuid().to_string())],
            parse_address_row,
        )
    }

    fn update_address(
        &self,
        scope: &Scope,
        id: AddressId,
        draft: &AddressDraft,
    ) -> RepoResult<Address> {
        draft.validate()?;
        require_writable(self.conn, scope)?;

        let changed = self.conn.execute(
            "UPDATE addresses
             SET
                first_line = ?3,
                second_line = ?4,
                city = ?5,
                county = ?6,
                country = ?7,
                post_code = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND authority_uuid = ?2;",
            params![
                id.to_string(),
                scope.authority_uuid().to_string(),
                draft.first_line.as_str(),
                draft.second_line.as_deref(),
                draft.city.as_str(),
                draft.county.as_deref(),
                draft.country.as_deref(),
                draft.post_code.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Address, id));
        }
        self.load_address(scope, id)
    }

    fn delete_address(&self, scope: &Scope, id: AddressId) -> RepoResult<DeleteReport> {
        delete_scoped(self.conn, scope, EntityKind::Address, id)
    }

    fn create_client(&self, scope: &Scope, draft: &ClientDraft) -> RepoResult<Client> {
        draft.validate()?;
        require_writable(self.conn, scope)?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO clients (uuid, fullname, authority_uuid) VALUES (?1, ?2, ?3);",
            params![
                id.to_string(),
                draft.fullname.as_str(),
                scope.authority_uuid().to_string(),
            ],
        )?;
        self.load_client(scope, id)
    }

    fn get_client(&self, scope: &Scope, id: ClientId) -> RepoResult<Client> {
        self.load_client(scope, id)
    }

    fn list_clients(&self, scope: &Scope) -> RepoResult<Vec<Client>> {
        self.query_list(
            &format!(
                "SELECT {CLIENT_COLUMNS} FROM clients
                 WHERE authority_uuid = ?
                 ORDER BY created_at ASC, clients.rowid ASC;"
            ),
            vec![Value::Text(scope.authority_uuid().to_string())],
            parse_client_row,
        )
    }

    fn update_client(
        &self,
        scope: &Scope,
        id: ClientId,
        draft: &ClientDraft,
    ) -> RepoResult<Client> {
        draft.validate()?;
        require_writable(self.conn, scope)?;

        let changed = self.conn.execute(
            "UPDATE clients
             SET fullname = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND authority_uuid = ?2;",
            params![
                id.to_string(),
                scope.authority_uuid().to_string(),
                draft.fullname.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Client, id));
        }
        self.load_client(scope, id)
    }

    fn delete_client(&self, scope: &Scope, id: ClientId) -> RepoResult<DeleteReport> {
        delete_scoped(self.conn, scope, EntityKind::Client, id)
    }

    fn create_email_address(
        &self,
        scope: &Scope,
        draft: &EmailAddressDraft,
    ) -> RepoResult<EmailAddress> {
        draft.validate()?;
        require_writable(self.conn, scope)?;
        ensure_optional_reference(
            self.conn,
            scope,
            EntityKind::EmailAddress,
            EntityKind::Client,
            draft.client_uuid,
        )?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO email_addresses (uuid, email, client_uuid, authority_uuid)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                id.to_string(),
                draft.email.as_str(),
                draft.client_uuid.map(|value| value.to_string()),
                scope.authority_uuid().to_string(),
            ],
        )?;
        self.load_email_address(scope, id)
    }

    fn get_email_address(&self, scope: &Scope, id: EmailAddressId) -> RepoResult<EmailAddress> {
        self.load_email_address(scope, id)
    }

    fn list_email_addresses(
        &self,
        scope: &Scope,
        query: &EmailAddressListQuery,
    ) -> RepoResult<Vec<EmailAddress>> {
        let mut sql =
            format!("SELECT {EMAIL_COLUMNS} FROM email_addresses WHERE authority_uuid = ?");
        let mut bind_values = vec![Value::Text(scope.authority_uuid().to_string())];
        push_uuid_filter(&mut sql, &mut bind_values, "client_uuid", query.client_uuid);
        sql.push_str(" ORDER BY created_at ASC, rowid ASC;");
        self.query_list(&sql, bind_values, parse_email_row)
    }

    fn update_email_address(
        &self,
        scope: &Scope,
        id: EmailAddressId,
        draft: &EmailAddressDraft,
    ) -> RepoResult<EmailAddress> {
        draft.validate()?;
        require_writable(self.conn, scope)?;
        ensure_in_scope(self.conn, scope, EntityKind::EmailAddress, id)?;
        ensure_optional_reference(
            self.conn,
            scope,
            EntityKind::EmailAddress,
            EntityKind::Client,
            draft.client_uuid,
        )?;

        self.conn.execute(
            "UPDATE email_addresses
             SET email = ?3,
                 client_uuid = ?4,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND authority_uuid = ?2;",
            params![
                id.to_string(),
                scope.authority_uuid().to_string(),
                draft.email.as_str(),
                draft.client_uuid.map(|value| value.to_string()),
            ],
        )?;
        self.load_email_address(scope, id)
    }

    fn delete_email_address(
        &self,
        scope: &Scope,
        id: EmailAddressId,
    ) -> RepoResult<DeleteReport> {
        delete_scoped(self.conn, scope, EntityKind::EmailAddress, id)
    }

    fn create_company(&self, scope: &Scope, draft: &CompanyDraft) -> RepoResult<Company> {
        draft.validate()?;
        require_writable(self.conn, scope)?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO companies (uuid, name, website, authority_uuid) VALUES (?1, ?2, ?3, ?4);",
            params![
                id.to_string(),
                draft.name.as_str(),
                draft.website.as_str(),
                scope.authority_uuid().to_string(),
            ],
        )?;
        self.load_company(scope, id)
    }

    fn get_company(&self, scope: &Scope, id: CompanyId) -> RepoResult<Company> {
        self.load_company(scope, id)
    }

    fn list_companies(&self, scope: &Scope) -> RepoResult<Vec<Company>> {
        self.query_list(
            &format!(
                "SELECT {COMPANY_COLUMNS} FROM companies
                 WHERE authority_uuid = ?
                 ORDER BY created_at ASC, companies.rowid ASC;"
            ),
            vec![Value::Text(scope.authority_uuid().to_string())],
            parse_company_row,
        )
    }

    fn update_company(
        &self,
        scope: &Scope,
        id: CompanyId,
        draft: &CompanyDraft,
    ) -> RepoResult<Company> {
        draft.validate()?;
        require_writable(self.conn, scope)?;

        let changed = self.conn.execute(
            "UPDATE companies
             SET name = ?3,
                 website = ?4,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND authority_uuid = ?2;",
            params![
                id.to_string(),
                scope.authority_uuid().to_string(),
                draft.name.as_str(),
                draft.website.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Company, id));
        }
        self.load_company(scope, id)
    }

    fn delete_company(&self, scope: &Scope, id: CompanyId) -> RepoResult<DeleteReport> {
        delete_scoped(self.conn, scope, EntityKind::Company, id)
    }

    fn link_address(
        &self,
        scope: &Scope,
        company: CompanyId,
        address: AddressId,
    ) -> RepoResult<()> {
        require_writable(self.conn, scope)?;
        ensure_in_scope(self.conn, scope, EntityKind::Company, company)?;
        ensure_reference(
            self.conn,
            scope,
            EntityKind::CompanyAddress,
            EntityKind::Address,
            address,
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO company_addresses (company_uuid, address_uuid) VALUES (?1, ?2);",
            params![company.to_string(), address.to_string()],
        )?;
        Ok(())
    }

    fn unlink_address(
        &self,
        scope: &Scope,
        company: CompanyId,
        address: AddressId,
    ) -> RepoResult<bool> {
        require_writable(self.conn, scope)?;
        ensure_in_scope(self.conn, scope, EntityKind::Company, company)?;
        let removed = self.conn.execute(
            "DELETE FROM company_addresses WHERE company_uuid = ?1 AND address_uuid = ?2;",
            params![company.to_string(), address.to_string()],
        )?;
        Ok(removed > 0)
    }

    fn list_company_addresses(
        &self,
        scope: &Scope,
        company: CompanyId,
    ) -> RepoResult<Vec<Address>> {
        ensure_in_scope(self.conn, scope, EntityKind::Company, company)?;
        self.query_list(
            &format!(
                "SELECT {ADDRESS_COLUMNS} FROM addresses
                 INNER JOIN company_addresses ON company_addresses.address_uuid = addresses.uuid
                 WHERE company_addresses.company_uuid = ?
                   AND addresses.authority_uuid = ?
                 ORDER BY addresses.created_at ASC, addresses.rowid ASC;"
            ),
            vec![
                Value::Text(company.to_string()),
                Value::Text(scope.authority_uuid().to_string()),
            ],
            parse_address_row,
        )
    }

    fn link_client(&self, scope: &Scope, company: CompanyId, client: ClientId) -> RepoResult<()> {
        require_writable(self.conn, scope)?;
        ensure_in_scope(self.conn, scope, EntityKind::Company, company)?;
        ensure_reference(
            self.conn,
            scope,
            EntityKind::CompanyClient,
            EntityKind::Client,
            client,
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO company_clients (company_uuid, client_uuid) VALUES (?1, ?2);",
            params![company.to_string(), client.to_string()],
        )?;
        Ok(())
    }

    fn unlink_client(
        &self,
        scope: &Scope,
        company: CompanyId,
        client: ClientId,
    ) -> RepoResult<bool> {
        require_writable(self.conn, scope)?;
        ensure_in_scope(self.conn, scope, EntityKind::Company, company)?;
        let removed = self.conn.execute(
            "DELETE FROM company_clients WHERE company_uuid = ?1 AND client_uuid = ?2;",
            params![company.to_string(), client.to_string()],
        )?;
        Ok(removed > 0)
    }

    fn list_company_clients(&self, scope: &Scope, company: CompanyId) -> RepoResult<Vec<Client>> {
        ensure_in_scope(self.conn, scope, EntityKind::Company, company)?;
        self.query_list(
            &format!(
                "SELECT {CLIENT_COLUMNS} FROM clients
                 INNER JOIN company_clients ON company_clients.client_uuid = clients.uuid
                 WHERE company_clients.company_uuid = ?
                   AND clients.authority_uuid = ?
                 ORDER BY clients.created_at ASC, clients.rowid ASC;"
            ),
            vec![
                Value::Text(company.to_string()),
                Value::Text(scope.authority_uuid().to_string()),
            ],
            parse_client_row,
        )
    }

    fn list_client_companies(&self, scope: &Scope, client: ClientId) -> RepoResult<Vec<Company>> {
        ensure_in_scope(self.conn, scope, EntityKind::Client, client)?;
        self.query_list(
            &format!(
                "SELECT {COMPANY_COLUMNS} FROM companies
                 INNER JOIN company_clients ON company_clients.company_uuid = companies.uuid
                 WHERE company_clients.client_uuid = ?
                   AND companies.authority_uuid = ?
                 ORDER BY companies.created_at ASC, companies.rowid ASC;"
            ),
            vec![
                Value::Text(client.to_string()),
                Value::Text(scope.authority_uuid().to_string()),
            ],
            parse_company_row,
        )
    }
}

fn parse_address_row(row: &Row<'_>) -> RepoResult<Address> {
    Ok(Address {
        uuid: read_uuid(row, "uuid")?,
        first_line: row.get("first_line")?,
        second_line: row.get("second_line")?,
        city: row.get("city")?,
        county: row.get("county")?,
        country: row.get("country")?,
        post_code: row.get("post_code")?,
        authority_uuid: read_uuid(row, "authority_uuid")?,
        timestamps: read_timestamps(row)?,
    })
}

fn parse_client_row(row: &Row<'_>) -> RepoResult<Client> {
    Ok(Client {
        uuid: read_uuid(row, "uuid")?,
        fullname: row.get("fullname")?,
        authority_uuid: read_uuid(row, "authority_uuid")?,
        timestamps: read_timestamps(row)?,
    })
}

fn parse_email_row(row: &Row<'_>) -> RepoResult<EmailAddress> {
    Ok(EmailAddress {
        uuid: read_uuid(row, "uuid")?,
        email: row.get("email")?,
        client_uuid: read_optional_uuid(row, "client_uuid")?,
        authority_uuid: read_uuid(row, "authority_uuid")?,
        timestamps: read_timestamps(row)?,
    })
}

fn parse_company_row(row: &Row<'_>) -> RepoResult<Company> {
    Ok(Company {
        uuid: read_uuid(row, "uuid")?,
        name: row.get("name")?,
        website: row.get("website")?,
        authority_uuid: read_uuid(row, "authority_uuid")?,
        timestamps: read_timestamps(row)?,
    })
}
