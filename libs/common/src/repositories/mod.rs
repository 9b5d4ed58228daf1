//! Record store: typed access to the hosted database
//!
//! [`RecordStore`] is the only way the rest of the workspace reaches the
//! backend. [`PgRecordStore`] talks to PostgreSQL; [`InMemoryRecordStore`]
//! serves tests and local development.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::DatabaseResult,
    models::{
        Company, Employee, EmployeeCredential, EmployeeFilter, EmployeePatch, Invoice,
        NewCompany, NewEmployee, PasswordPolicy, Payment, Product,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRecordStore;
pub use postgres::PgRecordStore;

/// Port for every query and mutation HoneyBEE issues against the backend.
///
/// Employee rows always come back joined with their company. Each call is
/// atomic: a failed mutation leaves no partial write behind.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Employees matching every predicate of `filter`, ordered by name
    async fn find_employees(&self, filter: &EmployeeFilter) -> DatabaseResult<Vec<Employee>>;

    /// Active employees with exactly this name, together with their stored credential
    async fn find_credentials(&self, name: &str) -> DatabaseResult<Vec<EmployeeCredential>>;

    async fn insert_employee(&self, new_employee: &NewEmployee) -> DatabaseResult<Employee>;

    /// Apply `patch` to the employee if it belongs to `company_id`.
    /// Returns `None` when no such employee exists in that company.
    async fn update_employee(
        &self,
        id: Uuid,
        company_id: Uuid,
        patch: &EmployeePatch,
    ) -> DatabaseResult<Option<Employee>>;

    /// Hard delete. Returns whether a row was removed.
    async fn delete_employee(&self, id: Uuid, company_id: Uuid) -> DatabaseResult<bool>;

    async fn list_companies(&self) -> DatabaseResult<Vec<Company>>;

    async fn insert_company(&self, new_company: &NewCompany) -> DatabaseResult<Company>;

    async fn list_invoices(&self) -> DatabaseResult<Vec<Invoice>>;

    async fn list_payments(&self) -> DatabaseResult<Vec<Payment>>;

    async fn list_products(&self, company_id: Uuid) -> DatabaseResult<Vec<Product>>;

    async fn find_password_policy(&self, company_id: Uuid)
    -> DatabaseResult<Option<PasswordPolicy>>;
}
