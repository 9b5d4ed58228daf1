//! Employee and company management on behalf of an authenticated identity
//!
//! Every employee operation is gated by [`can_manage_employees`] and scoped to
//! the caller's company. Validation runs before any backend call, so a
//! rejected request never touches the record store.

use common::{
    RecordStore,
    models::{
        Company, DEFAULT_ROLE, Employee, EmployeeFilter, EmployeePatch, NewCompany, NewEmployee,
        Role,
    },
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    authorization::{can_manage_companies, can_manage_employees},
    error::{AuthError, AuthResult},
    password::hash_credential,
    validation::{validate_email, validate_name, validate_password},
};

/// Employee creation request
#[derive(Debug, Clone, Deserialize)]
pub struct EmployeeRequest {
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Employee directory backed by the record store
#[derive(Clone)]
pub struct Directory {
    records: Arc<dyn RecordStore>,
}

fn require_manager(caller: &Employee) -> AuthResult<()> {
    if can_manage_employees(Some(caller)) {
        Ok(())
    } else {
        info!(
            "Employee {} with role {:?} denied employee management",
            caller.id, caller.role
        );
        Err(AuthError::Forbidden)
    }
}

fn checked_role(role: &str) -> AuthResult<String> {
    Role::parse(role)
        .map(|r| r.as_str().to_string())
        .ok_or_else(|| AuthError::Validation(format!("Unknown role: {}", role)))
}

/// Blank optional email reads as no email
fn checked_email(email: Option<&str>) -> AuthResult<Option<String>> {
    match email {
        None | Some("") => Ok(None),
        Some(email) => {
            validate_email(email).map_err(AuthError::Validation)?;
            Ok(Some(email.to_string()))
        }
    }
}

impl Directory {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Employees of the caller's company, ordered by name
    pub async fn list_employees(&self, caller: &Employee) -> AuthResult<Vec<Employee>> {
        require_manager(caller)?;

        self.records
            .find_employees(&EmployeeFilter::in_company(caller.company_id))
            .await
            .map_err(|e| {
                error!("Failed to list employees of {}: {}", caller.company_id, e);
                e.into()
            })
    }

    /// Create an active employee in the caller's company with a hashed credential
    pub async fn create_employee(
        &self,
        caller: &Employee,
        request: &EmployeeRequest,
    ) -> AuthResult<Employee> {
        require_manager(caller)?;

        validate_name(&request.name).map_err(AuthError::Validation)?;
        if request.password.is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }
        let email = checked_email(request.email.as_deref())?;
        let role = checked_role(request.role.as_deref().unwrap_or(DEFAULT_ROLE))?;

        let policy = self.records.find_password_policy(caller.company_id).await?;
        validate_password(&request.password, policy.as_ref()).map_err(AuthError::Validation)?;

        let new_employee = NewEmployee {
            name: request.name.clone(),
            email,
            credential: hash_credential(&request.password)?,
            role,
            company_id: caller.company_id,
            is_active: true,
        };

        let created = self.records.insert_employee(&new_employee).await.map_err(|e| {
            error!("Failed to create employee in {}: {}", caller.company_id, e);
            AuthError::from(e)
        })?;
        info!("Employee {} created by {}", created.id, caller.id);

        Ok(created)
    }

    /// Change role, active flag or email of an employee in the caller's company
    pub async fn update_employee(
        &self,
        caller: &Employee,
        id: Uuid,
        patch: &EmployeePatch,
    ) -> AuthResult<Employee> {
        require_manager(caller)?;

        if patch.is_empty() {
            return Err(AuthError::Validation("Nothing to update".to_string()));
        }
        let patch = EmployeePatch {
            role: patch.role.as_deref().map(checked_role).transpose()?,
            is_active: patch.is_active,
            email: match patch.email.as_deref() {
                Some(email) => {
                    validate_email(email).map_err(AuthError::Validation)?;
                    Some(email.to_string())
                }
                None => None,
            },
        };

        let updated = self
            .records
            .update_employee(id, caller.company_id, &patch)
            .await?
            .ok_or(AuthError::NotFound)?;
        info!("Employee {} updated by {}", id, caller.id);

        Ok(updated)
    }

    /// Flip the active flag of an employee in the caller's company
    pub async fn toggle_active(&self, caller: &Employee, id: Uuid) -> AuthResult<Employee> {
        require_manager(caller)?;

        let current = self
            .records
            .find_employees(&EmployeeFilter {
                id: Some(id),
                company_id: Some(caller.company_id),
                ..EmployeeFilter::default()
            })
            .await?
            .into_iter()
            .next()
            .ok_or(AuthError::NotFound)?;

        let patch = EmployeePatch {
            is_active: Some(!current.is_active),
            ..EmployeePatch::default()
        };
        self.update_employee(caller, id, &patch).await
    }

    /// Hard-delete an employee of the caller's company
    pub async fn delete_employee(&self, caller: &Employee, id: Uuid) -> AuthResult<()> {
        require_manager(caller)?;

        if !self.records.delete_employee(id, caller.company_id).await? {
            return Err(AuthError::NotFound);
        }
        info!("Employee {} deleted by {}", id, caller.id);

        Ok(())
    }

    pub async fn list_companies(&self) -> AuthResult<Vec<Company>> {
        Ok(self.records.list_companies().await?)
    }

    /// Register a company. Admins only.
    pub async fn create_company(
        &self,
        caller: &Employee,
        new_company: &NewCompany,
    ) -> AuthResult<Company> {
        if !can_manage_companies(Some(caller)) {
            return Err(AuthError::Forbidden);
        }
        if new_company.name.trim().is_empty() {
            return Err(AuthError::Validation("Company name is required".to_string()));
        }
        if let Some(email) = new_company.email.as_deref().filter(|e| !e.is_empty()) {
            validate_email(email).map_err(AuthError::Validation)?;
        }

        let company = self.records.insert_company(new_company).await?;
        info!("Company {} created by {}", company.id, caller.id);

        Ok(company)
    }
}
