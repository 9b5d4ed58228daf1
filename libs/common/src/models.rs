//! Typed records for the tables HoneyBEE reads and writes

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Role assigned to employees created without one
pub const DEFAULT_ROLE: &str = "employee";

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

fn default_true() -> bool {
    true
}

/// Recognized employee roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Employee];

    /// Parse a stored role string. Matching is exact; anything else is unrecognized.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "employee" => Some(Role::Employee),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Employee => "employee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Company entity, the tenant boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// New company creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCompany {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Employee entity joined with its company.
///
/// This is also the session snapshot format, so it never carries the credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub company_id: Uuid,
    #[serde(default)]
    pub companies: Option<Company>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    /// The recognized role, if the stored string is one
    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }

    pub fn company_name(&self) -> Option<&str> {
        self.companies.as_ref().map(|c| c.name.as_str())
    }
}

/// Employee row together with its stored credential, used only for sign-in
#[derive(Debug, Clone)]
pub struct EmployeeCredential {
    pub employee: Employee,
    pub credential: String,
}

/// Employee insert payload. `credential` is already hashed by the caller.
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub name: String,
    pub email: Option<String>,
    pub credential: String,
    pub role: String,
    pub company_id: Uuid,
    pub is_active: bool,
}

/// Employee update payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmployeePatch {
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub email: Option<String>,
}

impl EmployeePatch {
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.is_active.is_none() && self.email.is_none()
    }
}

/// Equality predicates for employee lookups
#[derive(Debug, Clone, Default)]
pub struct EmployeeFilter {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub company_id: Option<Uuid>,
    pub active_only: bool,
}

impl EmployeeFilter {
    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn in_company(company_id: Uuid) -> Self {
        Self {
            company_id: Some(company_id),
            ..Self::default()
        }
    }

    pub fn active(mut self) -> Self {
        self.active_only = true;
        self
    }

    pub fn matches(&self, employee: &Employee) -> bool {
        self.id.is_none_or(|id| employee.id == id)
            && self.name.as_ref().is_none_or(|name| &employee.name == name)
            && self.company_id.is_none_or(|c| employee.company_id == c)
            && (!self.active_only || employee.is_active)
    }
}

/// Invoice entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub total_amount: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
}

/// Payment entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub payment_number: String,
    pub customer_name: String,
    pub amount: f64,
    pub status: String,
    pub payment_date: NaiveDate,
    pub payment_method: String,
}

/// Product entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: String,
    pub price: f64,
    pub stock: i64,
    pub status: String,
}

/// Per-company password rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    pub company_id: Uuid,
    pub min_length: u32,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_numbers: bool,
    pub require_special_chars: bool,
    pub max_login_attempts: u32,
    pub password_expiry_days: Option<u32>,
}
