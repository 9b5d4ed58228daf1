//! Authorization gate for employee management

use common::models::{Employee, Role};

/// Whether the identity may create, update or delete employees.
///
/// Only the recognized `admin` and `manager` roles qualify. Unrecognized
/// roles and an absent identity are denied.
pub fn can_manage_employees(identity: Option<&Employee>) -> bool {
    matches!(
        identity.and_then(Employee::role),
        Some(Role::Admin | Role::Manager)
    )
}

/// Whether the identity may create companies
pub fn can_manage_companies(identity: Option<&Employee>) -> bool {
    matches!(identity.and_then(Employee::role), Some(Role::Admin))
}
