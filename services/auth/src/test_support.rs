use chrono::Utc;
use common::models::{Company, Employee};
use uuid::Uuid;

pub fn company(name: &str) -> Company {
    Company {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: None,
        phone: None,
        address: None,
    }
}

pub fn employee_in(name: &str, role: &str, company: &Company) -> Employee {
    Employee {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: Some(format!("{}@hive.co", name)),
        role: role.to_string(),
        is_active: true,
        company_id: company.id,
        companies: Some(company.clone()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn employee(name: &str, role: &str) -> Employee {
    employee_in(name, role, &company("Hive Co"))
}
