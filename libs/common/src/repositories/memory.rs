//! In-memory record store
//!
//! Mirrors the PostgreSQL store's semantics (company join, exact matching,
//! ordering) so services can be exercised without a database. Calls can be
//! made to fail with [`InMemoryRecordStore::set_unavailable`].

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::RecordStore;
use crate::{
    error::{DatabaseError, DatabaseResult},
    models::{
        Company, Employee, EmployeeCredential, EmployeeFilter, EmployeePatch, Invoice,
        NewCompany, NewEmployee, PasswordPolicy, Payment, Product,
    },
};

#[derive(Default)]
struct Tables {
    companies: Vec<Company>,
    employees: Vec<(Employee, String)>,
    invoices: Vec<Invoice>,
    payments: Vec<Payment>,
    products: Vec<Product>,
    password_policies: Vec<PasswordPolicy>,
}

impl Tables {
    fn joined(&self, employee: &Employee) -> Employee {
        let mut employee = employee.clone();
        employee.companies = self
            .companies
            .iter()
            .find(|c| c.id == employee.company_id)
            .cloned();
        employee
    }
}

/// Record store holding every table in process memory
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    tables: Arc<RwLock<Tables>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`DatabaseError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> DatabaseResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DatabaseError::Unavailable(
                "in-memory record store switched off".to_string(),
            ));
        }
        Ok(())
    }

    /// Seed a company directly, bypassing availability checks
    pub async fn seed_company(&self, company: Company) {
        self.tables.write().await.companies.push(company);
    }

    /// Seed an employee with its stored credential, bypassing availability checks
    pub async fn seed_employee(&self, employee: Employee, credential: impl Into<String>) {
        self.tables
            .write()
            .await
            .employees
            .push((employee, credential.into()));
    }

    pub async fn seed_invoices(&self, invoices: impl IntoIterator<Item = Invoice>) {
        self.tables.write().await.invoices.extend(invoices);
    }

    pub async fn seed_payments(&self, payments: impl IntoIterator<Item = Payment>) {
        self.tables.write().await.payments.extend(payments);
    }

    pub async fn seed_products(&self, products: impl IntoIterator<Item = Product>) {
        self.tables.write().await.products.extend(products);
    }

    pub async fn seed_password_policy(&self, policy: PasswordPolicy) {
        self.tables.write().await.password_policies.push(policy);
    }

    /// Stored credential of an employee, for asserting on hashing
    pub async fn credential_of(&self, id: Uuid) -> Option<String> {
        self.tables
            .read()
            .await
            .employees
            .iter()
            .find(|(e, _)| e.id == id)
            .map(|(_, credential)| credential.clone())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find_employees(&self, filter: &EmployeeFilter) -> DatabaseResult<Vec<Employee>> {
        self.check_available()?;
        let tables = self.tables.read().await;

        let mut found: Vec<Employee> = tables
            .employees
            .iter()
            .filter(|(e, _)| filter.matches(e))
            .map(|(e, _)| tables.joined(e))
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(found)
    }

    async fn find_credentials(&self, name: &str) -> DatabaseResult<Vec<EmployeeCredential>> {
        self.check_available()?;
        let tables = self.tables.read().await;

        let mut matches: Vec<EmployeeCredential> = tables
            .employees
            .iter()
            .filter(|(e, _)| e.name == name && e.is_active)
            .map(|(e, credential)| EmployeeCredential {
                employee: tables.joined(e),
                credential: credential.clone(),
            })
            .collect();
        matches.sort_by_key(|m| m.employee.created_at);
        Ok(matches)
    }

    async fn insert_employee(&self, new_employee: &NewEmployee) -> DatabaseResult<Employee> {
        self.check_available()?;
        let mut tables = self.tables.write().await;

        if !tables.companies.iter().any(|c| c.id == new_employee.company_id) {
            return Err(DatabaseError::Unavailable(format!(
                "foreign key violation: company {} does not exist",
                new_employee.company_id
            )));
        }

        let now = Utc::now();
        let employee = Employee {
            id: Uuid::new_v4(),
            name: new_employee.name.clone(),
            email: new_employee.email.clone(),
            role: new_employee.role.clone(),
            is_active: new_employee.is_active,
            company_id: new_employee.company_id,
            companies: None,
            created_at: now,
            updated_at: now,
        };
        tables
            .employees
            .push((employee.clone(), new_employee.credential.clone()));

        Ok(tables.joined(&employee))
    }

    async fn update_employee(
        &self,
        id: Uuid,
        company_id: Uuid,
        patch: &EmployeePatch,
    ) -> DatabaseResult<Option<Employee>> {
        self.check_available()?;
        let mut tables = self.tables.write().await;

        let Some((employee, _)) = tables
            .employees
            .iter_mut()
            .find(|(e, _)| e.id == id && e.company_id == company_id)
        else {
            return Ok(None);
        };

        if let Some(role) = &patch.role {
            employee.role = role.clone();
        }
        if let Some(is_active) = patch.is_active {
            employee.is_active = is_active;
        }
        if let Some(email) = &patch.email {
            employee.email = Some(email.clone());
        }
        employee.updated_at = Utc::now();

        let updated = employee.clone();
        Ok(Some(tables.joined(&updated)))
    }

    async fn delete_employee(&self, id: Uuid, company_id: Uuid) -> DatabaseResult<bool> {
        self.check_available()?;
        let mut tables = self.tables.write().await;

        let before = tables.employees.len();
        tables
            .employees
            .retain(|(e, _)| !(e.id == id && e.company_id == company_id));

        Ok(tables.employees.len() < before)
    }

    async fn list_companies(&self) -> DatabaseResult<Vec<Company>> {
        self.check_available()?;
        let mut companies = self.tables.read().await.companies.clone();
        companies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(companies)
    }

    async fn insert_company(&self, new_company: &NewCompany) -> DatabaseResult<Company> {
        self.check_available()?;
        let company = Company {
            id: Uuid::new_v4(),
            name: new_company.name.clone(),
            email: new_company.email.clone(),
            phone: new_company.phone.clone(),
            address: new_company.address.clone(),
        };
        self.tables.write().await.companies.push(company.clone());
        Ok(company)
    }

    async fn list_invoices(&self) -> DatabaseResult<Vec<Invoice>> {
        self.check_available()?;
        let mut invoices = self.tables.read().await.invoices.clone();
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invoices)
    }

    async fn list_payments(&self) -> DatabaseResult<Vec<Payment>> {
        self.check_available()?;
        let mut payments = self.tables.read().await.payments.clone();
        payments.sort_by(|a, b| a.payment_date.cmp(&b.payment_date));
        Ok(payments)
    }

    async fn list_products(&self, company_id: Uuid) -> DatabaseResult<Vec<Product>> {
        self.check_available()?;
        Ok(self
            .tables
            .read()
            .await
            .products
            .iter()
            .filter(|p| p.company_id == company_id)
            .cloned()
            .collect())
    }

    async fn find_password_policy(
        &self,
        company_id: Uuid,
    ) -> DatabaseResult<Option<PasswordPolicy>> {
        self.check_available()?;
        Ok(self
            .tables
            .read()
            .await
            .password_policies
            .iter()
            .find(|p| p.company_id == company_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(name: &str) -> Company {
        Company {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: None,
            phone: None,
            address: None,
        }
    }

    fn new_employee(name: &str, company_id: Uuid) -> NewEmployee {
        NewEmployee {
            name: name.to_string(),
            email: None,
            credential: "secret".to_string(),
            role: "employee".to_string(),
            company_id,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_insert_joins_company_and_lists_by_name() {
        let store = InMemoryRecordStore::new();
        let hive = company("Hive Co");
        store.seed_company(hive.clone()).await;

        store.insert_employee(&new_employee("zoe", hive.id)).await.unwrap();
        let amy = store.insert_employee(&new_employee("amy", hive.id)).await.unwrap();
        assert_eq!(amy.company_name(), Some("Hive Co"));

        let listed = store
            .find_employees(&EmployeeFilter::in_company(hive.id))
            .await
            .unwrap();
        let names: Vec<&str> = listed.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["amy", "zoe"]);
    }

    #[tokio::test]
    async fn test_mutations_are_scoped_to_company() {
        let store = InMemoryRecordStore::new();
        let hive = company("Hive Co");
        let other = company("Other Co");
        store.seed_company(hive.clone()).await;
        store.seed_company(other.clone()).await;

        let amy = store.insert_employee(&new_employee("amy", hive.id)).await.unwrap();
        let patch = EmployeePatch {
            is_active: Some(false),
            ..EmployeePatch::default()
        };

        assert!(store.update_employee(amy.id, other.id, &patch).await.unwrap().is_none());
        assert!(!store.delete_employee(amy.id, other.id).await.unwrap());

        let updated = store.update_employee(amy.id, hive.id, &patch).await.unwrap().unwrap();
        assert!(!updated.is_active);
        assert!(store.find_credentials("amy").await.unwrap().is_empty());
        assert!(store.delete_employee(amy.id, hive.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_credentials_come_back_in_creation_order() {
        let store = InMemoryRecordStore::new();
        let hive = company("Hive Co");
        store.seed_company(hive.clone()).await;

        let template = store.insert_employee(&new_employee("sam", hive.id)).await.unwrap();
        store.delete_employee(template.id, hive.id).await.unwrap();

        let older = Employee {
            id: Uuid::new_v4(),
            created_at: template.created_at - chrono::Duration::days(30),
            ..template.clone()
        };
        let newer = Employee {
            id: Uuid::new_v4(),
            ..template
        };
        store.seed_employee(newer.clone(), "newer").await;
        store.seed_employee(older.clone(), "older").await;

        let found = store.find_credentials("sam").await.unwrap();
        let ids: Vec<Uuid> = found.iter().map(|c| c.employee.id).collect();
        assert_eq!(ids, vec![older.id, newer.id]);
        assert_eq!(found[0].credential, "older");
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = InMemoryRecordStore::new();
        store.set_unavailable(true);

        let result = store.find_employees(&EmployeeFilter::default()).await;
        assert!(matches!(result, Err(DatabaseError::Unavailable(_))));
        assert!(store.list_payments().await.is_err());

        store.set_unavailable(false);
        assert!(store.list_payments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_requires_existing_company() {
        let store = InMemoryRecordStore::new();
        let result = store.insert_employee(&new_employee("amy", Uuid::new_v4())).await;
        assert!(result.is_err());
    }
}
