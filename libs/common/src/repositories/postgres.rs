//! PostgreSQL record store

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use tracing::{error, info};
use uuid::Uuid;

use super::RecordStore;
use crate::{
    error::{DatabaseError, DatabaseResult},
    models::{
        Company, DEFAULT_ROLE, Employee, EmployeeCredential, EmployeeFilter, EmployeePatch,
        Invoice, NewCompany, NewEmployee, PasswordPolicy, Payment, Product,
    },
};

/// Employee columns joined with the owning company. Callers append the
/// `FROM` source aliased as `e`.
const EMPLOYEE_COLUMNS: &str = r#"
    SELECT e.id, e.name, e.email,
           COALESCE(e.role, 'employee') AS role,
           COALESCE(e.is_active, TRUE) AS is_active,
           e.company_id, e.created_at, e.updated_at,
           c.id AS company_ref, c.name AS company_name, c.email AS company_email,
           c.phone AS company_phone, c.address AS company_address
"#;

fn employee_from_row(row: &PgRow) -> DatabaseResult<Employee> {
    let company_ref: Option<Uuid> = row.try_get("company_ref")?;
    let companies = match company_ref {
        Some(id) => Some(Company {
            id,
            name: row.try_get("company_name")?,
            email: row.try_get("company_email")?,
            phone: row.try_get("company_phone")?,
            address: row.try_get("company_address")?,
        }),
        None => None,
    };

    let role: Option<String> = row.try_get("role")?;

    Ok(Employee {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        role: role.unwrap_or_else(|| DEFAULT_ROLE.to_string()),
        is_active: row.try_get("is_active")?,
        company_id: row.try_get("company_id")?,
        companies,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn company_from_row(row: &PgRow) -> DatabaseResult<Company> {
    Ok(Company {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
    })
}

fn non_negative(value: i32, column: &str) -> DatabaseResult<u32> {
    u32::try_from(value)
        .map_err(|_| DatabaseError::Decode(format!("{} must not be negative, got {}", column, value)))
}

/// Record store backed by the hosted PostgreSQL database
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Create a new record store over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn find_employees(&self, filter: &EmployeeFilter) -> DatabaseResult<Vec<Employee>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(EMPLOYEE_COLUMNS);
        query.push(" FROM employees e LEFT JOIN companies c ON c.id = e.company_id WHERE TRUE");

        if let Some(id) = filter.id {
            query.push(" AND e.id = ").push_bind(id);
        }
        if let Some(name) = &filter.name {
            query.push(" AND e.name = ").push_bind(name.clone());
        }
        if let Some(company_id) = filter.company_id {
            query.push(" AND e.company_id = ").push_bind(company_id);
        }
        if filter.active_only {
            query.push(" AND COALESCE(e.is_active, TRUE)");
        }
        query.push(" ORDER BY e.name");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(employee_from_row).collect()
    }

    async fn find_credentials(&self, name: &str) -> DatabaseResult<Vec<EmployeeCredential>> {
        let sql = format!(
            "{}, e.password FROM employees e LEFT JOIN companies c ON c.id = e.company_id \
             WHERE e.name = $1 AND COALESCE(e.is_active, TRUE) ORDER BY e.created_at",
            EMPLOYEE_COLUMNS
        );

        let rows = sqlx::query(&sql).bind(name).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> DatabaseResult<EmployeeCredential> {
                let credential: Option<String> = row.try_get("password")?;
                Ok(EmployeeCredential {
                    employee: employee_from_row(row)?,
                    credential: credential.unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn insert_employee(&self, new_employee: &NewEmployee) -> DatabaseResult<Employee> {
        info!(
            "Inserting employee {} into company {}",
            new_employee.name, new_employee.company_id
        );

        let sql = format!(
            r#"
            WITH e AS (
                INSERT INTO employees (name, email, password, role, company_id, is_active)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            )
            {} FROM e LEFT JOIN companies c ON c.id = e.company_id
            "#,
            EMPLOYEE_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(&new_employee.name)
            .bind(&new_employee.email)
            .bind(&new_employee.credential)
            .bind(&new_employee.role)
            .bind(new_employee.company_id)
            .bind(new_employee.is_active)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to insert employee: {}", e);
                DatabaseError::from(e)
            })?;

        employee_from_row(&row)
    }

    async fn update_employee(
        &self,
        id: Uuid,
        company_id: Uuid,
        patch: &EmployeePatch,
    ) -> DatabaseResult<Option<Employee>> {
        let sql = format!(
            r#"
            WITH e AS (
                UPDATE employees
                SET role = COALESCE($3, role),
                    is_active = COALESCE($4, is_active),
                    email = COALESCE($5, email),
                    updated_at = NOW()
                WHERE id = $1 AND company_id = $2
                RETURNING *
            )
            {} FROM e LEFT JOIN companies c ON c.id = e.company_id
            "#,
            EMPLOYEE_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .bind(company_id)
            .bind(&patch.role)
            .bind(patch.is_active)
            .bind(&patch.email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(employee_from_row).transpose()
    }

    async fn delete_employee(&self, id: Uuid, company_id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM employees WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_companies(&self) -> DatabaseResult<Vec<Company>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, email, phone, address
            FROM companies
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(company_from_row).collect()
    }

    async fn insert_company(&self, new_company: &NewCompany) -> DatabaseResult<Company> {
        info!("Inserting company {}", new_company.name);

        let row = sqlx::query(
            r#"
            INSERT INTO companies (name, email, phone, address)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, phone, address
            "#,
        )
        .bind(&new_company.name)
        .bind(&new_company.email)
        .bind(&new_company.phone)
        .bind(&new_company.address)
        .fetch_one(&self.pool)
        .await?;

        company_from_row(&row)
    }

    async fn list_invoices(&self) -> DatabaseResult<Vec<Invoice>> {
        let rows = sqlx::query(
            r#"
            SELECT id, invoice_number, customer_name, customer_email,
                   total_amount::float8 AS total_amount, status, created_at,
                   due_date::date AS due_date
            FROM invoices
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> DatabaseResult<Invoice> {
                Ok(Invoice {
                    id: row.try_get("id")?,
                    invoice_number: row.try_get("invoice_number")?,
                    customer_name: row.try_get("customer_name")?,
                    customer_email: row.try_get("customer_email")?,
                    total_amount: row.try_get("total_amount")?,
                    status: row.try_get("status")?,
                    created_at: row.try_get("created_at")?,
                    due_date: row.try_get("due_date")?,
                })
            })
            .collect()
    }

    async fn list_payments(&self) -> DatabaseResult<Vec<Payment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, payment_number, customer_name, amount::float8 AS amount, status,
                   payment_date::date AS payment_date, payment_method
            FROM payments
            ORDER BY payment_date
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> DatabaseResult<Payment> {
                Ok(Payment {
                    id: row.try_get("id")?,
                    payment_number: row.try_get("payment_number")?,
                    customer_name: row.try_get("customer_name")?,
                    amount: row.try_get("amount")?,
                    status: row.try_get("status")?,
                    payment_date: row.try_get("payment_date")?,
                    payment_method: row.try_get("payment_method")?,
                })
            })
            .collect()
    }

    async fn list_products(&self, company_id: Uuid) -> DatabaseResult<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT id, company_id, name, sku, category, price::float8 AS price,
                   stock::int8 AS stock, COALESCE(status, 'active') AS status
            FROM products
            WHERE company_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> DatabaseResult<Product> {
                Ok(Product {
                    id: row.try_get("id")?,
                    company_id: row.try_get("company_id")?,
                    name: row.try_get("name")?,
                    sku: row.try_get("sku")?,
                    category: row.try_get("category")?,
                    price: row.try_get("price")?,
                    stock: row.try_get("stock")?,
                    status: row.try_get("status")?,
                })
            })
            .collect()
    }

    async fn find_password_policy(
        &self,
        company_id: Uuid,
    ) -> DatabaseResult<Option<PasswordPolicy>> {
        let row = sqlx::query(
            r#"
            SELECT company_id, min_length, require_uppercase, require_lowercase,
                   require_numbers, require_special_chars, max_login_attempts,
                   password_expiry_days
            FROM password_settings
            WHERE company_id = $1
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expiry: Option<i32> = row.try_get("password_expiry_days")?;
        Ok(Some(PasswordPolicy {
            company_id: row.try_get("company_id")?,
            min_length: non_negative(row.try_get("min_length")?, "min_length")?,
            require_uppercase: row.try_get("require_uppercase")?,
            require_lowercase: row.try_get("require_lowercase")?,
            require_numbers: row.try_get("require_numbers")?,
            require_special_chars: row.try_get("require_special_chars")?,
            max_login_attempts: non_negative(
                row.try_get("max_login_attempts")?,
                "max_login_attempts",
            )?,
            password_expiry_days: expiry
                .map(|days| non_negative(days, "password_expiry_days"))
                .transpose()?,
        }))
    }
}
