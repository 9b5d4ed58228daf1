//! Integration tests for the infrastructure components
//!
//! These tests verify that the PostgreSQL database and Redis cache are
//! reachable and that the record store can read the HoneyBEE tables. They
//! need live services and are ignored by default:
//!
//! ```sh
//! DATABASE_URL=postgresql://... cargo test -p common -- --ignored
//! ```

use common::{
    PgRecordStore, RecordStore,
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool},
    models::{EmployeeFilter, NewCompany},
};
use sqlx::Row;
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires PostgreSQL and Redis"]
async fn test_infrastructure_integration() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    let row = sqlx::query("SELECT 1 as result").fetch_one(&pool).await?;
    let result: i32 = row.get("result");
    assert_eq!(result, 1, "PostgreSQL simple query test failed");

    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;
    assert!(
        redis_pool.health_check().await?,
        "Redis health check failed"
    );

    let test_key = "integration_test_key";
    let test_value = "integration_test_value";
    redis_pool.set(test_key, test_value, Some(10)).await?;
    assert_eq!(
        redis_pool.get(test_key).await?,
        Some(test_value.to_string()),
        "Redis SET/GET test failed"
    );
    redis_pool.delete(test_key).await?;
    assert_eq!(redis_pool.get(test_key).await?, None, "Redis delete operation failed");

    Ok(())
}

#[tokio::test]
#[ignore = "requires PostgreSQL with the HoneyBEE schema"]
async fn test_record_store_reads_schema() -> Result<(), Box<dyn std::error::Error>> {
    let pool = init_pool(&DatabaseConfig::from_env()?).await?;
    let store = PgRecordStore::new(pool);

    let company = store
        .insert_company(&NewCompany {
            name: format!("integration-{}", Uuid::new_v4()),
            email: None,
            phone: None,
            address: None,
        })
        .await?;

    let employees = store
        .find_employees(&EmployeeFilter::in_company(company.id))
        .await?;
    assert!(employees.is_empty());

    store.list_invoices().await?;
    store.list_payments().await?;
    store.list_products(company.id).await?;
    assert!(store.find_password_policy(company.id).await?.is_none());

    Ok(())
}


#[tokio::test]
#[ignore = "requires PostgreSQL with the HoneyBEE schema"]
async fn test_password_policy_is_read_from_password_settings() -> Result<(), Box<dyn std::error::Error>> {
    let pool = init_pool(&DatabaseConfig::from_env()?).await?;
    let store = PgRecordStore::new(pool.clone());

    let company = store
        .insert_company(&NewCompany {
            name: format!("policy-{}", Uuid::new_v4()),
            email: None,
            phone: None,
            address: None,
        })
        .await?;

    sqlx::query(
        r#"
        INSERT INTO password_settings
            (company_id, min_length, require_uppercase, require_lowercase,
             require_numbers, require_special_chars, max_login_attempts,
             password_expiry_days)
        VALUES ($1, 12, true, true, true, false, 3, 90)
        "#,
    )
    .bind(company.id)
    .execute(&pool)
    .await?;

    let policy = store
        .find_password_policy(company.id)
        .await?
        .ok_or("policy row not found")?;
    assert_eq!(policy.company_id, company.id);
    assert_eq!(policy.min_length, 12);
    assert!(policy.require_uppercase);
    assert!(!policy.require_special_chars);
    assert_eq!(policy.max_login_attempts, 3);
    assert_eq!(policy.password_expiry_days, Some(90));

    sqlx::query("DELETE FROM password_settings WHERE company_id = $1")
        .bind(company.id)
        .execute(&pool)
        .await?;
    Ok(())
}
