//! API service routes

use analytics::TimeRange;
use auth::{AuthError, EmployeeRequest, rate_limiter::login_key};
use axum::{
    Extension, Json, Router,
    extract::{ConnectInfo, Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use common::models::{Employee, EmployeePatch, NewCompany};
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::{CurrentEmployee, session_middleware},
    state::AppState,
};

const TOKEN_LENGTH: usize = 48;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub employee: Employee,
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub range: Option<String>,
}

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/auth/session", get(current_session))
        .route("/employees", get(list_employees).post(create_employee))
        .route(
            "/employees/:id",
            patch(update_employee).delete(delete_employee),
        )
        .route("/employees/:id/toggle", post(toggle_employee))
        .route("/companies", get(list_companies).post(create_company))
        .route("/analytics", get(get_analytics))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .merge(protected_routes)
        .with_state(state)
}

fn new_client_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "honeybee-api"
    }))
}

/// Sign in and open a session under a new client token
pub async fn login(
    State(state): State<AppState>,
    client: Option<ConnectInfo<SocketAddr>>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let throttle_key = login_key(&payload.name, client.map(|ConnectInfo(addr)| addr.ip()));
    if !state.rate_limiter.is_allowed(&throttle_key).await {
        return Err(AuthError::TooManyAttempts.into());
    }

    let token = new_client_token();
    let mut authenticator = state.authenticator(&token);

    match authenticator.sign_in(&payload.name, &payload.password).await {
        Ok(employee) => {
            state.rate_limiter.reset(&throttle_key).await;
            Ok(Json(LoginResponse { token, employee }))
        }
        Err(err) => {
            if err == AuthError::InvalidCredentials {
                state.rate_limiter.record_failure(&throttle_key).await;
            }
            Err(err.into())
        }
    }
}

/// Close the session named by the bearer token. Succeeds whether or not one exists.
pub async fn logout(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> impl IntoResponse {
    if let Some(TypedHeader(Authorization(bearer))) = bearer {
        state.authenticator(bearer.token()).sign_out().await;
    }

    Json(json!({"message": "Signed out"}))
}

pub async fn current_session(
    Extension(CurrentEmployee(employee)): Extension<CurrentEmployee>,
) -> Json<Employee> {
    Json(employee)
}

pub async fn list_employees(
    State(state): State<AppState>,
    Extension(CurrentEmployee(caller)): Extension<CurrentEmployee>,
) -> ApiResult<Json<Vec<Employee>>> {
    Ok(Json(state.directory.list_employees(&caller).await?))
}

pub async fn create_employee(
    State(state): State<AppState>,
    Extension(CurrentEmployee(caller)): Extension<CurrentEmployee>,
    Json(payload): Json<EmployeeRequest>,
) -> ApiResult<impl IntoResponse> {
    let employee = state.directory.create_employee(&caller, &payload).await?;

    Ok((StatusCode::CREATED, Json(employee)))
}

pub async fn update_employee(
    State(state): State<AppState>,
    Extension(CurrentEmployee(caller)): Extension<CurrentEmployee>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EmployeePatch>,
) -> ApiResult<Json<Employee>> {
    Ok(Json(
        state.directory.update_employee(&caller, id, &payload).await?,
    ))
}

pub async fn toggle_employee(
    State(state): State<AppState>,
    Extension(CurrentEmployee(caller)): Extension<CurrentEmployee>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Employee>> {
    Ok(Json(state.directory.toggle_active(&caller, id).await?))
}

pub async fn delete_employee(
    State(state): State<AppState>,
    Extension(CurrentEmployee(caller)): Extension<CurrentEmployee>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.directory.delete_employee(&caller, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_companies(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.directory.list_companies().await?))
}

pub async fn create_company(
    State(state): State<AppState>,
    Extension(CurrentEmployee(caller)): Extension<CurrentEmployee>,
    Json(payload): Json<NewCompany>,
) -> ApiResult<impl IntoResponse> {
    let company = state.directory.create_company(&caller, &payload).await?;

    Ok((StatusCode::CREATED, Json(company)))
}

/// Analytics for the caller's company over the requested window (default 6 months)
pub async fn get_analytics(
    State(state): State<AppState>,
    Extension(CurrentEmployee(caller)): Extension<CurrentEmployee>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<impl IntoResponse> {
    let range = match query.range.as_deref() {
        Some(raw) => raw
            .parse::<TimeRange>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
        None => TimeRange::default(),
    };

    info!(
        "Analytics requested for company {} ({})",
        caller.company_id, range
    );
    let snapshot = state.analytics.snapshot(caller.company_id, range).await;

    Ok(Json(snapshot.as_ref().clone()))
}
