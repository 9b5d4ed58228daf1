//! Session middleware
//!
//! The bearer token names the client's session. Every request re-validates
//! that session against the record store before the handler runs.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use common::models::Employee;
use tracing::debug;

use crate::{error::ApiError, state::AppState};

/// The employee whose session authorized the request
#[derive(Debug, Clone)]
pub struct CurrentEmployee(pub Employee);

/// Bearer token the request was made with
#[derive(Debug, Clone)]
pub struct ClientToken(pub String);

pub async fn session_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::Unauthorized)?;
    let token = bearer.token().to_string();

    let mut authenticator = state.authenticator(&token);
    authenticator.initialize().await;

    let Some(employee) = authenticator.current().cloned() else {
        debug!("Request carried a token without a valid session");
        return Err(ApiError::Unauthorized);
    };

    req.extensions_mut().insert(CurrentEmployee(employee));
    req.extensions_mut().insert(ClientToken(token));

    Ok(next.run(req).await)
}
