//! Authentication state machine
//!
//! An [`Authenticator`] starts in [`AuthState::Unknown`]. [`Authenticator::initialize`]
//! re-validates whatever the session store holds against the record store and
//! settles on `Authenticated` or `Anonymous`. Sign-in and sign-out move between
//! those two states. The authenticator is the only writer of its session store.

use common::{
    RecordStore,
    models::{Employee, EmployeeFilter},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    error::{AuthError, AuthResult},
    password::verify_credential,
    session::SessionStore,
};

/// Where the authenticator stands
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "employee", rename_all = "lowercase")]
pub enum AuthState {
    Unknown,
    Checking,
    Authenticated(Employee),
    Anonymous,
}

impl AuthState {
    pub fn employee(&self) -> Option<&Employee> {
        match self {
            AuthState::Authenticated(employee) => Some(employee),
            _ => None,
        }
    }

    /// True once initialization has finished
    pub fn is_settled(&self) -> bool {
        matches!(self, AuthState::Authenticated(_) | AuthState::Anonymous)
    }
}

/// Holds the authenticated identity of one client
pub struct Authenticator {
    sessions: Arc<dyn SessionStore>,
    records: Arc<dyn RecordStore>,
    state: AuthState,
}

impl Authenticator {
    pub fn new(sessions: Arc<dyn SessionStore>, records: Arc<dyn RecordStore>) -> Self {
        Self {
            sessions,
            records,
            state: AuthState::Unknown,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// The authenticated employee, if any
    pub fn current(&self) -> Option<&Employee> {
        self.state.employee()
    }

    /// Re-validate the stored session. A no-op outside `Unknown`.
    pub async fn initialize(&mut self) -> &AuthState {
        if self.state != AuthState::Unknown {
            return &self.state;
        }
        self.state = AuthState::Checking;

        let Some(snapshot) = self.sessions.load().await else {
            self.state = AuthState::Anonymous;
            return &self.state;
        };

        match self.refresh(&snapshot).await {
            Ok(employee) => {
                self.sessions.save(&employee).await;
                info!("Session restored for employee {}", employee.id);
                self.state = AuthState::Authenticated(employee);
            }
            Err(e) => {
                warn!("Discarding session of employee {}: {}", snapshot.id, e);
                self.sessions.clear().await;
                self.state = AuthState::Anonymous;
            }
        }

        &self.state
    }

    async fn refresh(&self, snapshot: &Employee) -> AuthResult<Employee> {
        let found = self
            .records
            .find_employees(&EmployeeFilter::by_id(snapshot.id).active())
            .await?;

        found.into_iter().next().ok_or(AuthError::SessionInvalid)
    }

    /// Sign in with a login handle and password.
    ///
    /// The name is matched exactly, without trimming or case folding. A failed
    /// attempt leaves an existing authenticated identity untouched.
    pub async fn sign_in(&mut self, name: &str, password: &str) -> AuthResult<Employee> {
        if name.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "Name and password are required".to_string(),
            ));
        }

        let candidates = match self.records.find_credentials(name).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!("Credential lookup failed: {}", e);
                return Err(self.reject());
            }
        };

        let Some(employee) = candidates
            .into_iter()
            .find(|c| verify_credential(password, &c.credential))
            .map(|c| c.employee)
        else {
            info!("Rejected sign-in attempt");
            return Err(self.reject());
        };

        self.sessions.save(&employee).await;
        info!("Employee {} signed in", employee.id);
        self.state = AuthState::Authenticated(employee.clone());

        Ok(employee)
    }

    fn reject(&mut self) -> AuthError {
        if !matches!(self.state, AuthState::Authenticated(_)) {
            self.state = AuthState::Anonymous;
        }
        AuthError::InvalidCredentials
    }

    /// Clear the session and drop the identity. Idempotent.
    pub async fn sign_out(&mut self) {
        self.sessions.clear().await;
        if let Some(employee) = self.current() {
            info!("Employee {} signed out", employee.id);
        }
        self.state = AuthState::Anonymous;
    }
}
