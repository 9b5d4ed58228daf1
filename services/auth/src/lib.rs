//! Employee authentication for HoneyBEE
//!
//! Sign-in against the `employees` table, a persisted session snapshot that is
//! re-validated on every initialization, the role gate for employee
//! management, and the directory operations that sit behind that gate.

pub mod authenticator;
pub mod authorization;
pub mod directory;
pub mod error;
pub mod password;
pub mod rate_limiter;
pub mod session;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use authenticator::{AuthState, Authenticator};
pub use authorization::can_manage_employees;
pub use directory::{Directory, EmployeeRequest};
pub use error::{AuthError, AuthResult};
pub use session::{SessionStore, SessionStoreProvider};
