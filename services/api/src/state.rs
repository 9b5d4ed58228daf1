//! Application state shared across handlers

use analytics::RefreshCoordinator;
use auth::{Authenticator, Directory, SessionStoreProvider, rate_limiter::RateLimiter};
use common::RecordStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub records: Arc<dyn RecordStore>,
    pub sessions: Arc<dyn SessionStoreProvider>,
    pub directory: Directory,
    pub rate_limiter: RateLimiter,
    pub analytics: Arc<RefreshCoordinator>,
}

impl AppState {
    pub fn new(
        records: Arc<dyn RecordStore>,
        sessions: Arc<dyn SessionStoreProvider>,
        rate_limiter: RateLimiter,
        analytics: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            directory: Directory::new(records.clone()),
            records,
            sessions,
            rate_limiter,
            analytics,
        }
    }

    /// A fresh authenticator bound to one client's session
    pub fn authenticator(&self, client_token: &str) -> Authenticator {
        Authenticator::new(self.sessions.for_client(client_token), self.records.clone())
    }
}
