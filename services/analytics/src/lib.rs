//! Analytics for HoneyBEE
//!
//! A pure aggregator over invoices, payments and products, a coordinator that
//! caches its snapshots per company and reporting window, and a cron job that
//! keeps those snapshots warm.

pub mod aggregator;
pub mod coordinator;
pub mod refresher;
pub mod time_range;

pub use aggregator::{AnalyticsSnapshot, compute};
pub use coordinator::{AnalyticsSource, RecordStoreSource, RefreshCoordinator, SnapshotKey};
pub use refresher::BackgroundRefresher;
pub use time_range::TimeRange;
