//! Snapshot refresh coordination
//!
//! Snapshots are cached per [`SnapshotKey`]. At most one fetch per key is
//! outstanding at any time. Every fetch is tagged with a sequence number taken
//! when it is issued, and a result only replaces the cached snapshot when its
//! sequence is newer than the cached one, so a slow superseded fetch can never
//! overwrite a later one.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use common::{
    RecordStore,
    models::{Invoice, Payment, Product},
};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    aggregator::{AnalyticsSnapshot, compute},
    time_range::TimeRange,
};

/// Resource key: one snapshot per company and reporting window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotKey {
    pub company_id: Uuid,
    pub range: TimeRange,
}

/// Raw collections feeding the aggregator
#[derive(Debug, Clone, Default)]
pub struct SourceData {
    pub invoices: Vec<Invoice>,
    pub payments: Vec<Payment>,
    pub products: Vec<Product>,
    /// False when at least one collection could not be fetched and is empty in its place
    pub complete: bool,
}

/// Where the coordinator fetches raw collections from
#[async_trait]
pub trait AnalyticsSource: Send + Sync {
    async fn load(&self, company_id: Uuid) -> SourceData;
}

/// Fetches invoices, payments and products concurrently from the record store
pub struct RecordStoreSource {
    records: Arc<dyn RecordStore>,
}

impl RecordStoreSource {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }
}

fn or_empty<T>(what: &str, result: Result<Vec<T>, common::error::DatabaseError>) -> Option<Vec<T>> {
    match result {
        Ok(rows) => Some(rows),
        Err(e) => {
            error!("Failed to fetch {}: {}", what, e);
            None
        }
    }
}

#[async_trait]
impl AnalyticsSource for RecordStoreSource {
    async fn load(&self, company_id: Uuid) -> SourceData {
        let (invoices, payments, products) = tokio::join!(
            self.records.list_invoices(),
            self.records.list_payments(),
            self.records.list_products(company_id),
        );

        let invoices = or_empty("invoices", invoices);
        let payments = or_empty("payments", payments);
        let products = or_empty("products", products);
        let complete = invoices.is_some() && payments.is_some() && products.is_some();

        SourceData {
            invoices: invoices.unwrap_or_default(),
            payments: payments.unwrap_or_default(),
            products: products.unwrap_or_default(),
            complete,
        }
    }
}

struct Cached {
    sequence: u64,
    fetched_at: Instant,
    snapshot: Arc<AnalyticsSnapshot>,
}

#[derive(Default)]
struct Slot {
    flight: tokio::sync::Mutex<()>,
    cached: Mutex<Option<Cached>>,
}

impl Slot {
    fn cached(&self) -> MutexGuard<'_, Option<Cached>> {
        self.cached.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fresh(&self, ttl: Duration) -> Option<Arc<AnalyticsSnapshot>> {
        self.cached()
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < ttl)
            .map(|c| c.snapshot.clone())
    }

    fn latest(&self) -> Option<Arc<AnalyticsSnapshot>> {
        self.cached().as_ref().map(|c| c.snapshot.clone())
    }
}

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Caches analytics snapshots and serializes their refreshes per key
pub struct RefreshCoordinator {
    source: Arc<dyn AnalyticsSource>,
    ttl: Duration,
    today: Clock,
    sequence: AtomicU64,
    slots: Mutex<HashMap<SnapshotKey, Arc<Slot>>>,
}

impl RefreshCoordinator {
    pub fn new(source: Arc<dyn AnalyticsSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            today: Arc::new(|| Utc::now().date_naive()),
            sequence: AtomicU64::new(0),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Anchor reports on a fixed date instead of today's UTC date
    pub fn with_clock(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(today);
        self
    }

    fn slot(&self, key: SnapshotKey) -> Arc<Slot> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(key)
            .or_default()
            .clone()
    }

    /// Keys that have been requested at least once
    pub fn known_keys(&self) -> Vec<SnapshotKey> {
        let mut keys: Vec<SnapshotKey> = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .copied()
            .collect();
        keys.sort();
        keys
    }

    /// Take the next issuance sequence number
    pub fn issue(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Offer a result fetched under `sequence`. Accepted only if no result with
    /// a newer sequence has been stored for the key.
    pub fn publish(&self, key: SnapshotKey, sequence: u64, snapshot: Arc<AnalyticsSnapshot>) -> bool {
        let slot = self.slot(key);
        let mut cached = slot.cached();

        if cached.as_ref().is_some_and(|c| c.sequence >= sequence) {
            debug!("Discarding superseded snapshot {:?} #{}", key, sequence);
            return false;
        }
        *cached = Some(Cached {
            sequence,
            fetched_at: Instant::now(),
            snapshot,
        });
        true
    }

    /// The snapshot for a key, fetched if nothing fresh is cached
    pub async fn snapshot(&self, company_id: Uuid, range: TimeRange) -> Arc<AnalyticsSnapshot> {
        let key = SnapshotKey { company_id, range };
        let slot = self.slot(key);

        if let Some(snapshot) = slot.fresh(self.ttl) {
            return snapshot;
        }

        let _flight = slot.flight.lock().await;
        // A fetch that held the flight before us may have just stored a result
        if let Some(snapshot) = slot.fresh(self.ttl) {
            return snapshot;
        }

        self.fetch(key, &slot).await
    }

    /// Re-fetch a key regardless of freshness, waiting for any fetch in flight
    pub async fn refresh(&self, key: SnapshotKey) -> Arc<AnalyticsSnapshot> {
        let slot = self.slot(key);
        let _flight = slot.flight.lock().await;
        self.fetch(key, &slot).await
    }

    /// Re-fetch every known key whose previous fetch is not still running.
    /// Returns the number of keys refreshed.
    pub async fn refresh_known(&self) -> usize {
        let mut refreshed = 0;
        for key in self.known_keys() {
            let slot = self.slot(key);
            let Ok(_flight) = slot.flight.try_lock() else {
                debug!("Skipping {:?}, fetch already in flight", key);
                continue;
            };
            self.fetch(key, &slot).await;
            refreshed += 1;
        }
        refreshed
    }

    async fn fetch(&self, key: SnapshotKey, slot: &Slot) -> Arc<AnalyticsSnapshot> {
        let sequence = self.issue();
        let data = self.source.load(key.company_id).await;

        if !data.complete {
            if let Some(stale) = slot.latest() {
                warn!(
                    "Refresh #{} of {:?} incomplete, keeping previous snapshot",
                    sequence, key
                );
                return stale;
            }
        }

        let snapshot = Arc::new(compute(
            &data.invoices,
            &data.payments,
            &data.products,
            key.range,
            (self.today)(),
        ));
        if self.publish(key, sequence, snapshot.clone()) {
            info!(
                "Analytics snapshot for company {} ({}) refreshed as #{}",
                key.company_id, key.range, sequence
            );
        }

        slot.latest().unwrap_or(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct FakeSource {
        loads: AtomicUsize,
        complete: std::sync::atomic::AtomicBool,
        delay: Duration,
    }

    impl FakeSource {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                loads: AtomicUsize::new(0),
                complete: std::sync::atomic::AtomicBool::new(true),
                delay,
            })
        }

        fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AnalyticsSource for FakeSource {
        async fn load(&self, _company_id: Uuid) -> SourceData {
            let n = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            SourceData {
                payments: vec![Payment {
                    id: Uuid::nil(),
                    payment_number: format!("PAY-{}", n),
                    customer_name: "A".to_string(),
                    amount: n as f64,
                    status: "completed".to_string(),
                    payment_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                    payment_method: "card".to_string(),
                }],
                complete: self.complete.load(Ordering::SeqCst),
                ..SourceData::default()
            }
        }
    }

    fn coordinator(source: Arc<FakeSource>, ttl: Duration) -> Arc<RefreshCoordinator> {
        Arc::new(
            RefreshCoordinator::new(source, ttl)
                .with_clock(|| NaiveDate::from_ymd_opt(2026, 3, 20).unwrap()),
        )
    }

    fn key() -> SnapshotKey {
        SnapshotKey {
            company_id: Uuid::nil(),
            range: TimeRange::OneMonth,
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let source = FakeSource::new(Duration::from_millis(50));
        let coordinator = coordinator(source.clone(), Duration::from_secs(60));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move { coordinator.snapshot(Uuid::nil(), TimeRange::OneMonth).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().total_revenue, 1.0);
        }

        assert_eq!(source.loads(), 1);
    }

    #[tokio::test]
    async fn test_fresh_snapshot_is_served_from_cache() {
        let source = FakeSource::new(Duration::ZERO);
        let coordinator = coordinator(source.clone(), Duration::from_secs(60));

        coordinator.snapshot(Uuid::nil(), TimeRange::OneMonth).await;
        coordinator.snapshot(Uuid::nil(), TimeRange::OneMonth).await;
        assert_eq!(source.loads(), 1);

        coordinator.snapshot(Uuid::nil(), TimeRange::OneYear).await;
        assert_eq!(source.loads(), 2);
    }

    #[tokio::test]
    async fn test_expired_snapshot_is_refetched() {
        let source = FakeSource::new(Duration::ZERO);
        let coordinator = coordinator(source.clone(), Duration::ZERO);

        coordinator.snapshot(Uuid::nil(), TimeRange::OneMonth).await;
        let second = coordinator.snapshot(Uuid::nil(), TimeRange::OneMonth).await;
        assert_eq!(source.loads(), 2);
        assert_eq!(second.total_revenue, 2.0);
    }

    #[tokio::test]
    async fn test_older_issuance_never_replaces_newer() {
        let source = FakeSource::new(Duration::ZERO);
        let coordinator = coordinator(source, Duration::from_secs(60));
        let reference = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();

        let early = coordinator.issue();
        let late = coordinator.issue();
        let late_snapshot = Arc::new(compute(&[], &[], &[], TimeRange::OneMonth, reference));
        let early_snapshot = Arc::new(compute(&[], &[], &[], TimeRange::ThreeMonths, reference));

        assert!(coordinator.publish(key(), late, late_snapshot.clone()));
        assert!(!coordinator.publish(key(), early, early_snapshot));

        let served = coordinator.snapshot(Uuid::nil(), TimeRange::OneMonth).await;
        assert_eq!(served, late_snapshot);
    }

    #[tokio::test]
    async fn test_incomplete_refresh_keeps_stale_snapshot() {
        let source = FakeSource::new(Duration::ZERO);
        let coordinator = coordinator(source.clone(), Duration::from_secs(60));

        let first = coordinator.snapshot(Uuid::nil(), TimeRange::OneMonth).await;
        source.complete.store(false, Ordering::SeqCst);

        let after = coordinator.refresh(key()).await;
        assert_eq!(after, first);
        assert_eq!(source.loads(), 2);
    }

    #[tokio::test]
    async fn test_incomplete_first_fetch_still_produces_snapshot() {
        let source = FakeSource::new(Duration::ZERO);
        source.complete.store(false, Ordering::SeqCst);
        let coordinator = coordinator(source, Duration::from_secs(60));

        let snapshot = coordinator.snapshot(Uuid::nil(), TimeRange::OneMonth).await;
        assert_eq!(snapshot.monthly_revenue.len(), 1);
    }

    #[tokio::test]
    async fn test_background_refresh_skips_keys_in_flight() {
        let source = FakeSource::new(Duration::from_millis(100));
        let coordinator = coordinator(source.clone(), Duration::from_secs(60));

        let pending = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.snapshot(Uuid::nil(), TimeRange::OneMonth).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(coordinator.refresh_known().await, 0);
        pending.await.unwrap();
        assert_eq!(coordinator.refresh_known().await, 1);
        assert_eq!(source.loads(), 2);
    }

    #[tokio::test]
    async fn test_record_store_source_degrades_failed_fetches() {
        let records = common::InMemoryRecordStore::new();
        let source = RecordStoreSource::new(Arc::new(records.clone()));
        assert!(source.load(Uuid::nil()).await.complete);

        records.set_unavailable(true);
        let data = source.load(Uuid::nil()).await;
        assert!(!data.complete);
        assert!(data.invoices.is_empty() && data.payments.is_empty() && data.products.is_empty());
    }
}
