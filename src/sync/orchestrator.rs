// orchestrator.rs
use crate::db::connection::Database;
use crate::db::credentials::get_all_credentials;
use crate::db::listings::{count_listings, upsert_listing};
use crate::domain::{ApiCredentials, Endpoint, TenantCredential, TenantId};
use crate::errors::ServerError;
use crate::sync::{listing_items, normalize_listing, CancelToken};
use crate::upstream::Upstream;
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

/// Aggregate outcome of one sync run.
///
/// `processed`/`failed` count (tenant, endpoint) units. Listing-level counts
/// are informational; per-unit detail stays in `failures` and the logs.
#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub processed: usize,
    pub failed: usize,
    pub listings_upserted: usize,
    pub listings_skipped: usize,
    pub listings_failed: usize,
    pub cancelled: bool,
    #[serde(skip)]
    pub failures: Vec<UnitFailure>,
}

#[derive(Debug)]
pub struct UnitFailure {
    pub tenant_id: TenantId,
    pub endpoint_url: String,
    /// Position in the upstream array, for listing-level failures.
    pub listing_index: Option<usize>,
    pub error: ServerError,
}

impl SyncReport {
    fn merge(&mut self, other: SyncReport) {
        self.processed += other.processed;
        self.failed += other.failed;
        self.listings_upserted += other.listings_upserted;
        self.listings_skipped += other.listings_skipped;
        self.listings_failed += other.listings_failed;
        self.cancelled |= other.cancelled;
        self.failures.extend(other.failures);
    }

    fn record_endpoint(
        &mut self,
        tenant_id: &TenantId,
        endpoint: &Endpoint,
        result: Result<(), ServerError>,
    ) {
        match result {
            Ok(()) => self.processed += 1,
            Err(error) => {
                tracing::warn!(
                    tenant_id = %tenant_id,
                    endpoint = %endpoint.url,
                    error = %error,
                    "endpoint sync failed"
                );
                self.failed += 1;
                self.failures.push(UnitFailure {
                    tenant_id: tenant_id.clone(),
                    endpoint_url: endpoint.url.clone(),
                    listing_index: None,
                    error,
                });
            }
        }
    }

    fn record_listing(
        &mut self,
        tenant_id: &TenantId,
        endpoint: &Endpoint,
        index: usize,
        result: Result<(), ServerError>,
    ) {
        let error = match result {
            Ok(()) => {
                self.listings_upserted += 1;
                return;
            }
            Err(error) => error,
        };

        if matches!(error, ServerError::MalformedPayload(_)) {
            tracing::warn!(
                tenant_id = %tenant_id,
                endpoint = %endpoint.url,
                index,
                error = %error,
                "skipping listing"
            );
            self.listings_skipped += 1;
        } else {
            tracing::error!(
                tenant_id = %tenant_id,
                endpoint = %endpoint.url,
                index,
                error = %error,
                "listing upsert failed"
            );
            self.listings_failed += 1;
        }
        self.failures.push(UnitFailure {
            tenant_id: tenant_id.clone(),
            endpoint_url: endpoint.url.clone(),
            listing_index: Some(index),
            error,
        });
    }
}

pub struct SyncOrchestrator {
    db: Database,
    upstream: Arc<dyn Upstream>,
    workers: usize,
    // Whole runs never overlap, so two runs cannot race the same listing.
    run_lock: Mutex<()>,
}

impl SyncOrchestrator {
    pub fn new(db: Database, upstream: Arc<dyn Upstream>, workers: usize) -> Self {
        Self {
            db,
            upstream,
            workers: workers.max(1),
            run_lock: Mutex::new(()),
        }
    }

    /// One full pass over every tenant's configured endpoints.
    ///
    /// Only loading the tenant list can fail the run; every later failure is
    /// folded into the report.
    pub fn run(&self, cancel: &CancelToken) -> Result<SyncReport, ServerError> {
        let _guard = self
            .run_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let tenants = self.db.with_conn(|conn| get_all_credentials(conn))?;
        tracing::info!(tenants = tenants.len(), "starting listing sync");

        let next = AtomicUsize::new(0);
        let workers = self.workers.min(tenants.len()).max(1);

        // Tenants are spread over workers; one tenant's endpoints always
        // stay on a single thread, in worklist order.
        let report = thread::scope(|s| {
            let mut handles = Vec::with_capacity(workers);
            for _ in 0..workers {
                handles.push(s.spawn(|| {
                    let mut partial = SyncReport::default();
                    while let Some(tenant) = tenants.get(next.fetch_add(1, Ordering::Relaxed)) {
                        if cancel.is_cancelled() {
                            partial.cancelled = true;
                            break;
                        }
                        self.sync_tenant(tenant, cancel, &mut partial);
                    }
                    partial
                }));
            }

            handles
                .into_iter()
                .fold(SyncReport::default(), |mut acc, handle| {
                    match handle.join() {
                        Ok(partial) => acc.merge(partial),
                        Err(_) => tracing::error!("sync worker panicked"),
                    }
                    acc
                })
        });

        tracing::info!(
            processed = report.processed,
            failed = report.failed,
            upserted = report.listings_upserted,
            skipped = report.listings_skipped,
            cancelled = report.cancelled,
            "listing sync finished"
        );
        Ok(report)
    }

    fn sync_tenant(&self, cred: &TenantCredential, cancel: &CancelToken, report: &mut SyncReport) {
        let endpoints = cred.endpoints();
        if endpoints.is_empty() {
            tracing::debug!(tenant_id = %cred.tenant_id, "no endpoints configured");
            return;
        }

        let creds = cred.api_credentials();
        for endpoint in &endpoints {
            if cancel.is_cancelled() {
                tracing::info!(
                    tenant_id = %cred.tenant_id,
                    "sync cancelled, skipping remaining endpoints"
                );
                report.cancelled = true;
                break;
            }
            let result = self.sync_endpoint(&cred.tenant_id, &creds, endpoint, report);
            report.record_endpoint(&cred.tenant_id, endpoint, result);
        }

        match self.db.with_conn(|conn| count_listings(conn, &cred.tenant_id)) {
            Ok(stored) => tracing::info!(tenant_id = %cred.tenant_id, stored, "tenant synced"),
            Err(e) => {
                tracing::error!(tenant_id = %cred.tenant_id, error = %e, "counting listings failed")
            }
        }
    }

    fn sync_endpoint(
        &self,
        tenant_id: &TenantId,
        creds: &ApiCredentials,
        endpoint: &Endpoint,
        report: &mut SyncReport,
    ) -> Result<(), ServerError> {
        tracing::info!(tenant_id = %tenant_id, endpoint = %endpoint.url, "fetching endpoint");

        let body = self.upstream.fetch(&endpoint.url, creds)?;
        let items = listing_items(&body)?;
        let now = Utc::now().timestamp();

        for (index, item) in items.iter().enumerate() {
            let result = normalize_listing(item, endpoint).and_then(|listing| {
                self.db
                    .with_conn(|conn| upsert_listing(conn, tenant_id, &listing, now))
            });
            report.record_listing(tenant_id, endpoint, index, result);
        }

        tracing::debug!(
            tenant_id = %tenant_id,
            endpoint = %endpoint.url,
            listings = items.len(),
            "endpoint synced"
        );
        Ok(())
    }
}
