//! Boundary between callers and the report store.
//!
//! The catalog keeps the last successfully fetched active set so a failed
//! refresh still has something to show, and numbers every fetch so a slow
//! response that arrives after a newer fetch or a local write is dropped
//! instead of overwriting fresher data.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{CatalogError, CatalogResult};
use crate::lifecycle::{ClaimantRole, ReportStatusMachine, TransitionError, TransitionRequest};
use crate::model::{ItemReport, ReportDraft, ReportId, ReportStatus};
use crate::storage::{ReportStore, WriteOutcome};

#[derive(Debug)]
pub enum FetchOutcome {
    Fresh,
    /// A newer fetch was issued while this one was in flight.
    Superseded,
    Failed(CatalogError),
}

#[derive(Debug)]
pub struct Listing {
    pub reports: Arc<Vec<ItemReport>>,
    pub outcome: FetchOutcome,
}

impl Listing {
    pub fn is_fresh(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Fresh)
    }

    pub fn error(&self) -> Option<&CatalogError> {
        match &self.outcome {
            FetchOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

pub struct ReportCatalog<S> {
    store: S,
    machine: ReportStatusMachine,
    snapshot: Mutex<Arc<Vec<ItemReport>>>,
    requested: AtomicU64,
}

impl<S: ReportStore> ReportCatalog<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            machine: ReportStatusMachine,
            snapshot: Mutex::new(Arc::new(Vec::new())),
            requested: AtomicU64::new(0),
        }
    }

    /// Last good active set, newest first.
    pub fn snapshot(&self) -> Arc<Vec<ItemReport>> {
        Arc::clone(&self.snapshot.lock())
    }

    /// Refreshes the active set. Never fails outright: on a store error the
    /// previous snapshot comes back alongside [`FetchOutcome::Failed`].
    pub async fn list_active(&self) -> Listing {
        let generation = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.store.query_active().await;

        let mut snapshot = self.snapshot.lock();
        let latest = self.requested.load(Ordering::SeqCst);
        if generation != latest {
            tracing::debug!(generation, latest, "discarding superseded fetch");
            return Listing {
                reports: Arc::clone(&snapshot),
                outcome: FetchOutcome::Superseded,
            };
        }

        match result {
            Ok(reports) => {
                tracing::debug!(generation, rows = reports.len(), "fetched active reports");
                let reports = Arc::new(reports);
                *snapshot = Arc::clone(&reports);
                Listing {
                    reports,
                    outcome: FetchOutcome::Fresh,
                }
            }
            Err(err) => {
                tracing::warn!(generation, error = %err, "fetch failed, keeping previous reports");
                Listing {
                    reports: Arc::clone(&snapshot),
                    outcome: FetchOutcome::Failed(CatalogError::FetchFailed(err)),
                }
            }
        }
    }

    pub async fn find(&self, id: &ReportId) -> CatalogResult<ItemReport> {
        self.store
            .fetch_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }

    /// Commits `expected -> next` for one report, provided storage still
    /// holds `expected`.
    pub async fn submit_transition(
        &self,
        id: &ReportId,
        expected: ReportStatus,
        next: ReportStatus,
    ) -> CatalogResult<()> {
        let transition = self
            .machine
            .check_edge(expected, next)
            .map_err(|err| self.reject(id, err))?;

        match self.store.update_status_if(id, expected, next).await? {
            WriteOutcome::Applied => {
                tracing::info!(report = %id, %transition, status = %next, "status updated");
                if !next.is_discoverable() {
                    self.evict(id);
                }
                Ok(())
            }
            WriteOutcome::Conflict { actual } => {
                tracing::warn!(report = %id, %expected, %actual, "status changed concurrently");
                self.list_active().await;
                Err(CatalogError::Conflict {
                    id: id.clone(),
                    actual,
                })
            }
            WriteOutcome::NotFound => Err(CatalogError::NotFound(id.clone())),
        }
    }

    pub async fn claim(&self, report: &ItemReport, role: ClaimantRole) -> CatalogResult<ItemReport> {
        let request = self
            .machine
            .claim(report, role)
            .map_err(|err| self.reject(&report.id, err))?;
        self.commit(report, request).await
    }

    pub async fn confirm_return(&self, report: &ItemReport) -> CatalogResult<ItemReport> {
        let request = self
            .machine
            .confirm_return(report)
            .map_err(|err| self.reject(&report.id, err))?;
        self.commit(report, request).await
    }

    /// Validates and persists a new report; it starts out active.
    pub async fn create(&self, draft: ReportDraft) -> CatalogResult<ItemReport> {
        if let Some(field) = draft.invalid_field() {
            return Err(CatalogError::ValidationFailed { field });
        }
        let report = self.store.insert(draft).await?;
        tracing::info!(report = %report.id, kind = %report.kind, "report created");

        let mut snapshot = self.snapshot.lock();
        self.supersede_in_flight();
        let mut reports = Vec::with_capacity(snapshot.len() + 1);
        reports.push(report.clone());
        reports.extend(snapshot.iter().cloned());
        *snapshot = Arc::new(reports);
        Ok(report)
    }

    async fn commit(
        &self,
        report: &ItemReport,
        request: TransitionRequest,
    ) -> CatalogResult<ItemReport> {
        self.submit_transition(&request.report_id, request.expected, request.next)
            .await?;
        Ok(report.with_status(request.next))
    }

    fn evict(&self, id: &ReportId) {
        let mut snapshot = self.snapshot.lock();
        self.supersede_in_flight();
        if snapshot.iter().any(|report| &report.id == id) {
            let remaining = snapshot
                .iter()
                .filter(|report| &report.id != id)
                .cloned()
                .collect();
            *snapshot = Arc::new(remaining);
        }
    }

    /// Any fetch issued before a local write read pre-write data; make it
    /// land as superseded. Call with the snapshot lock held.
    fn supersede_in_flight(&self) {
        self.requested.fetch_add(1, Ordering::SeqCst);
    }

    fn reject(&self, id: &ReportId, err: TransitionError) -> CatalogError {
        tracing::error!(report = %id, error = %err, "rejected status transition");
        CatalogError::InvalidTransition(err)
    }
}
