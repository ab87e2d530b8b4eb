use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use time::OffsetDateTime;

use super::{ReportStore, WriteOutcome};
use crate::model::{ItemReport, ReportDraft, ReportId, ReportStatus};

/// Process-local store. Shares state across clones; can be switched into a
/// failing mode to exercise refresh errors.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    reports: Vec<ItemReport>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reports(reports: impl IntoIterator<Item = ItemReport>) -> Self {
        let store = Self::new();
        for report in reports {
            store.put(report);
        }
        store
    }

    /// Inserts or replaces a report by id, bypassing validation.
    pub fn put(&self, report: ItemReport) {
        let mut state = self.inner.lock();
        match state.reports.iter_mut().find(|slot| slot.id == report.id) {
            Some(slot) => *slot = report,
            None => state.reports.push(report),
        }
    }

    pub fn remove(&self, id: &ReportId) -> Option<ItemReport> {
        let mut state = self.inner.lock();
        let index = state.reports.iter().position(|report| &report.id == id)?;
        Some(state.reports.remove(index))
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unavailable = unavailable;
    }

    fn check_available(state: &MemoryState) -> Result<()> {
        if state.unavailable {
            bail!("report store unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn query_active(&self) -> Result<Vec<ItemReport>> {
        let state = self.inner.lock();
        Self::check_available(&state)?;
        let mut active: Vec<ItemReport> = state
            .reports
            .iter()
            .filter(|report| report.status == ReportStatus::Active)
            .cloned()
            .collect();
        // Later insertions win ties, matching the sqlite rowid ordering.
        active.reverse();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(active)
    }

    async fn update_status_if(
        &self,
        id: &ReportId,
        expected: ReportStatus,
        next: ReportStatus,
    ) -> Result<WriteOutcome> {
        let mut state = self.inner.lock();
        Self::check_available(&state)?;
        let Some(report) = state.reports.iter_mut().find(|report| &report.id == id) else {
            return Ok(WriteOutcome::NotFound);
        };
        if report.status != expected {
            return Ok(WriteOutcome::Conflict {
                actual: report.status,
            });
        }
        report.status = next;
        Ok(WriteOutcome::Applied)
    }

    async fn insert(&self, draft: ReportDraft) -> Result<ItemReport> {
        let mut state = self.inner.lock();
        Self::check_available(&state)?;
        let report = draft.into_report(ReportId::generate(), OffsetDateTime::now_utc())?;
        state.reports.push(report.clone());
        Ok(report)
    }

    async fn fetch_by_id(&self, id: &ReportId) -> Result<Option<ItemReport>> {
        let state = self.inner.lock();
        Self::check_available(&state)?;
        Ok(state.reports.iter().find(|report| &report.id == id).cloned())
    }
}
