//! Single-flight guard and last-outcome tracking for sync passes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info};
use utoipa::ToSchema;

use super::{SyncEngine, SyncError, SyncReport};

/// Returned when a pass is requested while another is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("sync already running")]
pub struct SyncAlreadyRunning;

/// Snapshot of the coordinator state.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct SyncStatus {
    /// A pass is in progress.
    pub running: bool,
    pub last_started_at: Option<DateTime<Utc>>,
    pub last_finished_at: Option<DateTime<Utc>>,
    /// Report of the last pass that completed.
    pub last_report: Option<SyncReport>,
    /// Error of the last pass, cleared by the next successful one.
    pub last_error: Option<String>,
}

/// Allows at most one reconciliation pass at a time.
#[derive(Debug, Default)]
pub struct SyncCoordinator {
    running: AtomicBool,
    status: RwLock<SyncStatus>,
}

/// Proof that the holder owns the single sync slot. Dropping it frees the
/// slot, including when the pass panics.
#[derive(Debug)]
pub struct SyncPermit {
    coordinator: Arc<SyncCoordinator>,
}

impl SyncCoordinator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim the sync slot.
    pub fn try_begin(self: &Arc<Self>) -> Result<SyncPermit, SyncAlreadyRunning> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SyncAlreadyRunning)?;

        self.status.write().last_started_at = Some(Utc::now());
        Ok(SyncPermit {
            coordinator: Arc::clone(self),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn status(&self) -> SyncStatus {
        let mut status = self.status.read().clone();
        status.running = self.is_running();
        status
    }

    /// Claim the slot and run a pass on the tokio runtime without waiting.
    pub fn spawn(
        self: &Arc<Self>,
        engine: Arc<SyncEngine>,
    ) -> Result<JoinHandle<()>, SyncAlreadyRunning> {
        let permit = self.try_begin()?;
        Ok(tokio::spawn(async move {
            let _ = permit.run(&engine).await;
        }))
    }
}

impl SyncPermit {
    /// Run one pass and record its outcome. The slot is released on return.
    pub async fn run(self, engine: &SyncEngine) -> Result<SyncReport, SyncError> {
        let result = engine.synchronize().await;
        self.finish(&result);
        result
    }

    fn finish(&self, result: &Result<SyncReport, SyncError>) {
        let mut status = self.coordinator.status.write();
        status.last_finished_at = Some(Utc::now());
        match result {
            Ok(report) => {
                status.last_report = Some(report.clone());
                status.last_error = None;
            }
            Err(e) => {
                error!(error = %e, "library sync failed");
                status.last_error = Some(e.to_string());
            }
        }
    }
}

impl Drop for SyncPermit {
    fn drop(&mut self) {
        self.coordinator.running.store(false, Ordering::Release);
        info!("sync slot released");
    }
}
