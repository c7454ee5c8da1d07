//! Submission orchestrator
//!
//! `submit()` is structurally a successful `save()` followed by the submit
//! call with the id that save returned. The latest local edits (including
//! an attendance toggle made moments before pressing submit) are therefore
//! always persisted before submission; a failed save means submission is
//! never attempted.

use crate::draft::sync::{DraftSyncController, InFlightGuard};
use crate::draft::workspace::DraftWorkspace;
use crate::services::ReportStore;
use pureum_common::api::DraftId;
use pureum_common::events::CompanionEvent;
use pureum_common::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Composes the sync controller with the final submit call
pub struct SubmissionOrchestrator {
    workspace: Arc<DraftWorkspace>,
    sync: Arc<DraftSyncController>,
    store: Arc<dyn ReportStore>,
    in_flight: AtomicBool,
}

impl SubmissionOrchestrator {
    pub fn new(
        workspace: Arc<DraftWorkspace>,
        sync: Arc<DraftSyncController>,
        store: Arc<dyn ReportStore>,
    ) -> Self {
        Self {
            workspace,
            sync,
            store,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a submission is currently outstanding
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Flush the latest draft state, then submit it exactly once.
    pub async fn submit(&self) -> Result<DraftId> {
        if self.workspace.is_submitted() {
            return Err(Error::InvalidInput(
                "the report was already submitted".to_string(),
            ));
        }
        let _guard = InFlightGuard::acquire(&self.in_flight, "submit")?;

        // save must fully complete before the submit request goes out;
        // its failure aborts the submission here
        let draft_id = self.sync.save().await?;

        let draft = self
            .store
            .submit(draft_id)
            .await
            .map_err(|e| Error::ReportApi(e.to_string()))?;

        self.workspace.mark_submitted();
        self.workspace
            .bus()
            .emit_lossy(CompanionEvent::DraftSubmitted {
                draft_id: draft.id,
                timestamp: chrono::Utc::now(),
            });
        tracing::info!(draft_id = draft.id, "Report submitted");

        Ok(draft.id)
    }
}
