//! Draft sync controller
//!
//! One `save()` resolves both asset stores, reads the attendance mirror,
//! assembles a single patch and sends it. Any failure aborts the whole
//! save; nothing partial is ever sent and local state stays untouched for
//! retry.

use crate::draft::workspace::DraftWorkspace;
use crate::services::{ObjectStorage, ReportStore};
use pureum_common::api::{DraftId, ReceiptPayload, ReportPatch};
use pureum_common::config::StorageConfig;
use pureum_common::events::CompanionEvent;
use pureum_common::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// RAII re-entrancy gate: acquiring flips the flag, dropping clears it, so
/// an early return on error can never leave an action disabled.
pub(crate) struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool, action: &'static str) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| Error::Busy(action))?;
        Ok(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Orchestrates one save of the draft workspace
pub struct DraftSyncController {
    workspace: Arc<DraftWorkspace>,
    store: Arc<dyn ReportStore>,
    storage: Arc<dyn ObjectStorage>,
    photo_prefix: String,
    receipt_prefix: String,
    in_flight: AtomicBool,
}

impl DraftSyncController {
    pub fn new(
        workspace: Arc<DraftWorkspace>,
        store: Arc<dyn ReportStore>,
        storage: Arc<dyn ObjectStorage>,
        storage_config: &StorageConfig,
    ) -> Self {
        Self {
            workspace,
            store,
            storage,
            photo_prefix: storage_config.photo_prefix.clone(),
            receipt_prefix: storage_config.receipt_prefix.clone(),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a save is currently outstanding (the UI disables the action)
    pub fn is_saving(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Upload pending assets, read the latest attendance, send one patch,
    /// and record the draft id the server returns.
    pub async fn save(&self) -> Result<DraftId> {
        if self.workspace.is_submitted() {
            return Err(Error::InvalidInput(
                "the report was already submitted and can no longer be edited".to_string(),
            ));
        }
        let _guard = InFlightGuard::acquire(&self.in_flight, "save")?;

        let key = *self.workspace.key();
        tracing::info!(key = %key, "Saving report draft");

        // snapshots of the stores; uploads run outside any lock
        let photos = self.workspace.snapshot_photos();
        let receipts = self.workspace.snapshot_receipts();

        let (image_urls, receipt_urls) = tokio::try_join!(
            photos.resolve_for_save(self.storage.as_ref(), &self.photo_prefix),
            receipts.resolve_for_save(self.storage.as_ref(), &self.receipt_prefix),
        )
        .map_err(|e| Error::Upload(e.to_string()))?;

        // attendance is read *after* the uploads, from the mirror cell, so
        // a toggle made while uploads ran is included
        let attendance = self.workspace.attendance().read_latest();
        let fields = self.workspace.fields();

        // kept receipts keep their items; newly uploaded URLs pair up with
        // the pending receipts positionally (upload order == added order)
        let kept_count = receipts.kept().len();
        let receipts_payload: Vec<ReceiptPayload> = receipts
            .kept()
            .iter()
            .map(|kept| ReceiptPayload {
                image_url: kept.url.clone(),
                items: kept.items.clone(),
            })
            .chain(
                receipts
                    .pending()
                    .iter()
                    .zip(&receipt_urls[kept_count..])
                    .map(|(pending, url)| ReceiptPayload {
                        image_url: url.clone(),
                        items: pending.items.clone(),
                    }),
            )
            .collect();

        let patch = ReportPatch {
            title: fields.title,
            activity_date: fields.activity_date,
            location: fields.location,
            content: fields.content,
            total_cost: fields.total_cost,
            image_urls,
            receipts: receipts_payload,
            attendance,
        };

        let draft = self
            .store
            .patch(&key, &patch)
            .await
            .map_err(|e| Error::ReportApi(e.to_string()))?;

        self.workspace.set_draft_id(draft.id);
        // promote what was just uploaded into the kept lists; the next
        // refetch sees the same server state and stays a no-op
        self.workspace.commit_saved(&draft, &photos, &receipts);
        self.workspace.bus().emit_lossy(CompanionEvent::DraftSaved {
            draft_id: draft.id,
            timestamp: chrono::Utc::now(),
        });
        tracing::info!(key = %key, draft_id = draft.id, "Report draft saved");

        Ok(draft.id)
    }
}
