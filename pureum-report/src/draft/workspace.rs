//! Draft workspace
//!
//! Holds everything being edited for one `(council, year, month)` draft:
//! free-text fields, the two asset reconciliation stores, the attendance
//! mirror, and the draft id once a save has produced one. UI events mutate
//! it synchronously; the sync controller reads consistent snapshots from it.

use crate::draft::asset_store::AssetStore;
use crate::draft::attendance::AttendanceMirror;
use crate::draft::ocr_pipeline::{OcrOutcome, OcrPipeline};
use crate::models::{LocalImage, PendingReceipt};
use chrono::NaiveDate;
use pureum_common::api::{DraftId, DraftKey, ReportDraft, StoredPhoto, StoredReceipt};
use pureum_common::config::LimitsConfig;
use pureum_common::events::{AssetKind, CompanionEvent, EventBus};
use pureum_common::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Free-text fields of the draft. `None` means the user never touched the
/// field (and the server never supplied one); such fields are omitted from
/// the patch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftFields {
    pub title: Option<String>,
    pub activity_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub content: Option<String>,
    pub total_cost: Option<i64>,
}

/// Everything being edited for one monthly draft
pub struct DraftWorkspace {
    key: DraftKey,
    bus: EventBus,
    fields: Mutex<DraftFields>,
    photos: Mutex<AssetStore<StoredPhoto, LocalImage>>,
    receipts: Mutex<AssetStore<StoredReceipt, PendingReceipt>>,
    attendance: AttendanceMirror,
    draft_id: Mutex<Option<DraftId>>,
    submitted: AtomicBool,
}

impl DraftWorkspace {
    pub fn new(key: DraftKey, limits: &LimitsConfig, bus: EventBus) -> Self {
        Self {
            key,
            attendance: AttendanceMirror::new(bus.clone()),
            fields: Mutex::new(DraftFields::default()),
            photos: Mutex::new(AssetStore::new(AssetKind::Photo, limits.max_photos)),
            receipts: Mutex::new(AssetStore::new(AssetKind::Receipt, limits.max_receipts)),
            draft_id: Mutex::new(None),
            submitted: AtomicBool::new(false),
            bus,
        }
    }

    pub fn key(&self) -> &DraftKey {
        &self.key
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn attendance(&self) -> &AttendanceMirror {
        &self.attendance
    }

    // --- fields ---

    /// Snapshot of the free-text fields
    pub fn fields(&self) -> DraftFields {
        lock(&self.fields).clone()
    }

    /// Apply one synchronous edit to the free-text fields
    pub fn update_fields(&self, edit: impl FnOnce(&mut DraftFields)) {
        let mut fields = lock(&self.fields);
        edit(&mut fields);
    }

    /// Set the total-cost field only when the user has not typed one.
    /// Returns whether the value was taken.
    pub fn prefill_total_cost(&self, total: i64) -> bool {
        let mut fields = lock(&self.fields);
        if fields.total_cost.is_some() {
            return false;
        }
        fields.total_cost = Some(total);
        true
    }

    // --- draft identity & submission state ---

    pub fn draft_id(&self) -> Option<DraftId> {
        *lock(&self.draft_id)
    }

    pub(crate) fn set_draft_id(&self, id: DraftId) {
        *lock(&self.draft_id) = Some(id);
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_submitted(&self) {
        self.submitted.store(true, Ordering::SeqCst);
    }

    /// Apply a freshly loaded server draft: fields, identity, kept assets,
    /// and attendance when the server already has a roster.
    pub fn hydrate_from(&self, draft: &ReportDraft) {
        {
            let mut fields = lock(&self.fields);
            fields.title = draft.title.clone();
            fields.activity_date = draft.activity_date;
            fields.location = draft.location.clone();
            fields.content = draft.content.clone();
            fields.total_cost = draft.total_cost;
        }
        self.set_draft_id(draft.id);
        self.submitted.store(draft.is_submitted, Ordering::SeqCst);

        self.hydrate_photos(draft.photos.clone());
        self.hydrate_receipts(draft.receipts.clone());
        if !draft.attendance.is_empty() {
            self.attendance.hydrate(draft.attendance.clone());
        }
    }

    // --- photos ---

    /// One-shot hydration of kept photos; refetches with an unchanged
    /// signature are no-ops (see [`AssetStore::hydrate`])
    pub fn hydrate_photos(&self, photos: Vec<StoredPhoto>) -> bool {
        let applied = lock(&self.photos).hydrate(photos);
        if applied {
            self.emit_assets(AssetKind::Photo);
        }
        applied
    }

    pub fn add_photos(&self, images: Vec<LocalImage>) -> Result<()> {
        lock(&self.photos).add_pending(images)?;
        self.emit_assets(AssetKind::Photo);
        Ok(())
    }

    pub fn remove_kept_photo(&self, index: usize) -> bool {
        let removed = lock(&self.photos).remove_kept(index).is_some();
        if removed {
            self.emit_assets(AssetKind::Photo);
        }
        removed
    }

    pub fn remove_pending_photo(&self, index: usize) -> bool {
        let removed = lock(&self.photos).remove_pending(index).is_some();
        if removed {
            self.emit_assets(AssetKind::Photo);
        }
        removed
    }

    pub(crate) fn snapshot_photos(&self) -> AssetStore<StoredPhoto, LocalImage> {
        lock(&self.photos).clone()
    }

    // --- receipts ---

    pub fn hydrate_receipts(&self, receipts: Vec<StoredReceipt>) -> bool {
        let applied = lock(&self.receipts).hydrate(receipts);
        if applied {
            self.emit_assets(AssetKind::Receipt);
        }
        applied
    }

    pub fn remove_kept_receipt(&self, index: usize) -> bool {
        let removed = lock(&self.receipts).remove_kept(index).is_some();
        if removed {
            self.emit_assets(AssetKind::Receipt);
        }
        removed
    }

    pub fn remove_pending_receipt(&self, index: usize) -> bool {
        let removed = lock(&self.receipts).remove_pending(index).is_some();
        if removed {
            self.emit_assets(AssetKind::Receipt);
        }
        removed
    }

    pub(crate) fn snapshot_receipts(&self) -> AssetStore<StoredReceipt, PendingReceipt> {
        lock(&self.receipts).clone()
    }

    /// Apply the draft the server echoed back from a successful save: every
    /// uploaded pending entry is promoted into the kept lists (assets added
    /// while the save ran stay pending).
    pub(crate) fn commit_saved(
        &self,
        draft: &ReportDraft,
        photos_sent: &AssetStore<StoredPhoto, LocalImage>,
        receipts_sent: &AssetStore<StoredReceipt, PendingReceipt>,
    ) {
        lock(&self.photos).commit_saved(draft.photos.clone(), photos_sent.pending());
        lock(&self.receipts).commit_saved(draft.receipts.clone(), receipts_sent.pending());
        self.emit_assets(AssetKind::Photo);
        self.emit_assets(AssetKind::Receipt);
    }

    /// Pending receipts as currently edited (for rendering)
    pub fn pending_receipts(&self) -> Vec<PendingReceipt> {
        lock(&self.receipts).pending().to_vec()
    }

    /// Append one receipt image and run recognition for it.
    ///
    /// The image is attached immediately and stays attached whatever
    /// recognition does. On an applied result the recognized items land on
    /// this receipt and the item sum pre-fills the total-cost field unless
    /// the user already typed one. A result arriving after a further image
    /// was added is discarded.
    pub async fn attach_receipt(
        &self,
        image: LocalImage,
        pipeline: &OcrPipeline,
    ) -> Result<OcrOutcome> {
        let ticket = {
            let mut receipts = lock(&self.receipts);
            if receipts.remaining_capacity() == 0 {
                return Err(Error::InvalidInput(
                    "receipt limit reached for this report".to_string(),
                ));
            }
            let ticket = pipeline.begin();
            receipts.add_pending(vec![PendingReceipt::new(image.clone(), ticket)])?;
            ticket
        };
        self.emit_assets(AssetKind::Receipt);

        let outcome = pipeline.extract(&image, ticket).await;
        match &outcome {
            OcrOutcome::Recognized {
                provider,
                items,
                total,
            } => {
                let applied = {
                    let mut receipts = lock(&self.receipts);
                    match receipts
                        .pending_mut()
                        .iter_mut()
                        .find(|pending| pending.ticket == ticket)
                    {
                        Some(pending) => {
                            pending.items = items.clone();
                            true
                        }
                        // the receipt was removed while recognition ran
                        None => false,
                    }
                };
                if applied && !items.is_empty() && self.prefill_total_cost(*total) {
                    tracing::debug!(total, "Total cost pre-filled from recognition");
                }
                self.bus.emit_lossy(CompanionEvent::RecognitionSettled {
                    ticket,
                    provider: Some(provider.to_string()),
                    item_count: items.len(),
                    applied,
                    timestamp: chrono::Utc::now(),
                });
            }
            OcrOutcome::Superseded { .. } | OcrOutcome::Failed { .. } => {
                self.bus.emit_lossy(CompanionEvent::RecognitionSettled {
                    ticket,
                    provider: None,
                    item_count: 0,
                    applied: false,
                    timestamp: chrono::Utc::now(),
                });
            }
        }

        Ok(outcome)
    }

    fn emit_assets(&self, kind: AssetKind) {
        let (kept, pending) = match kind {
            AssetKind::Photo => {
                let photos = lock(&self.photos);
                (photos.kept().len(), photos.pending().len())
            }
            AssetKind::Receipt => {
                let receipts = lock(&self.receipts);
                (receipts.kept().len(), receipts.pending().len())
            }
        };
        self.bus.emit_lossy(CompanionEvent::AssetsChanged {
            kind,
            kept,
            pending,
            timestamp: chrono::Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::OcrProvider;
    use async_trait::async_trait;
    use pureum_common::api::LineItem;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    /// Provider whose behavior is scripted per call, in order
    struct ScriptedProvider {
        script: Mutex<VecDeque<(Duration, anyhow::Result<Vec<LineItem>>)>>,
    }

    impl ScriptedProvider {
        fn new(
            script: Vec<(Duration, anyhow::Result<Vec<LineItem>>)>,
        ) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
            })
        }
    }

    #[async_trait]
    impl OcrProvider for ScriptedProvider {
        fn provider_id(&self) -> &'static str {
            "scripted"
        }

        async fn recognize(&self, _image: &LocalImage) -> anyhow::Result<Vec<LineItem>> {
            let (delay, result) = lock(&self.script)
                .pop_front()
                .unwrap_or((Duration::ZERO, Err(anyhow::anyhow!("script exhausted"))));
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        }
    }

    fn item(label: &str, amount: i64) -> LineItem {
        LineItem {
            label: label.to_string(),
            amount,
        }
    }

    fn image(name: &str) -> LocalImage {
        LocalImage::new(name, "image/jpeg", vec![0xFF, 0xD8])
    }

    fn workspace() -> DraftWorkspace {
        DraftWorkspace::new(
            DraftKey::new(1, 2026, 4),
            &LimitsConfig::default(),
            EventBus::new(64),
        )
    }

    fn pipeline(provider: Arc<ScriptedProvider>) -> OcrPipeline {
        OcrPipeline::new(provider, None, Duration::from_millis(500))
    }

    #[tokio::test]
    async fn recognized_items_land_on_the_attached_receipt() {
        let workspace = workspace();
        let pipeline = pipeline(ScriptedProvider::new(vec![(
            Duration::ZERO,
            Ok(vec![item("식비", 15000)]),
        )]));

        let outcome = workspace
            .attach_receipt(image("r1.jpg"), &pipeline)
            .await
            .expect("attach");
        assert!(matches!(outcome, OcrOutcome::Recognized { .. }));

        let pending = workspace.pending_receipts();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].items, vec![item("식비", 15000)]);
        assert_eq!(workspace.fields().total_cost, Some(15000));
    }

    #[tokio::test]
    async fn a_user_typed_total_is_never_overwritten() {
        let workspace = workspace();
        workspace.update_fields(|fields| fields.total_cost = Some(9999));

        let pipeline = pipeline(ScriptedProvider::new(vec![(
            Duration::ZERO,
            Ok(vec![item("식비", 15000)]),
        )]));
        workspace
            .attach_receipt(image("r1.jpg"), &pipeline)
            .await
            .expect("attach");

        assert_eq!(workspace.fields().total_cost, Some(9999));
    }

    #[tokio::test]
    async fn recognition_failure_keeps_the_image() {
        let workspace = workspace();
        let pipeline = pipeline(ScriptedProvider::new(vec![(
            Duration::ZERO,
            Err(anyhow::anyhow!("provider down")),
        )]));

        let outcome = workspace
            .attach_receipt(image("r1.jpg"), &pipeline)
            .await
            .expect("attach");
        assert!(matches!(outcome, OcrOutcome::Failed { .. }));

        let pending = workspace.pending_receipts();
        assert_eq!(pending.len(), 1);
        assert!(pending[0].items.is_empty());
        assert_eq!(workspace.fields().total_cost, None);
    }

    #[tokio::test]
    async fn a_late_result_for_a_superseded_image_is_discarded() {
        let workspace = Arc::new(workspace());
        // first call: slow, would recognize the wrong items;
        // second call: fast, the current image's items
        let provider = ScriptedProvider::new(vec![
            (Duration::from_millis(80), Ok(vec![item("stale", 1111)])),
            (Duration::ZERO, Ok(vec![item("현수막", 30000)])),
        ]);
        let pipeline = pipeline(provider);

        let first = workspace.attach_receipt(image("r1.jpg"), &pipeline);
        let second = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            workspace.attach_receipt(image("r2.jpg"), &pipeline).await
        };
        let (first, second) = tokio::join!(first, second);

        assert!(matches!(
            first.expect("first attach"),
            OcrOutcome::Superseded { .. }
        ));
        assert!(matches!(
            second.expect("second attach"),
            OcrOutcome::Recognized { .. }
        ));

        let pending = workspace.pending_receipts();
        assert_eq!(pending.len(), 2);
        assert!(pending[0].items.is_empty(), "stale items must not apply");
        assert_eq!(pending[1].items, vec![item("현수막", 30000)]);
        assert_eq!(workspace.fields().total_cost, Some(30000));
    }

    #[tokio::test]
    async fn receipt_capacity_is_enforced_before_recognition_starts() {
        let limits = LimitsConfig {
            max_photos: 10,
            max_receipts: 1,
        };
        let workspace =
            DraftWorkspace::new(DraftKey::new(1, 2026, 4), &limits, EventBus::new(16));
        let pipeline = pipeline(ScriptedProvider::new(vec![
            (Duration::ZERO, Ok(vec![])),
            (Duration::ZERO, Ok(vec![])),
        ]));

        workspace
            .attach_receipt(image("r1.jpg"), &pipeline)
            .await
            .expect("first attach");
        assert!(workspace
            .attach_receipt(image("r2.jpg"), &pipeline)
            .await
            .is_err());
        assert_eq!(workspace.pending_receipts().len(), 1);
    }

    #[test]
    fn hydrate_from_applies_fields_identity_and_assets() {
        let workspace = workspace();
        let draft = ReportDraft {
            id: 77,
            title: Some("4월 정기 봉사".to_string()),
            activity_date: NaiveDate::from_ymd_opt(2026, 4, 18),
            location: Some("춘천".to_string()),
            content: None,
            total_cost: Some(42000),
            attendance: vec![],
            photos: vec![StoredPhoto {
                id: 1,
                url: "https://cdn.test/p/1.jpg".to_string(),
            }],
            receipts: vec![],
            is_submitted: false,
        };

        workspace.hydrate_from(&draft);
        assert_eq!(workspace.draft_id(), Some(77));
        assert!(!workspace.is_submitted());
        assert_eq!(workspace.fields().title.as_deref(), Some("4월 정기 봉사"));
        assert_eq!(workspace.fields().total_cost, Some(42000));
        assert!(workspace.attendance().is_empty());
    }
}
