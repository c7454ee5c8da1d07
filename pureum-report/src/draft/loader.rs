//! Draft loading
//!
//! Builds the workspace for one `(council, year, month)`: fetches the
//! server draft when one exists, hydrates the stores and the attendance
//! mirror, and seeds attendance from the council roster when the draft has
//! none. Background refetches go through [`DraftLoader::refresh`], whose
//! hydrations are no-ops unless the draft's asset identity changed.

use crate::draft::workspace::DraftWorkspace;
use crate::services::{MembershipDirectory, ReportStore};
use pureum_common::api::DraftKey;
use pureum_common::config::LimitsConfig;
use pureum_common::events::EventBus;
use pureum_common::{Error, Result};
use std::sync::Arc;

/// Builds and refreshes draft workspaces
pub struct DraftLoader {
    store: Arc<dyn ReportStore>,
    membership: Arc<dyn MembershipDirectory>,
    bus: EventBus,
    limits: LimitsConfig,
}

impl DraftLoader {
    pub fn new(
        store: Arc<dyn ReportStore>,
        membership: Arc<dyn MembershipDirectory>,
        bus: EventBus,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            store,
            membership,
            bus,
            limits,
        }
    }

    /// Open the draft for `key`, hydrating from the server or seeding a
    /// fresh workspace when no draft exists yet.
    pub async fn load(&self, key: DraftKey) -> Result<Arc<DraftWorkspace>> {
        key.validate()?;

        let workspace = Arc::new(DraftWorkspace::new(key, &self.limits, self.bus.clone()));

        let draft = self
            .store
            .fetch(&key)
            .await
            .map_err(|e| Error::ReportApi(e.to_string()))?;
        match &draft {
            Some(draft) => {
                tracing::debug!(key = %key, draft_id = draft.id, "Hydrating existing draft");
                workspace.hydrate_from(draft);
            }
            None => tracing::debug!(key = %key, "No server draft yet, starting fresh"),
        }

        // first report for this council: seed attendance from the roster
        if workspace.attendance().is_empty() {
            let members = self
                .membership
                .members(key.council_id)
                .await
                .map_err(|e| Error::Internal(format!("membership service: {}", e)))?;
            workspace.attendance().seed_from_members(&members);
        }

        Ok(workspace)
    }

    /// Re-fetch the server draft (e.g. after regaining focus). Asset
    /// hydration is signature-keyed, so a refetch never resurrects a
    /// locally removed asset; attendance and fields are left alone to
    /// protect local edits.
    pub async fn refresh(&self, workspace: &DraftWorkspace) -> Result<()> {
        let Some(draft) = self
            .store
            .fetch(workspace.key())
            .await
            .map_err(|e| Error::ReportApi(e.to_string()))?
        else {
            return Ok(());
        };

        workspace.hydrate_photos(draft.photos);
        workspace.hydrate_receipts(draft.receipts);
        Ok(())
    }
}
