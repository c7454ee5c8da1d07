//! Asset reconciliation store
//!
//! Owns the "what will be sent on next save" view for one asset kind. The
//! kept-existing list (server-originated) and the pending-new list (local
//! files) stay separate until the moment of save, so an upload in flight is
//! never mistaken for a persisted asset.
//!
//! Hydration is one-shot per draft: the store remembers the asset-id
//! signature of the server list it applied and ignores refetches carrying
//! the same signature. A locally removed asset can therefore never be
//! resurrected by a background refetch.

use crate::models::{LocalImage, PendingReceipt};
use crate::services::{ObjectStorage, StorageError};
use pureum_common::api::{StoredPhoto, StoredReceipt};
use pureum_common::events::AssetKind;
use pureum_common::{Error, Result};

/// A server-originated asset the user may keep or drop, but never re-upload
pub trait KeptAsset: Clone + Send + Sync {
    fn asset_id(&self) -> i64;
    fn url(&self) -> &str;
}

impl KeptAsset for StoredPhoto {
    fn asset_id(&self) -> i64 {
        self.id
    }

    fn url(&self) -> &str {
        &self.url
    }
}

impl KeptAsset for StoredReceipt {
    fn asset_id(&self) -> i64 {
        self.id
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// A locally added entry waiting for upload
pub trait PendingAsset: Clone + Send + Sync {
    fn image(&self) -> &LocalImage;

    /// Whether `other` is the same entry, used to recognize an entry across
    /// a save snapshot (its mutable parts may have changed in between)
    fn same_entry(&self, other: &Self) -> bool;
}

impl PendingAsset for LocalImage {
    fn image(&self) -> &LocalImage {
        self
    }

    fn same_entry(&self, other: &Self) -> bool {
        self == other
    }
}

impl PendingAsset for PendingReceipt {
    fn image(&self) -> &LocalImage {
        &self.image
    }

    // recognition may attach items while a save is in flight; the ticket
    // is the stable identity
    fn same_entry(&self, other: &Self) -> bool {
        self.ticket == other.ticket
    }
}

/// Reconciliation store for one asset kind
#[derive(Debug, Clone)]
pub struct AssetStore<S, P> {
    kind: AssetKind,
    max_total: usize,
    hydration_key: Option<String>,
    kept: Vec<S>,
    pending: Vec<P>,
}

impl<S: KeptAsset, P: PendingAsset> AssetStore<S, P> {
    pub fn new(kind: AssetKind, max_total: usize) -> Self {
        Self {
            kind,
            max_total,
            hydration_key: None,
            kept: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn kept(&self) -> &[S] {
        &self.kept
    }

    pub fn pending(&self) -> &[P] {
        &self.pending
    }

    pub fn pending_mut(&mut self) -> &mut [P] {
        &mut self.pending
    }

    /// Capacity left for pending additions: the global ceiling minus every
    /// entry already spoken for. Dropping a kept asset frees a slot.
    pub fn remaining_capacity(&self) -> usize {
        self.max_total
            .saturating_sub(self.kept.len() + self.pending.len())
    }

    fn signature(assets: &[S]) -> String {
        let mut key = String::new();
        for asset in assets {
            if !key.is_empty() {
                key.push('-');
            }
            key.push_str(&asset.asset_id().to_string());
        }
        key
    }

    /// Apply the server's asset list, at most once per draft identity.
    ///
    /// Returns whether the list was applied. A repeat call whose asset-id
    /// signature matches the one already applied is a no-op; a changed
    /// signature (different draft, or a refetch after a successful save)
    /// re-hydrates.
    pub fn hydrate(&mut self, assets: Vec<S>) -> bool {
        let key = Self::signature(&assets);
        if self.hydration_key.as_deref() == Some(key.as_str()) {
            tracing::trace!(kind = self.kind.as_str(), "Hydration already applied, skipping");
            return false;
        }

        tracing::debug!(
            kind = self.kind.as_str(),
            count = assets.len(),
            "Hydrating kept assets from server"
        );
        self.kept = assets;
        self.hydration_key = Some(key);
        true
    }

    /// Drop one kept-existing entry. Local only; the server learns about it
    /// at the next save.
    pub fn remove_kept(&mut self, index: usize) -> Option<S> {
        if index >= self.kept.len() {
            return None;
        }
        Some(self.kept.remove(index))
    }

    /// Append locally added entries, bounded by the remaining capacity
    pub fn add_pending(&mut self, entries: Vec<P>) -> Result<()> {
        if entries.len() > self.remaining_capacity() {
            return Err(Error::InvalidInput(format!(
                "{} limit reached: at most {} per report",
                self.kind.as_str(),
                self.max_total
            )));
        }
        self.pending.extend(entries);
        Ok(())
    }

    /// Apply the server's post-save state: the echoed kept list replaces
    /// the local one and every pending entry that was part of the save is
    /// dropped, now that it lives on as a kept asset.
    ///
    /// The hydration signature is reset to the echoed list, so a refetch
    /// between saves is a no-op instead of re-introducing the upload while
    /// its file still sits in pending. Entries added while the save was in
    /// flight are not in `saved` and stay pending.
    pub fn commit_saved(&mut self, kept: Vec<S>, saved: &[P]) {
        tracing::debug!(
            kind = self.kind.as_str(),
            kept = kept.len(),
            promoted = saved.len(),
            "Committing saved assets"
        );
        self.hydration_key = Some(Self::signature(&kept));
        self.kept = kept;
        self.pending
            .retain(|entry| !saved.iter().any(|sent| sent.same_entry(entry)));
    }

    /// Remove one pending-new entry before it is ever uploaded
    pub fn remove_pending(&mut self, index: usize) -> Option<P> {
        if index >= self.pending.len() {
            return None;
        }
        Some(self.pending.remove(index))
    }

    /// Upload every pending file and return all URLs in kept-then-added
    /// order, preserving the order files were added.
    ///
    /// Uploads run concurrently but the result order is positional, so the
    /// Nth returned pending URL corresponds to the Nth added file. Any
    /// single failure fails the whole call; no partial list is returned.
    pub async fn resolve_for_save(
        &self,
        storage: &dyn ObjectStorage,
        prefix: &str,
    ) -> std::result::Result<Vec<String>, StorageError> {
        let mut urls: Vec<String> = self.kept.iter().map(|a| a.url().to_string()).collect();

        if !self.pending.is_empty() {
            let uploads = self
                .pending
                .iter()
                .map(|entry| storage.upload(prefix, entry.image()));
            let uploaded = futures::future::try_join_all(uploads).await?;
            tracing::debug!(
                kind = self.kind.as_str(),
                uploaded = uploaded.len(),
                "Pending assets uploaded"
            );
            urls.extend(uploaded);
        }

        Ok(urls)
    }
}
