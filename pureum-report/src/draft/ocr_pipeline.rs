//! Receipt recognition pipeline
//!
//! Dual-provider fallback: the hosted service first, the local tesseract
//! fallback second, never in parallel. One extraction walks
//! idle → requesting remote → (done | requesting local → (done | failed)),
//! the whole walk bounded by a ceiling timeout independent of either
//! provider's own transport timeout.
//!
//! Supersession: every extraction carries the generation ticket handed out
//! when its image was added. Whenever a provider resolves, the ticket is
//! compared against the current generation; a stale result is discarded,
//! never queued.

use crate::models::LocalImage;
use crate::services::OcrProvider;
use pureum_common::api::LineItem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Phase of one in-flight extraction, for logging and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrPhase {
    Idle,
    RequestingRemote,
    RequestingLocal,
    Done,
    Failed,
}

/// Terminal result of one extraction attempt
#[derive(Debug, Clone, PartialEq)]
pub enum OcrOutcome {
    /// A provider produced items (possibly zero of them - an empty receipt
    /// is a success, the UI prompts for manual entry)
    Recognized {
        provider: &'static str,
        items: Vec<LineItem>,
        total: i64,
    },
    /// Another image was added while this extraction was in flight; the
    /// result does not correspond to the current image and was dropped
    Superseded { ticket: u64 },
    /// Every provider failed, or the ceiling elapsed
    Failed { message: String },
}

enum ProviderRun {
    Done {
        provider: &'static str,
        items: Vec<LineItem>,
    },
    Superseded,
    Failed(String),
}

/// Dual-provider extraction pipeline with generation-based supersession
pub struct OcrPipeline {
    remote: Arc<dyn OcrProvider>,
    local: Option<Arc<dyn OcrProvider>>,
    ceiling: Duration,
    generation: AtomicU64,
}

impl OcrPipeline {
    /// Build the pipeline. An unavailable local fallback (tesseract not
    /// installed) is dropped with a warning; recognition then runs
    /// remote-only.
    pub fn new(
        remote: Arc<dyn OcrProvider>,
        local: Option<Arc<dyn OcrProvider>>,
        ceiling: Duration,
    ) -> Self {
        let local = local.filter(|provider| {
            if provider.is_available() {
                tracing::info!(
                    provider = provider.provider_id(),
                    "Local recognition fallback available"
                );
                true
            } else {
                tracing::warn!(
                    provider = provider.provider_id(),
                    "Local recognition fallback unavailable, continuing remote-only"
                );
                false
            }
        });

        Self {
            remote,
            local,
            ceiling,
            generation: AtomicU64::new(0),
        }
    }

    /// Hand out the ticket for a newly added image. Starting a new
    /// extraction supersedes every earlier in-flight one.
    pub fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Run one extraction for the image whose addition produced `ticket`.
    ///
    /// In-flight provider requests are abandoned on ceiling expiry, not
    /// cancelled; the transport may not support cancellation.
    pub async fn extract(&self, image: &LocalImage, ticket: u64) -> OcrOutcome {
        let run = tokio::time::timeout(self.ceiling, self.run_providers(image, ticket)).await;

        // supersession check at resolution, not at scheduling
        if self.current_generation() != ticket {
            tracing::debug!(ticket, "Recognition result superseded, discarding");
            return OcrOutcome::Superseded { ticket };
        }

        match run {
            Ok(ProviderRun::Done { provider, items }) => {
                let total = items.iter().map(|item| item.amount).sum();
                tracing::info!(
                    ticket,
                    provider,
                    item_count = items.len(),
                    total,
                    phase = ?OcrPhase::Done,
                    "Recognition finished"
                );
                OcrOutcome::Recognized {
                    provider,
                    items,
                    total,
                }
            }
            Ok(ProviderRun::Superseded) => OcrOutcome::Superseded { ticket },
            Ok(ProviderRun::Failed(message)) => {
                tracing::warn!(ticket, phase = ?OcrPhase::Failed, %message, "Recognition failed");
                OcrOutcome::Failed { message }
            }
            Err(_elapsed) => {
                tracing::warn!(
                    ticket,
                    ceiling_ms = self.ceiling.as_millis() as u64,
                    phase = ?OcrPhase::Failed,
                    "Recognition ceiling elapsed, abandoning in-flight requests"
                );
                OcrOutcome::Failed {
                    message: "영수증 인식 시간이 초과되었습니다. 금액을 직접 입력해 주세요."
                        .to_string(),
                }
            }
        }
    }

    async fn run_providers(&self, image: &LocalImage, ticket: u64) -> ProviderRun {
        tracing::debug!(
            ticket,
            provider = self.remote.provider_id(),
            phase = ?OcrPhase::RequestingRemote,
            "Starting recognition"
        );

        let remote_err = match self.remote.recognize(image).await {
            Ok(items) => {
                return ProviderRun::Done {
                    provider: self.remote.provider_id(),
                    items,
                }
            }
            Err(e) => e,
        };
        tracing::warn!(ticket, error = %remote_err, "Remote recognition failed");

        // do not bother the fallback for a result nobody will apply
        if self.current_generation() != ticket {
            return ProviderRun::Superseded;
        }

        let Some(local) = &self.local else {
            return ProviderRun::Failed(format!(
                "영수증 인식에 실패했습니다 ({})",
                remote_err
            ));
        };

        tracing::debug!(
            ticket,
            provider = local.provider_id(),
            phase = ?OcrPhase::RequestingLocal,
            "Falling back to local recognition"
        );
        match local.recognize(image).await {
            Ok(items) => ProviderRun::Done {
                provider: local.provider_id(),
                items,
            },
            Err(local_err) => ProviderRun::Failed(format!(
                "영수증 인식에 실패했습니다 (remote: {}; local: {})",
                remote_err, local_err
            )),
        }
    }
}
