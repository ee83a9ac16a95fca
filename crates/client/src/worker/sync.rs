//! Background sync replay of queued form submissions.
//!
//! Delivery is at-least-once: a task is only removed after a 2xx replay, so
//! the server may see a submission twice if a response is lost.

use offcache_core::{Error, Request};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::CacheManager;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SyncReport {
    pub tag: String,
    /// Replayed successfully and removed from the queue.
    pub replayed: usize,
    /// Still queued for the next sync.
    pub failed: usize,
    /// Removed after reaching the attempt cap.
    pub dropped: usize,
}

impl CacheManager {
    /// Queue a request for the next sync under the configured tag.
    pub async fn queue_sync(&self, request: &Request) -> Result<i64, Error> {
        if request.is_get() {
            return Err(Error::InvalidInput("only submissions can be queued for sync".into()));
        }
        self.db.enqueue_sync(&self.config.sync_tag, request).await
    }

    /// Handle a sync event.
    ///
    /// Tags other than the configured contact form tag are ignored. Storage
    /// errors while updating a task are logged and the loop moves on to the
    /// next task; only failing to read the queue aborts the sync.
    pub async fn sync(&self, tag: &str) -> Result<SyncReport, Error> {
        let mut report = SyncReport { tag: tag.to_string(), ..Default::default() };
        if tag != self.config.sync_tag {
            tracing::debug!(tag, "ignoring unknown sync tag");
            return Ok(report);
        }

        for task in self.db.pending_sync(tag).await? {
            let request = task.to_request();
            if !request.method.eq_ignore_ascii_case("POST") || !self.config.routes.is_sync_eligible(&request) {
                continue;
            }

            let outcome = match self.network.fetch(&request).await {
                Ok(response) if response.is_success() => Ok(()),
                Ok(response) => Err(format!("status {}", response.status)),
                Err(e) => Err(e.to_string()),
            };

            match outcome {
                Ok(()) => {
                    if let Err(e) = self.db.remove_sync(task.id).await {
                        tracing::warn!(task_id = task.id, "synced but could not dequeue: {}", e);
                    }
                    report.replayed += 1;
                    tracing::info!(task_id = task.id, "contact form synced");
                }
                Err(reason) => {
                    let attempts = match self.db.record_sync_failure(task.id, &reason).await {
                        Ok(attempts) => attempts,
                        Err(e) => {
                            tracing::warn!(task_id = task.id, "could not record sync failure: {}", e);
                            report.failed += 1;
                            continue;
                        }
                    };
                    match self.config.sync_max_attempts {
                        Some(max) if attempts >= max => match self.db.remove_sync(task.id).await {
                            Ok(_) => {
                                report.dropped += 1;
                                tracing::warn!(task_id = task.id, attempts, "dropping submission: {}", reason);
                            }
                            Err(e) => {
                                report.failed += 1;
                                tracing::warn!(task_id = task.id, "could not drop submission: {}", e);
                            }
                        },
                        _ => {
                            report.failed += 1;
                            tracing::warn!(task_id = task.id, attempts, "sync failed: {}", reason);
                        }
                    }
                }
            }
        }

        Ok(report)
    }
}
