//! Change detection for the watched file.
//!
//! The modification time is only a pre-filter: the content is re-read when the
//! mtime moves, and published only when it differs from what was last
//! uploaded successfully.

use crate::config::WatchTarget;
use crate::consul::Publish;
use crate::hashing::short_digest;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

/// Last observed modification time and last successfully uploaded content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSnapshot {
    pub modified: Option<SystemTime>,
    pub content: Option<Vec<u8>>,
}

impl FileSnapshot {
    pub fn clear(&mut self) {
        self.modified = None;
        self.content = None;
    }
}

/// What a single poll tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Metadata unchanged and nothing pending, file not read
    Idle,
    /// File re-read but content matches the last upload
    Unchanged,
    /// New content uploaded
    Published,
    /// New content read but the upload failed; retried next tick
    PublishFailed,
    /// File does not exist right now
    Missing,
    /// Metadata or content could not be read; retried next tick
    ReadFailed,
}

pub struct ChangeDetector {
    target: WatchTarget,
    snapshot: FileSnapshot,
    retry_pending: bool,
    missing: bool,
}

impl ChangeDetector {
    pub fn new(target: WatchTarget) -> Self {
        Self {
            target,
            snapshot: FileSnapshot::default(),
            retry_pending: false,
            missing: false,
        }
    }

    pub fn target(&self) -> &WatchTarget {
        &self.target
    }

    pub fn snapshot(&self) -> &FileSnapshot {
        &self.snapshot
    }

    /// Run one polling tick. Never fails: errors are logged and reported
    /// through the returned outcome.
    pub async fn poll<P>(&mut self, publisher: &P) -> PollOutcome
    where
        P: Publish + ?Sized,
    {
        let path = self.target.path();

        let modified = match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == ErrorKind::NotFound => return self.mark_missing(),
            Err(e) => {
                error!("Failed to stat {}: {}", path.display(), e);
                return PollOutcome::ReadFailed;
            }
        };

        if self.missing {
            info!("File reappeared: {}", path.display());
            self.missing = false;
        }

        let first_poll = self.snapshot.modified.is_none();
        if !first_poll && self.snapshot.modified == Some(modified) && !self.retry_pending {
            return PollOutcome::Idle;
        }

        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return self.mark_missing(),
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                return PollOutcome::ReadFailed;
            }
        };

        self.snapshot.modified = Some(modified);

        if self.snapshot.content.as_deref() == Some(content.as_slice()) {
            debug!(
                modified = %DateTime::<Utc>::from(modified).to_rfc3339(),
                "Content unchanged, skipping upload"
            );
            self.retry_pending = false;
            return PollOutcome::Unchanged;
        }

        info!(
            bytes = content.len(),
            sha256 = %short_digest(&content),
            "Detected new content in {}",
            path.display()
        );

        if publisher.publish(&content).await {
            self.snapshot.content = Some(content);
            self.retry_pending = false;
            PollOutcome::Published
        } else {
            // Keep the old content so the next tick retries even without a new mtime
            self.retry_pending = true;
            PollOutcome::PublishFailed
        }
    }

    fn mark_missing(&mut self) -> PollOutcome {
        if !self.missing {
            warn!(
                "File disappeared: {}; waiting for it to come back",
                self.target.path().display()
            );
            self.missing = true;
        }
        self.snapshot.clear();
        self.retry_pending = false;
        PollOutcome::Missing
    }
}
