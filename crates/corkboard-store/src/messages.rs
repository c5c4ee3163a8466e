//! Message store: the single JSON ledger of posted notes.
//!
//! The ledger is loaded in full and rewritten in full on every mutation.
//! Nothing guards concurrent read-modify-write cycles: two racing mutators
//! can interleave as read-A, read-B, write-A, write-B and silently lose A's
//! update.  Last writer wins.  This is an accepted limitation for a single
//! trusted local user, not something to paper over with locking.

use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::models::{Attachment, Message, MessageUpdate};

/// Reserved name of the ledger file inside the shared directory.  The facade
/// excludes it from file listings.
pub const LEDGER_FILE: &str = "messages.json";

/// Parse a caller-supplied message id.  Anything that is not a whole number
/// is an [`StoreError::InvalidId`], distinct from a well-formed id that
/// matches no record.
pub fn parse_id(raw: &str) -> Result<i64> {
    raw.trim().parse::<i64>().map_err(|_| StoreError::InvalidId)
}

/// Owns the ledger document at an injected path.
#[derive(Debug)]
pub struct MessageStore {
    ledger_path: PathBuf,
    // Highest id handed out by this instance; posts inside the same
    // millisecond still get strictly increasing ids.
    last_id: AtomicI64,
}

impl MessageStore {
    pub fn new(ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            ledger_path: ledger_path.into(),
            last_id: AtomicI64::new(0),
        }
    }

    pub fn ledger_path(&self) -> &std::path::Path {
        &self.ledger_path
    }

    /// Read the full ledger in insertion order.
    ///
    /// A missing file, unreadable bytes, or content that is not a JSON array
    /// of records all degrade to an empty list.  Corruption never fails the
    /// caller; the next mutation overwrites the damaged file.  This is a
    /// deliberate fail-safe policy with a known data-loss risk.
    pub async fn read_all(&self) -> Vec<Message> {
        let bytes = match fs::read(&self.ledger_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        path = %self.ledger_path.display(),
                        error = %e,
                        "failed to read ledger, treating as empty"
                    );
                }
                return Vec::new();
            }
        };
        match serde_json::from_slice::<Vec<Message>>(&bytes) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(
                    path = %self.ledger_path.display(),
                    error = %e,
                    "ledger is not a valid message array, treating as empty"
                );
                Vec::new()
            }
        }
    }

    /// Append a plain text note.  The text is trimmed; blank text is
    /// rejected with [`StoreError::InvalidText`].
    pub async fn append(&self, text: &str) -> Result<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::InvalidText);
        }
        let message = Message {
            id: self.next_id(),
            text: text.to_string(),
            created_at: Utc::now(),
            note: None,
            files: None,
        };
        let mut all = self.read_all().await;
        all.push(message.clone());
        self.write_all(&all).await?;

        debug!(id = message.id, "appended message");
        Ok(message)
    }

    /// Append an upload note carrying attachment metadata.
    ///
    /// The attachment list must be non-empty; an empty list reuses the
    /// empty-text error code, which keeps the caller's handling simple.
    /// Blank text gets a derived caption: the single attachment's original
    /// name, or `"<N> files"` for more than one.
    pub async fn append_with_attachments(
        &self,
        text: Option<&str>,
        attachments: Vec<Attachment>,
    ) -> Result<Message> {
        if attachments.is_empty() {
            return Err(StoreError::InvalidText);
        }
        let trimmed = text.unwrap_or("").trim();
        let text = if !trimmed.is_empty() {
            trimmed.to_string()
        } else if attachments.len() == 1 {
            attachments[0].original_name.clone()
        } else {
            format!("{} files", attachments.len())
        };
        let message = Message {
            id: self.next_id(),
            text,
            created_at: Utc::now(),
            note: None,
            files: Some(attachments),
        };
        let mut all = self.read_all().await;
        all.push(message.clone());
        self.write_all(&all).await?;

        debug!(id = message.id, files = message.files.as_ref().map(Vec::len), "appended upload message");
        Ok(message)
    }

    /// Remove a message and return the removed record, `files` included, so
    /// the facade can cascade-delete its attachments.
    pub async fn delete_by_id(&self, id: i64) -> Result<Message> {
        let mut all = self.read_all().await;
        let index = all
            .iter()
            .position(|m| m.id == id)
            .ok_or(StoreError::NotFound(id))?;
        let removed = all.remove(index);
        self.write_all(&all).await?;

        debug!(id, "deleted message");
        Ok(removed)
    }

    /// Merge the provided fields into an existing record.
    ///
    /// At least one of `text`/`note` must be present.  Blank text is
    /// rejected; a blank note removes the field entirely rather than
    /// persisting an empty string.  `id` and `created_at` never change.
    pub async fn update_by_id(&self, id: i64, update: MessageUpdate) -> Result<Message> {
        if update.text.is_none() && update.note.is_none() {
            return Err(StoreError::InvalidText);
        }
        let text = match update.text.as_deref().map(str::trim) {
            Some("") => return Err(StoreError::InvalidText),
            other => other.map(str::to_string),
        };

        let mut all = self.read_all().await;
        let slot = all
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if let Some(text) = text {
            slot.text = text;
        }
        if let Some(note) = update.note.as_deref().map(str::trim) {
            slot.note = if note.is_empty() {
                None
            } else {
                Some(note.to_string())
            };
        }
        let updated = slot.clone();
        self.write_all(&all).await?;

        debug!(id, "updated message");
        Ok(updated)
    }

    fn next_id(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let prev = self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            });
        match prev {
            Ok(last) | Err(last) => now.max(last + 1),
        }
    }

    /// Rewrite the whole ledger: pretty-printed JSON array, trailing
    /// newline, UTF-8.
    async fn write_all(&self, messages: &[Message]) -> Result<()> {
        let mut body = serde_json::to_string_pretty(messages).map_err(std::io::Error::from)?;
        body.push('\n');
        fs::write(&self.ledger_path, body).await?;
        Ok(())
    }
}
