//! Domain records persisted in the shared directory.
//!
//! Every struct derives `Serialize` and `Deserialize` with camelCase field
//! names so it can be handed directly to the browser UI as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single posted note, optionally carrying file attachments.
///
/// Invariant: `text` is never empty (attachment-only posts get a derived
/// caption), and `files`, when present, is never empty either.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Creation time in epoch milliseconds; unique within the ledger.
    pub id: i64,
    /// Trimmed note text, or a caption derived from the attachments.
    pub text: String,
    /// ISO-8601 creation timestamp, immutable after creation.
    pub created_at: DateTime<Utc>,
    /// Optional free-text annotation; absent rather than empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Attachment metadata, present only for upload messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<Attachment>>,
}

/// Metadata for one uploaded file recorded against a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// The user-supplied name, unsanitized, for display only.
    pub original_name: String,
    /// The sanitized, store-unique on-disk name.  Never contains a path
    /// separator or traversal sequence.
    pub filename: String,
    /// Size in bytes of the written file.
    pub size: u64,
    /// Client-declared MIME type, best effort.
    pub mimetype: String,
    /// Public URL, derived deterministically from `filename`.
    pub url: String,
}

/// Partial update applied to an existing message.  At least one field must
/// be present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageUpdate {
    /// Replacement text; blank after trimming is rejected.
    #[serde(default)]
    pub text: Option<String>,
    /// Replacement note; blank after trimming removes the note entirely.
    #[serde(default)]
    pub note: Option<String>,
}
