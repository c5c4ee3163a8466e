//! # corkboard-store
//!
//! Shared-storage core for the corkboard note board.  A small set of trusted
//! local users posts short text notes and file attachments; both persist as
//! flat files under one shared directory.  Messages live in a single JSON
//! ledger, attachments as individual files next to it.
//!
//! This crate owns the invariants worth protecting: filename safety (no path
//! traversal out of the shared directory), id uniqueness, cascade deletion of
//! a message's attachment files, and fail-safe recovery from a corrupt
//! ledger.  The HTTP layer on top is a thin boundary that forwards into the
//! [`SharedStorage`] facade and maps [`StoreError`] codes to status codes.

pub mod error;
pub mod files;
pub mod messages;
pub mod models;
pub mod sanitize;
pub mod service;

pub use error::StoreError;
pub use files::FileStore;
pub use messages::{MessageStore, LEDGER_FILE};
pub use models::{Attachment, Message, MessageUpdate};
pub use service::{SharedStorage, UploadFile};
