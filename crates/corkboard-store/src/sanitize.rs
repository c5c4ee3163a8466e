//! Filename validation and generation for the shared directory.

use rand::Rng;

use crate::error::{Result, StoreError};

/// Longest raw candidate name accepted for lookup or deletion.
const MAX_NAME_LEN: usize = 255;

/// Cap applied to the display-derived part of a generated store name.
const MAX_STEM_LEN: usize = 120;

/// Validate a candidate filename for lookup/delete without transforming it.
///
/// Rejects anything that could name a path outside the shared directory:
/// empty names, path separators, `..` sequences, dotfiles, and names longer
/// than 255 characters.  The HTTP boundary reuses this to reject a raw path
/// parameter before ever calling into the store.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.starts_with('.')
        || name.chars().count() > MAX_NAME_LEN
    {
        return Err(StoreError::InvalidFilename(name.to_string()));
    }
    Ok(())
}

/// Derive a store-unique on-disk name from a user-supplied display name.
///
/// Strips everything outside `[A-Za-z0-9._-]`, caps the residual at 120
/// characters, and falls back to the literal `file` when nothing survives.
/// The result is prefixed with a millisecond timestamp and a random suffix
/// so concurrent uploads of identically named files never collide.  Every
/// generated name satisfies [`validate_name`], so it can round-trip through
/// the lookup and delete paths later.
pub fn storable_name(display: &str) -> String {
    let mut stem = String::new();
    for c in display
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        // Runs of dots would trip the `..` check on the way back in.
        if c == '.' && (stem.is_empty() || stem.ends_with('.')) {
            continue;
        }
        stem.push(c);
        if stem.len() >= MAX_STEM_LEN {
            break;
        }
    }
    if stem.is_empty() {
        stem.push_str("file");
    }
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..0x100_0000);
    format!("{}-{:06x}-{}", millis, suffix, stem)
}
