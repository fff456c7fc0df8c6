//! Fragment ids derived from element ids.
//!
//! ```text
//! block-system-main                   ──▶ system_main
//! block-views_block--recent__page_123 ──▶ views_block--recent-node-123   (on /node/123)
//! ```
//!
//! A compound id (containing `__`) is parameterised per page, so its head is
//! kept verbatim and suffixed with the page slug to keep pages apart.

use crate::paths::slug_for_path;

/// Separator marking a compound element id.
const COMPOUND_SEPARATOR: &str = "__";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedId {
    /// Prefix-stripped id with dashes as underscores. Checked against the
    /// do-not-fragment list together with `id`.
    pub normalized: String,
    /// File name and URL segment of the fragment.
    pub id: String,
}

/// Derive the fragment id of an element on `page_path`.
///
/// Returns `None` when nothing usable remains, or when the result could
/// escape the fragment directory.
pub fn derive(element_id: &str, id_prefix: &str, page_path: &str) -> Option<DerivedId> {
    let stripped = element_id
        .trim()
        .strip_prefix(id_prefix)
        .unwrap_or(element_id.trim());
    if stripped.is_empty() {
        return None;
    }

    let normalized = stripped.replace('-', "_");
    let id = match stripped.split_once(COMPOUND_SEPARATOR) {
        Some((head, _)) if !head.is_empty() => {
            let slug = slug_for_path(page_path);
            if slug.is_empty() {
                head.to_owned()
            } else {
                format!("{head}-{slug}")
            }
        }
        _ => normalized.clone(),
    };

    is_safe(&id).then_some(DerivedId { normalized, id })
}

/// A fragment id must be a single, non-hidden path segment.
pub fn is_safe(id: &str) -> bool {
    !id.is_empty() && !id.starts_with('.') && !id.contains(['/', '\\', '\0'])
}
