//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [generator] Section Defaults
// ============================================================================

pub mod generator {
    use std::path::PathBuf;

    /// Unset on purpose: sweeping an unconfigured root must fail validation.
    pub fn directory() -> PathBuf {
        PathBuf::new()
    }

    pub fn front_page() -> String {
        "/front".into()
    }

    pub fn node_path() -> String {
        "/node/{id}".into()
    }

    pub fn bundles() -> Vec<String> {
        vec!["page".into()]
    }

    pub fn batch_size() -> u64 {
        1000
    }

    pub fn workers() -> usize {
        1
    }

    pub fn strip_ids() -> Vec<String> {
        vec!["toolbar-administration".into()]
    }
}

// ============================================================================
// [esi] Section Defaults
// ============================================================================

pub mod esi {
    pub fn directory() -> String {
        "esi/block".into()
    }

    pub fn marker_class() -> String {
        "block".into()
    }

    pub fn id_prefix() -> String {
        "block-".into()
    }
}

// ============================================================================
// [sweep] Section Defaults
// ============================================================================

pub mod sweep {
    pub fn drupal() -> Vec<String> {
        ["core", "modules", "themes", "libraries", "profiles", "sites"]
            .into_iter()
            .map(String::from)
            .collect()
    }
}

// ============================================================================
// [files] Section Defaults
// ============================================================================

pub mod files {
    pub fn command() -> Vec<String> {
        ["rsync", "-a", "--exclude-from={exclude_from}", "{source}/", "{dest}"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    pub fn public_files() -> String {
        "sites/default/files".into()
    }
}

// ============================================================================
// [host] Section Defaults
// ============================================================================

pub mod host {
    /// Drupal's anonymous account.
    pub fn anonymous_user() -> String {
        "0".into()
    }
}
