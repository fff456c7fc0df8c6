//! List-valued settings.
//!
//! Older configurations store lists as a single comma separated string
//! (`"/admin/*,/user/*"`). Both that form and a TOML array are accepted and
//! normalized once, at load time, into `Vec<String>`.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawList {
    Items(Vec<String>),
    Joined(String),
}

/// Split a comma separated list, trimming entries and dropping empty ones.
pub fn split_joined(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

/// `deserialize_with` adapter for list settings.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawList::deserialize(deserializer)? {
        RawList::Items(items) => items
            .into_iter()
            .map(|item| item.trim().to_owned())
            .filter(|item| !item.is_empty())
            .collect(),
        RawList::Joined(joined) => split_joined(&joined),
    })
}
