//! Errors raised while generating pages and fragments.
//!
//! | Variant                | Single page   | Bulk run                   |
//! |------------------------|---------------|----------------------------|
//! | `ConfigurationMissing` | propagated    | aborts before any sweep    |
//! | `Render` / `Extract`   | propagated    | logged, counted, continue  |
//! | `Io`                   | propagated    | logged, counted, continue  |
//! | `Host`                 | propagated    | aborts the bundle          |
//! | `Sync`                 | -             | logged, non-zero exit      |
//! | `Cancelled`            | -             | stops between items        |
//!
//! Exclusions are not errors; they surface as a `PageStatus`.

use crate::esi::ExtractError;
use crate::host::HostError;
use std::{error::Error as StdError, io, path::PathBuf};
use thiserror::Error;

pub type Result<T, E = GenerateError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("failed to render `{path}`")]
    Render {
        path: String,
        #[source]
        source: HostError,
    },

    #[error("host query failed: {what}")]
    Host {
        what: &'static str,
        #[source]
        source: HostError,
    },

    #[error("failed to process markup of `{path}`")]
    Extract {
        path: String,
        #[source]
        source: ExtractError,
    },

    #[error("IO error at `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("file sync failed: {0}")]
    Sync(String),

    #[error("run cancelled")]
    Cancelled,

    #[error("failed to start the render pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid fragment id pattern")]
    Pattern(#[from] regex::Error),
}

impl GenerateError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Render an error and its sources on one line, `outer: inner: root`.
pub fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
