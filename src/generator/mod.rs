//! Page, fragment and bulk generation.
//!
//! | Module     | Purpose                                               |
//! |------------|-------------------------------------------------------|
//! | `page`     | One page: render, extract fragments, write            |
//! | `bulk`     | Site-wide runs, windows, reports, cancellation        |
//! | `sweep`    | Top-level deletes of the output root                  |
//! | `redirect` | Meta-refresh pages for configured redirects           |
//! | `files`    | Exclude list and sync command for mirrored files      |
//! | `info`     | Status of one generated path                          |

pub mod bulk;
pub mod files;
pub mod info;
pub mod page;
pub mod redirect;
pub mod sweep;

pub use bulk::{BulkOrchestrator, CancelFlag, NodeQuery, RunReport};
pub use page::{PageGenerator, PageOptions, PageStatus};
