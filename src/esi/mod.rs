//! Fragment caching: extraction of fragment elements into include
//! directives, and the fragment files they point to.

pub mod extract;
pub mod id;
pub mod store;

pub use extract::{ExtractError, FragmentExtractor};
pub use store::{FragmentStore, PutOutcome};
