//! Boundary to the CMS host.
//!
//! The generator never renders or queries content itself. Everything it
//! needs from the CMS goes through these traits:
//!
//! | Trait            | Provides                                         |
//! |------------------|--------------------------------------------------|
//! | `Renderer`       | page and fragment HTML                           |
//! | `AliasResolver`  | canonical alias of a path                        |
//! | `ContentSource`  | published ids, unpublished media, redirects      |
//! | `AccountSwitcher`| anonymous identity and default theme for renders |
//!
//! `CommandHost` implements all of them by running configured commands.
//! Renders must happen inside an [`AnonymousScope`]; use [`render_anonymous`].

pub mod command;
#[cfg(test)]
pub mod memory;

use serde::Deserialize;
use thiserror::Error;

pub use command::CommandHost;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("host command `[host.{0}]` is not configured")]
    NotConfigured(&'static str),

    #[error("{0}")]
    Command(String),

    #[error("unexpected output from `[host.{what}]`")]
    Output {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Message(String),
}

/// A configured redirect: `source` path answers with a redirect to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Redirect {
    pub source: String,
    pub target: String,
}

// ============================================================================
// Traits
// ============================================================================

pub trait Renderer: Send + Sync {
    /// Full HTML of `path` as an anonymous visitor would receive it.
    fn render(&self, path: &str) -> Result<String, HostError>;

    /// HTML of a single fragment.
    fn render_block(&self, block_id: &str) -> Result<String, HostError>;
}

pub trait AliasResolver: Send + Sync {
    /// Canonical alias of `path`; `path` itself when it has none.
    fn alias(&self, path: &str) -> Result<String, HostError>;
}

pub trait ContentSource: Send + Sync {
    fn published_count(&self, bundle: &str) -> Result<u64, HostError>;

    fn published_ids(&self, bundle: &str, offset: u64, limit: u64)
    -> Result<Vec<String>, HostError>;

    /// File URIs (`public://...`) of unpublished media.
    fn unpublished_media_uris(&self) -> Result<Vec<String>, HostError>;

    fn redirects(&self) -> Result<Vec<Redirect>, HostError>;
}

pub trait AccountSwitcher: Send + Sync {
    /// Push the anonymous identity and default theme.
    fn switch_to_anonymous(&self) -> Result<(), HostError>;

    /// Restore the identity and theme active before the matching switch.
    fn switch_back(&self);
}

/// Everything the generator needs from the CMS.
pub trait Host: Renderer + AliasResolver + ContentSource + AccountSwitcher {}

impl<T: Renderer + AliasResolver + ContentSource + AccountSwitcher> Host for T {}

// ============================================================================
// Anonymous Scope
// ============================================================================

/// Anonymous identity held for the lifetime of the guard.
///
/// The previous identity is restored on drop, so an early return, an error
/// or a panic never leaves the host switched.
pub struct AnonymousScope<'a, S: AccountSwitcher + ?Sized> {
    switcher: &'a S,
}

impl<'a, S: AccountSwitcher + ?Sized> AnonymousScope<'a, S> {
    pub fn enter(switcher: &'a S) -> Result<Self, HostError> {
        switcher.switch_to_anonymous()?;
        Ok(Self { switcher })
    }
}

impl<S: AccountSwitcher + ?Sized> Drop for AnonymousScope<'_, S> {
    fn drop(&mut self) {
        self.switcher.switch_back();
    }
}

/// Render `path` inside an anonymous scope.
pub fn render_anonymous<H: Host + ?Sized>(host: &H, path: &str) -> Result<String, HostError> {
    let _scope = AnonymousScope::enter(host)?;
    host.render(path)
}

/// Render a fragment inside an anonymous scope.
pub fn render_block_anonymous<H: Host + ?Sized>(
    host: &H,
    block_id: &str,
) -> Result<String, HostError> {
    let _scope = AnonymousScope::enter(host)?;
    host.render_block(block_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory::MemoryHost;

    #[test]
    fn test_render_anonymous_switches_and_restores() {
        let host = MemoryHost::new().with_page("/node/1", "<p>one</p>");

        assert_eq!(render_anonymous(&host, "/node/1").unwrap(), "<p>one</p>");
        assert_eq!(host.render_identities(), vec!["anonymous"]);
        assert_eq!(host.identity(), "admin");
    }

    #[test]
    fn test_identity_restored_after_failure() {
        let host = MemoryHost::new().with_failure("/broken");

        assert!(render_anonymous(&host, "/broken").is_err());
        assert_eq!(host.identity(), "admin");
    }

    #[test]
    fn test_identity_restored_after_panic() {
        let host = MemoryHost::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = AnonymousScope::enter(&host).unwrap();
            assert_eq!(host.identity(), "anonymous");
            panic!("render blew up");
        }));

        assert!(result.is_err());
        assert_eq!(host.identity(), "admin");
    }

    #[test]
    fn test_works_through_trait_object() {
        let host = MemoryHost::new().with_block("alpha", "<div>a</div>");
        let host: &dyn Host = &host;
        assert_eq!(render_block_anonymous(host, "alpha").unwrap(), "<div>a</div>");
    }
}
