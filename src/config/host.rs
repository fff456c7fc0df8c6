//! `[host]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[host]` section - commands used to talk to the CMS.
///
/// Every command is an argument list; placeholders are substituted per call
/// and never passed through a shell.
///
/// `render` and `render_block` must produce what an anonymous visitor sees
/// with the default theme. `{user}` expands to `anonymous_user` so the
/// command can pass it on to the CMS.
///
/// | Command             | Placeholders                    | Stdout                 |
/// |---------------------|---------------------------------|------------------------|
/// | `render`            | `{path}` `{user}`               | page HTML              |
/// | `render_block`      | `{block}` `{user}`              | fragment HTML          |
/// | `alias`             | `{path}`                        | alias (empty = none)   |
/// | `count`             | `{bundle}`                      | integer                |
/// | `ids`               | `{bundle}` `{offset}` `{limit}` | JSON array of ids      |
/// | `unpublished_media` |                                 | JSON array of URIs     |
/// | `redirects`         |                                 | JSON array of objects  |
///
/// # Example
/// ```toml
/// [host]
/// working_dir = "/var/www/html"
/// render = ["drush", "sg:render", "--user={user}", "{path}"]
/// alias = ["drush", "sg:alias", "{path}"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Working directory for host commands.
    pub working_dir: Option<PathBuf>,
    /// Account renders run as; substituted for `{user}`.
    #[educe(Default = defaults::host::anonymous_user())]
    pub anonymous_user: String,
    pub render: Vec<String>,
    pub render_block: Vec<String>,
    pub alias: Vec<String>,
    pub count: Vec<String>,
    pub ids: Vec<String>,
    pub unpublished_media: Vec<String>,
    pub redirects: Vec<String>,
}
