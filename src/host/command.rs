//! Host implemented by running `[host]` command templates.
//!
//! Each call expands the template for that operation and runs it without a
//! shell. HTML comes back on stdout as-is, lists come back as JSON.

use super::{AccountSwitcher, AliasResolver, ContentSource, HostError, Redirect, Renderer};
use crate::config::HostConfig;
use crate::utils::exec::{SILENT_FILTER, exec, expand_template};
use serde::Deserialize;
use std::{
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
};

pub struct CommandHost {
    config: HostConfig,
    working_dir: Option<PathBuf>,
    /// Open anonymous scopes. Renders outside a scope are refused.
    anonymous: AtomicUsize,
}

/// Ids may be printed as JSON numbers or strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum ContentId {
    Number(u64),
    Text(String),
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        match id {
            ContentId::Number(n) => n.to_string(),
            ContentId::Text(s) => s,
        }
    }
}

impl CommandHost {
    pub fn new(config: &HostConfig) -> Self {
        Self {
            config: config.clone(),
            working_dir: config.working_dir.clone(),
            anonymous: AtomicUsize::new(0),
        }
    }

    /// Run the `what` command and return its stdout.
    fn run(
        &self,
        what: &'static str,
        template: &[String],
        vars: &[(&str, &str)],
    ) -> Result<String, HostError> {
        if template.is_empty() {
            return Err(HostError::NotConfigured(what));
        }
        let cmd = expand_template(template, vars);
        let output = exec(self.working_dir.as_deref(), &cmd, &SILENT_FILTER)
            .map_err(|err| HostError::Command(format!("{err:#}")))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run_json<T: for<'de> Deserialize<'de>>(
        &self,
        what: &'static str,
        template: &[String],
        vars: &[(&str, &str)],
    ) -> Result<T, HostError> {
        let stdout = self.run(what, template, vars)?;
        let stdout = stdout.trim();
        let stdout = if stdout.is_empty() { "[]" } else { stdout };
        serde_json::from_str(stdout).map_err(|source| HostError::Output { what, source })
    }

    fn ensure_anonymous(&self) -> Result<(), HostError> {
        if self.anonymous.load(Ordering::SeqCst) == 0 {
            return Err(HostError::Message(
                "render requested outside an anonymous scope".into(),
            ));
        }
        Ok(())
    }
}

impl Renderer for CommandHost {
    fn render(&self, path: &str) -> Result<String, HostError> {
        self.ensure_anonymous()?;
        let user = self.config.anonymous_user.as_str();
        self.run("render", &self.config.render, &[("path", path), ("user", user)])
    }

    fn render_block(&self, block_id: &str) -> Result<String, HostError> {
        self.ensure_anonymous()?;
        let user = self.config.anonymous_user.as_str();
        self.run("render_block", &self.config.render_block, &[("block", block_id), ("user", user)])
    }
}

impl AliasResolver for CommandHost {
    fn alias(&self, path: &str) -> Result<String, HostError> {
        if self.config.alias.is_empty() {
            return Ok(path.to_owned());
        }
        let alias = self.run("alias", &self.config.alias, &[("path", path)])?;
        let alias = alias.trim();
        Ok(if alias.is_empty() { path } else { alias }.to_owned())
    }
}

impl ContentSource for CommandHost {
    fn published_count(&self, bundle: &str) -> Result<u64, HostError> {
        let stdout = self.run("count", &self.config.count, &[("bundle", bundle)])?;
        stdout.trim().parse().map_err(|_| {
            HostError::Message(format!(
                "`[host.count]` printed `{}`, expected an integer",
                stdout.trim()
            ))
        })
    }

    fn published_ids(
        &self,
        bundle: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<String>, HostError> {
        let offset = offset.to_string();
        let limit = limit.to_string();
        let ids: Vec<ContentId> = self.run_json(
            "ids",
            &self.config.ids,
            &[("bundle", bundle), ("offset", &offset), ("limit", &limit)],
        )?;
        Ok(ids.into_iter().map(String::from).collect())
    }

    fn unpublished_media_uris(&self) -> Result<Vec<String>, HostError> {
        if self.config.unpublished_media.is_empty() {
            return Ok(Vec::new());
        }
        self.run_json("unpublished_media", &self.config.unpublished_media, &[])
    }

    fn redirects(&self) -> Result<Vec<Redirect>, HostError> {
        self.run_json("redirects", &self.config.redirects, &[])
    }
}

impl AccountSwitcher for CommandHost {
    fn switch_to_anonymous(&self) -> Result<(), HostError> {
        self.anonymous.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn switch_back(&self) {
        let _ = self
            .anonymous
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}
