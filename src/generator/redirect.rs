//! Static redirect pages.
//!
//! A static server cannot answer with a 301, so each configured redirect is
//! baked in as a meta-refresh document at the source path's output location.

use crate::error::{GenerateError, Result};
use crate::host::Redirect;
use crate::paths::PathResolver;
use crate::utils::fs::write_atomic;
use crate::vlog;
use quick_xml::escape::escape;
use std::path::PathBuf;

/// Public URL of a redirect target.
///
/// `internal:/x` becomes `/x`, `entity:node/5` becomes the alias of
/// `/node/5`, anything else (absolute URLs) is kept.
pub fn redirect_target(resolver: &PathResolver<'_>, target: &str) -> Result<String> {
    if let Some(path) = target.strip_prefix("internal:") {
        return Ok(path.to_owned());
    }
    if let Some(entity) = target.strip_prefix("entity:") {
        let path = format!("/{}", entity.trim_start_matches('/'));
        return resolver
            .resolve_alias(&path)
            .map_err(|source| GenerateError::Host {
                what: "alias",
                source,
            });
    }
    Ok(target.to_owned())
}

pub fn redirect_markup(url: &str) -> String {
    let url = escape(url);
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\
         <meta http-equiv=\"refresh\" content=\"0; url={url}\">\
         <link rel=\"canonical\" href=\"{url}\"></head>\
         <body><a href=\"{url}\">{url}</a></body></html>\n"
    )
}

/// Write the redirect page of `redirect`. Returns the written file.
pub fn write_redirect(resolver: &PathResolver<'_>, redirect: &Redirect) -> Result<PathBuf> {
    let source = format!("/{}", redirect.source.trim_start_matches('/'));
    let target = redirect_target(resolver, &redirect.target)?;
    let file = resolver.output_path(&source);

    write_atomic(&file, redirect_markup(&target).as_bytes())
        .map_err(|err| GenerateError::io(&file, err))?;
    vlog!("redirect"; "{source} -> {target}");
    Ok(file)
}
