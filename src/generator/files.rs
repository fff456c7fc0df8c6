//! File mirroring into the output root.
//!
//! ```text
//! unpublished media URIs ─┐
//!                         ├─▶ exclude file ─▶ sync command (once per source)
//! [files].exclude ────────┘
//! ```
//!
//! The sync command itself is external; only the exclude list and the
//! argument expansion happen here.

use crate::config::{SiteConfig, SyncSource};
use crate::error::{GenerateError, Result};
use crate::host::ContentSource;
use crate::log;
use crate::utils::exec::{EMPTY_FILTER, exec, expand_template};
use std::{borrow::Cow, fs, io::Write, path::Path};

/// Output-relative path of an unpublished media file, without leading slash.
///
/// `public://` URIs land under `public_files`; absolute paths are taken as
/// output-relative already. Other schemes (`private://`, remote URLs) are
/// never mirrored and yield `None`.
pub fn media_exclude(uri: &str, public_files: &str) -> Option<String> {
    let public_files = public_files.trim_matches('/');
    if let Some(rest) = uri.strip_prefix("public://") {
        let rest = urlencoding::decode(rest).unwrap_or(Cow::Borrowed(rest));
        return Some(format!("{public_files}/{}", rest.trim_start_matches('/')));
    }
    if uri.starts_with('/') {
        let decoded = urlencoding::decode(uri).unwrap_or(Cow::Borrowed(uri));
        return Some(decoded.trim_start_matches('/').to_owned());
    }
    None
}

/// Exclude patterns for one source: media files below the source's
/// destination, anchored at the transfer root, then the configured excludes.
pub fn exclude_list(source: &SyncSource, media: &[String], extra: &[String]) -> Vec<String> {
    let dest = source.to.trim_matches('/');
    let anchored = media.iter().filter_map(|path| {
        if dest.is_empty() {
            Some(format!("/{path}"))
        } else {
            path.strip_prefix(dest)
                .and_then(|rest| rest.strip_prefix('/'))
                .map(|rest| format!("/{rest}"))
        }
    });
    anchored.chain(extra.iter().cloned()).collect()
}

/// Mirror every configured source. Returns the number of synced sources.
///
/// Every source is attempted; failures are collected into one
/// [`GenerateError::Sync`].
pub fn sync_files(config: &SiteConfig, host: &dyn ContentSource) -> Result<usize> {
    let files = &config.files;
    if files.sources.is_empty() {
        log!("sync"; "no sources configured");
        return Ok(0);
    }
    let program = files
        .command
        .first()
        .ok_or_else(|| GenerateError::Sync("files.command is empty".into()))?;
    which::which(program)
        .map_err(|_| GenerateError::Sync(format!("`{program}` not found in PATH")))?;

    let media: Vec<String> = host
        .unpublished_media_uris()
        .map_err(|source| GenerateError::Host {
            what: "unpublished_media",
            source,
        })?
        .iter()
        .filter_map(|uri| media_exclude(uri, &files.public_files))
        .collect();
    log!("sync"; "{} unpublished media files excluded", media.len());

    let root = &config.generator.directory;
    let mut failures = Vec::new();
    let mut synced = 0;
    for source in &files.sources {
        match sync_source(config, root, source, &media) {
            Ok(()) => synced += 1,
            Err(err) => {
                log!("error"; "{}: {err}", source.from.display());
                failures.push(format!("{}: {err}", source.from.display()));
            }
        }
    }

    if failures.is_empty() {
        Ok(synced)
    } else {
        Err(GenerateError::Sync(failures.join("; ")))
    }
}

fn sync_source(
    config: &SiteConfig,
    root: &Path,
    source: &SyncSource,
    media: &[String],
) -> std::result::Result<(), String> {
    let dest = root.join(source.to.trim_matches('/'));
    fs::create_dir_all(&dest).map_err(|err| err.to_string())?;

    let mut exclude = tempfile::Builder::new()
        .prefix("esigen-exclude")
        .suffix(".txt")
        .tempfile()
        .map_err(|err| err.to_string())?;
    for pattern in exclude_list(source, media, &config.files.exclude) {
        writeln!(exclude, "{pattern}").map_err(|err| err.to_string())?;
    }
    exclude.flush().map_err(|err| err.to_string())?;

    let from = source.from.to_string_lossy();
    let dest = dest.to_string_lossy();
    let exclude_from = exclude.path().to_string_lossy();
    let cmd = expand_template(
        &config.files.command,
        &[
            ("source", from.trim_end_matches('/')),
            ("dest", &*dest),
            ("exclude_from", &*exclude_from),
        ],
    );

    log!("sync"; "{from} -> {dest}");
    exec(None, &cmd, &EMPTY_FILTER).map_err(|err| format!("{err:#}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn source(to: &str) -> SyncSource {
        SyncSource {
            from: PathBuf::from("/var/www/html/sites/default/files"),
            to: to.into(),
        }
    }

    #[test]
    fn test_media_exclude() {
        let public = "sites/default/files";
        assert_eq!(
            media_exclude("public://2024/a%20b.jpg", public).as_deref(),
            Some("sites/default/files/2024/a b.jpg")
        );
        assert_eq!(
            media_exclude("/sites/default/files/x.pdf", public).as_deref(),
            Some("sites/default/files/x.pdf")
        );
        assert_eq!(media_exclude("private://secret.pdf", public), None);
        assert_eq!(media_exclude("https://cdn.example.org/x.png", public), None);
    }

    #[test]
    fn test_exclude_list_relative_to_destination() {
        let media = vec![
            "sites/default/files/2024/a.jpg".to_string(),
            "modules/custom/x.js".to_string(),
        ];
        let extra = vec!["*.php".to_string()];

        assert_eq!(
            exclude_list(&source("sites/default/files"), &media, &extra),
            vec!["/2024/a.jpg", "*.php"]
        );
        assert_eq!(
            exclude_list(&source(""), &media, &[]),
            vec!["/sites/default/files/2024/a.jpg", "/modules/custom/x.js"]
        );
    }

    #[test]
    fn test_exclude_list_does_not_match_sibling_prefix() {
        let media = vec!["sites/default/files-old/a.jpg".to_string()];
        assert!(exclude_list(&source("sites/default/files"), &media, &[]).is_empty());
    }

    #[test]
    fn test_sync_without_sources() {
        let config = SiteConfig::default();
        let host = MemoryHost::new();
        assert_eq!(sync_files(&config, &host).unwrap(), 0);
    }

    #[test]
    fn test_sync_missing_program() {
        let dir = TempDir::new().unwrap();
        let mut config = SiteConfig::default();
        config.generator.directory = dir.path().to_path_buf();
        config.files.command = vec!["esigen-no-such-sync-tool".into()];
        config.files.sources = vec![source("files")];

        let host = MemoryHost::new();
        assert!(matches!(sync_files(&config, &host), Err(GenerateError::Sync(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_sync_runs_command_per_source() {
        let dir = TempDir::new().unwrap();
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("a.txt"), "a").unwrap();

        let mut config = SiteConfig::default();
        config.generator.directory = dir.path().to_path_buf();
        config.files.command = vec![
            "cp".into(),
            "-R".into(),
            "{source}/.".into(),
            "{dest}".into(),
        ];
        config.files.sources = vec![SyncSource {
            from: src.path().to_path_buf(),
            to: "mirror".into(),
        }];

        let host = MemoryHost::new().with_media("public://hidden.jpg");
        assert_eq!(sync_files(&config, &host).unwrap(), 1);
        assert_eq!(fs::read_to_string(dir.path().join("mirror/a.txt")).unwrap(), "a");
    }

    #[cfg(unix)]
    #[test]
    fn test_sync_failure_is_collected() {
        let dir = TempDir::new().unwrap();
        let mut config = SiteConfig::default();
        config.generator.directory = dir.path().to_path_buf();
        config.files.command = vec!["false".into()];
        config.files.sources = vec![source("a"), source("b")];

        let host = MemoryHost::new();
        let err = sync_files(&config, &host).unwrap_err();
        assert!(matches!(err, GenerateError::Sync(ref msg) if msg.matches("files:").count() == 2));
    }
}
