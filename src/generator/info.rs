//! Human-readable generation status of one path.

use super::page::PageGenerator;
use crate::error::{GenerateError, Result};
use chrono::{DateTime, Local};
use std::{fmt::Write, fs, io};

/// Status lines for `path`: alias, output file, whether and when it was
/// generated, and its public link.
pub fn generation_info(pages: &PageGenerator<'_>, path: &str) -> Result<String> {
    let alias = pages.resolve_alias(path)?;
    let file = pages.page_file(path)?;
    let resolver = pages.resolver();

    let status = if resolver.is_excluded(path) || resolver.is_excluded(&alias) {
        "excluded (paths_do_not_generate)".to_owned()
    } else {
        match fs::metadata(&file) {
            Ok(meta) => {
                let modified = meta
                    .modified()
                    .map(|time| DateTime::<Local>::from(time).format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|_| "unknown time".to_owned());
                format!("generated {modified}, {} bytes", meta.len())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => "not generated".to_owned(),
            Err(err) => return Err(GenerateError::io(&file, err)),
        }
    };

    let mut info = String::new();
    let _ = writeln!(info, "path:   {path}");
    let _ = writeln!(info, "alias:  {alias}");
    let _ = writeln!(info, "file:   {}", file.display());
    let _ = writeln!(info, "status: {status}");
    let _ = write!(info, "link:   {alias}");
    Ok(info)
}
