//! External command execution utilities.
//!
//! Host and sync commands are configured as argument lists with `{name}`
//! placeholders. They are expanded per call and run directly, never through
//! a shell, so substituted values cannot inject extra arguments.

use crate::log;
use anyhow::{Context, Result};
use regex::Regex;
use std::{
    borrow::Cow,
    ffi::OsString,
    path::Path,
    process::{Command, Output},
    sync::OnceLock,
};

// ============================================================================
// Template Expansion
// ============================================================================

/// Expand `{name}` placeholders in every argument of a command template.
///
/// Arguments that expand to an empty string are dropped, so an optional
/// placeholder given an empty value disappears from the command line.
///
/// # Example
/// ```ignore
/// let cmd = expand_template(&["drush".into(), "render".into(), "{path}".into()], &[("path", "/node/1")]);
/// assert_eq!(cmd, ["drush", "render", "/node/1"]);
/// ```
pub fn expand_template(template: &[String], vars: &[(&str, &str)]) -> Vec<OsString> {
    template
        .iter()
        .map(|arg| {
            vars.iter().fold(Cow::Borrowed(arg.as_str()), |arg, (name, value)| {
                let placeholder = format!("{{{name}}}");
                if arg.contains(&placeholder) {
                    Cow::Owned(arg.replace(&placeholder, value))
                } else {
                    arg
                }
            })
        })
        .filter(|arg| !arg.is_empty())
        .map(|arg| OsString::from(arg.into_owned()))
        .collect()
}

// ============================================================================
// Command Execution
// ============================================================================

/// Execute a command and capture its output.
///
/// `cmd[0]` is the program, the rest are its arguments.
///
/// # Errors
/// Returns error if command fails to execute or returns non-zero exit code.
pub fn exec(root: Option<&Path>, cmd: &[OsString], filter: &'static FilterRule) -> Result<Output> {
    let (name, mut command) = prepare(root, cmd)?;

    let output = command
        .output()
        .with_context(|| format!("Failed to execute `{name}`"))?;

    log_output(&name, &output, filter)?;
    Ok(output)
}

/// Prepare a Command from components.
fn prepare(root: Option<&Path>, cmd: &[OsString]) -> Result<(String, Command)> {
    let (program, args) = cmd.split_first().context("Empty command")?;
    let name = program.to_string_lossy().into_owned();

    let mut command = Command::new(program);
    command.args(args);

    if let Some(dir) = root {
        command.current_dir(dir);
    }

    Ok((name, command))
}

// ============================================================================
// Output Filtering
// ============================================================================

fn strip_ansi(s: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());
    re.replace_all(s, "")
}

/// Filter rule for skipping entire output blocks or specific prefixes.
///
/// Used to reduce noise in command output logging by ignoring known warnings
/// or irrelevant messages.
pub struct FilterRule {
    /// Prefixes to match at the start of output lines.
    pub skip_prefixes: &'static [&'static str],
}

impl FilterRule {
    /// Create a new filter rule with the given prefixes.
    pub const fn new(skip_prefixes: &'static [&'static str]) -> Self {
        Self { skip_prefixes }
    }

    /// Check if output should be skipped entirely.
    ///
    /// Returns true if output is empty or starts with any of the skip prefixes.
    fn should_skip(&self, output: &str) -> bool {
        output.is_empty() || self.skip_prefixes.iter().any(|p| output.starts_with(p))
    }

    /// Log output lines if not skipped.
    fn log(&self, name: &str, output: &str) {
        let mut valid_lines = Vec::new();
        for line in output.lines() {
            let plain = strip_ansi(line);
            let trimmed = plain.trim();
            if !trimmed.is_empty() && !self.should_skip(trimmed) {
                valid_lines.push(line);
            }
        }

        if !valid_lines.is_empty() {
            let message = valid_lines.join("\n");
            log!(name; "{}", message);
        }
    }
}

/// Stdout filter: skip HTML and JSON output.
const STDOUT_FILTER: FilterRule = FilterRule::new(&["<!DOCTYPE", "<html", "{", "["]);

/// Empty filter (no skipping).
pub const EMPTY_FILTER: FilterRule = FilterRule::new(&[]);

/// Silent filter: skip all output.
pub const SILENT_FILTER: FilterRule = FilterRule::new(&[""]);

/// Log command output, filtering known noise.
fn log_output(name: &str, output: &Output, filter: &'static FilterRule) -> Result<()> {
    if !output.status.success() {
        anyhow::bail!(format_error(name, output, filter));
    }

    // On success, only log stderr (warnings) to reduce noise
    let stderr = String::from_utf8_lossy(&output.stderr);
    filter.log(name, stderr.trim());

    Ok(())
}

/// Format command error message with filtering.
fn format_error(name: &str, output: &Output, filter: &'static FilterRule) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    // Strip warning prefix from error output
    let error_msg = filter
        .skip_prefixes
        .iter()
        .filter(|p| !p.is_empty())
        .fold(stderr.trim(), |s, p| s.trim_start_matches(p).trim_start());

    let mut msg = format!("Command `{name}` failed with {}\n", output.status);
    if !error_msg.is_empty() {
        msg.push_str(error_msg);
    }

    let stdout_trimmed = stdout.trim();
    if !stdout_trimmed.is_empty() && !STDOUT_FILTER.should_skip(stdout_trimmed) {
        msg.push_str("\nStdout:\n");
        msg.push_str(stdout_trimmed);
    }
    msg
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn template(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_expand_template_whole_argument() {
        let cmd = expand_template(&template(&["drush", "sg:render", "{path}"]), &[("path", "/node/1")]);
        assert_eq!(cmd, vec!["drush", "sg:render", "/node/1"]);
    }

    #[test]
    fn test_expand_template_substring() {
        let cmd = expand_template(
            &template(&["rsync", "--exclude-from={exclude_from}", "{source}/", "{dest}"]),
            &[("exclude_from", "/tmp/x"), ("source", "/src"), ("dest", "/out")],
        );
        assert_eq!(cmd, vec!["rsync", "--exclude-from=/tmp/x", "/src/", "/out"]);
    }

    #[test]
    fn test_expand_template_value_not_split() {
        let cmd = expand_template(&template(&["echo", "{path}"]), &[("path", "/a b; rm -rf /")]);
        assert_eq!(cmd.len(), 2);
        assert_eq!(cmd[1], OsString::from("/a b; rm -rf /"));
    }

    #[test]
    fn test_expand_template_drops_empty() {
        let cmd = expand_template(&template(&["ids", "{bundle}", "--flag"]), &[("bundle", "")]);
        assert_eq!(cmd, vec!["ids", "--flag"]);
    }

    #[test]
    fn test_prepare_empty() {
        let result = prepare(None, &[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_prepare_valid() {
        let cmd = vec![OsString::from("echo"), OsString::from("hello")];
        let (name, _) = prepare(None, &cmd).unwrap();
        assert_eq!(name, "echo");
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_captures_stdout() {
        let cmd = vec![OsString::from("echo"), OsString::from("hello")];
        let output = exec(None, &cmd, &SILENT_FILTER).unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_failure_is_error() {
        let cmd = vec![OsString::from("false")];
        let err = exec(None, &cmd, &SILENT_FILTER).unwrap_err();
        assert!(err.to_string().contains("Command `false` failed"));
    }

    #[test]
    fn test_filter_rule() {
        let filter = FilterRule::new(&["WARN:", "INFO:"]);

        assert!(filter.should_skip("WARN: something"));
        assert!(filter.should_skip("INFO: something"));
        assert!(!filter.should_skip("ERROR: something"));
        assert!(filter.should_skip("")); // Empty lines skipped
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(strip_ansi("\x1b[1;32mGreen Bold\x1b[0m"), "Green Bold");
        assert_eq!(strip_ansi("Plain text"), "Plain text");
        assert_eq!(
            strip_ansi("Start \x1b[33mYellow\x1b[0m End"),
            "Start Yellow End"
        );
    }
}
