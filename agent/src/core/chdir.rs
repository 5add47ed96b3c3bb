//! Leading-token `cd` detection and pure target resolution.
//!
//! Directory changes are the one piece of shell syntax the session must
//! track: a subprocess's own `cd` never propagates to the parent process.
//! Detection is deliberately leading-token only. Known limitation: compound
//! forms such as `cd x && make` are treated as a change to the literal
//! remainder, not interpreted as shell syntax.

use std::path::{Component, Path, PathBuf};

/// Extract the target of a directory-change command, if the command is one.
///
/// Returns `None` when the command is not a `cd`. A bare `cd` (or `cd`
/// followed by only whitespace) yields `"~"`.
pub fn chdir_target(command: &str) -> Option<&str> {
    let trimmed = command.trim();
    if trimmed == "cd" {
        return Some("~");
    }
    let rest = trimmed.strip_prefix("cd ")?.trim();
    if rest.is_empty() { Some("~") } else { Some(rest) }
}

/// Resolve a `cd` target to an absolute path without touching the
/// filesystem.
///
/// `~` forms expand against `home`; when `home` is absent they resolve to
/// the literal token and fail later at the existence check. Relative
/// targets resolve against `cwd` with lexical `.`/`..` normalization.
pub fn resolve_target(cwd: &Path, target: &str, home: Option<&Path>) -> PathBuf {
    let expanded = if target == "~" {
        match home {
            Some(home) => home.to_path_buf(),
            None => PathBuf::from(target),
        }
    } else if let Some(rest) = target.strip_prefix("~/") {
        match home {
            Some(home) => home.join(rest),
            None => PathBuf::from(target),
        }
    } else {
        PathBuf::from(target)
    };

    let joined = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };
    normalize(&joined)
}

/// Lexically collapse `.` and `..` components. `..` at the root stays at
/// the root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
