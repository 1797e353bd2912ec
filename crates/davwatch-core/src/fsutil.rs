//! Path classification and remote path mapping helpers
//!
//! The subtree walk is intentionally iterative with an explicit stack:
//! directory depth is user-controlled and unbounded recursion would be a
//! stack-overflow hazard.

use std::path::{Path, PathBuf};

use crate::config::RemapRule;

/// What a local path currently resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// A regular file
    File,
    /// A directory
    Directory,
    /// Nothing exists at the path (it may have vanished since the event)
    Missing,
}

/// Classifies `path` as a file, directory, or missing entry.
pub fn path_kind(path: &Path) -> PathKind {
    if path.is_file() {
        PathKind::File
    } else if path.is_dir() {
        PathKind::Directory
    } else {
        PathKind::Missing
    }
}

/// Walks a subtree depth-first, yielding every directory and file under it.
///
/// The starting path itself is included. A file start yields exactly that
/// file; a missing start yields nothing. Each directory is yielded before
/// its children; files of a directory are yielded after its subdirectories
/// have been pushed onto the stack. Unreadable directories are skipped.
pub fn walk_subtree(start: &Path) -> Vec<PathBuf> {
    let mut result = Vec::new();

    match path_kind(start) {
        PathKind::File => {
            result.push(start.to_path_buf());
            return result;
        }
        PathKind::Missing => return result,
        PathKind::Directory => {}
    }

    let mut stack: Vec<PathBuf> = vec![start.to_path_buf()];

    while let Some(current) = stack.pop() {
        result.push(current.clone());

        let entries = match std::fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        let mut files = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }

        result.append(&mut files);
    }

    result
}

/// Strips the watch root from `path`, yielding the relative remote path.
///
/// Paths outside the root are returned unchanged; they can only appear
/// through misconfiguration and the upload will then fail visibly.
pub fn relative_to_root(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

/// Applies the ordered remap rules to a relative remote path.
///
/// For each rule whose `from` prefix matches the start of the path, the
/// *first occurrence* of `from` is substituted with `to`. All matching
/// rules are applied in order, each seeing the previous rule's output.
pub fn apply_remap(relative_path: &str, rules: &[RemapRule]) -> String {
    let mut remapped = relative_path.to_string();

    for rule in rules {
        if remapped.starts_with(&rule.from) {
            remapped = remapped.replacen(&rule.from, &rule.to, 1);
        }
    }

    remapped
}

/// Flattens Windows-style separators out of a remote path.
///
/// Backslashes cannot appear in a WebDAV collection segment, so any that
/// leaked in from the local path are replaced with underscores.
pub fn normalize_separators(remote_path: &str) -> String {
    remote_path.replace('\\', "_")
}
