//! Externally referenced files
//!
//! MMD files reference no textures or materials, so the set collected
//! during an export is always empty. The copy step still runs so path
//! handling matches the other exporters.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How referenced file paths are written and whether files are copied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PathMode {
    /// Relative when inside the output directory, absolute otherwise
    #[default]
    Auto,
    /// Always absolute
    Absolute,
    /// Always relative to the output file
    Relative,
    /// Keep paths as the host stores them
    Match,
    /// File name only
    Strip,
    /// Copy files next to the output and reference them by name
    Copy,
}

/// Files referenced by an export, in deterministic order
pub type ReferencedFiles = BTreeSet<PathBuf>;

/// Copy referenced files into `dest_dir` when the mode asks for it.
///
/// Returns the destination paths that were written.
pub fn copy_referenced_files(
    files: &ReferencedFiles,
    mode: PathMode,
    dest_dir: &Path,
) -> io::Result<Vec<PathBuf>> {
    if mode != PathMode::Copy || files.is_empty() {
        return Ok(Vec::new());
    }

    let mut copied = Vec::with_capacity(files.len());
    for source in files {
        let Some(file_name) = source.file_name() else {
            continue;
        };
        let target = dest_dir.join(file_name);
        if target != *source {
            fs::copy(source, &target)?;
        }
        copied.push(target);
    }
    tracing::debug!(count = copied.len(), "Copied referenced files");
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let copied = copy_referenced_files(&ReferencedFiles::new(), PathMode::Copy, dir.path()).unwrap();
        assert!(copied.is_empty());
    }

    #[test]
    fn test_copy_mode_copies() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let file = src.path().join("skin.png");
        fs::write(&file, b"png").unwrap();

        let mut files = ReferencedFiles::new();
        files.insert(file);

        assert!(copy_referenced_files(&files, PathMode::Auto, dst.path()).unwrap().is_empty());

        let copied = copy_referenced_files(&files, PathMode::Copy, dst.path()).unwrap();
        assert_eq!(copied, vec![dst.path().join("skin.png")]);
        assert_eq!(fs::read(dst.path().join("skin.png")).unwrap(), b"png");
    }
}
