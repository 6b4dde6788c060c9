//! Artifact hashing: a stable content hash over a skill directory.
//!
//! The file tree is walked depth-first, sorted by relative path (excluded
//! directories skipped), and each entry contributes
//! `relative_path \0 sha256(contents)` to an outer SHA-256. The result is
//! stable across runs and machines for identical content.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::RegistryError;
use crate::patterns::EXCLUDED_DIRS;

/// Compute the artifact hash for a directory tree.
pub fn calculate_artifact_hash(dir: &Path) -> Result<String, RegistryError> {
    if !dir.is_dir() {
        return Err(RegistryError::Storage(format!(
            "not a directory: {}",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    collect_files(dir, dir, &mut files)?;
    files.sort();

    let mut outer = Sha256::new();
    for relative in &files {
        let contents = fs::read(dir.join(relative))?;
        let digest = Sha256::digest(&contents);
        // Paths hash with forward slashes so the result is platform-stable.
        let rel = relative.to_string_lossy().replace('\\', "/");
        outer.update(rel.as_bytes());
        outer.update([0u8]);
        outer.update(digest);
    }
    Ok(hex::encode(outer.finalize()))
}

fn collect_files(base: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RegistryError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_symlink() {
            continue;
        }
        if path.is_dir() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if EXCLUDED_DIRS.contains(&name.as_ref()) {
                continue;
            }
            collect_files(base, &path, out)?;
        } else if path.is_file() {
            let relative = path.strip_prefix(base).unwrap_or(&path).to_path_buf();
            out.push(relative);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn hash_is_stable_across_runs() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "alpha").unwrap();
        fs::write(tmp.path().join("b.txt"), "beta").unwrap();

        let first = calculate_artifact_hash(tmp.path()).unwrap();
        let second = calculate_artifact_hash(tmp.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn hash_changes_with_content() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "alpha").unwrap();
        let before = calculate_artifact_hash(tmp.path()).unwrap();

        fs::write(tmp.path().join("a.txt"), "alpha2").unwrap();
        let after = calculate_artifact_hash(tmp.path()).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn hash_changes_with_renames() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "same").unwrap();
        let before = calculate_artifact_hash(tmp.path()).unwrap();

        fs::rename(tmp.path().join("a.txt"), tmp.path().join("b.txt")).unwrap();
        let after = calculate_artifact_hash(tmp.path()).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn excluded_dirs_do_not_affect_hash() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "alpha").unwrap();
        let before = calculate_artifact_hash(tmp.path()).unwrap();

        let modules = tmp.path().join("node_modules");
        fs::create_dir(&modules).unwrap();
        fs::write(modules.join("dep.js"), "junk").unwrap();
        let after = calculate_artifact_hash(tmp.path()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn missing_dir_is_an_error() {
        assert!(calculate_artifact_hash(Path::new("/no/such/dir")).is_err());
    }
}
