//! Upstream repository setup utilities
//!
//! Provides throwaway "remote" repositories that mirrors can fetch from through
//! git's local transport.

#![allow(dead_code)]

use mirrorsync::core::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Upstream repository kept alive for the duration of a test.
pub struct TestRepo {
    pub temp_dir: TempDir,
    pub path: PathBuf,
}

impl TestRepo {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remote URL usable by a mirror.
    pub fn url(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

fn git(repo_path: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git").args(args).current_dir(repo_path).output()?;
    if !output.status.success() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        )
        .into());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Sets up an upstream repository on branch `main` with one commit
///
/// The initial commit contains `README.md` and `manifests/init.pp`.
pub fn setup_upstream_repo() -> Result<TestRepo> {
    let temp_dir = TempDir::new()?;
    let repo_path = temp_dir.path().to_path_buf();

    git(&repo_path, &["init", "-q"])?;
    git(&repo_path, &["symbolic-ref", "HEAD", "refs/heads/main"])?;
    git(&repo_path, &["config", "user.name", "Test User"])?;
    git(&repo_path, &["config", "user.email", "test@example.com"])?;

    let repo = TestRepo {
        temp_dir,
        path: repo_path,
    };
    create_file(&repo.path, "README.md", "# example module\n")?;
    create_file(&repo.path, "manifests/init.pp", "class example {}\n")?;
    git_commit_all(&repo.path, "Initial commit")?;
    Ok(repo)
}

/// Creates a file (and its parent directories) with the given content
pub fn create_file(repo_path: &Path, filename: &str, content: &str) -> Result<()> {
    let target = repo_path.join(filename);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, content)?;
    Ok(())
}

/// Removes a tracked file from the upstream work tree
pub fn remove_file(repo_path: &Path, filename: &str) -> Result<()> {
    fs::remove_file(repo_path.join(filename))?;
    Ok(())
}

/// Stages everything and commits; returns the new commit id
pub fn git_commit_all(repo_path: &Path, message: &str) -> Result<String> {
    git(repo_path, &["add", "-A"])?;
    git(repo_path, &["commit", "-q", "-m", message])?;
    head_of(repo_path)
}

/// Creates a lightweight tag at HEAD
pub fn git_tag(repo_path: &Path, tag: &str) -> Result<()> {
    git(repo_path, &["tag", tag])?;
    Ok(())
}

pub fn head_of(repo_path: &Path) -> Result<String> {
    git(repo_path, &["rev-parse", "HEAD"])
}

/// Sorted list of every file below `root`, relative to it
pub fn list_files(root: &Path) -> Result<Vec<String>> {
    fn visit(root: &Path, dir: &Path, files: &mut Vec<String>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                visit(root, &path, files)?;
            } else {
                let relative = path.strip_prefix(root).unwrap_or(&path);
                files.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
        Ok(())
    }

    let mut files = Vec::new();
    visit(root, root, &mut files)?;
    files.sort();
    Ok(files)
}
