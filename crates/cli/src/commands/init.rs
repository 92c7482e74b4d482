// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ao init`: create the state layout and gitignore entry.

use anyhow::Result;
use ao_core::paths::AGENTS_DIR;
use ao_core::RpiPaths;
use std::fs;
use std::path::Path;

pub fn run(cwd: &Path) -> Result<i32> {
    let paths = RpiPaths::new(cwd);
    fs::create_dir_all(paths.runs_dir())?;
    fs::create_dir_all(paths.logs_dir())?;
    fs::create_dir_all(paths.context_dir())?;
    fs::create_dir_all(paths.handoff_pending_dir())?;

    let added = ensure_gitignore_entry(cwd)?;
    if added {
        println!("initialized {}/ and updated .gitignore", AGENTS_DIR);
    } else {
        println!("initialized {}/ (.gitignore already current)", AGENTS_DIR);
    }
    Ok(0)
}

/// Ensure `.gitignore` carries exactly one `.agents/` entry.
///
/// Returns whether an entry was added.
pub fn ensure_gitignore_entry(repo: &Path) -> std::io::Result<bool> {
    let entry = format!("{}/", AGENTS_DIR);
    let path = repo.join(".gitignore");
    let mut content = fs::read_to_string(&path).unwrap_or_default();

    if content.lines().any(|line| line.trim() == entry) {
        return Ok(false);
    }

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(&entry);
    content.push('\n');
    fs::write(&path, content)?;
    Ok(true)
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
