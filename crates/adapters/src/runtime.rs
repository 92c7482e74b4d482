// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent runtime command construction.
//!
//! The phase engine hands a prompt to the runtime binary (claude by
//! default) through the gateway. `direct` mode is a one-shot text
//! invocation; `stream` adds JSONL event output; `auto` picks stream when
//! the binary is resolvable and accepts it.

use ao_core::config::{RuntimeMode, ToolCommands};
use std::path::PathBuf;

/// A fully assembled runtime invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl RuntimeInvocation {
    /// Borrowed argument slice for gateway calls.
    pub fn arg_refs(&self) -> Vec<&str> {
        self.args.iter().map(String::as_str).collect()
    }
}

/// Build the runtime invocation for one phase prompt.
///
/// `stream_supported` is resolved once per supervisor start (auto mode
/// only consults it; direct/stream are explicit).
pub fn build_invocation(
    tools: &ToolCommands,
    prompt: &str,
    stream_supported: bool,
) -> RuntimeInvocation {
    let stream = match tools.runtime_mode {
        RuntimeMode::Direct => false,
        RuntimeMode::Stream => true,
        RuntimeMode::Auto => stream_supported,
    };

    let mut args = vec![
        "-p".to_string(),
        prompt.to_string(),
        "--output-format".to_string(),
    ];
    if stream {
        args.push("stream-json".to_string());
        args.push("--verbose".to_string());
    } else {
        args.push("text".to_string());
    }

    RuntimeInvocation {
        program: tools.runtime_command.clone(),
        args,
    }
}

/// Extract the binary basename from a command string.
///
/// Handles absolute paths (`/usr/bin/claude` → `claude`), relative paths
/// (`./claude` → `claude`), and plain names. Falls back to `"claude"` for
/// empty strings.
pub fn extract_process_name(command: &str) -> String {
    command
        .split_whitespace()
        .next()
        .and_then(|first| first.rsplit('/').next())
        .unwrap_or("claude")
        .to_string()
}

/// Resolve a binary against `PATH`, returning its full path if found.
///
/// Absolute and relative paths are checked directly.
pub fn resolve_binary(name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    if name.contains('/') {
        let path = PathBuf::from(name);
        return path.is_file().then_some(path);
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
