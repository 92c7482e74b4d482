// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transcript tail parsing for the context watchdog.
//!
//! Transcripts are append-only JSONL. The watchdog never reads whole
//! files: the outer search walks candidates newest-first with a per-file
//! line budget, and usage extraction reads a newline-aligned tail window,
//! scanning lines in reverse for the last assistant usage record and the
//! last user task.

use ao_core::budget::TranscriptUsage;
use ao_core::SessionId;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Per-file line budget when searching for a session's transcript.
pub const SCAN_MAX_LINES: usize = 5000;

/// Tail window read per transcript.
pub const TAIL_MAX_BYTES: u64 = 256 * 1024;

/// What the tail of a transcript yields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptTail {
    pub usage: TranscriptUsage,
    pub last_task: String,
}

/// Locate the newest transcript mentioning `session_id`.
///
/// Candidates are `.jsonl` files under `root` (one level of
/// subdirectories), visited newest-first; the first file that mentions the
/// session within its first [`SCAN_MAX_LINES`] lines wins.
pub fn find_transcript(root: &Path, session_id: &SessionId) -> Option<PathBuf> {
    let mut candidates: Vec<(SystemTime, PathBuf)> = Vec::new();
    collect_jsonl(root, 0, &mut candidates);
    candidates.sort_by(|a, b| b.0.cmp(&a.0));

    candidates
        .into_iter()
        .map(|(_, path)| path)
        .find(|path| mentions_session(path, session_id.as_str()))
}

fn collect_jsonl(dir: &Path, depth: usize, out: &mut Vec<(SystemTime, PathBuf)>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if depth < 2 {
                collect_jsonl(&path, depth + 1, out);
            }
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
            continue;
        }
        let mtime = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        out.push((mtime, path));
    }
}

fn mentions_session(path: &Path, session_id: &str) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let reader = BufReader::new(file);
    for line in reader.lines().take(SCAN_MAX_LINES) {
        match line {
            Ok(line) if line.contains(session_id) => return true,
            Ok(_) => continue,
            Err(_) => return false,
        }
    }
    false
}

/// Read the tail of a transcript: last assistant usage + last user task.
///
/// The window starts at `len - max_bytes`, aligned forward to the next
/// newline so no partial JSON line is parsed. Missing or unreadable files
/// yield the zero tail.
pub fn read_tail(path: &Path, max_bytes: u64) -> TranscriptTail {
    let Ok(mut file) = File::open(path) else {
        return TranscriptTail::default();
    };
    let len = match file.metadata() {
        Ok(m) => m.len(),
        Err(_) => return TranscriptTail::default(),
    };

    let start = len.saturating_sub(max_bytes);
    if file.seek(SeekFrom::Start(start)).is_err() {
        return TranscriptTail::default();
    }

    let mut content = String::new();
    if file.read_to_string(&mut content).is_err() {
        return TranscriptTail::default();
    }

    // Drop the partial first line when the window starts mid-file
    let body = if start > 0 {
        match content.find('\n') {
            Some(idx) => &content[idx + 1..],
            None => "",
        }
    } else {
        content.as_str()
    };

    let mut tail = TranscriptTail::default();
    for line in body.lines().rev() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) else {
            continue;
        };

        match json.get("type").and_then(|v| v.as_str()) {
            Some("assistant") if tail.usage.is_empty() => {
                if let Some(usage) = parse_usage(&json) {
                    tail.usage = usage;
                }
            }
            Some("user") if tail.last_task.is_empty() => {
                if let Some(task) = parse_user_task(&json) {
                    tail.last_task = task;
                }
            }
            _ => {}
        }

        if !tail.usage.is_empty() && !tail.last_task.is_empty() {
            break;
        }
    }
    tail
}

/// Extract usage from a `type: "assistant"` record.
fn parse_usage(json: &serde_json::Value) -> Option<TranscriptUsage> {
    let message = json.get("message")?;
    let usage = message.get("usage")?;
    let get = |key: &str| usage.get(key).and_then(|v| v.as_u64()).unwrap_or(0);

    Some(TranscriptUsage {
        input_tokens: get("input_tokens"),
        cache_creation_tokens: get("cache_creation_input_tokens"),
        cache_read_tokens: get("cache_read_input_tokens"),
        model: message
            .get("model")
            .and_then(|v| v.as_str())
            .map(String::from),
        timestamp: json
            .get("timestamp")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
    })
}

/// Extract the task text from a `type: "user"` record. Content is either a
/// plain string or a list of text blocks.
fn parse_user_task(json: &serde_json::Value) -> Option<String> {
    let content = json.get("message")?.get("content")?;
    if let Some(text) = content.as_str() {
        let text = text.trim();
        return (!text.is_empty()).then(|| text.to_string());
    }
    let blocks = content.as_array()?;
    for block in blocks {
        if block.get("type").and_then(|v| v.as_str()) == Some("text") {
            if let Some(text) = block.get("text").and_then(|v| v.as_str()) {
                let text = text.trim();
                if !text.is_empty() {
                    return Some(text.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "transcript_tests.rs"]
mod tests;
