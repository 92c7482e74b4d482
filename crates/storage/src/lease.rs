// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory filesystem leases with TTL and owner metadata.
//!
//! A lease is a single JSON file created with `O_CREATE|O_EXCL`. Existence
//! of the file is equivalent to the lease being held. A holder that died is
//! only stolen when its PID is gone AND the TTL has expired; the race where
//! the owner dies between the PID check and the unlink is accepted, so
//! release is safe to call on an already-deleted file and callers re-read
//! after any retry.

use ao_core::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from lease operations
#[derive(Debug, Error)]
pub enum LeaseError {
    /// Another live holder owns the lock.
    #[error("lock acquisition failed: {0}")]
    Contention(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Owner metadata stored in the lease file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseMeta {
    pub run_id: RunId,
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl LeaseMeta {
    pub fn new(run_id: RunId, pid: u32, ttl_seconds: u64) -> Self {
        Self {
            run_id,
            pid,
            acquired_at: Utc::now(),
            ttl_seconds,
        }
    }

    /// Stale iff the owner PID is dead AND the TTL has expired.
    fn is_stale(&self, now: DateTime<Utc>, pid_alive: impl Fn(u32) -> bool) -> bool {
        if pid_alive(self.pid) {
            return false;
        }
        let age = now.signed_duration_since(self.acquired_at);
        age.num_seconds() > self.ttl_seconds as i64
    }
}

/// A held lease. Dropping releases it best-effort; call [`Lease::release`]
/// for the checked path.
#[derive(Debug)]
pub struct Lease {
    path: PathBuf,
    released: bool,
}

impl Lease {
    /// Acquire a lease, failing fast on contention.
    ///
    /// On EEXIST the existing metadata is read; a stale holder (dead PID
    /// and expired TTL) is unlinked and acquisition retried exactly once.
    pub fn acquire(
        path: &Path,
        meta: &LeaseMeta,
        pid_alive: impl Fn(u32) -> bool,
    ) -> Result<Lease, LeaseError> {
        Self::acquire_at(path, meta, pid_alive, Utc::now())
    }

    /// Acquisition with an explicit "now" for staleness checks.
    pub fn acquire_at(
        path: &Path,
        meta: &LeaseMeta,
        pid_alive: impl Fn(u32) -> bool,
        now: DateTime<Utc>,
    ) -> Result<Lease, LeaseError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        match Self::try_create(path, meta) {
            Ok(lease) => return Ok(lease),
            Err(LeaseError::Contention(_)) => {}
            Err(e) => return Err(e),
        }

        // Holder exists: steal only from a provably stale owner.
        let existing = Self::read_meta(path);
        let stale = match &existing {
            Some(m) => m.is_stale(now, &pid_alive),
            // Unreadable metadata cannot name a live owner; treat as stale.
            None => true,
        };

        if !stale {
            let holder = existing
                .map(|m| format!("held by pid {} for run {}", m.pid, m.run_id))
                .unwrap_or_else(|| "held".to_string());
            return Err(LeaseError::Contention(format!(
                "{} at {}",
                holder,
                path.display()
            )));
        }

        warn!(path = %path.display(), "removing stale lease");
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        // Single retry; a racing acquirer winning here is contention.
        Self::try_create(path, meta)
    }

    fn try_create(path: &Path, meta: &LeaseMeta) -> Result<Lease, LeaseError> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                file.write_all(serde_json::to_string_pretty(meta)?.as_bytes())?;
                file.sync_all()?;
                debug!(path = %path.display(), pid = meta.pid, "lease acquired");
                Ok(Lease {
                    path: path.to_path_buf(),
                    released: false,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(
                LeaseError::Contention(format!("lease file exists at {}", path.display())),
            ),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the metadata of an existing lease file, if parseable.
    pub fn read_meta(path: &Path) -> Option<LeaseMeta> {
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Idempotent release: unlink, treating an already-missing file as
    /// released.
    pub fn release(&mut self) -> Result<(), LeaseError> {
        self.released = true;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if !self.released {
            let _ = fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
