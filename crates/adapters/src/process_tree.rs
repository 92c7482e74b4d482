// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-tree discovery capability.
//!
//! Cancellation needs to find everything a run spawned: descendants of the
//! orchestrator PID plus any process whose command line mentions the
//! worktree. The capability is a trait so tests never scrape a real
//! process table.

use std::collections::HashMap;

#[cfg(any(test, feature = "test-support"))]
use parking_lot::Mutex;
#[cfg(any(test, feature = "test-support"))]
use std::sync::Arc;

/// Process discovery, liveness probing, and signalling.
pub trait ProcessTree: Clone + Send + Sync + 'static {
    /// Transitive children of `pid`, not including `pid` itself.
    fn descendants(&self, pid: u32) -> Vec<u32>;

    /// Whether a process with this PID exists.
    fn pid_alive(&self, pid: u32) -> bool;

    /// PIDs whose command line contains `needle`.
    fn find_by_cmdline(&self, needle: &str) -> Vec<u32>;

    /// Ask a process to exit (SIGTERM). Missing processes are fine.
    fn terminate(&self, pid: u32);

    /// Force a process to exit (SIGKILL). Missing processes are fine.
    fn kill_hard(&self, pid: u32);
}

/// One row of the process table.
#[derive(Debug, Clone)]
struct ProcessRow {
    pid: u32,
    ppid: u32,
    args: String,
}

/// Parse `ps -eo pid=,ppid=,args=` output.
fn parse_ps_output(output: &str) -> Vec<ProcessRow> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.trim().splitn(3, char::is_whitespace);
            let pid: u32 = parts.next()?.trim().parse().ok()?;
            let ppid: u32 = parts.next()?.trim().parse().ok()?;
            let args = parts.next().unwrap_or("").trim().to_string();
            Some(ProcessRow { pid, ppid, args })
        })
        .collect()
}

/// Breadth-first walk of the child map starting from `root`.
fn collect_descendants(rows: &[ProcessRow], root: u32) -> Vec<u32> {
    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for row in rows {
        children.entry(row.ppid).or_default().push(row.pid);
    }

    let mut found = Vec::new();
    let mut queue = vec![root];
    while let Some(pid) = queue.pop() {
        if let Some(kids) = children.get(&pid) {
            for &kid in kids {
                if !found.contains(&kid) {
                    found.push(kid);
                    queue.push(kid);
                }
            }
        }
    }
    found
}

/// Real process tree backed by `ps`.
#[cfg(unix)]
#[derive(Clone, Default)]
pub struct UnixProcessTree;

#[cfg(unix)]
impl UnixProcessTree {
    pub fn new() -> Self {
        Self
    }

    fn snapshot(&self) -> Vec<ProcessRow> {
        let output = match std::process::Command::new("ps")
            .args(["-eo", "pid=,ppid=,args="])
            .output()
        {
            Ok(o) if o.status.success() => o,
            _ => return Vec::new(),
        };
        parse_ps_output(&String::from_utf8_lossy(&output.stdout))
    }
}

#[cfg(unix)]
impl ProcessTree for UnixProcessTree {
    fn descendants(&self, pid: u32) -> Vec<u32> {
        collect_descendants(&self.snapshot(), pid)
    }

    fn pid_alive(&self, pid: u32) -> bool {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        // Signal 0: existence check only. EPERM still means "exists".
        match kill(Pid::from_raw(pid as i32), None) {
            Ok(()) => true,
            Err(nix::errno::Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    fn find_by_cmdline(&self, needle: &str) -> Vec<u32> {
        self.snapshot()
            .into_iter()
            .filter(|row| row.args.contains(needle))
            .map(|row| row.pid)
            .collect()
    }

    fn terminate(&self, pid: u32) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
    }

    fn kill_hard(&self, pid: u32) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
    }
}

/// Scripted process tree for testing.
#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
#[derive(Clone, Default)]
pub struct FakeProcessTree {
    inner: Arc<Mutex<FakeTreeState>>,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
struct FakeTreeState {
    rows: Vec<ProcessRow>,
    dead: Vec<u32>,
    signalled: Vec<(u32, &'static str)>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeProcessTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a process row.
    pub fn add(&self, pid: u32, ppid: u32, args: impl Into<String>) {
        self.inner.lock().rows.push(ProcessRow {
            pid,
            ppid,
            args: args.into(),
        });
    }

    /// Mark a PID as dead for `pid_alive`.
    pub fn mark_dead(&self, pid: u32) {
        self.inner.lock().dead.push(pid);
    }

    /// Signals recorded by `terminate`/`kill_hard`, in order.
    pub fn signals(&self) -> Vec<(u32, &'static str)> {
        self.inner.lock().signalled.clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl ProcessTree for FakeProcessTree {
    fn descendants(&self, pid: u32) -> Vec<u32> {
        collect_descendants(&self.inner.lock().rows, pid)
    }

    fn pid_alive(&self, pid: u32) -> bool {
        let state = self.inner.lock();
        !state.dead.contains(&pid) && state.rows.iter().any(|r| r.pid == pid)
    }

    fn find_by_cmdline(&self, needle: &str) -> Vec<u32> {
        self.inner
            .lock()
            .rows
            .iter()
            .filter(|r| r.args.contains(needle))
            .map(|r| r.pid)
            .collect()
    }

    fn terminate(&self, pid: u32) {
        let mut state = self.inner.lock();
        state.signalled.push((pid, "TERM"));
        state.dead.push(pid);
    }

    fn kill_hard(&self, pid: u32) {
        self.inner.lock().signalled.push((pid, "KILL"));
    }
}

#[cfg(test)]
#[path = "process_tree_tests.rs"]
mod tests;
