// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ao-engine: the phased run supervisor.
//!
//! The supervisor owns the cycle loop; the phase engine drives one run
//! through discovery → implementation → validation. Leases, the landing
//! sequence, the context watchdog, discovery, and cancellation all live
//! here, built on the adapter and storage seams.

pub mod cancel;
pub mod discovery;
pub mod error;
pub mod handoff;
pub mod landing;
pub mod phases;
pub mod supervisor;
pub mod transcript;
pub mod watchdog;
pub mod worktree;

pub use cancel::{CancelOutcome, Cancellation};
pub use discovery::{classify_run_status, DiscoveredRun, DiscoveryService};
pub use error::EngineError;
pub use handoff::{render_handoff, HandoffContext};
pub use landing::{render_commit_message, LandingCoordinator, LandingScope};
pub use phases::{PhaseEngine, PHASE_ATTEMPT_CAP};
pub use supervisor::{Supervisor, SuperviseSummary};
pub use transcript::{find_transcript, read_tail, TranscriptTail};
pub use watchdog::{default_transcripts_root, ContextWatchdog, WatchdogConfig};
pub use worktree::{GcCandidate, WorktreeManager};
