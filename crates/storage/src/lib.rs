// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ao-storage: filesystem persistence for run state, leases, and handoffs

pub mod handoff;
pub mod heartbeat;
pub mod lease;
pub mod registry;

pub use handoff::{ContextStore, HandoffMarker, HandoffStore};
pub use heartbeat::{determine_liveness, heartbeat_age, heartbeat_fresh, HEARTBEAT_FRESH_SECS};
pub use lease::{Lease, LeaseError, LeaseMeta};
pub use registry::{RunRegistry, RegistryError};
