// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O

pub mod gateway;
pub mod process_tree;
pub mod runtime;
pub mod tmux;

pub use gateway::{GatewayError, ProcessGateway, SystemGateway};
pub use process_tree::ProcessTree;
#[cfg(unix)]
pub use process_tree::UnixProcessTree;
pub use runtime::{build_invocation, extract_process_name, resolve_binary, RuntimeInvocation};
pub use tmux::{parse_session_name, session_name, TmuxProbe, TmuxSessionInfo, PROBE_TIMEOUT};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use gateway::{FakeGateway, GatewayCall};
#[cfg(any(test, feature = "test-support"))]
pub use process_tree::FakeProcessTree;
