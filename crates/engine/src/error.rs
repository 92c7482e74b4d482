// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine runtime

use ao_core::FailureKind;
use thiserror::Error;

/// Errors that can occur while supervising runs
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("gateway error: {0}")]
    Gateway(#[from] ao_adapters::GatewayError),
    #[error("registry error: {0}")]
    Registry(#[from] ao_storage::RegistryError),
    #[error("{0}")]
    Lease(#[from] ao_storage::LeaseError),
    #[error("config error: {0}")]
    Config(#[from] ao_core::ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("run not found: {0}")]
    RunNotFound(String),
    #[error("{0}")]
    TaskFailed(String),
    #[error("phase {phase} exhausted {attempts} attempts")]
    RetriesExhausted { phase: String, attempts: u32 },
    #[error("cancelled")]
    Cancelled,
    #[error("landing failed: {0}")]
    Landing(String),
    #[error("FATAL: {0}")]
    Fatal(String),
}

impl EngineError {
    /// Classify for the cycle failure taxonomy. Uncategorized errors are
    /// task failures (fail-closed); infrastructure failures never mark the
    /// queue entry failed.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            EngineError::Gateway(_)
            | EngineError::Registry(_)
            | EngineError::Lease(_)
            | EngineError::Io(_)
            | EngineError::Landing(_) => FailureKind::Infrastructure,
            EngineError::Config(_)
            | EngineError::RunNotFound(_)
            | EngineError::TaskFailed(_)
            | EngineError::RetriesExhausted { .. }
            | EngineError::Cancelled
            | EngineError::Fatal(_) => FailureKind::Task,
        }
    }
}
