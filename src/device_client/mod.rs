use std::{future::Future, time::Duration};

use async_trait::async_trait;

use crate::monitor::snapshot::JobSnapshot;

pub mod client;
pub mod models;

pub use client::{DeviceClient, FetchError};

// ////////////////////// //
// Collaborator contracts //
// ////////////////////// //

#[async_trait]
pub trait JobStatusProvider: Send + Sync {
    /// The job currently known to the host for `printer`, or `None` when nothing is printing.
    async fn fetch_current(&self, printer: &str) -> Result<Option<JobSnapshot>, FetchError>;
}

#[async_trait]
pub trait PrinterStateProvider: Send + Sync {
    async fn fetch_on_off(&self, printer: &str) -> Result<bool, FetchError>;
}

#[async_trait]
pub trait DoorStateProvider: Send + Sync {
    /// Raw endstop bit field reported by the firmware.
    async fn fetch_endstops(&self, printer: &str) -> Result<i64, FetchError>;
}

#[async_trait]
pub trait WifiStrengthProvider: Send + Sync {
    /// Signal strength of the connected network in dBm, `None` when the host has no reading.
    async fn fetch_strength(&self) -> Result<Option<i32>, FetchError>;
}

/// Bounds a provider call. A call that does not finish in time is reported as [`FetchError::Timeout`].
pub async fn with_timeout<T>(timeout: Duration, call: impl Future<Output = Result<T, FetchError>>) -> Result<T, FetchError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout { timeout }),
    }
}
