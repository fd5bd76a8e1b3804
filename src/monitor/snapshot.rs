use serde_derive::{Deserialize, Serialize};

/// Job states reported by the print host. Anything else deserializes to `Unknown`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Ready,
    Printing,
    Paused,
    Completed,
    Failed,
    Cancelling,
    Cancelled,
    Deleted,
    #[default]
    #[serde(other)]
    Unknown,
}

/// The last fetched job state and its progress metrics.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub status: JobStatus,
    /// Empty when the host reported no id.
    pub job_id: String,
    pub job_name: String,
    pub total_slices: u32,
    pub current_slice: u32,
    pub elapsed_time: i64,
    pub average_slice_time: f64,
    pub start_time: i64,
}

impl JobSnapshot {
    /// The canonical "nothing is printing" snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }
}
