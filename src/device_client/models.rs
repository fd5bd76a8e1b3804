use serde_derive::Deserialize;

use crate::monitor::snapshot::{JobSnapshot, JobStatus};

// These types mirror the JSON returned by the print host's REST services.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJobResponse {
    pub status: Option<JobStatus>,
    pub id: Option<JobId>,
    pub job_name: Option<String>,
    pub total_slices: Option<u32>,
    pub current_slice: Option<u32>,
    pub elapsed_time: Option<i64>,
    pub average_slice_time: Option<f64>,
    pub start_time: Option<i64>,
}

/// Job ids are UUID strings on current hosts, older hosts send plain numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum JobId {
    Text(String),
    Number(i64),
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        match id {
            JobId::Text(text) => text,
            JobId::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PrinterResponse {
    #[serde(default)]
    pub started: bool,
}

#[derive(Debug, Deserialize)]
pub struct GCodeResponse {
    #[serde(default)]
    pub message: String,
}

/// The subset of the firmware's `M408 S3` status report we use.
#[derive(Debug, Deserialize)]
pub struct M408Status {
    pub endstops: i64,
}

impl From<PrintJobResponse> for JobSnapshot {
    fn from(job: PrintJobResponse) -> Self {
        JobSnapshot {
            status: job.status.unwrap_or_default(),
            job_id: job.id.map(String::from).unwrap_or_default(),
            job_name: job.job_name.unwrap_or_default(),
            total_slices: job.total_slices.unwrap_or(0),
            current_slice: job.current_slice.unwrap_or(0),
            elapsed_time: job.elapsed_time.unwrap_or(0),
            average_slice_time: job.average_slice_time.unwrap_or(0.0),
            start_time: job.start_time.unwrap_or(0),
        }
    }
}
