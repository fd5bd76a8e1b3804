pub mod job_status;
pub mod navigation;
pub mod snapshot;
pub mod transition;

pub use job_status::JobStatusMonitor;
pub use navigation::{NavigationRequest, Page};
pub use snapshot::JobSnapshot;
