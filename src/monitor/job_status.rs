use std::{sync::Arc, time::Duration};

use log::{debug, info, warn};

use crate::device_client::{with_timeout, JobStatusProvider};
use crate::store::StateStore;

use super::navigation::{NavigationRequest, Page};
use super::snapshot::{JobSnapshot, JobStatus};
use super::transition::{TransitionKind, TransitionMemory};

const LAST_STARTED_JOB_KEY: &str = "laststartedjob";

/// Tracks the job of one printer and decides when the panel has to move to another page.
///
/// `poll` takes `&mut self`, so a monitor can never run two polls at once.
pub struct JobStatusMonitor {
    provider: Arc<dyn JobStatusProvider>,
    printer: String,
    fetch_timeout: Duration,
    snapshot: JobSnapshot,
    memory: TransitionMemory,
    /// Transition behind the last returned redirect, recorded once the redirect is sent.
    pending: Option<(TransitionKind, String)>,
    store: Arc<StateStore>,
}

impl JobStatusMonitor {
    pub fn new(provider: Arc<dyn JobStatusProvider>, printer: impl Into<String>, fetch_timeout: Duration, store: Arc<StateStore>) -> Self {
        Self {
            provider,
            printer: printer.into(),
            fetch_timeout,
            snapshot: JobSnapshot::empty(),
            memory: TransitionMemory::load(store.clone()),
            pending: None,
            store,
        }
    }

    pub fn snapshot(&self) -> &JobSnapshot {
        &self.snapshot
    }

    /// Refreshes the snapshot and returns where the panel should go next, if anywhere.
    ///
    /// Nothing is fetched while the panel shows the error page: the user has to
    /// dismiss it first. A failed or cancelled job keeps producing its redirect
    /// until [`JobStatusMonitor::navigation_sent`] confirms it.
    pub async fn poll(&mut self, current_page: Page) -> Option<NavigationRequest> {
        self.pending = None;
        if current_page == Page::Error {
            debug!("Error page is showing, skipping job poll.");
            return None;
        }

        self.refresh().await;
        let action = self.next_action(current_page);
        if let Some(request) = &action {
            info!("Job '{}' is {:?}, sending panel to {}.", self.snapshot.job_id, self.snapshot.status, request.page);
        }
        action
    }

    /// Marks the redirect returned by the last poll as delivered.
    pub fn navigation_sent(&mut self) {
        if let Some((kind, job_id)) = self.pending.take() {
            self.memory.record(kind, &job_id);
        }
    }

    async fn refresh(&mut self) {
        let fetched = with_timeout(self.fetch_timeout, self.provider.fetch_current(&self.printer)).await;
        self.snapshot = match fetched {
            Ok(Some(job)) => {
                self.remember_started(&job.job_id);
                job
            }
            Ok(None) => JobSnapshot::empty(),
            Err(e) => {
                warn!("Could not fetch job for printer '{}', assuming idle: {}", self.printer, e);
                JobSnapshot::empty()
            }
        };
    }

    fn remember_started(&self, job_id: &str) {
        if let Err(e) = self.store.set(LAST_STARTED_JOB_KEY, job_id) {
            warn!("Could not persist last started job '{}': {}", job_id, e);
        }
    }

    fn next_action(&mut self, current_page: Page) -> Option<NavigationRequest> {
        let job = &self.snapshot;
        let (kind, request) = match job.status {
            JobStatus::Printing if current_page != Page::PrintDialogue => return Some(NavigationRequest::print_dialogue()),
            JobStatus::Failed => (TransitionKind::Failed, NavigationRequest::print_failed(&job.job_name, &job.job_id)),
            JobStatus::Cancelling | JobStatus::Cancelled => (TransitionKind::Cancelled, NavigationRequest::print_cancelled(&job.job_name)),
            _ => return None,
        };
        if !self.memory.is_new(kind, &job.job_id) {
            return None;
        }
        self.pending = Some((kind, job.job_id.clone()));
        Some(request)
    }
}
