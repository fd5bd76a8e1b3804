use async_trait::async_trait;
use log::{info, warn};
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::config::models::Schedule;
use crate::indicators::{DoorView, IconUpdate, Indicator, IndicatorPanel};
use crate::monitor::{JobSnapshot, JobStatusMonitor, NavigationRequest, Page};
use crate::mqtt_client::client::{MqttClient, PublishError};

/// Where the session sends what the panel should show.
#[async_trait]
pub trait PanelSink: Send + Sync {
    async fn navigate(&self, request: &NavigationRequest) -> Result<(), PublishError>;
    async fn icon(&self, update: &IconUpdate) -> Result<(), PublishError>;
    async fn snapshot(&self, snapshot: &JobSnapshot) -> Result<(), PublishError>;
}

#[async_trait]
impl PanelSink for MqttClient {
    async fn navigate(&self, request: &NavigationRequest) -> Result<(), PublishError> {
        self.publish_navigation(request).await
    }

    async fn icon(&self, update: &IconUpdate) -> Result<(), PublishError> {
        self.publish_icon(update).await
    }

    async fn snapshot(&self, snapshot: &JobSnapshot) -> Result<(), PublishError> {
        self.publish_snapshot(snapshot).await
    }
}

/// Drives the monitor and the indicators of one printer on two cadences.
///
/// Ticks run one at a time inside a single task, so the monitor is never
/// polled concurrently.
pub struct Session {
    monitor: JobStatusMonitor,
    panel: IndicatorPanel,
    sink: Box<dyn PanelSink>,
    page_rx: watch::Receiver<Page>,
    current_page: Page,
    schedule: Schedule,
    last_snapshot: Option<JobSnapshot>,
}

impl Session {
    pub fn new(monitor: JobStatusMonitor, panel: IndicatorPanel, sink: Box<dyn PanelSink>, page_rx: watch::Receiver<Page>, schedule: Schedule) -> Self {
        let current_page = *page_rx.borrow();
        Self { monitor, panel, sink, page_rx, current_page, schedule, last_snapshot: None }
    }

    /// Runs until ctrl-c.
    pub async fn run(mut self) {
        self.start().await;

        let mut fast = time::interval(self.schedule.fast);
        fast.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut slow = time::interval(self.schedule.slow);
        slow.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately and start() already covered it.
        fast.tick().await;
        slow.tick().await;

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);
        let mut page_reports_open = true;

        loop {
            tokio::select! {
                _ = fast.tick() => self.fast_tick().await,
                _ = slow.tick() => self.slow_tick().await,
                changed = self.page_rx.changed(), if page_reports_open => match changed {
                    Ok(()) => {
                        let page = *self.page_rx.borrow_and_update();
                        self.set_page(page);
                    }
                    Err(_) => {
                        warn!("Page reports stopped, keeping page {}.", self.current_page);
                        page_reports_open = false;
                    }
                },
                _ = &mut shutdown => {
                    info!("Shutting down.");
                    break;
                }
            }
        }
    }

    /// Replays cached icons, fills in the ones never seen and polls the job once.
    async fn start(&mut self) {
        let restored = self.panel.restore();
        for update in &restored.updates {
            self.publish_icon(update).await;
        }
        for indicator in restored.missing {
            let update = match indicator {
                Indicator::PrinterStatus => self.panel.refresh_printer().await,
                Indicator::Wifi => self.panel.refresh_wifi().await,
                // Door icons follow on the first tick for the page on show.
                Indicator::DoorCheck | Indicator::DialogueDoorCheck => None,
            };
            if let Some(update) = update {
                self.publish_icon(&update).await;
            }
        }
        self.poll_job().await;
    }

    async fn fast_tick(&mut self) {
        self.poll_job().await;
        if let Some(update) = self.panel.refresh_printer().await {
            self.publish_icon(&update).await;
        }
        if self.current_page != Page::PrintDialogue {
            if let Some(update) = self.panel.refresh_door(DoorView::Idle).await {
                self.publish_icon(&update).await;
            }
        }
    }

    async fn slow_tick(&mut self) {
        if let Some(update) = self.panel.refresh_wifi().await {
            self.publish_icon(&update).await;
        }
        if self.current_page == Page::PrintDialogue {
            if let Some(update) = self.panel.refresh_door(DoorView::Dialogue).await {
                self.publish_icon(&update).await;
            }
        }
    }

    async fn poll_job(&mut self) {
        if let Some(request) = self.monitor.poll(self.current_page).await {
            match self.sink.navigate(&request).await {
                Ok(()) => {
                    self.monitor.navigation_sent();
                    self.set_page(request.page);
                }
                Err(e) => warn!("Could not send panel to {}: {}", request.page, e),
            }
        }

        let snapshot = self.monitor.snapshot();
        if self.last_snapshot.as_ref() != Some(snapshot) {
            match self.sink.snapshot(snapshot).await {
                Ok(()) => self.last_snapshot = Some(snapshot.clone()),
                Err(e) => warn!("Could not publish job snapshot: {}", e),
            }
        }
    }

    async fn publish_icon(&self, update: &IconUpdate) {
        match self.sink.icon(update).await {
            Ok(()) => self.panel.icon_sent(update),
            Err(e) => warn!("Could not publish {:?} icon: {}", update.indicator, e),
        }
    }

    fn set_page(&mut self, page: Page) {
        if page != self.current_page {
            info!("Panel page is now {}.", page);
            self.current_page = page;
        }
    }
}
