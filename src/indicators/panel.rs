use std::{sync::Arc, time::Duration};

use log::{debug, warn};

use crate::device_client::{with_timeout, DoorStateProvider, PrinterStateProvider, WifiStrengthProvider};
use crate::store::StateStore;

use super::signal::{classify, NO_SIGNAL_DBM};
use super::{printer_icon, DoorState, DoorView, IconUpdate, Indicator};

/// Icons restored from the state store at startup.
#[derive(Debug, Default)]
pub struct Restored {
    pub updates: Vec<IconUpdate>,
    /// Indicators with no usable cached value.
    pub missing: Vec<Indicator>,
}

/// Refreshes the header indicators from the print host.
///
/// Each refresh returns an update only when the icon differs from the last
/// one recorded in the state store. An update is recorded by
/// [`IndicatorPanel::icon_sent`], so an icon that never reached the panel is
/// offered again on the next refresh.
pub struct IndicatorPanel {
    printers: Arc<dyn PrinterStateProvider>,
    doors: Arc<dyn DoorStateProvider>,
    wifi: Arc<dyn WifiStrengthProvider>,
    printer: String,
    fetch_timeout: Duration,
    store: Arc<StateStore>,
}

impl IndicatorPanel {
    pub fn new(
        printers: Arc<dyn PrinterStateProvider>,
        doors: Arc<dyn DoorStateProvider>,
        wifi: Arc<dyn WifiStrengthProvider>,
        printer: impl Into<String>,
        fetch_timeout: Duration,
        store: Arc<StateStore>,
    ) -> Self {
        Self { printers, doors, wifi, printer: printer.into(), fetch_timeout, store }
    }

    pub fn restore(&self) -> Restored {
        let mut restored = Restored::default();
        for indicator in Indicator::ALL {
            let cached = self.store.get(indicator.store_key());
            let icon = match indicator {
                Indicator::Wifi => cached.and_then(|dbm| dbm.parse::<i32>().ok()).map(IconUpdate::wifi),
                _ => cached.map(|icon| IconUpdate::new(indicator, icon)),
            };
            match icon {
                Some(update) => restored.updates.push(update),
                None => restored.missing.push(indicator),
            }
        }
        restored
    }

    /// On failure the printer icon is left as it is.
    pub async fn refresh_printer(&self) -> Option<IconUpdate> {
        match with_timeout(self.fetch_timeout, self.printers.fetch_on_off(&self.printer)).await {
            Ok(started) => self.changed(IconUpdate::new(Indicator::PrinterStatus, printer_icon(started))),
            Err(e) => {
                warn!("Could not fetch state of printer '{}': {}", self.printer, e);
                None
            }
        }
    }

    /// On failure, or for an endstop code we do not understand, the door icon is left as it is.
    pub async fn refresh_door(&self, view: DoorView) -> Option<IconUpdate> {
        let code = match with_timeout(self.fetch_timeout, self.doors.fetch_endstops(&self.printer)).await {
            Ok(code) => code,
            Err(e) => {
                warn!("Could not read door of printer '{}': {}", self.printer, e);
                return None;
            }
        };
        let Some(state) = DoorState::from_endstops(code) else {
            debug!("Ignoring unknown endstop code {}.", code);
            return None;
        };
        self.changed(IconUpdate::new(view.indicator(), view.icon(state)))
    }

    /// A missing reading and a failed fetch both count as no connection.
    pub async fn refresh_wifi(&self) -> Option<IconUpdate> {
        let dbm = match with_timeout(self.fetch_timeout, self.wifi.fetch_strength()).await {
            Ok(reading) => reading.unwrap_or(NO_SIGNAL_DBM),
            Err(e) => {
                warn!("Could not fetch wifi strength: {}", e);
                NO_SIGNAL_DBM
            }
        };

        let update = IconUpdate::wifi(dbm);
        let previous = self.store.get(Indicator::Wifi.store_key()).and_then(|v| v.parse::<i32>().ok());
        match previous {
            Some(previous) if classify(previous).icon() == update.icon => {
                // Same icon on show, only the reading moved.
                self.persist(Indicator::Wifi, &update.stored);
                None
            }
            _ => Some(update),
        }
    }

    /// Records an update the panel has received.
    pub fn icon_sent(&self, update: &IconUpdate) {
        self.persist(update.indicator, &update.stored);
    }

    fn changed(&self, update: IconUpdate) -> Option<IconUpdate> {
        if self.store.get(update.indicator.store_key()).as_deref() == Some(update.stored.as_str()) {
            return None;
        }
        Some(update)
    }

    fn persist(&self, indicator: Indicator, value: &str) {
        if let Err(e) = self.store.set(indicator.store_key(), value) {
            warn!("Could not persist {:?}: {}", indicator, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_client::FetchError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// One fake host answering all three indicator endpoints.
    #[derive(Default)]
    struct FakeHost {
        started: Mutex<Option<bool>>,
        endstops: Mutex<Option<i64>>,
        wifi: Mutex<Option<Option<i32>>>,
    }

    fn unreachable() -> FetchError {
        FetchError::Timeout { timeout: Duration::from_millis(10) }
    }

    #[async_trait]
    impl PrinterStateProvider for FakeHost {
        async fn fetch_on_off(&self, _printer: &str) -> Result<bool, FetchError> {
            self.started.lock().unwrap().ok_or_else(unreachable)
        }
    }

    #[async_trait]
    impl DoorStateProvider for FakeHost {
        async fn fetch_endstops(&self, _printer: &str) -> Result<i64, FetchError> {
            self.endstops.lock().unwrap().ok_or_else(unreachable)
        }
    }

    #[async_trait]
    impl WifiStrengthProvider for FakeHost {
        async fn fetch_strength(&self) -> Result<Option<i32>, FetchError> {
            self.wifi.lock().unwrap().ok_or_else(unreachable)
        }
    }

    fn panel(host: &Arc<FakeHost>, store: &Arc<StateStore>) -> IndicatorPanel {
        IndicatorPanel::new(host.clone(), host.clone(), host.clone(), "Dental", Duration::from_secs(1), store.clone())
    }

    /// Refreshes and, when something changed, hands the update to the panel.
    fn shown(panel: &IndicatorPanel, update: Option<IconUpdate>) -> Option<IconUpdate> {
        if let Some(update) = &update {
            panel.icon_sent(update);
        }
        update
    }

    #[tokio::test]
    async fn printer_icon_follows_on_off_and_survives_failures() {
        let host = Arc::new(FakeHost::default());
        let store = Arc::new(StateStore::in_memory());
        let panel = panel(&host, &store);

        *host.started.lock().unwrap() = Some(true);
        assert_eq!(shown(&panel, panel.refresh_printer().await), Some(IconUpdate::new(Indicator::PrinterStatus, "images/printer-on.png")));
        assert_eq!(panel.refresh_printer().await, None);

        *host.started.lock().unwrap() = None;
        assert_eq!(panel.refresh_printer().await, None);
        assert_eq!(store.get("printerstatus").as_deref(), Some("images/printer-on.png"));

        *host.started.lock().unwrap() = Some(false);
        assert_eq!(panel.refresh_printer().await, Some(IconUpdate::new(Indicator::PrinterStatus, "images/printer-off.png")));
    }

    #[tokio::test]
    async fn unsent_icons_are_offered_again() {
        let host = Arc::new(FakeHost::default());
        let store = Arc::new(StateStore::in_memory());
        let panel = panel(&host, &store);

        *host.started.lock().unwrap() = Some(true);
        let update = panel.refresh_printer().await;
        assert!(update.is_some());
        assert_eq!(store.get("printerstatus"), None);
        assert_eq!(panel.refresh_printer().await, update);

        *host.wifi.lock().unwrap() = Some(Some(-50));
        assert_eq!(panel.refresh_wifi().await, Some(IconUpdate::wifi(-50)));
        assert_eq!(panel.refresh_wifi().await, Some(IconUpdate::wifi(-50)));
        assert_eq!(store.get("lastwifi"), None);
    }

    #[tokio::test]
    async fn door_views_update_their_own_indicator() {
        let host = Arc::new(FakeHost::default());
        let store = Arc::new(StateStore::in_memory());
        let panel = panel(&host, &store);

        *host.endstops.lock().unwrap() = Some(5);
        assert_eq!(shown(&panel, panel.refresh_door(DoorView::Idle).await), Some(IconUpdate::new(Indicator::DoorCheck, "images/open.png")));
        assert_eq!(
            shown(&panel, panel.refresh_door(DoorView::Dialogue).await),
            Some(IconUpdate::new(Indicator::DialogueDoorCheck, "images/open_with_msg.png"))
        );

        *host.endstops.lock().unwrap() = Some(9);
        assert_eq!(panel.refresh_door(DoorView::Idle).await, None);
        assert_eq!(store.get("doorcheck").as_deref(), Some("images/open.png"));
    }

    #[tokio::test]
    async fn wifi_without_reading_shows_no_connection() {
        let host = Arc::new(FakeHost::default());
        let store = Arc::new(StateStore::in_memory());
        let panel = panel(&host, &store);

        *host.wifi.lock().unwrap() = Some(Some(-60));
        let first = shown(&panel, panel.refresh_wifi().await).unwrap();
        assert_eq!(first.icon, "images/wifi-2.png");
        *host.wifi.lock().unwrap() = Some(Some(-62));
        assert_eq!(panel.refresh_wifi().await, None);
        assert_eq!(store.get("lastwifi").as_deref(), Some("-62"));

        *host.wifi.lock().unwrap() = Some(None);
        assert_eq!(shown(&panel, panel.refresh_wifi().await).map(|u| u.icon), Some("images/wifi-nc.png".to_owned()));

        *host.wifi.lock().unwrap() = Some(Some(-40));
        shown(&panel, panel.refresh_wifi().await);
        *host.wifi.lock().unwrap() = None;
        assert_eq!(shown(&panel, panel.refresh_wifi().await), Some(IconUpdate::wifi(NO_SIGNAL_DBM)));
        assert_eq!(store.get("lastwifi").as_deref(), Some("-100"));
    }

    #[test]
    fn restore_replays_cached_icons() {
        let host = Arc::new(FakeHost::default());
        let store = Arc::new(StateStore::in_memory());
        store.set("doorcheck", "images/closed.png").unwrap();
        store.set("lastwifi", "-75").unwrap();

        let restored = panel(&host, &store).restore();
        assert_eq!(
            restored.updates,
            vec![IconUpdate::new(Indicator::DoorCheck, "images/closed.png"), IconUpdate::wifi(-75)]
        );
        assert_eq!(restored.missing, vec![Indicator::PrinterStatus, Indicator::DialogueDoorCheck]);
    }
}
