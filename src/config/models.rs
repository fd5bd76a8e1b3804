use std::{path::PathBuf, time::Duration};

use serde_derive::Deserialize;

use crate::monitor::Page;

// When changing anything here, make sure to add
// #[serde(alias = "ihavenounderscores")]
// where needed, so it can be read from the ENV vars.

#[derive(Debug, Deserialize)]
pub struct Mqtt {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    #[serde(alias = "ignoretlserrors")]
    pub ignore_tls_errors: bool,
    pub username: String,
    pub password: String,
    #[serde(alias = "clientid")]
    pub client_id: String,
    #[serde(alias = "roottopic")]
    pub root_topic: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrintHost {
    pub uri: String,
    /// Name of the printer as known to the print host.
    pub printer: String,
    #[serde(alias = "fetchtimeout", with = "humantime_serde")]
    pub fetch_timeout: Duration,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Schedule {
    /// Job, printer and door polling.
    #[serde(with = "humantime_serde")]
    pub fast: Duration,
    /// Wifi and print dialogue door polling.
    #[serde(with = "humantime_serde")]
    pub slow: Duration,
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct Panel {
    #[serde(alias = "initialpage")]
    pub initial_page: Page,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub mqtt: Mqtt,
    #[serde(alias = "printhost")]
    pub print_host: PrintHost,
    pub schedule: Schedule,
    pub store: Store,
    pub panel: Panel,
    #[serde(alias = "sentrydsn")]
    pub sentry_dsn: Option<String>,
}
