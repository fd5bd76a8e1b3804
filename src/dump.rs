use std::time::Duration;

use anyhow::Result;
use serde_derive::Serialize;

use crate::config::models::Settings;
use crate::device_client::{with_timeout, DeviceClient, DoorStateProvider, FetchError, JobStatusProvider, PrinterStateProvider, WifiStrengthProvider};
use crate::indicators::{classify, DoorState, Tier};
use crate::indicators::signal::NO_SIGNAL_DBM;
use crate::monitor::JobSnapshot;

/// Everything the print host reports for one printer, as the service would read it.
#[derive(Debug, Serialize)]
pub struct DumpReport {
    pub printer: String,
    pub job: Option<JobSnapshot>,
    pub printer_started: Option<bool>,
    pub endstops: Option<i64>,
    pub door: Option<DoorState>,
    pub wifi_dbm: Option<i32>,
    pub wifi_tier: Tier,
    pub errors: Vec<String>,
}

/// Queries every endpoint once and prints the result as JSON.
pub async fn dump(settings: &Settings) -> Result<()> {
    let client = DeviceClient::new(&settings.print_host)?;
    let report = collect(&client, &settings.print_host.printer, settings.print_host.fetch_timeout).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn collect(client: &DeviceClient, printer: &str, timeout: Duration) -> DumpReport {
    let mut errors = Vec::new();

    let job = keep(&mut errors, "job", with_timeout(timeout, client.fetch_current(printer)).await).flatten();
    let printer_started = keep(&mut errors, "printer", with_timeout(timeout, client.fetch_on_off(printer)).await);
    let endstops = keep(&mut errors, "door", with_timeout(timeout, client.fetch_endstops(printer)).await);
    let wifi_dbm = keep(&mut errors, "wifi", with_timeout(timeout, client.fetch_strength()).await).flatten();

    DumpReport {
        printer: printer.to_owned(),
        job,
        printer_started,
        endstops,
        door: endstops.and_then(DoorState::from_endstops),
        wifi_dbm,
        wifi_tier: classify(wifi_dbm.unwrap_or(NO_SIGNAL_DBM)),
        errors,
    }
}

fn keep<T>(errors: &mut Vec<String>, what: &str, result: Result<T, FetchError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(format!("{}: {}", what, e));
            None
        }
    }
}
