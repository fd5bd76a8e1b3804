use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use crate::config::models::Settings;
use device_client::DeviceClient;
use indicators::IndicatorPanel;
use log::info;
use monitor::JobStatusMonitor;
use mqtt_client::client::{MqttClient, Topics};
use session::Session;
use store::StateStore;

mod cli;
mod config;
mod device_client;
mod dump;
mod indicators;
mod monitor;
mod mqtt_client;
mod session;
mod store;

#[tokio::main]
async fn main() -> Result<()> {
    colog::init();
    let cli = Cli::parse();

    let settings = config::loading::load_config().context("Could not load configuration")?;
    if settings.print_host.printer.trim().is_empty() {
        bail!("No printer configured, set PF2M_PRINTHOST_PRINTER.");
    }
    let _sentry = init_sentry(&settings);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(settings).await,
        Commands::Dump => dump::dump(&settings).await,
    }
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref().filter(|dsn| !dsn.is_empty())?;
    Some(sentry::init((dsn, sentry::ClientOptions {
        release: sentry::release_name!(),
        ..Default::default()
    })))
}

async fn run(settings: Settings) -> Result<()> {
    let printer = settings.print_host.printer.clone();
    let fetch_timeout = settings.print_host.fetch_timeout;

    let store = Arc::new(StateStore::open_or_empty(&settings.store.path));
    let device = Arc::new(DeviceClient::new(&settings.print_host).context("Invalid print host settings")?);

    let monitor = JobStatusMonitor::new(device.clone(), printer.clone(), fetch_timeout, store.clone());
    let panel = IndicatorPanel::new(device.clone(), device.clone(), device, printer.clone(), fetch_timeout, store);

    let topics = Topics::new(&settings.mqtt.root_topic, &printer);
    let (mqtt, page_rx) = MqttClient::connect(&settings.mqtt, topics, settings.panel.initial_page);

    info!(
        "Watching printer '{}' on {} every {} (indicators every {}).",
        printer,
        settings.print_host.uri,
        humantime::format_duration(settings.schedule.fast),
        humantime::format_duration(settings.schedule.slow)
    );
    Session::new(monitor, panel, Box::new(mqtt), page_rx, settings.schedule).run().await;
    Ok(())
}
