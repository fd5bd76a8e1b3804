use std::{sync::Arc, time::Duration};

use backon::{ExponentialBuilder, Retryable};
use convert_case::{Case, Casing};
use log::{debug, info, warn};
use rumqttc::{tokio_rustls::rustls::ClientConfig, AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::Serialize;
use snafu::{ResultExt, Snafu};
use tokio::sync::watch;

use crate::config::models::Mqtt;
use crate::indicators::{IconUpdate, Indicator};
use crate::monitor::{JobSnapshot, NavigationRequest, Page};

use super::fun_with_tls::{get_system_certs, NoopServerCertVerifier};
use super::models::{MqttIcon, MqttNavigation};

/// Retries after the first attempt, so a message is tried three times in total.
const PUBLISH_RETRIES: usize = 2;
const PUBLISH_RETRY_DELAY: Duration = Duration::from_millis(100);
/// Capacity of the request queue between the client and the event loop.
const REQUEST_QUEUE: usize = 10;
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Topic layout below `<root>/<printer>`.
#[derive(Debug, Clone)]
pub struct Topics {
    base: String,
}

impl Topics {
    pub fn new(root_topic: &str, printer: &str) -> Self {
        Self { base: format!("{}/{}", root_topic.trim_end_matches('/'), printer.to_case(Case::Kebab)) }
    }

    pub fn navigate(&self) -> String {
        format!("{}/navigate", self.base)
    }

    pub fn icon(&self, indicator: Indicator) -> String {
        format!("{}/icon/{}", self.base, indicator.name())
    }

    pub fn job(&self) -> String {
        format!("{}/job", self.base)
    }

    /// Where the shell reports the page it is showing.
    pub fn page(&self) -> String {
        format!("{}/page", self.base)
    }
}

pub struct MqttClient {
    client: AsyncClient,
    topics: Topics,
}

impl MqttClient {
    /// Connects to the broker and spawns the event loop. Page reports from the
    /// shell are forwarded to the returned receiver.
    pub fn connect(mqtt_settings: &Mqtt, topics: Topics, initial_page: Page) -> (Self, watch::Receiver<Page>) {
        let mut mqtt_options = MqttOptions::new(mqtt_settings.client_id.to_owned(), mqtt_settings.host.to_owned(), mqtt_settings.port);
        if !mqtt_settings.username.is_empty() {
            mqtt_options.set_credentials(mqtt_settings.username.to_owned(), mqtt_settings.password.to_owned());
        }
        mqtt_options
            .set_transport(match mqtt_settings.secure {
                true => {
                    let config: ClientConfig = match mqtt_settings.ignore_tls_errors {
                        // TLS without certificate verification.
                        true => ClientConfig::builder().dangerous().with_custom_certificate_verifier(Arc::new(NoopServerCertVerifier {})).with_no_client_auth(),
                        // TLS with certificate verification.
                        false => ClientConfig::builder().with_root_certificates(get_system_certs().clone()).with_no_client_auth(),
                    };
                    rumqttc::Transport::tls_with_config(rumqttc::TlsConfiguration::Rustls(Arc::new(config)))
                }
                // No TLS.
                false => rumqttc::Transport::tcp(),
            })
            .set_keep_alive(Duration::from_secs(10));

        let (client, mut eventloop) = AsyncClient::new(mqtt_options, REQUEST_QUEUE);
        let (page_tx, page_rx) = watch::channel(initial_page);

        let page_topic = topics.page();
        let subscriber = client.clone();
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("Connected to MQTT broker, listening on {}.", page_topic);
                        // The event loop is this task, so the request must not wait for queue space.
                        if let Err(e) = subscriber.try_subscribe(page_topic.as_str(), QoS::AtLeastOnce) {
                            warn!("Could not subscribe to {}: {}", page_topic, e);
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) if publish.topic == page_topic => {
                        match parse_page_report(&publish.payload) {
                            Ok(page) => {
                                debug!("Shell reports page {}.", page);
                                let _ = page_tx.send(page);
                            }
                            Err(e) => warn!("Ignoring page report: {}", e),
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("MQTT connection error: {}", e);
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        });

        (Self { client, topics }, page_rx)
    }

    pub async fn publish_navigation(&self, request: &NavigationRequest) -> Result<(), PublishError> {
        self.publish_json(self.topics.navigate(), &MqttNavigation::from(request), false).await
    }

    pub async fn publish_icon(&self, update: &IconUpdate) -> Result<(), PublishError> {
        self.publish_json(self.topics.icon(update.indicator), &MqttIcon::from(update), true).await
    }

    pub async fn publish_snapshot(&self, snapshot: &JobSnapshot) -> Result<(), PublishError> {
        self.publish_json(self.topics.job(), snapshot, true).await
    }

    /// Queues a message for the event loop without waiting for queue space.
    ///
    /// While the broker is away the queue fills up; a full queue is an error
    /// so a tick never waits for the connection to come back.
    async fn publish_json<T: Serialize>(&self, topic: String, payload: &T, retain: bool) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(payload).context(SerializeSnafu { topic: topic.clone() })?;
        let client = &self.client;

        let result = (|| {
            let topic = topic.clone();
            let payload = payload.clone();
            async move { client.try_publish(topic, QoS::AtLeastOnce, retain, payload) }
        })
        .retry(ExponentialBuilder::default().with_min_delay(PUBLISH_RETRY_DELAY).with_max_times(PUBLISH_RETRIES))
        .notify(|e, wait| warn!("Publishing failed ({}), retrying in {:?}.", e, wait))
        .await;

        result.context(ClientSnafu { topic })
    }
}

fn parse_page_report(payload: &[u8]) -> Result<Page, String> {
    let text = std::str::from_utf8(payload).map_err(|e| e.to_string())?;
    text.trim().trim_matches('"').parse()
}

// ////// //
// Errors //
// ////// //

#[derive(Debug, Snafu)]
pub enum PublishError {
    #[snafu(display("Could not publish to {topic}"))]
    Client { topic: String, source: rumqttc::ClientError },
    #[snafu(display("Could not serialize payload for {topic}"))]
    Serialize { topic: String, source: serde_json::Error },
}
