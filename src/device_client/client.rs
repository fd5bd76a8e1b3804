use std::{num::ParseIntError, time::Duration};

use async_trait::async_trait;
use log::trace;
use reqwest::StatusCode;
use snafu::{OptionExt, ResultExt, Snafu};
use url::Url;

use crate::config::models::PrintHost;
use crate::monitor::snapshot::JobSnapshot;

use super::models::*;
use super::{DoorStateProvider, JobStatusProvider, PrinterStateProvider, WifiStrengthProvider};

/// G-code that makes the firmware report its status, including the endstop bits.
const STATUS_GCODE: &str = "M408 S3";

/// HTTP client for the print host's REST services.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
    base: Url,
}

impl DeviceClient {
    pub fn new(settings: &PrintHost) -> Result<Self, FetchError> {
        let base = Url::parse(&settings.uri).context(InvalidUrlSnafu { uri: settings.uri.clone() })?;
        if base.cannot_be_a_base() {
            return NotABaseSnafu { uri: settings.uri.clone() }.fail();
        }

        let http = reqwest::Client::builder()
            .timeout(settings.fetch_timeout)
            .build()
            .context(RequestSnafu)?;

        Ok(Self { http, base })
    }

    /// Builds `<base>/services/<segments...>`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .ok()
            .context(NotABaseSnafu { uri: self.base.to_string() })?
            .pop_if_empty()
            .push("services")
            .extend(segments);
        Ok(url)
    }

    async fn get_text(&self, url: Url) -> Result<(StatusCode, String), FetchError> {
        trace!("GET {}", url);
        let response = self.http.get(url).send().await.context(RequestSnafu)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            return Ok((status, String::new()));
        }
        let body = response.error_for_status().context(RequestSnafu)?.text().await.context(RequestSnafu)?;
        Ok((status, body))
    }
}

#[async_trait]
impl JobStatusProvider for DeviceClient {
    async fn fetch_current(&self, printer: &str) -> Result<Option<JobSnapshot>, FetchError> {
        let url = self.endpoint(&["printJobs", "getByPrinterName", printer])?;
        let (_, body) = self.get_text(url).await?;
        parse_job(&body)
    }
}

#[async_trait]
impl PrinterStateProvider for DeviceClient {
    async fn fetch_on_off(&self, printer: &str) -> Result<bool, FetchError> {
        let url = self.endpoint(&["printers", "get", printer])?;
        let (status, body) = self.get_text(url).await?;
        if status == StatusCode::NOT_FOUND {
            return UnknownPrinterSnafu { printer }.fail();
        }
        let printer: PrinterResponse = serde_json::from_str(&body).context(JsonSnafu)?;
        Ok(printer.started)
    }
}

#[async_trait]
impl DoorStateProvider for DeviceClient {
    async fn fetch_endstops(&self, printer: &str) -> Result<i64, FetchError> {
        let url = self.endpoint(&["printers", "executeGCode", printer, STATUS_GCODE])?;
        let (status, body) = self.get_text(url).await?;
        if status == StatusCode::NOT_FOUND {
            return UnknownPrinterSnafu { printer }.fail();
        }
        let reply: GCodeResponse = serde_json::from_str(&body).context(JsonSnafu)?;
        parse_endstops(&reply.message)
    }
}

#[async_trait]
impl WifiStrengthProvider for DeviceClient {
    async fn fetch_strength(&self) -> Result<Option<i32>, FetchError> {
        let url = self.endpoint(&["machine", "wirelessNetworks", "getWirelessStrength"])?;
        let (_, body) = self.get_text(url).await?;
        parse_strength(&body)
    }
}

// /////// //
// Parsing //
// /////// //

/// An empty body, a JSON `null` and an absent job all mean "nothing is printing".
pub fn parse_job(body: &str) -> Result<Option<JobSnapshot>, FetchError> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(None);
    }
    let job: Option<PrintJobResponse> = serde_json::from_str(body).context(JsonSnafu)?;
    Ok(job.map(JobSnapshot::from))
}

/// The firmware reply is a JSON object followed by the `ok` acknowledgement.
pub fn parse_endstops(message: &str) -> Result<i64, FetchError> {
    let trimmed = message.trim_end();
    let json = trimmed.strip_suffix("ok").unwrap_or(trimmed).trim();
    let status: M408Status = serde_json::from_str(json).context(JsonSnafu)?;
    Ok(status.endstops)
}

/// The host answers with a bare or quoted number, or `null` when it has no reading.
/// Only the leading integer counts: `-54 dBm` and `-54.5` both read as -54.
pub fn parse_strength(body: &str) -> Result<Option<i32>, FetchError> {
    let value = body.trim().trim_matches('"').trim();
    if value.is_empty() || value == "null" {
        return Ok(None);
    }
    let sign = usize::from(value.starts_with(['-', '+']));
    let end = value[sign..].find(|c: char| !c.is_ascii_digit()).map_or(value.len(), |i| sign + i);
    value[..end].parse::<i32>().map(Some).context(NumberSnafu { body: value })
}

// ////// //
// Errors //
// ////// //

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FetchError {
    #[snafu(display("Invalid print host URI '{uri}'"))]
    InvalidUrl { uri: String, source: url::ParseError },
    #[snafu(display("Print host URI '{uri}' is not a base URL"))]
    NotABase { uri: String },
    #[snafu(display("Request to print host failed"))]
    Request { source: reqwest::Error },
    #[snafu(display("Print host does not know printer '{printer}'"))]
    UnknownPrinter { printer: String },
    #[snafu(display("Print host did not answer within {}", humantime::format_duration(*timeout)))]
    Timeout { timeout: Duration },
    #[snafu(display("Unexpected JSON from print host"))]
    Json { source: serde_json::Error },
    #[snafu(display("Expected an integer from print host, got '{body}'"))]
    Number { body: String, source: ParseIntError },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::snapshot::JobStatus;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> DeviceClient {
        DeviceClient::new(&PrintHost {
            uri: format!("{}/", server.uri()),
            printer: "Dental 1".to_owned(),
            fetch_timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[test]
    fn parses_a_running_job() {
        let body = r#"{
            "status": "Printing",
            "id": "5b4a1c8e",
            "jobName": "crown.cws",
            "totalSlices": 420,
            "currentSlice": 17,
            "elapsedTime": 65000,
            "averageSliceTime": 3800.5,
            "startTime": 1700000000000
        }"#;

        let job = parse_job(body).unwrap().unwrap();
        assert_eq!(
            job,
            JobSnapshot {
                status: JobStatus::Printing,
                job_id: "5b4a1c8e".to_owned(),
                job_name: "crown.cws".to_owned(),
                total_slices: 420,
                current_slice: 17,
                elapsed_time: 65000,
                average_slice_time: 3800.5,
                start_time: 1700000000000,
            }
        );
    }

    #[test]
    fn numeric_ids_and_unknown_statuses_are_accepted() {
        let job = parse_job(r#"{"status": "PausedDoorOpen", "id": 12}"#).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Unknown);
        assert_eq!(job.job_id, "12");
        assert_eq!(job.total_slices, 0);
    }

    #[test]
    fn null_and_empty_bodies_mean_no_job() {
        assert_eq!(parse_job("null").unwrap(), None);
        assert_eq!(parse_job("  \n").unwrap(), None);
        assert!(parse_job("<html>").is_err());
    }

    #[test]
    fn endstops_are_read_from_the_firmware_reply() {
        let message = "{\"status\":\"I\",\"endstops\":6,\"msgBox.mode\":-1}\n\nok\n";
        assert_eq!(parse_endstops(message).unwrap(), 6);
        assert_eq!(parse_endstops("{\"endstops\":1}").unwrap(), 1);
        assert!(parse_endstops("Error: printer not started\nok\n").is_err());
    }

    #[test]
    fn strength_accepts_bare_quoted_and_null() {
        assert_eq!(parse_strength("-54").unwrap(), Some(-54));
        assert_eq!(parse_strength("\"-71\"").unwrap(), Some(-71));
        assert_eq!(parse_strength("null").unwrap(), None);
        assert!(matches!(parse_strength("strong"), Err(FetchError::Number { .. })));
        assert!(matches!(parse_strength("-"), Err(FetchError::Number { .. })));
    }

    #[test]
    fn strength_reads_the_leading_integer() {
        assert_eq!(parse_strength("-54 dBm").unwrap(), Some(-54));
        assert_eq!(parse_strength("-54.5").unwrap(), Some(-54));
        assert_eq!(parse_strength("\"-71dBm\"\n").unwrap(), Some(-71));
        assert_eq!(parse_strength("+3").unwrap(), Some(3));
    }

    #[tokio::test]
    async fn fetches_job_for_printer_with_encoded_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/printJobs/getByPrinterName/Dental%201"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"Failed","id":"J9","jobName":"bridge"}"#))
            .mount(&server)
            .await;

        let job = client_for(&server).fetch_current("Dental 1").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.job_name, "bridge");
    }

    #[tokio::test]
    async fn missing_job_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/printJobs/getByPrinterName/Dental%201"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert_eq!(client_for(&server).fetch_current("Dental 1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn server_errors_are_fetch_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(matches!(client.fetch_current("Dental 1").await, Err(FetchError::Request { .. })));
        assert!(client.fetch_strength().await.is_err());
    }

    #[tokio::test]
    async fn fetches_printer_door_and_wifi() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/printers/get/Dental%201"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"started":true,"printerName":"Dental 1"}"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/services/printers/executeGCode/Dental%201/M408%20S3"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"message":"{\"endstops\":3}\n\nok\n"}"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/services/machine/wirelessNetworks/getWirelessStrength"))
            .respond_with(ResponseTemplate::new(200).set_body_string("\"-66\""))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.fetch_on_off("Dental 1").await.unwrap());
        assert_eq!(client.fetch_endstops("Dental 1").await.unwrap(), 3);
        assert_eq!(client.fetch_strength().await.unwrap(), Some(-66));
    }

    #[tokio::test]
    async fn slow_hosts_time_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("-50").set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = super::super::with_timeout(Duration::from_millis(50), client.fetch_strength()).await;
        assert!(matches!(result, Err(FetchError::Timeout { .. })));
    }
}
