//! ---
//! mtr_section: "02-messaging-ipc-data-model"
//! mtr_subsection: "module"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Typed device requests and envelope decoding."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

/// Free-form string metadata attached to most requests.
pub type Metadata = IndexMap<String, String>;

/// Registration of a device with the tenant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceRegistrationRequest {
    /// Hardware identifier; defaults to the envelope sender when absent.
    pub hardware_id: Option<String>,
    /// Token of the device specification to register against.
    pub specification_token: Option<String>,
    /// Token of the site the device is assigned to.
    pub site_token: Option<String>,
    pub metadata: Metadata,
}

/// Reported device location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceLocationCreateRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: Option<f64>,
    #[serde(default)]
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Metadata,
    /// Whether the device state should be updated from this event.
    #[serde(default)]
    pub update_state: bool,
}

/// Batch of named numeric measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMeasurementsCreateRequest {
    pub measurements: IndexMap<String, f64>,
    #[serde(default)]
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub update_state: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSource {
    #[default]
    Device,
    System,
}

/// Alert raised by a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAlertCreateRequest {
    /// Alert type identifier, e.g. `engine.overheat`.
    #[serde(rename = "type")]
    pub alert_type: String,
    pub message: String,
    #[serde(default)]
    pub level: AlertLevel,
    #[serde(default)]
    pub source: AlertSource,
    #[serde(default)]
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub update_state: bool,
}

/// Opens a binary data stream for a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStreamCreateRequest {
    pub stream_id: String,
    pub content_type: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// One chunk of a device stream. `data` travels base64-encoded.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStreamDataCreateRequest {
    pub stream_id: String,
    pub sequence_number: u64,
    #[serde_as(as = "Base64")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Device acknowledgement of a previously delivered command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCommandResponseCreateRequest {
    /// Id of the command invocation being acknowledged.
    pub originating_event_id: String,
    #[serde(default)]
    pub response_event_id: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Metadata,
}
