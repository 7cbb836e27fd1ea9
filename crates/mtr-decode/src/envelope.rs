//! ---
//! mtr_section: "02-messaging-ipc-data-model"
//! mtr_subsection: "module"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Typed device requests and envelope decoding."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use thiserror::Error;
use tracing::trace;

use crate::requests::{
    DeviceAlertCreateRequest, DeviceCommandResponseCreateRequest, DeviceLocationCreateRequest,
    DeviceMeasurementsCreateRequest, DeviceRegistrationRequest, DeviceStreamCreateRequest,
    DeviceStreamDataCreateRequest,
};

pub const FIELD_TYPE: &str = "type";
pub const FIELD_SENDER_ID: &str = "senderId";
pub const FIELD_CORRELATION_ID: &str = "correlationId";
pub const FIELD_REQUEST: &str = "request";

/// Tag carried in the envelope `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter)]
pub enum RequestKind {
    RegisterDevice,
    DeviceLocation,
    DeviceMeasurements,
    DeviceAlert,
    DeviceStream,
    DeviceStreamData,
    Acknowledge,
}

/// Typed body of a decoded envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceRequest {
    RegisterDevice(DeviceRegistrationRequest),
    DeviceLocation(DeviceLocationCreateRequest),
    DeviceMeasurements(DeviceMeasurementsCreateRequest),
    DeviceAlert(DeviceAlertCreateRequest),
    DeviceStream(DeviceStreamCreateRequest),
    DeviceStreamData(DeviceStreamDataCreateRequest),
    Acknowledge(DeviceCommandResponseCreateRequest),
}

impl DeviceRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            DeviceRequest::RegisterDevice(_) => RequestKind::RegisterDevice,
            DeviceRequest::DeviceLocation(_) => RequestKind::DeviceLocation,
            DeviceRequest::DeviceMeasurements(_) => RequestKind::DeviceMeasurements,
            DeviceRequest::DeviceAlert(_) => RequestKind::DeviceAlert,
            DeviceRequest::DeviceStream(_) => RequestKind::DeviceStream,
            DeviceRequest::DeviceStreamData(_) => RequestKind::DeviceStreamData,
            DeviceRequest::Acknowledge(_) => RequestKind::Acknowledge,
        }
    }
}

/// Envelope after decoding: routing identifiers plus the typed request.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRequest {
    /// Identifier of the sending device.
    pub sender_id: String,
    /// Caller supplied id used to correlate responses.
    pub correlation_id: String,
    pub request: DeviceRequest,
}

impl DecodedRequest {
    pub fn kind(&self) -> RequestKind {
        self.request.kind()
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("envelope field '{0}' is missing or not a string")]
    MalformedEnvelope(&'static str),
    #[error("unknown event type '{0}'")]
    UnknownEventType(String),
    #[error("invalid {kind} request: {source}")]
    InvalidRequest {
        kind: RequestKind,
        #[source]
        source: serde_json::Error,
    },
}

pub fn decode(payload: &[u8]) -> Result<DecodedRequest, DecodeError> {
    let value: Value = serde_json::from_slice(payload).map_err(DecodeError::InvalidJson)?;
    decode_value(value)
}

pub fn decode_str(payload: &str) -> Result<DecodedRequest, DecodeError> {
    decode(payload.as_bytes())
}

/// Decode an already parsed envelope.
///
/// The `type` tag is validated before the routing identifiers; a missing or null
/// `request` decodes as an empty object.
pub fn decode_value(value: Value) -> Result<DecodedRequest, DecodeError> {
    let Value::Object(mut envelope) = value else {
        return Err(DecodeError::MalformedEnvelope(FIELD_TYPE));
    };

    let tag = string_field(&envelope, FIELD_TYPE)?;
    let kind: RequestKind = tag
        .parse()
        .map_err(|_| DecodeError::UnknownEventType(tag.to_owned()))?;
    let sender_id = string_field(&envelope, FIELD_SENDER_ID)?.to_owned();
    let correlation_id = string_field(&envelope, FIELD_CORRELATION_ID)?.to_owned();

    let body = match envelope.remove(FIELD_REQUEST) {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(body) => body,
    };
    let request = match kind {
        RequestKind::RegisterDevice => DeviceRequest::RegisterDevice(typed(kind, body)?),
        RequestKind::DeviceLocation => DeviceRequest::DeviceLocation(typed(kind, body)?),
        RequestKind::DeviceMeasurements => DeviceRequest::DeviceMeasurements(typed(kind, body)?),
        RequestKind::DeviceAlert => DeviceRequest::DeviceAlert(typed(kind, body)?),
        RequestKind::DeviceStream => DeviceRequest::DeviceStream(typed(kind, body)?),
        RequestKind::DeviceStreamData => DeviceRequest::DeviceStreamData(typed(kind, body)?),
        RequestKind::Acknowledge => DeviceRequest::Acknowledge(typed(kind, body)?),
    };
    trace!(%kind, sender = %sender_id, correlation = %correlation_id, "request decoded");

    Ok(DecodedRequest {
        sender_id,
        correlation_id,
        request,
    })
}

fn string_field<'a>(envelope: &'a Map<String, Value>, field: &'static str) -> Result<&'a str, DecodeError> {
    envelope
        .get(field)
        .and_then(Value::as_str)
        .ok_or(DecodeError::MalformedEnvelope(field))
}

fn typed<T: DeserializeOwned>(kind: RequestKind, body: Value) -> Result<T, DecodeError> {
    serde_json::from_value(body).map_err(|source| DecodeError::InvalidRequest { kind, source })
}
