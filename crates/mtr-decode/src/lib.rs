//! ---
//! mtr_section: "02-messaging-ipc-data-model"
//! mtr_subsection: "module"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Typed device requests and envelope decoding."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
//! Stateless decoding of inbound device payloads.
//!
//! Payloads arrive as a JSON envelope `{type, senderId, correlationId, request}`; the
//! `type` tag selects which typed request the `request` body is decoded into.

pub mod envelope;
pub mod requests;

pub use envelope::{
    decode, decode_str, decode_value, DecodeError, DecodedRequest, DeviceRequest, RequestKind,
};
pub use requests::{
    AlertLevel, AlertSource, DeviceAlertCreateRequest, DeviceCommandResponseCreateRequest,
    DeviceLocationCreateRequest, DeviceMeasurementsCreateRequest, DeviceRegistrationRequest,
    DeviceStreamCreateRequest, DeviceStreamDataCreateRequest, Metadata,
};
