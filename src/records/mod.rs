//! Appointment rows as exchanged with the record source
//!
//! This module holds the wire schema for schedule rows, the validation step
//! that turns untyped JSON rows into that schema, and the conversions between
//! wire and display forms used at ingest and submit time.

pub mod conversion;
pub mod payload;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use conversion::AppointmentConverter;
pub use payload::{AppointmentChanges, NewAppointment, ScheduleChanges, SchedulePayload};

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("row {index} does not match the schedule schema: {source}")]
    InvalidRow {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid time: {0:?}")]
    InvalidTime(String),
    #[error("invalid date: {0:?}")]
    InvalidDate(String),
    #[error("unknown status: {0:?}")]
    InvalidStatus(String),
}

/// One schedule row as listed by the record source.
///
/// Only the two identifiers are required. The date is kept untyped because
/// sources hand it over as a plain date, a timestamp, or epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawAppointment {
    #[serde(rename = "ScheduleID")]
    pub schedule_id: i64,
    #[serde(rename = "PatientID")]
    pub patient_id: i64,
    pub patient_name: Option<String>,
    pub mobile: Option<String>,
    pub appointment_type: Option<String>,
    #[serde(default)]
    pub appointment_date: Value,
    pub appointment_start_time: Option<String>,
    pub appointment_end_time: Option<String>,
    pub appointment_status: Option<String>,
    pub constitution_type: Option<String>,
    pub note: Option<String>,
}

/// Validates a full listing. The first row that does not fit the schema
/// rejects the whole batch.
pub fn parse_rows(rows: Vec<Value>) -> Result<Vec<RawAppointment>, RecordError> {
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            serde_json::from_value(row).map_err(|source| RecordError::InvalidRow { index, source })
        })
        .collect()
}
