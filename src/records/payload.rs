//! Mutation bodies sent to the record source.
//!
//! Front-desk input arrives in display form (`2:30 PM`, `20/10/2026`) and is
//! converted to wire form here, before it leaves the process.

use super::RecordError;
use crate::schedule::time::{to_wire_date, to_wire_time};
use crate::storage::AppointmentStatus;
use serde::{Deserialize, Serialize};

const DEFAULT_CONSTITUTION: &str = "Not specified";

/// Booking form as submitted by the front desk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewAppointment {
    pub patient_id: Option<i64>,
    pub patient_name: String,
    pub patient_phone: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub appointment_type: String,
    pub constitution: Option<String>,
    pub notes: Option<String>,
}

/// Wire body for creating a schedule row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SchedulePayload {
    #[serde(rename = "PatientID")]
    pub patient_id: i64,
    pub patient_name: String,
    pub mobile: String,
    pub appointment_date: String,
    pub appointment_start_time: String,
    pub appointment_end_time: Option<String>,
    pub appointment_type: String,
    pub constitution_type: String,
    pub note: Option<String>,
}

impl NewAppointment {
    pub fn to_payload(&self) -> Result<SchedulePayload, RecordError> {
        let patient_id = self
            .patient_id
            .filter(|id| *id > 0)
            .ok_or(RecordError::MissingField("patientId"))?;
        let patient_name = required(&self.patient_name, "patientName")?;
        let mobile = required(&self.patient_phone, "patientPhone")?;
        let date = required(&self.appointment_date, "appointmentDate")?;
        let time = required(&self.appointment_time, "appointmentTime")?;
        let appointment_type = required(&self.appointment_type, "appointmentType")?;

        Ok(SchedulePayload {
            patient_id,
            patient_name: patient_name.to_string(),
            mobile: mobile.to_string(),
            appointment_date: to_wire_date(date)
                .ok_or_else(|| RecordError::InvalidDate(date.to_string()))?,
            appointment_start_time: to_wire_time(time)
                .ok_or_else(|| RecordError::InvalidTime(time.to_string()))?,
            appointment_end_time: None,
            appointment_type: appointment_type.to_string(),
            constitution_type: optional(&self.constitution)
                .unwrap_or(DEFAULT_CONSTITUTION)
                .to_string(),
            note: optional(&self.notes).map(str::to_string),
        })
    }
}

/// Partial update; absent or blank fields are left unchanged at the source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppointmentChanges {
    pub date: Option<String>,
    pub time: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScheduleChanges {
    pub appointment_date: Option<String>,
    pub appointment_start_time: Option<String>,
    pub appointment_status: Option<String>,
    pub note: Option<String>,
}

impl ScheduleChanges {
    pub fn is_empty(&self) -> bool {
        self.appointment_date.is_none()
            && self.appointment_start_time.is_none()
            && self.appointment_status.is_none()
            && self.note.is_none()
    }
}

impl AppointmentChanges {
    pub fn to_wire(&self) -> Result<ScheduleChanges, RecordError> {
        let appointment_date = optional(&self.date)
            .map(|d| to_wire_date(d).ok_or_else(|| RecordError::InvalidDate(d.to_string())))
            .transpose()?;
        let appointment_start_time = optional(&self.time)
            .map(|t| to_wire_time(t).ok_or_else(|| RecordError::InvalidTime(t.to_string())))
            .transpose()?;
        let appointment_status = optional(&self.status)
            .map(|s| {
                let status = AppointmentStatus::from(s.to_lowercase());
                if status.is_known() {
                    Ok(status.as_str().to_string())
                } else {
                    Err(RecordError::InvalidStatus(s.to_string()))
                }
            })
            .transpose()?;

        Ok(ScheduleChanges {
            appointment_date,
            appointment_start_time,
            appointment_status,
            note: optional(&self.notes).map(str::to_string),
        })
    }
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, RecordError> {
    let value = value.trim();
    if value.is_empty() {
        Err(RecordError::MissingField(field))
    } else {
        Ok(value)
    }
}

fn optional(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn booking() -> NewAppointment {
        NewAppointment {
            patient_id: Some(42),
            patient_name: " Ravi Kumar ".to_string(),
            patient_phone: "9000000001".to_string(),
            appointment_date: "20/10/2026".to_string(),
            appointment_time: "2:30 PM".to_string(),
            appointment_type: "Therapy: Abhyanga".to_string(),
            constitution: None,
            notes: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_to_payload_converts_to_wire_form() {
        let payload = booking().to_payload().unwrap();
        assert_eq!(
            payload,
            SchedulePayload {
                patient_id: 42,
                patient_name: "Ravi Kumar".to_string(),
                mobile: "9000000001".to_string(),
                appointment_date: "2026-10-20".to_string(),
                appointment_start_time: "14:30:00".to_string(),
                appointment_end_time: None,
                appointment_type: "Therapy: Abhyanga".to_string(),
                constitution_type: "Not specified".to_string(),
                note: None,
            }
        );
    }

    #[test]
    fn test_to_payload_requires_fields() {
        let mut missing_phone = booking();
        missing_phone.patient_phone.clear();
        assert!(matches!(
            missing_phone.to_payload(),
            Err(RecordError::MissingField("patientPhone"))
        ));

        let mut no_patient = booking();
        no_patient.patient_id = Some(0);
        assert!(matches!(
            no_patient.to_payload(),
            Err(RecordError::MissingField("patientId"))
        ));
    }

    #[test]
    fn test_to_payload_rejects_bad_time() {
        let mut bad = booking();
        bad.appointment_time = "25:00".to_string();
        assert!(matches!(bad.to_payload(), Err(RecordError::InvalidTime(_))));
    }

    #[test]
    fn test_payload_uses_wire_field_names() {
        let json = serde_json::to_value(booking().to_payload().unwrap()).unwrap();
        assert_eq!(json["PatientID"], 42);
        assert_eq!(json["AppointmentStartTime"], "14:30:00");
        assert_eq!(json["ConstitutionType"], "Not specified");
    }

    #[test]
    fn test_changes_to_wire() {
        let changes = AppointmentChanges {
            date: Some("2026-10-21".to_string()),
            time: Some("".to_string()),
            status: Some("Completed".to_string()),
            notes: None,
        };
        let wire = changes.to_wire().unwrap();
        assert_eq!(wire.appointment_date.as_deref(), Some("2026-10-21"));
        assert_eq!(wire.appointment_start_time, None);
        assert_eq!(wire.appointment_status.as_deref(), Some("completed"));
        assert!(!wire.is_empty());

        assert!(AppointmentChanges::default().to_wire().unwrap().is_empty());
    }

    #[test]
    fn test_changes_reject_unknown_status() {
        let changes = AppointmentChanges {
            status: Some("lost".to_string()),
            ..Default::default()
        };
        assert!(matches!(changes.to_wire(), Err(RecordError::InvalidStatus(_))));
    }
}
