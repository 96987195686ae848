use super::RawAppointment;
use crate::schedule::time::{normalize_date, normalize_time, to_wire_time};
use crate::storage::{Appointment, AppointmentCategory, AppointmentStatus};
use serde_json::Value;

const DEFAULT_TYPE: &str = "General";
const DEFAULT_STATUS: &str = "scheduled";

/// Converts between wire rows and normalized appointments.
pub trait AppointmentConverter {
    fn to_appointment(&self) -> Appointment;
    fn from_appointment(appointment: &Appointment) -> Self
    where
        Self: Sized;
}

impl AppointmentConverter for RawAppointment {
    fn to_appointment(&self) -> Appointment {
        let status = non_empty(&self.appointment_status)
            .unwrap_or(DEFAULT_STATUS)
            .to_lowercase();
        let appointment_type = non_empty(&self.appointment_type).unwrap_or(DEFAULT_TYPE);

        Appointment {
            id: self.schedule_id,
            patient_id: self.patient_id,
            patient_name: self.patient_name.clone().unwrap_or_default(),
            patient_phone: self.mobile.clone().unwrap_or_default(),
            appointment_type: appointment_type.to_string(),
            category: AppointmentCategory::from_type_label(appointment_type),
            date: normalize_date(&self.appointment_date),
            time: self
                .appointment_start_time
                .as_deref()
                .map(normalize_time)
                .unwrap_or_default(),
            status: AppointmentStatus::from(status),
            constitution: self.constitution_type.clone().unwrap_or_default(),
            notes: self.note.clone().unwrap_or_default(),
        }
    }

    fn from_appointment(appointment: &Appointment) -> Self {
        RawAppointment {
            schedule_id: appointment.id,
            patient_id: appointment.patient_id,
            patient_name: Some(appointment.patient_name.clone()),
            mobile: Some(appointment.patient_phone.clone()),
            appointment_type: Some(appointment.appointment_type.clone()),
            appointment_date: appointment
                .date
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(Value::Null),
            appointment_start_time: to_wire_time(&appointment.time),
            appointment_end_time: None,
            appointment_status: Some(appointment.status.as_str().to_string()),
            constitution_type: Some(appointment.constitution.clone()),
            note: Some(appointment.notes.clone()),
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}
