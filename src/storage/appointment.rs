use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A scheduled visit, normalized for display and filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub patient_name: String,
    pub patient_phone: String,
    pub appointment_type: String,
    /// Derived from `appointment_type` when the row is converted.
    #[serde(default)]
    pub category: AppointmentCategory,
    /// Local calendar day; `None` when the source date was missing or invalid.
    pub date: Option<NaiveDate>,
    /// Display form, `h:mm AM/PM`, or empty.
    pub time: String,
    pub status: AppointmentStatus,
    pub constitution: String,
    pub notes: String,
}

/// Appointment status. Labels outside the known set are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AppointmentStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Rescheduled,
    Other(String),
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::InProgress => "in-progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Rescheduled => "rescheduled",
            AppointmentStatus::Other(label) => label,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, AppointmentStatus::Other(_))
    }
}

impl Default for AppointmentStatus {
    fn default() -> Self {
        AppointmentStatus::Scheduled
    }
}

// Exact, case-sensitive: "Scheduled" is not "scheduled".
impl From<&str> for AppointmentStatus {
    fn from(label: &str) -> Self {
        match label {
            "scheduled" => AppointmentStatus::Scheduled,
            "in-progress" => AppointmentStatus::InProgress,
            "completed" => AppointmentStatus::Completed,
            "cancelled" => AppointmentStatus::Cancelled,
            "rescheduled" => AppointmentStatus::Rescheduled,
            other => AppointmentStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for AppointmentStatus {
    fn from(label: String) -> Self {
        AppointmentStatus::from(label.as_str())
    }
}

impl From<AppointmentStatus> for String {
    fn from(status: AppointmentStatus) -> Self {
        match status {
            AppointmentStatus::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AppointmentStatus::from(s))
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Department bucket derived from the appointment type label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentCategory {
    Therapy,
    Diet,
    #[default]
    General,
}

impl AppointmentCategory {
    pub fn from_type_label(label: &str) -> Self {
        let label = label.to_lowercase();
        if label.contains("therapy") {
            AppointmentCategory::Therapy
        } else if label.contains("diet") {
            AppointmentCategory::Diet
        } else {
            AppointmentCategory::General
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(AppointmentStatus::from("in-progress"), AppointmentStatus::InProgress);
        assert_eq!(AppointmentStatus::InProgress.to_string(), "in-progress");
        assert_eq!(
            AppointmentStatus::from("Scheduled"),
            AppointmentStatus::Other("Scheduled".to_string())
        );
        assert!(!AppointmentStatus::from("no-show").is_known());
        assert_eq!(AppointmentStatus::default(), AppointmentStatus::Scheduled);
    }

    #[test]
    fn test_status_serializes_as_label() {
        let json = serde_json::to_string(&AppointmentStatus::Rescheduled).unwrap();
        assert_eq!(json, "\"rescheduled\"");
        let parsed: AppointmentStatus = serde_json::from_str("\"no-show\"").unwrap();
        assert_eq!(parsed, AppointmentStatus::Other("no-show".to_string()));
    }

    #[test]
    fn test_category_from_type() {
        assert_eq!(AppointmentCategory::from_type_label("Therapy: Abhyanga"), AppointmentCategory::Therapy);
        assert_eq!(AppointmentCategory::from_type_label("DIET consult"), AppointmentCategory::Diet);
        assert_eq!(AppointmentCategory::from_type_label("General"), AppointmentCategory::General);
    }
}
