use crate::schedule::time::time_to_minutes;
use crate::storage::{Appointment, AppointmentStatus};
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Date window for the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateFilter {
    Today,
    Tomorrow,
    ThisWeek,
    ThisMonth,
    #[default]
    All,
}

impl DateFilter {
    /// Parses a filter name; anything unrecognised means `All`.
    pub fn parse(name: &str) -> Self {
        match name {
            "today" => DateFilter::Today,
            "tomorrow" => DateFilter::Tomorrow,
            "thisWeek" => DateFilter::ThisWeek,
            "thisMonth" => DateFilter::ThisMonth,
            _ => DateFilter::All,
        }
    }

    /// Whether `date` falls in this window. `date` is assumed not to be past.
    fn matches(self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            DateFilter::Today => date == today,
            DateFilter::Tomorrow => Some(date) == today.checked_add_days(Days::new(1)),
            DateFilter::ThisWeek => {
                let week_end = today.checked_add_days(Days::new(7)).unwrap_or(NaiveDate::MAX);
                date <= week_end
            }
            DateFilter::ThisMonth => date <= last_day_of_month(today),
            DateFilter::All => true,
        }
    }
}

impl FromStr for DateFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(DateFilter::parse(s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(AppointmentStatus),
}

impl StatusFilter {
    pub fn parse(name: &str) -> Self {
        match name {
            "all" => StatusFilter::All,
            label => StatusFilter::Only(AppointmentStatus::from(label)),
        }
    }

    fn matches(&self, status: &AppointmentStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == status,
        }
    }
}

/// Everything the timeline filters on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineQuery {
    pub date_filter: DateFilter,
    pub status: StatusFilter,
    pub search: String,
    /// Day picked on the calendar; narrows the result to that day.
    pub selected: Option<NaiveDate>,
}

impl TimelineQuery {
    pub fn new(date_filter: DateFilter, status: StatusFilter, search: impl Into<String>) -> Self {
        TimelineQuery {
            date_filter,
            status,
            search: search.into(),
            selected: None,
        }
    }

    pub fn on_day(mut self, day: NaiveDate) -> Self {
        self.selected = Some(day);
        self
    }
}

/// Appointments matching `query`, ordered by day and then time of day.
///
/// Appointments dated before `today`, or with no date, never match.
pub fn filter_appointments(
    appointments: &[Appointment],
    today: NaiveDate,
    query: &TimelineQuery,
) -> Vec<Appointment> {
    let needle = query.search.to_lowercase();

    let mut matched: Vec<Appointment> = appointments
        .iter()
        .filter(|a| {
            let Some(date) = a.date else {
                return false;
            };
            if date < today {
                return false;
            }
            query.date_filter.matches(date, today)
                && query.status.matches(&a.status)
                && matches_search(a, &needle)
                && query.selected.map_or(true, |day| day == date)
        })
        .cloned()
        .collect();

    matched.sort_by_key(|a| (a.date, time_to_minutes(&a.time)));

    tracing::debug!(
        filter = ?query.date_filter,
        status = ?query.status,
        search = %query.search,
        matched = matched.len(),
        "timeline filtered"
    );
    matched
}

fn matches_search(appointment: &Appointment, needle: &str) -> bool {
    needle.is_empty()
        || appointment.patient_name.to_lowercase().contains(needle)
        || appointment.patient_phone.to_lowercase().contains(needle)
        || appointment.appointment_type.to_lowercase().contains(needle)
}

pub(crate) fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::AppointmentCategory;
    use pretty_assertions::assert_eq;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn plus(days: i64) -> Option<NaiveDate> {
        Some(today() + chrono::Duration::days(days))
    }

    fn appt(id: i64, date: Option<NaiveDate>, time: &str) -> Appointment {
        Appointment {
            id,
            patient_id: id,
            patient_name: format!("Patient {}", id),
            patient_phone: format!("98000{:05}", id),
            appointment_type: "General".to_string(),
            category: AppointmentCategory::General,
            date,
            time: time.to_string(),
            status: AppointmentStatus::Scheduled,
            constitution: String::new(),
            notes: String::new(),
        }
    }

    fn ids(list: &[Appointment]) -> Vec<i64> {
        list.iter().map(|a| a.id).collect()
    }

    fn run(list: &[Appointment], date_filter: &str, status: &str, search: &str) -> Vec<i64> {
        let query = TimelineQuery::new(DateFilter::parse(date_filter), StatusFilter::parse(status), search);
        ids(&filter_appointments(list, today(), &query))
    }

    fn sample() -> Vec<Appointment> {
        vec![
            appt(1, plus(-1), "9:00 AM"),
            appt(2, plus(0), "2:00 PM"),
            appt(3, plus(0), "8:30 AM"),
            appt(4, plus(1), "10:00 AM"),
            appt(5, plus(7), "11:00 AM"),
            appt(6, plus(8), "11:00 AM"),
            appt(7, plus(13), "9:00 AM"),
            appt(8, plus(14), "9:00 AM"),
            appt(9, None, "9:00 AM"),
        ]
    }

    #[test]
    fn test_date_windows() {
        let list = sample();
        assert_eq!(run(&list, "today", "all", ""), vec![3, 2]);
        assert_eq!(run(&list, "tomorrow", "all", ""), vec![4]);
        assert_eq!(run(&list, "thisWeek", "all", ""), vec![3, 2, 4, 5]);
        // October 31st is today + 13
        assert_eq!(run(&list, "thisMonth", "all", ""), vec![3, 2, 4, 5, 6, 7]);
        assert_eq!(run(&list, "all", "all", ""), vec![3, 2, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_unknown_filter_behaves_as_all() {
        let list = sample();
        assert_eq!(run(&list, "fortnight", "all", ""), run(&list, "all", "all", ""));
    }

    #[test]
    fn test_past_appointments_never_match() {
        let list = vec![appt(1, plus(-1), "9:00 AM")];
        for filter in ["today", "tomorrow", "thisWeek", "thisMonth", "all", "bogus"] {
            assert!(run(&list, filter, "all", "").is_empty(), "filter {}", filter);
        }
    }

    #[test]
    fn test_status_filter_is_exact() {
        let mut list = sample();
        list[2].status = AppointmentStatus::Completed;
        assert_eq!(run(&list, "all", "completed", ""), vec![3]);
        assert!(run(&list, "all", "Completed", "").is_empty());
    }

    #[test]
    fn test_search_across_fields() {
        let mut list = sample();
        list[3].appointment_type = "Therapy: Nasya".to_string();
        list[4].patient_name = "Kavya Menon".to_string();

        assert_eq!(run(&list, "all", "all", "NASYA"), vec![4]);
        assert_eq!(run(&list, "all", "all", "kavya"), vec![5]);
        assert_eq!(run(&list, "all", "all", "9800000006"), vec![6]);
        assert!(run(&list, "all", "all", "nobody").is_empty());
    }

    #[test]
    fn test_selected_day_narrows_result() {
        let list = sample();
        let query = TimelineQuery::default().on_day(plus(7).unwrap());
        assert_eq!(ids(&filter_appointments(&list, today(), &query)), vec![5]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let list = vec![appt(1, plus(2), "9:00 AM"), appt(2, plus(2), "9:00 AM"), appt(3, plus(2), "")];
        assert_eq!(run(&list, "all", "all", ""), vec![3, 1, 2]);
    }

    #[test]
    fn test_last_day_of_month() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(last_day_of_month(d(2026, 10, 18)), d(2026, 10, 31));
        assert_eq!(last_day_of_month(d(2026, 12, 1)), d(2026, 12, 31));
        assert_eq!(last_day_of_month(d(2028, 2, 10)), d(2028, 2, 29));
    }
}
