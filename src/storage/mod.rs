//! In-memory appointment store
//!
//! Holds the appointments of the current session:
//! - Full replacement on every load from the record source
//! - Local-only status changes until the next load
//! - Today's list and grouping by calendar day

mod appointment;
pub mod persistence;

pub use appointment::{Appointment, AppointmentCategory, AppointmentStatus};
pub use persistence::{JsonFileSource, MemorySource, RecordSource, SourceError};

use crate::records::{AppointmentConverter, RawAppointment};
use crate::schedule::clock::Clock;
use crate::schedule::time::{day_key, day_label, time_to_minutes};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Appointments sharing one calendar day, in their original relative order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateGroup {
    /// Day string form, e.g. `Sun Oct 18 2026`.
    pub key: String,
    pub date: NaiveDate,
    /// `Today`, or a long form such as `Monday, October 19`.
    pub label: String,
    pub appointments: Vec<Appointment>,
}

#[derive(Debug, Default)]
struct StoreState {
    appointments: Vec<Appointment>,
    next_id: i64,
}

pub struct AppointmentStore {
    state: RwLock<StoreState>,
    clock: Arc<dyn Clock>,
}

impl AppointmentStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        AppointmentStore {
            state: RwLock::new(StoreState {
                appointments: Vec::new(),
                next_id: 1,
            }),
            clock,
        }
    }

    /// Replaces the whole collection with the given rows and returns it.
    ///
    /// Rows repeating an id already seen in the batch are dropped.
    pub fn load_all(&self, raw: Vec<RawAppointment>) -> Vec<Appointment> {
        let mut seen = HashSet::with_capacity(raw.len());
        let mut appointments = Vec::with_capacity(raw.len());

        for row in &raw {
            if !seen.insert(row.schedule_id) {
                tracing::warn!(id = row.schedule_id, "skipping duplicate schedule row");
                continue;
            }
            appointments.push(row.to_appointment());
        }

        let next_id = appointments.iter().map(|a| a.id).fold(0, i64::max) + 1;

        let mut state = self.write();
        state.appointments = appointments.clone();
        state.next_id = next_id;
        drop(state);

        tracing::debug!(count = appointments.len(), next_id, "appointments loaded");
        appointments
    }

    pub fn all(&self) -> Vec<Appointment> {
        self.read().appointments.clone()
    }

    pub fn get(&self, id: i64) -> Option<Appointment> {
        self.read().appointments.iter().find(|a| a.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().appointments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One past the highest id seen in the last load. Display bookkeeping only.
    pub fn next_id(&self) -> i64 {
        self.read().next_id
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Appointments dated today, earliest first.
    pub fn get_today(&self) -> Vec<Appointment> {
        let today = self.clock.today();
        let mut todays: Vec<Appointment> = self
            .read()
            .appointments
            .iter()
            .filter(|a| a.date == Some(today))
            .cloned()
            .collect();
        todays.sort_by_key(|a| time_to_minutes(&a.time));
        todays
    }

    /// Sets the status of one appointment in memory. Returns false for an
    /// unknown id.
    pub fn update_status(&self, id: i64, status: AppointmentStatus) -> bool {
        let mut state = self.write();
        match state.appointments.iter_mut().find(|a| a.id == id) {
            Some(appointment) => {
                appointment.status = status;
                true
            }
            None => false,
        }
    }

    /// Days that have at least one appointment.
    pub fn appointment_dates(&self) -> HashSet<NaiveDate> {
        self.read().appointments.iter().filter_map(|a| a.date).collect()
    }

    pub fn group_by_date(&self, list: &[Appointment]) -> Vec<DateGroup> {
        group_by_date(list, self.clock.today())
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Partitions appointments by day. Groups appear in order of first
/// occurrence; appointments without a date are left out.
pub fn group_by_date(list: &[Appointment], today: NaiveDate) -> Vec<DateGroup> {
    let mut groups: Vec<DateGroup> = Vec::new();

    for appointment in list {
        let Some(date) = appointment.date else {
            continue;
        };
        match groups.iter_mut().find(|g| g.date == date) {
            Some(group) => group.appointments.push(appointment.clone()),
            None => groups.push(DateGroup {
                key: day_key(date),
                date,
                label: day_label(date, today),
                appointments: vec![appointment.clone()],
            }),
        }
    }

    groups
}
