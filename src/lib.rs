//! clinicdesk: appointment scheduling for a small clinic
//!
//! The store holds the session's appointments as loaded from the record
//! source. Today's list, the filtered timeline and the month calendar are
//! derived from it on demand. Bookings, edits and cancellations go to the
//! source first, and the store is then reloaded from it.

pub mod api;
pub mod config;
pub mod error;
pub mod records;
pub mod schedule;
pub mod storage;

pub use error::{ClinicError, ClinicResult};
pub use records::{AppointmentChanges, NewAppointment, RawAppointment};
pub use schedule::{
    CalendarAdapter, Clock, DateFilter, QueryEngine, StatusFilter, SystemClock, TimelineQuery,
};
pub use storage::{Appointment, AppointmentStatus, AppointmentStore, DateGroup};
