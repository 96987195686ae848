//! Scheduling rules
//!
//! Everything derived from the appointment store:
//! - Time and date normalization between wire and display forms
//! - Today / week / month filtering and timeline grouping
//! - The month calendar and day selection

pub mod calendar;
pub mod clock;
pub mod filter;
pub mod query;
pub mod time;

pub use calendar::{CalendarAdapter, CalendarDay, MonthCursor, MonthGrid};
pub use clock::{Clock, FixedClock, SystemClock};
pub use filter::{DateFilter, StatusFilter, TimelineQuery};
pub use query::{QueryEngine, QueryError};
