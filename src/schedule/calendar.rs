//! Month grid for picking a day on the timeline.
//!
//! [`month_grid`] is a pure function of the displayed month, today, the
//! selected day and the set of days with appointments. [`CalendarAdapter`]
//! adds the navigation state on top and tells listeners when a day is picked.
//! Neither touches the store beyond reading it.

use crate::schedule::clock::Clock;
use crate::schedule::filter::last_day_of_month;
use crate::storage::AppointmentStore;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// The month a calendar is showing, held as its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCursor(NaiveDate);

impl MonthCursor {
    /// `None` if `month` is outside 1..=12 or the year is out of range.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(MonthCursor)
    }

    pub fn containing(date: NaiveDate) -> Self {
        MonthCursor(date.with_day(1).unwrap_or(date))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    pub fn last_day(&self) -> NaiveDate {
        last_day_of_month(self.0)
    }

    /// Moves by `months`, across year boundaries. Stays put at the edges of
    /// the representable range.
    pub fn shift(self, months: i32) -> Self {
        let index = self.year() * 12 + self.month0() as i32 + months;
        let year = index.div_euclid(12);
        let month = index.rem_euclid(12) as u32 + 1;
        MonthCursor::new(year, month).unwrap_or(self)
    }

    fn month0(&self) -> u32 {
        self.0.month0()
    }
}

impl fmt::Display for MonthCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%B %Y"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub day: u32,
    pub has_appointments: bool,
    /// Past days cannot be selected.
    pub is_past: bool,
    pub is_today: bool,
    pub is_selected: bool,
    /// Event dot; only shown on days that are not past.
    pub show_marker: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub title: String,
    pub weekday_labels: [&'static str; 7],
    /// Empty cells before day 1, counted from Sunday.
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
}

impl MonthGrid {
    /// Rows of seven cells; `None` marks blank cells before the 1st and
    /// after the last day.
    pub fn weeks(&self) -> Vec<Vec<Option<CalendarDay>>> {
        let mut cells: Vec<Option<CalendarDay>> = std::iter::repeat(None)
            .take(self.leading_blanks as usize)
            .chain(self.days.iter().cloned().map(Some))
            .collect();
        while cells.len() % 7 != 0 {
            cells.push(None);
        }
        cells.chunks(7).map(|week| week.to_vec()).collect()
    }

    pub fn day(&self, day: u32) -> Option<&CalendarDay> {
        self.days.get(day.checked_sub(1)? as usize)
    }
}

pub fn month_grid(
    cursor: MonthCursor,
    today: NaiveDate,
    selected: Option<NaiveDate>,
    event_dates: &HashSet<NaiveDate>,
) -> MonthGrid {
    let first = cursor.first_day();
    let day_count = cursor.last_day().day() as usize;

    let days = first
        .iter_days()
        .take(day_count)
        .map(|date| {
            let has_appointments = event_dates.contains(&date);
            let is_past = date < today;
            CalendarDay {
                date,
                day: date.day(),
                has_appointments,
                is_past,
                is_today: date == today,
                is_selected: selected == Some(date),
                show_marker: has_appointments && !is_past,
            }
        })
        .collect();

    MonthGrid {
        year: cursor.year(),
        month: cursor.month(),
        title: cursor.to_string(),
        weekday_labels: WEEKDAY_LABELS,
        leading_blanks: first.weekday().num_days_from_sunday(),
        days,
    }
}

type DateListener = Box<dyn FnMut(NaiveDate) + Send>;

/// Stateful calendar view over the store: a displayed month, a selected
/// day, and listeners notified on selection.
pub struct CalendarAdapter {
    store: Arc<AppointmentStore>,
    clock: Arc<dyn Clock>,
    cursor: MonthCursor,
    selected: Option<NaiveDate>,
    listeners: Vec<DateListener>,
}

impl CalendarAdapter {
    pub fn new(store: Arc<AppointmentStore>, clock: Arc<dyn Clock>) -> Self {
        let cursor = MonthCursor::containing(clock.today());
        CalendarAdapter {
            store,
            clock,
            cursor,
            selected: None,
            listeners: Vec::new(),
        }
    }

    pub fn cursor(&self) -> MonthCursor {
        self.cursor
    }

    pub fn selected(&self) -> Option<NaiveDate> {
        self.selected
    }

    pub fn on_date_selected(&mut self, listener: impl FnMut(NaiveDate) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn render(&self) -> MonthGrid {
        month_grid(
            self.cursor,
            self.clock.today(),
            self.selected,
            &self.store.appointment_dates(),
        )
    }

    /// Picks a day. Past days are ignored and yield `None`; otherwise the
    /// day becomes the selection, the grid moves to its month, listeners are
    /// notified and the new grid is returned.
    pub fn select(&mut self, date: NaiveDate) -> Option<MonthGrid> {
        if date < self.clock.today() {
            return None;
        }

        self.selected = Some(date);
        self.cursor = MonthCursor::containing(date);
        let grid = self.render();
        for listener in self.listeners.iter_mut() {
            listener(date);
        }
        Some(grid)
    }

    pub fn clear_selection(&mut self) -> MonthGrid {
        self.selected = None;
        self.render()
    }

    pub fn previous_month(&mut self) -> MonthGrid {
        self.cursor = self.cursor.shift(-1);
        self.render()
    }

    pub fn next_month(&mut self) -> MonthGrid {
        self.cursor = self.cursor.shift(1);
        self.render()
    }
}
