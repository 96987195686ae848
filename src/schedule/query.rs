use std::sync::Arc;
use chrono::NaiveDate;
use crate::records::{self, AppointmentChanges, NewAppointment, RecordError};
use crate::schedule::calendar::{month_grid, MonthCursor, MonthGrid};
use crate::schedule::clock::Clock;
use crate::schedule::filter::{filter_appointments, TimelineQuery};
use crate::storage::{Appointment, AppointmentStatus, AppointmentStore, DateGroup, RecordSource, SourceError};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Records(#[from] RecordError),
    #[error("invalid calendar month: {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },
    #[error("background task failed: {0}")]
    Task(String),
}

/// The scheduling context handed to every consumer.
///
/// Reads come from the in-memory store. Mutations go to the record source,
/// and the store is then reloaded from it in full.
pub struct QueryEngine {
    store: Arc<AppointmentStore>,
    source: Arc<dyn RecordSource>,
    clock: Arc<dyn Clock>,
}

impl QueryEngine {
    pub fn new(store: Arc<AppointmentStore>, source: Arc<dyn RecordSource>, clock: Arc<dyn Clock>) -> Self {
        QueryEngine { store, source, clock }
    }

    pub fn store(&self) -> &Arc<AppointmentStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn today_date(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Fetches every row from the source and replaces the store's contents.
    /// Returns the number of appointments loaded.
    pub async fn reload(&self) -> Result<usize, QueryError> {
        let rows = self.blocking(|source| source.fetch_all()).await?;
        let raw = records::parse_rows(rows)?;
        let loaded = self.store.load_all(raw);
        tracing::info!(count = loaded.len(), "appointments reloaded");
        Ok(loaded.len())
    }

    pub fn all(&self) -> Vec<Appointment> {
        self.store.all()
    }

    pub fn get(&self, id: i64) -> Option<Appointment> {
        self.store.get(id)
    }

    /// The store's list, optionally narrowed to one day and one status.
    /// Unlike the timeline, past days are kept.
    pub fn list(&self, date: Option<NaiveDate>, status: Option<&AppointmentStatus>) -> Vec<Appointment> {
        self.store
            .all()
            .into_iter()
            .filter(|a| date.map_or(true, |day| a.date == Some(day)))
            .filter(|a| status.map_or(true, |s| &a.status == s))
            .collect()
    }

    pub fn today(&self) -> Vec<Appointment> {
        self.store.get_today()
    }

    pub fn filter(&self, query: &TimelineQuery) -> Vec<Appointment> {
        filter_appointments(&self.store.all(), self.clock.today(), query)
    }

    /// Filtered appointments grouped by day, for the timeline.
    pub fn timeline(&self, query: &TimelineQuery) -> Vec<DateGroup> {
        self.store.group_by_date(&self.filter(query))
    }

    pub fn calendar(&self, year: i32, month: u32, selected: Option<NaiveDate>) -> Result<MonthGrid, QueryError> {
        let cursor = MonthCursor::new(year, month)
            .ok_or(QueryError::InvalidMonth { year, month })?;
        Ok(month_grid(cursor, self.clock.today(), selected, &self.store.appointment_dates()))
    }

    pub fn current_month(&self, selected: Option<NaiveDate>) -> MonthGrid {
        let cursor = MonthCursor::containing(self.clock.today());
        month_grid(cursor, self.clock.today(), selected, &self.store.appointment_dates())
    }

    /// Books an appointment at the source and reloads. Returns the new
    /// schedule id.
    pub async fn create(&self, booking: NewAppointment) -> Result<i64, QueryError> {
        let payload = booking.to_payload()?;
        let id = self.blocking(move |source| source.create(&payload)).await?;
        tracing::info!(id, "appointment created");
        self.refresh_after_write(id).await;
        Ok(id)
    }

    pub async fn update(&self, id: i64, changes: AppointmentChanges) -> Result<(), QueryError> {
        let wire = changes.to_wire()?;
        self.blocking(move |source| source.update(id, &wire)).await?;
        tracing::info!(id, "appointment updated");
        self.refresh_after_write(id).await;
        Ok(())
    }

    pub async fn cancel(&self, id: i64) -> Result<(), QueryError> {
        self.blocking(move |source| source.cancel(id)).await?;
        tracing::info!(id, "appointment cancelled");
        self.refresh_after_write(id).await;
        Ok(())
    }

    /// In-memory only; the next reload restores the source's status.
    pub fn update_status(&self, id: i64, status: AppointmentStatus) -> bool {
        self.store.update_status(id, status)
    }

    /// A write that reached the source stands even when the reload after it
    /// fails; the store then stays stale until the next successful reload.
    async fn refresh_after_write(&self, id: i64) {
        if let Err(e) = self.reload().await {
            tracing::error!(id, error = %e, "reload after write failed");
        }
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, QueryError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn RecordSource) -> Result<T, SourceError> + Send + 'static,
    {
        let source = Arc::clone(&self.source);
        tokio::task::spawn_blocking(move || op(source.as_ref()))
            .await
            .map_err(|e| QueryError::Task(e.to_string()))?
            .map_err(QueryError::from)
    }
}
