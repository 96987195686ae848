use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::records::{RawAppointment, ScheduleChanges, SchedulePayload};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("schedule file I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("schedule file is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("schedule {0} not found")]
    NotFound(i64),
    #[error("schedule rejected: {0}")]
    Rejected(String),
}

/// The system of record for schedule rows.
///
/// Listings come back untyped, the way an HTTP backend would return them;
/// the caller validates them before they reach the store.
pub trait RecordSource: Send + Sync {
    /// Every row that has not been cancelled.
    fn fetch_all(&self) -> Result<Vec<Value>, SourceError>;
    /// Inserts a row and returns its schedule id.
    fn create(&self, payload: &SchedulePayload) -> Result<i64, SourceError>;
    /// Applies the fields present in `changes`.
    fn update(&self, id: i64, changes: &ScheduleChanges) -> Result<(), SourceError>;
    /// Soft-cancels a row, hiding it from later listings.
    fn cancel(&self, id: i64) -> Result<(), SourceError>;
}

/// A stored schedule row: the listed fields plus the cancellation flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleRow {
    #[serde(flatten)]
    pub record: RawAppointment,
    #[serde(rename = "IsCancelled", default)]
    pub is_cancelled: bool,
}

/// Row operations shared by the in-memory and file-backed sources.
#[derive(Debug, Default)]
struct ScheduleTable {
    rows: Vec<ScheduleRow>,
}

impl ScheduleTable {
    fn listing(&self) -> Result<Vec<Value>, SourceError> {
        let mut active: Vec<&RawAppointment> = self
            .rows
            .iter()
            .filter(|row| !row.is_cancelled)
            .map(|row| &row.record)
            .collect();

        // Newest day first, earliest slot first within a day.
        active.sort_by(|a, b| {
            let day_a = a.appointment_date.as_str().unwrap_or_default();
            let day_b = b.appointment_date.as_str().unwrap_or_default();
            day_b.cmp(day_a).then_with(|| {
                a.appointment_start_time.cmp(&b.appointment_start_time)
            })
        });

        active
            .into_iter()
            .map(|record| serde_json::to_value(record).map_err(SourceError::from))
            .collect()
    }

    fn create(&mut self, payload: &SchedulePayload) -> Result<i64, SourceError> {
        if payload.patient_id <= 0 {
            return Err(SourceError::Rejected("valid PatientID is required".to_string()));
        }
        for (field, value) in [
            ("Mobile", &payload.mobile),
            ("AppointmentDate", &payload.appointment_date),
            ("AppointmentStartTime", &payload.appointment_start_time),
            ("AppointmentType", &payload.appointment_type),
        ] {
            if value.trim().is_empty() {
                return Err(SourceError::Rejected(format!("{} is required", field)));
            }
        }

        let id = self.rows.iter().map(|r| r.record.schedule_id).fold(0, i64::max) + 1;
        self.rows.push(ScheduleRow {
            record: RawAppointment {
                schedule_id: id,
                patient_id: payload.patient_id,
                patient_name: Some(payload.patient_name.clone()),
                mobile: Some(payload.mobile.clone()),
                appointment_type: Some(payload.appointment_type.clone()),
                appointment_date: Value::String(payload.appointment_date.clone()),
                appointment_start_time: Some(payload.appointment_start_time.clone()),
                appointment_end_time: payload.appointment_end_time.clone(),
                appointment_status: Some("Scheduled".to_string()),
                constitution_type: Some(payload.constitution_type.clone()),
                note: payload.note.clone(),
            },
            is_cancelled: false,
        });
        Ok(id)
    }

    fn update(&mut self, id: i64, changes: &ScheduleChanges) -> Result<(), SourceError> {
        let row = self.row_mut(id)?;
        if let Some(date) = &changes.appointment_date {
            row.record.appointment_date = Value::String(date.clone());
        }
        if let Some(time) = &changes.appointment_start_time {
            row.record.appointment_start_time = Some(time.clone());
        }
        if let Some(status) = &changes.appointment_status {
            row.record.appointment_status = Some(status.clone());
        }
        if let Some(note) = &changes.note {
            row.record.note = Some(note.clone());
        }
        Ok(())
    }

    fn cancel(&mut self, id: i64) -> Result<(), SourceError> {
        let row = self.row_mut(id)?;
        row.is_cancelled = true;
        row.record.appointment_status = Some("Cancelled".to_string());
        Ok(())
    }

    /// Cancelled rows stay addressable; they are only hidden from listings.
    fn row_mut(&mut self, id: i64) -> Result<&mut ScheduleRow, SourceError> {
        self.rows
            .iter_mut()
            .find(|r| r.record.schedule_id == id)
            .ok_or(SourceError::NotFound(id))
    }
}

/// Source that keeps its rows in memory for the life of the process.
#[derive(Debug, Default)]
pub struct MemorySource {
    table: Mutex<ScheduleTable>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<RawAppointment>) -> Self {
        let rows = rows
            .into_iter()
            .map(|record| ScheduleRow { record, is_cancelled: false })
            .collect();
        MemorySource {
            table: Mutex::new(ScheduleTable { rows }),
        }
    }

    fn with_table<T>(&self, op: impl FnOnce(&mut ScheduleTable) -> T) -> T {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        op(&mut table)
    }
}

impl RecordSource for MemorySource {
    fn fetch_all(&self) -> Result<Vec<Value>, SourceError> {
        self.with_table(|table| table.listing())
    }

    fn create(&self, payload: &SchedulePayload) -> Result<i64, SourceError> {
        self.with_table(|table| table.create(payload))
    }

    fn update(&self, id: i64, changes: &ScheduleChanges) -> Result<(), SourceError> {
        self.with_table(|table| table.update(id, changes))
    }

    fn cancel(&self, id: i64) -> Result<(), SourceError> {
        self.with_table(|table| table.cancel(id))
    }
}

/// Source backed by a JSON array of rows on disk.
///
/// The file is re-read on every call so edits made outside the process show
/// up on the next reload. Writes go through a synced temporary file that is
/// renamed over the previous file.
#[derive(Debug)]
pub struct JsonFileSource {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Create the parent directory if it doesn't exist
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        Ok(JsonFileSource {
            path,
            lock: Mutex::new(()),
        })
    }

    fn load_table(&self) -> Result<ScheduleTable, SourceError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ScheduleTable::default()),
            Err(e) => return Err(SourceError::Io(e)),
        };
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(ScheduleTable::default());
        }
        let rows: Vec<ScheduleRow> = serde_json::from_slice(&bytes)?;
        Ok(ScheduleTable { rows })
    }

    fn save_table(&self, table: &ScheduleTable) -> Result<(), SourceError> {
        let serialized = serde_json::to_vec_pretty(&table.rows)?;

        // Write to a temporary file first
        let temp_path = self.path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(&serialized)?;

        // Ensure data is flushed to disk
        file.sync_all()?;

        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    fn modify<T>(
        &self,
        op: impl FnOnce(&mut ScheduleTable) -> Result<T, SourceError>,
    ) -> Result<T, SourceError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut table = self.load_table()?;
        let result = op(&mut table)?;
        self.save_table(&table)?;
        Ok(result)
    }
}

impl RecordSource for JsonFileSource {
    fn fetch_all(&self) -> Result<Vec<Value>, SourceError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load_table()?.listing()
    }

    fn create(&self, payload: &SchedulePayload) -> Result<i64, SourceError> {
        self.modify(|table| table.create(payload))
    }

    fn update(&self, id: i64, changes: &ScheduleChanges) -> Result<(), SourceError> {
        self.modify(|table| table.update(id, changes))
    }

    fn cancel(&self, id: i64) -> Result<(), SourceError> {
        self.modify(|table| table.cancel(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::parse_rows;
    use serde_json::json;
    use tempfile::TempDir;

    fn payload(date: &str, time: &str) -> SchedulePayload {
        SchedulePayload {
            patient_id: 7,
            patient_name: "Lata Iyer".to_string(),
            mobile: "9811122233".to_string(),
            appointment_date: date.to_string(),
            appointment_start_time: time.to_string(),
            appointment_end_time: None,
            appointment_type: "General".to_string(),
            constitution_type: "Vata".to_string(),
            note: None,
        }
    }

    #[test]
    fn test_memory_source_lifecycle() {
        let source = MemorySource::new();
        let first = source.create(&payload("2026-10-20", "10:00:00")).unwrap();
        let second = source.create(&payload("2026-10-21", "09:00:00")).unwrap();
        assert_eq!((first, second), (1, 2));

        let listed = parse_rows(source.fetch_all().unwrap()).unwrap();
        assert_eq!(listed.iter().map(|r| r.schedule_id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(listed[0].appointment_status.as_deref(), Some("Scheduled"));

        source.cancel(2).unwrap();
        let listed = parse_rows(source.fetch_all().unwrap()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].schedule_id, 1);

        // Repeated cancels and edits of a cancelled row still succeed.
        source.cancel(2).unwrap();
        let changes = ScheduleChanges {
            note: Some("called back".to_string()),
            ..Default::default()
        };
        source.update(2, &changes).unwrap();
        assert_eq!(parse_rows(source.fetch_all().unwrap()).unwrap().len(), 1);
    }

    #[test]
    fn test_update_only_touches_present_fields() {
        let source = MemorySource::new();
        let id = source.create(&payload("2026-10-20", "10:00:00")).unwrap();

        let changes = ScheduleChanges {
            appointment_start_time: Some("11:30:00".to_string()),
            ..Default::default()
        };
        source.update(id, &changes).unwrap();

        let row = &parse_rows(source.fetch_all().unwrap()).unwrap()[0];
        assert_eq!(row.appointment_start_time.as_deref(), Some("11:30:00"));
        assert_eq!(row.appointment_date, json!("2026-10-20"));
        assert_eq!(row.appointment_status.as_deref(), Some("Scheduled"));
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let source = MemorySource::new();
        assert!(matches!(source.cancel(3), Err(SourceError::NotFound(3))));
        assert!(matches!(
            source.update(3, &ScheduleChanges::default()),
            Err(SourceError::NotFound(3))
        ));
    }

    #[test]
    fn test_create_rejects_incomplete_payload() {
        let source = MemorySource::new();
        let mut bad = payload("2026-10-20", "10:00:00");
        bad.mobile.clear();
        assert!(matches!(source.create(&bad), Err(SourceError::Rejected(_))));

        bad = payload("2026-10-20", "10:00:00");
        bad.patient_id = 0;
        assert!(matches!(source.create(&bad), Err(SourceError::Rejected(_))));
    }

    #[test]
    fn test_json_file_source_persists_mutations() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("schedule.json");
        let source = JsonFileSource::new(&path).unwrap();

        assert!(source.fetch_all().unwrap().is_empty());

        let id = source.create(&payload("2026-10-22", "15:00:00")).unwrap();
        let on_disk: Vec<Value> = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk[0]["ScheduleID"], id);
        assert_eq!(on_disk[0]["IsCancelled"], false);

        let reopened = JsonFileSource::new(&path).unwrap();
        assert_eq!(reopened.fetch_all().unwrap().len(), 1);

        reopened.cancel(id).unwrap();
        assert!(source.fetch_all().unwrap().is_empty());
        let on_disk: Vec<Value> = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk[0]["AppointmentStatus"], "Cancelled");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_json_file_source_reports_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schedule.json");
        fs::write(&path, b"{ not json").unwrap();

        let source = JsonFileSource::new(&path).unwrap();
        assert!(matches!(source.fetch_all(), Err(SourceError::Serialization(_))));
    }
}
