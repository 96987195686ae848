//! Timeline filtering and day grouping over a synthetic clinic schedule.

use chrono::{Duration, NaiveDate};
use clinicdesk::records::RawAppointment;
use clinicdesk::schedule::filter::filter_appointments;
use clinicdesk::schedule::{Clock, DateFilter, FixedClock, StatusFilter, TimelineQuery};
use clinicdesk::storage::{group_by_date, Appointment, AppointmentStore};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;

const TYPES: [&str; 3] = ["Therapy: Abhyanga", "Diet Consultation", "General"];

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap_or_default()
}

/// Spreads `count` bookings over the two weeks around today, ten per hour slot.
fn synthetic_schedule(count: usize) -> Vec<Appointment> {
    let rows = (0..count)
        .map(|i| {
            let date = today() + Duration::days(i as i64 % 14 - 3);
            RawAppointment {
                schedule_id: i as i64 + 1,
                patient_id: (i % 500) as i64 + 1,
                patient_name: Some(format!("Patient {}", i)),
                mobile: Some(format!("98{:08}", i)),
                appointment_type: Some(TYPES[i % TYPES.len()].to_string()),
                appointment_date: json!(date.format("%Y-%m-%d").to_string()),
                appointment_start_time: Some(format!("{:02}:{:02}:00", 9 + i % 9, (i * 7) % 60)),
                ..Default::default()
            }
        })
        .collect();

    let clock: Arc<dyn Clock> = Arc::new(FixedClock(today()));
    AppointmentStore::new(clock).load_all(rows)
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");

    for size in [100usize, 1_000, 10_000] {
        let appointments = synthetic_schedule(size);
        group.throughput(Throughput::Elements(size as u64));

        let this_week = TimelineQuery::new(DateFilter::ThisWeek, StatusFilter::All, "");
        group.bench_with_input(BenchmarkId::new("this_week", size), &appointments, |b, list| {
            b.iter(|| filter_appointments(black_box(list), today(), &this_week))
        });

        let search = TimelineQuery::new(DateFilter::All, StatusFilter::All, "diet");
        group.bench_with_input(BenchmarkId::new("search_all", size), &appointments, |b, list| {
            b.iter(|| filter_appointments(black_box(list), today(), &search))
        });
    }

    group.finish();
}

fn bench_group(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_by_date");

    for size in [100usize, 1_000, 10_000] {
        let query = TimelineQuery::new(DateFilter::All, StatusFilter::All, "");
        let filtered = filter_appointments(&synthetic_schedule(size), today(), &query);
        group.throughput(Throughput::Elements(filtered.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &filtered, |b, list| {
            b.iter(|| group_by_date(black_box(list), today()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_filter, bench_group);
criterion_main!(benches);
