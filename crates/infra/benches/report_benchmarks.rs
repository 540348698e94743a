use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::{Duration, TimeZone, Utc};
use eventhub_core::{
    Attendee, AttendeeId, Event, EventId, EventRating, OrderSpec, PageRequest, Period, RatingId,
    RatingValue, SortDirection,
};
use eventhub_infra::{InMemoryStore, ReportService};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Store with `event_count` events, each carrying a few attendees and ratings.
fn seeded_store(event_count: usize) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    let base = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();

    for i in 0..event_count {
        let created = base + Duration::hours(i as i64);
        let event = Event {
            id: EventId::new(),
            name: format!("Event {i}"),
            date: created + Duration::days(30),
            place: "Hall".into(),
            description: String::new(),
            image_url: None,
            created_at: created,
            updated_at: created,
        };
        store.seed_event(event.clone()).unwrap();

        for a in 0..(i % 5) {
            store
                .seed_attendee(Attendee {
                    id: AttendeeId::new(),
                    event_id: event.id,
                    name: format!("Guest {a}"),
                    email: None,
                    phone: None,
                    created_at: created,
                })
                .unwrap();
        }
        for r in 0..(i % 4) {
            store
                .seed_event_rating(EventRating {
                    id: RatingId::new(),
                    event_id: event.id,
                    rating: RatingValue::new(((i + r) % 5 + 1) as i64).unwrap(),
                    created_at: created,
                })
                .unwrap();
        }
    }
    store
}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread().build().unwrap()
}

fn bench_events_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("events_report");
    let rt = runtime();

    for event_count in [10, 100, 1000].iter() {
        let service = ReportService::new(seeded_store(*event_count));
        group.throughput(Throughput::Elements(*event_count as u64));

        for (label, order) in [
            ("date", OrderSpec::ByDate(SortDirection::Desc)),
            ("rating", OrderSpec::ByRatingMean(SortDirection::Desc)),
            ("attendees", OrderSpec::ByAttendeeCount(SortDirection::Desc)),
        ] {
            group.bench_with_input(
                BenchmarkId::new(label, event_count),
                event_count,
                |b, _| {
                    b.iter(|| {
                        let report = rt
                            .block_on(service.events_report(order, PageRequest::new(10, 0)))
                            .unwrap();
                        black_box(report);
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("summary_report");
    let rt = runtime();
    let service = ReportService::new(seeded_store(1000));
    let since = Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap();
    let generated = Utc::now();

    group.bench_function("month_1000_events", |b| {
        b.iter(|| {
            let summary = rt
                .block_on(service.summary_since(Period::Month, Some(since), generated))
                .unwrap();
            black_box(summary);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_events_report, bench_summary);
criterion_main!(benches);
