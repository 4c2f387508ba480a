// src/services/dashboard_service.rs

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use crate::common::clock::Clock;
use crate::common::error::AppError;
use crate::models::customer::Customer;
use crate::models::visit::{Visit, VisitNotes};
use crate::store::{EntityStore, SharedStore};

/// What happened today, at a glance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodaySummary {
    pub date: NaiveDate,
    pub new_customers: usize,
    pub visits: usize,
    pub checkins: usize,
    /// Photos attached to today's visits and check-ins combined.
    pub photos: usize,
}

/// Activity counts over an inclusive date range, with deltas against the
/// preceding period of the same length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub new_customers: usize,
    pub visits: usize,
    pub checkins: usize,
    pub photos: usize,
    pub growth: ActivityGrowth,
}

/// Count deltas versus the previous period; negative means a decline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityGrowth {
    pub new_customers: i64,
    pub visits: i64,
    pub checkins: i64,
    pub photos: i64,
}

#[derive(Debug, Clone, Copy, Default)]
struct ActivityCounts {
    new_customers: usize,
    visits: usize,
    checkins: usize,
    photos: usize,
}

/// Read-only aggregates for the home screen: today's activity counts, the
/// recent-activity feeds, and the plain-text daily visit report.
#[derive(Clone)]
pub struct DashboardService {
    store: SharedStore,
    clock: Arc<dyn Clock>,
}

impl DashboardService {
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn today_summary(&self) -> TodaySummary {
        let store = self.store.read().await;
        let today = self.clock.today();
        let counts = counts_between(&store, today, today);

        TodaySummary {
            date: today,
            new_customers: counts.new_customers,
            visits: counts.visits,
            checkins: counts.checkins,
            photos: counts.photos,
        }
    }

    /// Activity counts for `start..=end`, plus the change against the period
    /// of the same length ending the day before `start`.
    pub async fn summary_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RangeSummary, AppError> {
        if start > end {
            return Err(AppError::validation("startDate", "after_end_date"));
        }

        let store = self.store.read().await;
        let current = counts_between(&store, start, end);

        let span_days = (end - start).num_days();
        let previous_end = start - Duration::days(1);
        let previous_start = previous_end - Duration::days(span_days);
        let previous = counts_between(&store, previous_start, previous_end);

        let delta = |now: usize, before: usize| now as i64 - before as i64;
        Ok(RangeSummary {
            start,
            end,
            new_customers: current.new_customers,
            visits: current.visits,
            checkins: current.checkins,
            photos: current.photos,
            growth: ActivityGrowth {
                new_customers: delta(current.new_customers, previous.new_customers),
                visits: delta(current.visits, previous.visits),
                checkins: delta(current.checkins, previous.checkins),
                photos: delta(current.photos, previous.photos),
            },
        })
    }

    /// The latest `limit` visits, newest first.
    pub async fn recent_visits(&self, limit: usize) -> Vec<Visit> {
        let store = self.store.read().await;
        let mut visits: Vec<Visit> = store.list_visits().to_vec();
        visits.sort_by(|a, b| b.visit_time.cmp(&a.visit_time));
        visits.truncate(limit);
        visits
    }

    /// The latest `limit` customers, newest first.
    pub async fn recent_customers(&self, limit: usize) -> Vec<Customer> {
        let store = self.store.read().await;
        let mut customers: Vec<Customer> = store.list_customers().to_vec();
        customers.sort_by(|a, b| b.create_time.cmp(&a.create_time));
        customers.truncate(limit);
        customers
    }

    /// Today's visits as shareable plain text, in recording order. Only note
    /// fields with content make it into the report.
    pub async fn today_visit_report(&self) -> String {
        let store = self.store.read().await;
        let today = self.clock.today();

        let visits: Vec<&Visit> = store
            .list_visits()
            .iter()
            .filter(|v| v.visit_time.date_naive() == today)
            .collect();

        let mut report = format!("Visit report {today} ({} visits)\n", visits.len());
        for (index, visit) in visits.iter().enumerate() {
            let name = store
                .customer(visit.customer_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|_| "(deleted customer)".to_owned());
            let _ = write!(
                report,
                "\n{}. {} {}",
                index + 1,
                visit.visit_time.format("%H:%M"),
                name
            );
            if !visit.photos.is_empty() {
                let _ = write!(report, " [{} photos]", visit.photos.len());
            }
            let _ = writeln!(report);
            for (label, text) in filled_notes(&visit.notes) {
                let _ = writeln!(report, "   {label}: {text}");
            }
        }
        report
    }
}

fn counts_between(store: &EntityStore, start: NaiveDate, end: NaiveDate) -> ActivityCounts {
    let in_range = |date: NaiveDate| date >= start && date <= end;
    let mut counts = ActivityCounts::default();

    counts.new_customers = store
        .list_customers()
        .iter()
        .filter(|c| in_range(c.create_time.date_naive()))
        .count();
    for visit in store
        .list_visits()
        .iter()
        .filter(|v| in_range(v.visit_time.date_naive()))
    {
        counts.visits += 1;
        counts.photos += visit.photos.len();
    }
    for checkin in store
        .list_checkins()
        .iter()
        .filter(|c| in_range(c.checkin_time.date_naive()))
    {
        counts.checkins += 1;
        counts.photos += checkin.photos.len();
    }
    counts
}

fn filled_notes(notes: &VisitNotes) -> Vec<(&'static str, &str)> {
    let fields: [(&'static str, &Option<String>); 14] = [
        ("listing", &notes.listing),
        ("development method", &notes.development_method),
        ("order", &notes.order),
        ("problem", &notes.problem),
        ("solution", &notes.solution),
        ("case", &notes.case_notes),
        ("inventory", &notes.inventory),
        ("shipping", &notes.shipping),
        ("foundation", &notes.foundation),
        ("replenishment", &notes.replenishment),
        ("training", &notes.training),
        ("wechat", &notes.wechat),
        ("tools", &notes.tools),
        ("feedback", &notes.feedback),
    ];
    fields
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .filter(|text| !text.trim().is_empty())
                .map(|text| (label, text))
        })
        .collect()
}
