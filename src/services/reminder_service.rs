// src/services/reminder_service.rs

use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use crate::common::clock::Clock;
use crate::common::error::AppError;
use crate::config::Settings;
use crate::store::{BlobStore, SharedStore};

/// A customer's revisit countdown. `countdown_days == 0` means overdue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisitCountdown {
    pub customer_id: Uuid,
    pub customer_name: String,
    pub countdown_days: i64,
}

/// Revisit reminders: each customer should be seen again within the revisit
/// interval of their last visit (or of their creation, if never visited).
/// Read-only over entity data; the only state it keeps is the per-day
/// acknowledged set, so a reminder is not re-surfaced twice in one day.
#[derive(Clone)]
pub struct ReminderService {
    store: SharedStore,
    blob: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    settings: Arc<Settings>,
}

impl ReminderService {
    pub fn new(
        store: SharedStore,
        blob: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            store,
            blob,
            clock,
            settings,
        }
    }

    /// Countdown for every customer, in store order.
    pub async fn countdowns(&self) -> Vec<RevisitCountdown> {
        let store = self.store.read().await;
        let today = self.clock.today();

        store
            .list_customers()
            .iter()
            .map(|customer| {
                // basis: most recent visit, else the customer's creation
                let basis = store
                    .list_visits()
                    .iter()
                    .filter(|v| v.customer_id == customer.id)
                    .map(|v| v.visit_time)
                    .max()
                    .unwrap_or(customer.create_time)
                    .date_naive();

                let next_due = basis + Duration::days(self.settings.revisit_interval_days);
                let countdown_days = (next_due - today).num_days().max(0);

                RevisitCountdown {
                    customer_id: customer.id,
                    customer_name: customer.name.clone(),
                    countdown_days,
                }
            })
            .collect()
    }

    /// Customers inside the due-soon window (`0 < countdown <= window`) that
    /// have not been acknowledged today.
    pub async fn due_soon(&self) -> Result<Vec<RevisitCountdown>, AppError> {
        let acknowledged = self.acknowledged_today()?;
        let window = self.settings.due_soon_window_days;

        Ok(self
            .countdowns()
            .await
            .into_iter()
            .filter(|c| c.countdown_days > 0 && c.countdown_days <= window)
            .filter(|c| !acknowledged.contains(&c.customer_id))
            .collect())
    }

    /// Marks customers as reminded for the rest of the day.
    pub async fn acknowledge(&self, customer_ids: &[Uuid]) -> Result<(), AppError> {
        let mut acknowledged = self.acknowledged_today()?;
        acknowledged.extend(customer_ids.iter().copied());
        let payload = serde_json::to_string(&acknowledged)?;
        self.blob.set(&self.ack_key(), payload);
        Ok(())
    }

    fn acknowledged_today(&self) -> Result<Vec<Uuid>, AppError> {
        match self.blob.get(&self.ack_key()) {
            Some(payload) => Ok(serde_json::from_str(&payload)?),
            None => Ok(Vec::new()),
        }
    }

    fn ack_key(&self) -> String {
        format!("visit_reminder_{}", self.clock.today())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::common::clock::FixedClock;
    use crate::models::customer::NewCustomer;
    use crate::models::visit::NewVisit;
    use crate::store::{EntityStore, MemoryBlobStore};

    struct Fixture {
        service: ReminderService,
        store: SharedStore,
    }

    /// Clock pinned to 2024-05-10; customers are backdated through the store's
    /// own create path by loading pre-written blobs where needed.
    fn fixture() -> Fixture {
        let clock = Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap(),
        ));
        let blob: Arc<MemoryBlobStore> = Arc::new(MemoryBlobStore::new());
        let store = EntityStore::load(blob.clone(), clock.clone())
            .unwrap()
            .into_shared();
        let service = ReminderService::new(
            store.clone(),
            blob,
            clock,
            Arc::new(Settings::default()),
        );
        Fixture { service, store }
    }

    async fn customer_created_days_ago(fixture: &Fixture, name: &str, days: i64) -> Uuid {
        let mut guard = fixture.store.write().await;
        let customer = guard
            .create_customer(NewCustomer {
                name: name.to_owned(),
                ..Default::default()
            })
            .unwrap();
        guard.backdate_customer_for_tests(customer.id, Duration::days(days));
        customer.id
    }

    #[tokio::test]
    async fn unvisited_customer_35_days_old_is_overdue_clamped_to_zero() {
        let fixture = fixture();
        let id = customer_created_days_ago(&fixture, "Stale Co", 35).await;

        let countdowns = fixture.service.countdowns().await;
        let entry = countdowns.iter().find(|c| c.customer_id == id).unwrap();
        assert_eq!(entry.countdown_days, 0);
    }

    #[tokio::test]
    async fn countdown_counts_from_the_last_visit() {
        let fixture = fixture();
        let id = customer_created_days_ago(&fixture, "Visited Co", 60).await;
        fixture
            .store
            .write()
            .await
            .create_visit(NewVisit {
                customer_id: id,
                visit_date: None,
                notes: Default::default(),
                photos: vec![],
                custom_fields: vec![],
            })
            .unwrap();

        // visited today: the full interval remains
        let countdowns = fixture.service.countdowns().await;
        let entry = countdowns.iter().find(|c| c.customer_id == id).unwrap();
        assert_eq!(entry.countdown_days, 30);
    }

    #[tokio::test]
    async fn due_soon_matches_the_window_only() {
        let fixture = fixture();
        let due = customer_created_days_ago(&fixture, "Due Co", 27).await; // countdown 3
        customer_created_days_ago(&fixture, "Fresh Co", 1).await; // countdown 29
        customer_created_days_ago(&fixture, "Overdue Co", 40).await; // countdown 0

        let due_soon = fixture.service.due_soon().await.unwrap();
        let ids: Vec<Uuid> = due_soon.iter().map(|c| c.customer_id).collect();
        assert_eq!(ids, vec![due]);
        assert_eq!(due_soon[0].countdown_days, 3);
    }

    #[tokio::test]
    async fn acknowledged_customers_are_not_resurfaced_today() {
        let fixture = fixture();
        let id = customer_created_days_ago(&fixture, "Ack Co", 27).await;

        assert_eq!(fixture.service.due_soon().await.unwrap().len(), 1);
        fixture.service.acknowledge(&[id]).await.unwrap();
        assert!(fixture.service.due_soon().await.unwrap().is_empty());
    }
}
