// src/services/checkin_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::common::error::AppError;
use crate::location::LocationProvider;
use crate::models::checkin::{Checkin, NewCheckin};
use crate::store::SharedStore;

/// Check-in submission. A check-in is only written after a successful location
/// fix and with at least one photo attached; a failed fix propagates without
/// touching the store, so a torn-down session leaves nothing behind.
#[derive(Clone)]
pub struct CheckinService {
    store: SharedStore,
    location: Arc<dyn LocationProvider>,
}

impl CheckinService {
    pub fn new(store: SharedStore, location: Arc<dyn LocationProvider>) -> Self {
        Self { store, location }
    }

    pub async fn submit(&self, draft: NewCheckin) -> Result<Checkin, AppError> {
        // suspend for the fix before taking the store lock; nothing is
        // persisted until the fix resolves
        let fix = self.location.current_position().await?;

        let checkin = self.store.write().await.create_checkin(draft, fix)?;
        tracing::info!(
            checkin_id = %checkin.id,
            customer_id = %checkin.customer_id,
            "check-in submitted"
        );
        Ok(checkin)
    }

    pub async fn checkins_for_customer(&self, customer_id: Uuid) -> Vec<Checkin> {
        let store = self.store.read().await;
        let mut checkins: Vec<Checkin> = store
            .list_checkins()
            .iter()
            .filter(|c| c.customer_id == customer_id)
            .cloned()
            .collect();
        checkins.sort_by(|a, b| b.checkin_time.cmp(&a.checkin_time));
        checkins
    }
}
