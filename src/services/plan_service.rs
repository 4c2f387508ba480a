// src/services/plan_service.rs

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::common::clock::Clock;
use crate::common::error::AppError;
use crate::models::plan::{NewPlan, VisitPlan};
use crate::store::SharedStore;

/// VisitPlan lifecycle: creation with the duplicate check, the nearby drop-in
/// flow, and the pending -> completed / cancelled transitions. Completion via
/// a recorded visit lives in `VisitService`.
#[derive(Clone)]
pub struct PlanService {
    store: SharedStore,
    clock: Arc<dyn Clock>,
}

impl PlanService {
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create_plan(&self, draft: NewPlan) -> Result<VisitPlan, AppError> {
        self.store.write().await.create_plan(draft)
    }

    /// Adds a drop-in plan for today from the nearby-discovery flow. The
    /// remark records how far away the customer was at the time.
    pub async fn add_drop_in(
        &self,
        customer_id: Uuid,
        distance_km: f64,
    ) -> Result<VisitPlan, AppError> {
        let remark = format!("Drop-in visit ({distance_km:.1} km away)");
        let plan = self
            .store
            .write()
            .await
            .create_drop_in_plan(customer_id, Some(remark))?;
        tracing::info!(plan_id = %plan.id, customer_id = %customer_id, "drop-in plan added");
        Ok(plan)
    }

    pub async fn complete_plan(&self, id: Uuid) -> Result<VisitPlan, AppError> {
        self.store.write().await.complete_plan(id)
    }

    pub async fn cancel_plan(&self, id: Uuid) -> Result<VisitPlan, AppError> {
        self.store.write().await.cancel_plan(id)
    }

    pub async fn delete_plan(&self, id: Uuid) -> Result<(), AppError> {
        self.store.write().await.delete_plan(id)
    }

    pub async fn plan(&self, id: Uuid) -> Result<VisitPlan, AppError> {
        Ok(self.store.read().await.plan(id)?.clone())
    }

    pub async fn plans_on(&self, date: NaiveDate) -> Vec<VisitPlan> {
        self.store
            .read()
            .await
            .list_plans()
            .iter()
            .filter(|p| p.plan_date == date)
            .cloned()
            .collect()
    }

    /// All plans ordered by (date, slot); unslotted drop-ins sort first within
    /// their day.
    pub async fn list_plans(&self) -> Vec<VisitPlan> {
        let mut plans: Vec<VisitPlan> = self.store.read().await.list_plans().to_vec();
        plans.sort_by_key(|p| (p.plan_date, p.plan_time));
        plans
    }

    pub async fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone, Utc};

    use crate::common::clock::FixedClock;
    use crate::models::customer::NewCustomer;
    use crate::models::plan::{PlanPriority, PlanStatus};
    use crate::store::{EntityStore, MemoryBlobStore};

    async fn service_with_customer() -> (PlanService, Uuid) {
        let clock = Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap(),
        ));
        let store = EntityStore::load(Arc::new(MemoryBlobStore::new()), clock.clone())
            .unwrap()
            .into_shared();
        let customer = store
            .write()
            .await
            .create_customer(NewCustomer {
                name: "Wang Wu Lighting".to_owned(),
                ..Default::default()
            })
            .unwrap();
        (PlanService::new(store, clock), customer.id)
    }

    fn draft(customer_id: Uuid, date: NaiveDate, hour: u32) -> NewPlan {
        NewPlan {
            customer_id,
            plan_date: date,
            plan_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            priority: PlanPriority::Normal,
            remark: None,
        }
    }

    #[tokio::test]
    async fn cancel_then_complete_is_rejected() {
        let (service, customer_id) = service_with_customer().await;
        let date = NaiveDate::from_ymd_opt(2024, 5, 11).unwrap();
        let plan = service.create_plan(draft(customer_id, date, 9)).await.unwrap();

        service.cancel_plan(plan.id).await.unwrap();
        let err = service.complete_plan(plan.id).await.unwrap_err();
        assert!(matches!(err, AppError::PlanClosed { .. }));
    }

    #[tokio::test]
    async fn completion_stamps_completed_time() {
        let (service, customer_id) = service_with_customer().await;
        let date = NaiveDate::from_ymd_opt(2024, 5, 11).unwrap();
        let plan = service.create_plan(draft(customer_id, date, 9)).await.unwrap();

        let done = service.complete_plan(plan.id).await.unwrap();
        assert_eq!(done.status, PlanStatus::Completed);
        assert!(done.completed_time.is_some());
    }

    #[tokio::test]
    async fn drop_in_carries_distance_remark_and_no_slot() {
        let (service, customer_id) = service_with_customer().await;
        let plan = service.add_drop_in(customer_id, 1.27).await.unwrap();

        assert!(plan.drop_in);
        assert_eq!(plan.plan_time, None);
        assert_eq!(plan.plan_date, service.today().await);
        assert_eq!(plan.remark.as_deref(), Some("Drop-in visit (1.3 km away)"));
    }

    #[tokio::test]
    async fn second_drop_in_same_day_is_rejected() {
        let (service, customer_id) = service_with_customer().await;
        service.add_drop_in(customer_id, 0.5).await.unwrap();
        let err = service.add_drop_in(customer_id, 0.5).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicatePlan { .. }));
    }
}
