// src/services/visit_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::common::clock::Clock;
use crate::common::error::AppError;
use crate::models::plan::PlanStatus;
use crate::models::visit::{NewVisit, Visit};
use crate::store::SharedStore;

/// Visit recording and editing, including the plan-completion handshake: a
/// recorded visit converts the matching pending plan to completed.
#[derive(Clone)]
pub struct VisitService {
    store: SharedStore,
    clock: Arc<dyn Clock>,
}

impl VisitService {
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Records a new visit. At most one visit per customer per calendar day:
    /// when the recording would convert a plan the rejection is
    /// `DailyLimitExceeded` (the plan stays pending, nothing is skipped
    /// silently); a plain ad-hoc duplicate is `DuplicateVisit`.
    ///
    /// Plan matching: an explicit `plan_id` takes precedence; otherwise the
    /// oldest pending plan for (customer, visit date) is completed, if any.
    pub async fn record_visit(
        &self,
        draft: NewVisit,
        plan_id: Option<Uuid>,
    ) -> Result<Visit, AppError> {
        let mut store = self.store.write().await;

        let today = self.clock.today();
        let visit_date = draft.visit_date.unwrap_or(today);

        if store.has_visit_on(draft.customer_id, today) {
            // only a reference that would actually complete a plan counts as a
            // conversion; a stale or unknown id converts nothing
            let converts_a_plan = match plan_id {
                Some(id) => store
                    .plan(id)
                    .is_ok_and(|p| p.status == PlanStatus::Pending),
                None => store
                    .oldest_pending_plan(draft.customer_id, visit_date)
                    .is_some(),
            };
            return Err(if converts_a_plan {
                AppError::DailyLimitExceeded {
                    customer_id: draft.customer_id,
                    date: today,
                }
            } else {
                AppError::DuplicateVisit {
                    customer_id: draft.customer_id,
                    date: today,
                }
            });
        }

        let customer_id = draft.customer_id;
        let visit = store.create_visit(draft)?;

        match plan_id {
            Some(id) => match store.plan(id) {
                Ok(plan) if plan.status == PlanStatus::Pending => {
                    store.complete_plan(id)?;
                }
                Ok(plan) => {
                    tracing::warn!(
                        plan_id = %id,
                        status = %plan.status,
                        "visit referenced a plan that is no longer pending"
                    );
                }
                Err(_) => {
                    tracing::warn!(plan_id = %id, "visit referenced an unknown plan");
                }
            },
            None => {
                if let Some(plan_id) = store
                    .oldest_pending_plan(customer_id, visit_date)
                    .map(|p| p.id)
                {
                    store.complete_plan(plan_id)?;
                }
            }
        }

        Ok(visit)
    }

    /// Full replace-on-edit; identity and original timestamps survive.
    pub async fn edit_visit(&self, id: Uuid, draft: NewVisit) -> Result<Visit, AppError> {
        self.store.write().await.replace_visit(id, draft)
    }

    /// Deletes the visit and any check-in that references it.
    pub async fn delete_visit(&self, id: Uuid) -> Result<(), AppError> {
        let removed_checkins = self.store.write().await.delete_visit(id)?;
        if removed_checkins > 0 {
            tracing::info!(visit_id = %id, removed_checkins, "visit deleted with check-ins");
        }
        Ok(())
    }

    pub async fn visit(&self, id: Uuid) -> Result<Visit, AppError> {
        Ok(self.store.read().await.visit(id)?.clone())
    }

    pub async fn visits_for_customer(&self, customer_id: Uuid) -> Vec<Visit> {
        let store = self.store.read().await;
        let mut visits: Vec<Visit> = store
            .list_visits()
            .iter()
            .filter(|v| v.customer_id == customer_id)
            .cloned()
            .collect();
        // newest first, as the customer detail page shows them
        visits.sort_by(|a, b| b.visit_time.cmp(&a.visit_time));
        visits
    }
}
