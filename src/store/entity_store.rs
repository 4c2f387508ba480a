// src/store/entity_store.rs

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use uuid::Uuid;
use validator::Validate;

use crate::common::clock::Clock;
use crate::common::error::AppError;
use crate::geo::GeoPoint;
use crate::models::checkin::{Checkin, NewCheckin};
use crate::models::customer::{Customer, CustomerPatch, NewCustomer};
use crate::models::plan::{NewPlan, PlanStatus, VisitPlan, is_schedulable_slot};
use crate::models::visit::{NewVisit, Visit};
use crate::store::blob::BlobStore;

/// Handle the services share. One logical actor mutates at a time; the lock is
/// never held across the location suspension point.
pub type SharedStore = Arc<RwLock<EntityStore>>;

const CUSTOMERS_KEY: &str = "customers";
const VISITS_KEY: &str = "visits";
const CHECKINS_KEY: &str = "checkins";
const VISIT_PLANS_KEY: &str = "visitPlans";

/// What a customer cascade removed, for logging and callers that confirm the
/// blast radius.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub visits: usize,
    pub checkins: usize,
    pub plans: usize,
}

/// The single authoritative owner of all four entity collections. Every
/// cross-entity relationship is a `customer_id` / `visit_id` lookup, never an
/// embedded object, and every mutation goes through the methods here.
/// Collections keep insertion order.
pub struct EntityStore {
    customers: Vec<Customer>,
    visits: Vec<Visit>,
    checkins: Vec<Checkin>,
    plans: Vec<VisitPlan>,

    blob: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
}

impl EntityStore {
    /// Loads all four collections from the blob store. Missing keys start as
    /// empty collections.
    pub fn load(blob: Arc<dyn BlobStore>, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        let customers = read_collection(blob.as_ref(), CUSTOMERS_KEY)?;
        let visits = read_collection(blob.as_ref(), VISITS_KEY)?;
        let checkins = read_collection(blob.as_ref(), CHECKINS_KEY)?;
        let plans = read_collection(blob.as_ref(), VISIT_PLANS_KEY)?;

        let store = Self {
            customers,
            visits,
            checkins,
            plans,
            blob,
            clock,
        };
        tracing::info!(
            customers = store.customers.len(),
            visits = store.visits.len(),
            checkins = store.checkins.len(),
            plans = store.plans.len(),
            "entity store loaded"
        );
        Ok(store)
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    // =========================================================================
    //  CUSTOMERS
    // =========================================================================

    pub fn create_customer(&mut self, draft: NewCustomer) -> Result<Customer, AppError> {
        draft.validate()?;
        validate_optional_coordinate(draft.latitude, draft.longitude)?;

        let now = self.clock.now();
        let customer = Customer {
            id: Uuid::new_v4(),
            name: draft.name.trim().to_owned(),
            contact: draft.contact,
            phone: draft.phone,
            address: draft.address,
            latitude: draft.latitude,
            longitude: draft.longitude,
            remark: draft.remark,
            create_time: now,
            update_time: now,
        };
        self.customers.push(customer.clone());
        self.persist(CUSTOMERS_KEY, &self.customers)?;
        Ok(customer)
    }

    pub fn customer(&self, id: Uuid) -> Result<&Customer, AppError> {
        self.customers
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::not_found("customer", id))
    }

    pub fn list_customers(&self) -> &[Customer] {
        &self.customers
    }

    /// Case-insensitive substring match over name, contact, phone and address,
    /// returned in insertion order.
    pub fn search_customers(&self, keyword: &str) -> Vec<&Customer> {
        let keyword = keyword.to_lowercase();
        if keyword.is_empty() {
            return self.customers.iter().collect();
        }
        self.customers
            .iter()
            .filter(|c| {
                let matches = |field: Option<&String>| {
                    field.is_some_and(|v| v.to_lowercase().contains(&keyword))
                };
                c.name.to_lowercase().contains(&keyword)
                    || matches(c.contact.as_ref())
                    || matches(c.phone.as_ref())
                    || matches(c.address.as_ref())
            })
            .collect()
    }

    pub fn update_customer(&mut self, id: Uuid, patch: CustomerPatch) -> Result<Customer, AppError> {
        validate_optional_coordinate(patch.latitude, patch.longitude)?;
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(AppError::validation("name", "required"));
        }

        let now = self.clock.now();
        let customer = self
            .customers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::not_found("customer", id))?;

        if let Some(name) = patch.name {
            customer.name = name.trim().to_owned();
        }
        merge(&mut customer.contact, patch.contact);
        merge(&mut customer.phone, patch.phone);
        merge(&mut customer.address, patch.address);
        merge(&mut customer.latitude, patch.latitude);
        merge(&mut customer.longitude, patch.longitude);
        merge(&mut customer.remark, patch.remark);
        customer.update_time = now;

        let updated = customer.clone();
        self.persist(CUSTOMERS_KEY, &self.customers)?;
        Ok(updated)
    }

    /// Deletes a customer and cascades to every visit, check-in and plan that
    /// references it. The cascade set is computed before anything is removed,
    /// so the caller sees all of it gone or none of it.
    pub fn delete_customer(&mut self, id: Uuid) -> Result<CascadeReport, AppError> {
        let position = self
            .customers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| AppError::not_found("customer", id))?;

        let report = CascadeReport {
            visits: self.visits.iter().filter(|v| v.customer_id == id).count(),
            checkins: self.checkins.iter().filter(|c| c.customer_id == id).count(),
            plans: self.plans.iter().filter(|p| p.customer_id == id).count(),
        };

        self.customers.remove(position);
        self.visits.retain(|v| v.customer_id != id);
        self.checkins.retain(|c| c.customer_id != id);
        self.plans.retain(|p| p.customer_id != id);

        self.persist(CUSTOMERS_KEY, &self.customers)?;
        self.persist(VISITS_KEY, &self.visits)?;
        self.persist(CHECKINS_KEY, &self.checkins)?;
        self.persist(VISIT_PLANS_KEY, &self.plans)?;

        tracing::info!(
            customer_id = %id,
            visits = report.visits,
            checkins = report.checkins,
            plans = report.plans,
            "customer deleted with cascade"
        );
        Ok(report)
    }

    // =========================================================================
    //  VISITS
    // =========================================================================

    pub fn create_visit(&mut self, draft: NewVisit) -> Result<Visit, AppError> {
        draft.validate()?;
        if self.customer(draft.customer_id).is_err() {
            return Err(AppError::validation("customerId", "unknown_customer"));
        }

        let today = self.clock.today();
        if self.has_visit_on(draft.customer_id, today) {
            return Err(AppError::DuplicateVisit {
                customer_id: draft.customer_id,
                date: today,
            });
        }

        let now = self.clock.now();
        let visit = Visit {
            id: Uuid::new_v4(),
            customer_id: draft.customer_id,
            visit_time: now,
            visit_date: draft.visit_date.unwrap_or(today),
            notes: draft.notes,
            photos: draft.photos,
            custom_fields: draft.custom_fields,
            create_time: now,
            update_time: now,
        };
        self.visits.push(visit.clone());
        self.persist(VISITS_KEY, &self.visits)?;
        Ok(visit)
    }

    pub fn visit(&self, id: Uuid) -> Result<&Visit, AppError> {
        self.visits
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| AppError::not_found("visit", id))
    }

    pub fn list_visits(&self) -> &[Visit] {
        &self.visits
    }

    /// True when the customer already has a visit whose creation day equals
    /// `day`. The invariant is keyed on the creation timestamp, not on the
    /// user-facing `visit_date`.
    pub fn has_visit_on(&self, customer_id: Uuid, day: NaiveDate) -> bool {
        self.visits
            .iter()
            .any(|v| v.customer_id == customer_id && v.create_time.date_naive() == day)
    }

    /// Full replace-on-edit. Identity, `create_time` and `visit_time` survive
    /// the edit; everything else comes from the draft.
    pub fn replace_visit(&mut self, id: Uuid, draft: NewVisit) -> Result<Visit, AppError> {
        draft.validate()?;
        if self.customer(draft.customer_id).is_err() {
            return Err(AppError::validation("customerId", "unknown_customer"));
        }

        let now = self.clock.now();
        let visit = self
            .visits
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| AppError::not_found("visit", id))?;

        visit.customer_id = draft.customer_id;
        visit.visit_date = draft.visit_date.unwrap_or(visit.visit_date);
        visit.notes = draft.notes;
        visit.photos = draft.photos;
        visit.custom_fields = draft.custom_fields;
        visit.update_time = now;

        let updated = visit.clone();
        self.persist(VISITS_KEY, &self.visits)?;
        Ok(updated)
    }

    /// Deletes a visit and every check-in that references it. Returns the
    /// number of check-ins removed.
    pub fn delete_visit(&mut self, id: Uuid) -> Result<usize, AppError> {
        let position = self
            .visits
            .iter()
            .position(|v| v.id == id)
            .ok_or_else(|| AppError::not_found("visit", id))?;

        self.visits.remove(position);
        let before = self.checkins.len();
        self.checkins.retain(|c| c.visit_id != Some(id));
        let removed = before - self.checkins.len();

        self.persist(VISITS_KEY, &self.visits)?;
        if removed > 0 {
            self.persist(CHECKINS_KEY, &self.checkins)?;
        }
        Ok(removed)
    }

    // =========================================================================
    //  CHECKINS
    // =========================================================================

    /// Inserts a check-in at the given fix. The fix comes from the location
    /// provider; the store only verifies it is usable.
    pub fn create_checkin(&mut self, draft: NewCheckin, fix: GeoPoint) -> Result<Checkin, AppError> {
        draft.validate()?;
        if !fix.is_finite() {
            return Err(AppError::InvalidCoordinate);
        }
        if self.customer(draft.customer_id).is_err() {
            return Err(AppError::validation("customerId", "unknown_customer"));
        }
        if let Some(visit_id) = draft.visit_id
            && self.visit(visit_id).is_err()
        {
            return Err(AppError::validation("visitId", "unknown_visit"));
        }

        let now = self.clock.now();
        let checkin = Checkin {
            id: Uuid::new_v4(),
            customer_id: draft.customer_id,
            visit_id: draft.visit_id,
            checkin_time: now,
            latitude: fix.latitude,
            longitude: fix.longitude,
            address: draft.address,
            photos: draft.photos,
            remark: draft.remark,
            create_time: now,
        };
        self.checkins.push(checkin.clone());
        self.persist(CHECKINS_KEY, &self.checkins)?;
        Ok(checkin)
    }

    pub fn list_checkins(&self) -> &[Checkin] {
        &self.checkins
    }

    // =========================================================================
    //  VISIT PLANS
    // =========================================================================

    pub fn create_plan(&mut self, draft: NewPlan) -> Result<VisitPlan, AppError> {
        draft.validate()?;
        if self.customer(draft.customer_id).is_err() {
            return Err(AppError::validation("customerId", "unknown_customer"));
        }
        if !is_schedulable_slot(draft.plan_time) {
            return Err(AppError::validation("planTime", "invalid_slot"));
        }

        let duplicate = self.plans.iter().any(|p| {
            p.status == PlanStatus::Pending
                && p.customer_id == draft.customer_id
                && p.plan_date == draft.plan_date
                && p.plan_time == Some(draft.plan_time)
        });
        if duplicate {
            return Err(AppError::DuplicatePlan {
                customer_id: draft.customer_id,
                date: draft.plan_date,
                time: Some(draft.plan_time),
            });
        }

        let plan = VisitPlan {
            id: Uuid::new_v4(),
            customer_id: draft.customer_id,
            plan_date: draft.plan_date,
            plan_time: Some(draft.plan_time),
            priority: draft.priority,
            status: PlanStatus::Pending,
            route_order: None,
            remark: draft.remark,
            drop_in: false,
            create_time: self.clock.now(),
            completed_time: None,
        };
        self.plans.push(plan.clone());
        self.persist(VISIT_PLANS_KEY, &self.plans)?;
        Ok(plan)
    }

    /// Drop-in plan from the nearby flow: dated today, no slot. Rejected when
    /// the customer already has any plan for today, whatever its slot or
    /// status.
    pub fn create_drop_in_plan(
        &mut self,
        customer_id: Uuid,
        remark: Option<String>,
    ) -> Result<VisitPlan, AppError> {
        if self.customer(customer_id).is_err() {
            return Err(AppError::validation("customerId", "unknown_customer"));
        }

        let today = self.clock.today();
        if self
            .plans
            .iter()
            .any(|p| p.customer_id == customer_id && p.plan_date == today)
        {
            return Err(AppError::DuplicatePlan {
                customer_id,
                date: today,
                time: None,
            });
        }

        let plan = VisitPlan {
            id: Uuid::new_v4(),
            customer_id,
            plan_date: today,
            plan_time: None,
            priority: Default::default(),
            status: PlanStatus::Pending,
            route_order: None,
            remark,
            drop_in: true,
            create_time: self.clock.now(),
            completed_time: None,
        };
        self.plans.push(plan.clone());
        self.persist(VISIT_PLANS_KEY, &self.plans)?;
        Ok(plan)
    }

    pub fn plan(&self, id: Uuid) -> Result<&VisitPlan, AppError> {
        self.plans
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::not_found("plan", id))
    }

    pub fn list_plans(&self) -> &[VisitPlan] {
        &self.plans
    }

    pub fn pending_plans_on(&self, date: NaiveDate) -> Vec<VisitPlan> {
        self.plans
            .iter()
            .filter(|p| p.status == PlanStatus::Pending && p.plan_date == date)
            .cloned()
            .collect()
    }

    /// Oldest pending plan for the customer on the given date, by creation
    /// time. This is the deterministic fallback for plan-to-visit matching.
    pub fn oldest_pending_plan(&self, customer_id: Uuid, date: NaiveDate) -> Option<&VisitPlan> {
        let mut oldest: Option<&VisitPlan> = None;
        for plan in self.plans.iter().filter(|p| {
            p.status == PlanStatus::Pending && p.customer_id == customer_id && p.plan_date == date
        }) {
            // strict comparison keeps the first-inserted plan on timestamp ties
            if oldest.is_none_or(|best| plan.create_time < best.create_time) {
                oldest = Some(plan);
            }
        }
        oldest
    }

    /// `pending -> completed`. Terminal states never transition again.
    pub fn complete_plan(&mut self, id: Uuid) -> Result<VisitPlan, AppError> {
        self.close_plan(id, PlanStatus::Completed)
    }

    /// `pending -> cancelled`.
    pub fn cancel_plan(&mut self, id: Uuid) -> Result<VisitPlan, AppError> {
        self.close_plan(id, PlanStatus::Cancelled)
    }

    fn close_plan(&mut self, id: Uuid, status: PlanStatus) -> Result<VisitPlan, AppError> {
        let now = self.clock.now();
        let plan = self
            .plans
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::not_found("plan", id))?;
        if plan.status.is_terminal() {
            return Err(AppError::PlanClosed {
                id,
                status: plan.status,
            });
        }

        plan.status = status;
        if status == PlanStatus::Completed {
            plan.completed_time = Some(now);
        }
        let updated = plan.clone();
        self.persist(VISIT_PLANS_KEY, &self.plans)?;
        tracing::info!(plan_id = %id, status = %status, "plan closed");
        Ok(updated)
    }

    pub fn delete_plan(&mut self, id: Uuid) -> Result<(), AppError> {
        let position = self
            .plans
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| AppError::not_found("plan", id))?;
        self.plans.remove(position);
        self.persist(VISIT_PLANS_KEY, &self.plans)
    }

    /// Writes the optimizer's result back: 1-based ranks in sequence order and
    /// a suggested slot stepping one hour per rank from `start_hour`. A display
    /// aid; ranks past the end of the day keep their rank but get no slot, so
    /// two plans never end up sharing one and the duplicate-plan invariant
    /// cannot be reintroduced here.
    pub fn apply_route_order(
        &mut self,
        ordered_ids: &[Uuid],
        start_hour: u32,
    ) -> Result<Vec<VisitPlan>, AppError> {
        let mut updated = Vec::with_capacity(ordered_ids.len());
        for (index, id) in ordered_ids.iter().enumerate() {
            let plan = self
                .plans
                .iter_mut()
                .find(|p| p.id == *id)
                .ok_or_else(|| AppError::not_found("plan", *id))?;
            let hour = start_hour + index as u32;
            plan.route_order = Some(index as u32 + 1);
            plan.plan_time = if hour <= 23 {
                chrono::NaiveTime::from_hms_opt(hour, 0, 0)
            } else {
                None
            };
            updated.push(plan.clone());
        }
        self.persist(VISIT_PLANS_KEY, &self.plans)?;
        Ok(updated)
    }

    // =========================================================================
    //  PERSISTENCE
    // =========================================================================

    fn persist<T: Serialize>(&self, key: &str, collection: &[T]) -> Result<(), AppError> {
        let payload = serde_json::to_string(collection)?;
        self.blob.set(key, payload);
        Ok(())
    }
}

#[cfg(test)]
impl EntityStore {
    /// Shifts a customer's creation time into the past. Reminder countdowns
    /// key off `create_time`, which the public API deliberately never exposes
    /// for mutation.
    pub fn backdate_customer_for_tests(&mut self, id: Uuid, by: chrono::Duration) {
        if let Some(customer) = self.customers.iter_mut().find(|c| c.id == id) {
            customer.create_time -= by;
            customer.update_time -= by;
        }
    }
}

fn read_collection<T: DeserializeOwned>(
    blob: &dyn BlobStore,
    key: &str,
) -> Result<Vec<T>, AppError> {
    match blob.get(key) {
        Some(payload) => Ok(serde_json::from_str(&payload)?),
        None => Ok(Vec::new()),
    }
}

fn merge<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn validate_optional_coordinate(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<(), AppError> {
    if latitude.is_some_and(|v| !v.is_finite()) || longitude.is_some_and(|v| !v.is_finite()) {
        return Err(AppError::InvalidCoordinate);
    }
    Ok(())
}
