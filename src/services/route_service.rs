// src/services/route_service.rs

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::config::Settings;
use crate::geo::{GeoPoint, distance_km};
use crate::location::LocationProvider;
use crate::models::customer::Customer;
use crate::models::plan::VisitPlan;
use crate::store::SharedStore;

/// A customer within discovery range, with the distance from the current fix.
#[derive(Debug, Clone)]
pub struct NearbyCustomer {
    pub customer: Customer,
    pub distance_km: f64,
}

/// Orders a day's pending plans into a travel-efficient sequence with the
/// greedy nearest-neighbor heuristic, and powers the nearby-customer
/// discovery flow. O(n²) over a single day's plans, which stay in the tens.
#[derive(Clone)]
pub struct RouteService {
    store: SharedStore,
    location: Arc<dyn LocationProvider>,
    settings: Arc<Settings>,
}

impl RouteService {
    pub fn new(
        store: SharedStore,
        location: Arc<dyn LocationProvider>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            store,
            location,
            settings,
        }
    }

    /// Optimizes the pending plans of `date`, starting from the device's
    /// current position. With no pending plans this reports
    /// `NothingToOptimize`; without a fix it reports `LocationUnavailable`
    /// and writes nothing.
    pub async fn optimize_route(&self, date: NaiveDate) -> Result<Vec<VisitPlan>, AppError> {
        // check there is work before suspending on the fix
        if self.store.read().await.pending_plans_on(date).is_empty() {
            return Err(AppError::NothingToOptimize { date });
        }

        let start = self
            .location
            .current_position()
            .await
            .map_err(|_| AppError::LocationUnavailable)?;

        self.optimize_route_from(date, start).await
    }

    /// Same as [`optimize_route`](Self::optimize_route) with a caller-supplied
    /// start point.
    pub async fn optimize_route_from(
        &self,
        date: NaiveDate,
        start: GeoPoint,
    ) -> Result<Vec<VisitPlan>, AppError> {
        if !start.is_finite() {
            return Err(AppError::InvalidCoordinate);
        }

        let mut store = self.store.write().await;

        let pending = store.pending_plans_on(date);
        if pending.is_empty() {
            return Err(AppError::NothingToOptimize { date });
        }

        // resolve each plan to its customer's coordinate; plans without one
        // are excluded from optimization and left at the tail, unordered
        let mut locatable: Vec<(Uuid, GeoPoint)> = Vec::new();
        let mut unlocatable: Vec<VisitPlan> = Vec::new();
        for plan in &pending {
            match store.customer(plan.customer_id).ok().and_then(Customer::position) {
                Some(point) => locatable.push((plan.id, point)),
                None => unlocatable.push(plan.clone()),
            }
        }

        let ordered_ids = nearest_neighbor_order(start, &locatable)?;
        let mut route =
            store.apply_route_order(&ordered_ids, self.settings.route_start_hour)?;

        tracing::info!(
            %date,
            ordered = route.len(),
            skipped = unlocatable.len(),
            "route optimized"
        );
        route.extend(unlocatable);
        Ok(route)
    }

    /// Customers within the configured radius of the current fix, closest
    /// first.
    pub async fn nearby_customers(&self) -> Result<Vec<NearbyCustomer>, AppError> {
        let here = self.location.current_position().await?;

        let store = self.store.read().await;
        let mut nearby: Vec<NearbyCustomer> = Vec::new();
        for customer in store.list_customers() {
            let Some(position) = customer.position() else {
                continue;
            };
            let distance = distance_km(here, position)?;
            if distance <= self.settings.nearby_radius_km {
                nearby.push(NearbyCustomer {
                    customer: customer.clone(),
                    distance_km: distance,
                });
            }
        }
        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        Ok(nearby)
    }
}

/// Greedy nearest-neighbor ordering. Ties go to the candidate encountered
/// first in the input sequence, so the result is stable.
fn nearest_neighbor_order(
    start: GeoPoint,
    candidates: &[(Uuid, GeoPoint)],
) -> Result<Vec<Uuid>, AppError> {
    let mut remaining: Vec<(Uuid, GeoPoint)> = candidates.to_vec();
    let mut ordered = Vec::with_capacity(remaining.len());
    let mut current = start;

    while !remaining.is_empty() {
        let mut nearest_index = 0;
        let mut nearest_distance = distance_km(current, remaining[0].1)?;
        for (index, (_, point)) in remaining.iter().enumerate().skip(1) {
            let candidate_distance = distance_km(current, *point)?;
            if candidate_distance < nearest_distance {
                nearest_distance = candidate_distance;
                nearest_index = index;
            }
        }

        let (id, point) = remaining.remove(nearest_index);
        ordered.push(id);
        current = point;
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone, Timelike, Utc};
    use std::collections::HashSet;

    use crate::common::clock::FixedClock;
    use crate::location::{StaticLocationProvider, UnavailableLocationProvider};
    use crate::models::customer::NewCustomer;
    use crate::models::plan::{NewPlan, PlanPriority};
    use crate::store::{EntityStore, MemoryBlobStore};

    const PLAN_DATE: &str = "2024-05-11";

    fn plan_date() -> NaiveDate {
        PLAN_DATE.parse().unwrap()
    }

    async fn add_customer_with_plan(
        store: &SharedStore,
        name: &str,
        position: Option<(f64, f64)>,
        hour: u32,
    ) -> Uuid {
        let mut guard = store.write().await;
        let customer = guard
            .create_customer(NewCustomer {
                name: name.to_owned(),
                latitude: position.map(|p| p.0),
                longitude: position.map(|p| p.1),
                ..Default::default()
            })
            .unwrap();
        guard
            .create_plan(NewPlan {
                customer_id: customer.id,
                plan_date: plan_date(),
                plan_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
                priority: PlanPriority::Normal,
                remark: None,
            })
            .unwrap()
            .id
    }

    fn service(store: SharedStore, provider: Arc<dyn LocationProvider>) -> RouteService {
        RouteService::new(store, provider, Arc::new(Settings::default()))
    }

    fn shared_store() -> SharedStore {
        let clock = Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap(),
        ));
        EntityStore::load(Arc::new(MemoryBlobStore::new()), clock)
            .unwrap()
            .into_shared()
    }

    #[tokio::test]
    async fn orders_plans_by_successive_nearest_neighbor() {
        let store = shared_store();
        let near = add_customer_with_plan(&store, "Nearest", Some((39.90, 116.405)), 9).await;
        let mid = add_customer_with_plan(&store, "Middle", Some((39.91, 116.41)), 10).await;
        let far = add_customer_with_plan(&store, "Farthest", Some((39.80, 116.30)), 11).await;

        let service = service(
            store,
            Arc::new(StaticLocationProvider(GeoPoint::new(39.90, 116.40))),
        );
        let route = service.optimize_route(plan_date()).await.unwrap();

        let ids: Vec<Uuid> = route.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![near, mid, far]);
    }

    #[tokio::test]
    async fn output_is_a_permutation_with_ranks_and_hourly_slots() {
        let store = shared_store();
        let mut expected = HashSet::new();
        expected.insert(add_customer_with_plan(&store, "A", Some((39.91, 116.41)), 9).await);
        expected.insert(add_customer_with_plan(&store, "B", Some((39.80, 116.30)), 10).await);
        expected.insert(add_customer_with_plan(&store, "C", Some((39.90, 116.405)), 11).await);

        let service = service(
            store,
            Arc::new(StaticLocationProvider(GeoPoint::new(39.90, 116.40))),
        );
        let route = service.optimize_route(plan_date()).await.unwrap();

        let got: HashSet<Uuid> = route.iter().map(|p| p.id).collect();
        assert_eq!(got, expected);
        for (index, plan) in route.iter().enumerate() {
            assert_eq!(plan.route_order, Some(index as u32 + 1));
            let slot = plan.plan_time.unwrap();
            assert_eq!(slot.hour(), 9 + index as u32);
            assert_eq!(slot.minute(), 0);
        }
    }

    #[tokio::test]
    async fn plans_without_coordinates_trail_unordered() {
        let store = shared_store();
        let located = add_customer_with_plan(&store, "Located", Some((39.91, 116.41)), 9).await;
        let unlocated = add_customer_with_plan(&store, "No Coords", None, 10).await;

        let service = service(
            store,
            Arc::new(StaticLocationProvider(GeoPoint::new(39.90, 116.40))),
        );
        let route = service.optimize_route(plan_date()).await.unwrap();

        assert_eq!(route.len(), 2);
        assert_eq!(route[0].id, located);
        assert_eq!(route[1].id, unlocated);
        assert_eq!(route[1].route_order, None);
    }

    #[tokio::test]
    async fn empty_day_reports_nothing_to_optimize() {
        let service = service(
            shared_store(),
            Arc::new(StaticLocationProvider(GeoPoint::new(39.90, 116.40))),
        );
        let err = service.optimize_route(plan_date()).await.unwrap_err();
        assert!(matches!(err, AppError::NothingToOptimize { .. }));
    }

    #[tokio::test]
    async fn missing_fix_reports_location_unavailable_and_writes_nothing() {
        let store = shared_store();
        let plan = add_customer_with_plan(&store, "Waiting", Some((39.91, 116.41)), 9).await;

        let service = service(store.clone(), Arc::new(UnavailableLocationProvider));
        let err = service.optimize_route(plan_date()).await.unwrap_err();
        assert!(matches!(err, AppError::LocationUnavailable));
        assert_eq!(store.read().await.plan(plan).unwrap().route_order, None);
    }

    #[tokio::test]
    async fn nearby_customers_are_sorted_by_distance_within_radius() {
        let store = shared_store();
        {
            let mut guard = store.write().await;
            for (name, lat, lon) in [
                ("Close", 39.9044, 116.4076),
                ("Closer", 39.9042, 116.4074),
                ("Across Town", 39.7, 116.1),
            ] {
                guard
                    .create_customer(NewCustomer {
                        name: name.to_owned(),
                        latitude: Some(lat),
                        longitude: Some(lon),
                        ..Default::default()
                    })
                    .unwrap();
            }
        }

        let service = service(
            store,
            Arc::new(StaticLocationProvider(GeoPoint::new(39.9042, 116.4074))),
        );
        let nearby = service.nearby_customers().await.unwrap();

        let names: Vec<&str> = nearby.iter().map(|n| n.customer.name.as_str()).collect();
        assert_eq!(names, vec!["Closer", "Close"]);
        assert!(nearby[0].distance_km <= nearby[1].distance_km);
    }
}
