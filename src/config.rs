// src/config.rs

use std::env;
use std::str::FromStr;
use std::sync::Arc;

use crate::common::clock::{Clock, SystemClock};
use crate::location::LocationProvider;
use crate::services::{
    CheckinService, DashboardService, PlanService, ReminderService, RouteService, VisitService,
};
use crate::store::{BlobStore, EntityStore, SharedStore};

/// Tunables with the defaults the product shipped with. Every field can be
/// overridden from the environment through [`Settings::from_env`].
#[derive(Debug, Clone)]
pub struct Settings {
    /// Days a customer may go unvisited before their reminder comes due.
    pub revisit_interval_days: i64,
    /// Reminder surfacing window: countdowns in `1..=window` are "due soon".
    pub due_soon_window_days: i64,
    /// Discovery radius for the nearby-customer flow.
    pub nearby_radius_km: f64,
    /// First hourly slot assigned when a route is optimized.
    pub route_start_hour: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            revisit_interval_days: 30,
            due_soon_window_days: 7,
            nearby_radius_km: 2.0,
            route_start_hour: 9,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Self {
            revisit_interval_days: env_or(
                "FIELDTRACK_REVISIT_INTERVAL_DAYS",
                defaults.revisit_interval_days,
            ),
            due_soon_window_days: env_or(
                "FIELDTRACK_DUE_SOON_WINDOW_DAYS",
                defaults.due_soon_window_days,
            ),
            nearby_radius_km: env_or("FIELDTRACK_NEARBY_RADIUS_KM", defaults.nearby_radius_km),
            route_start_hour: env_or("FIELDTRACK_ROUTE_START_HOUR", defaults.route_start_hour),
        }
    }
}

fn env_or<T: FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(%name, %raw, "unparsable setting, using the default");
            default
        }),
        Err(_) => default,
    }
}

/// Assembled application state: the shared store plus one instance of each
/// service, all wired to the same store, clock, and settings.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub settings: Arc<Settings>,
    pub visits: VisitService,
    pub checkins: CheckinService,
    pub plans: PlanService,
    pub routes: RouteService,
    pub reminders: ReminderService,
    pub dashboard: DashboardService,
}

impl AppState {
    /// Loads entity data from `blob` and builds the dependency graph. The
    /// caller supplies the platform seams; everything else is wired here.
    pub fn new(
        blob: Arc<dyn BlobStore>,
        location: Arc<dyn LocationProvider>,
    ) -> anyhow::Result<Self> {
        let settings = Arc::new(Settings::from_env());
        Self::with_settings(blob, location, settings)
    }

    pub fn with_settings(
        blob: Arc<dyn BlobStore>,
        location: Arc<dyn LocationProvider>,
        settings: Arc<Settings>,
    ) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = EntityStore::load(blob.clone(), clock.clone())?.into_shared();
        tracing::info!("entity store loaded");

        Ok(Self {
            visits: VisitService::new(store.clone(), clock.clone()),
            checkins: CheckinService::new(store.clone(), location.clone()),
            plans: PlanService::new(store.clone(), clock.clone()),
            routes: RouteService::new(store.clone(), location, settings.clone()),
            reminders: ReminderService::new(store.clone(), blob, clock.clone(), settings.clone()),
            dashboard: DashboardService::new(store.clone(), clock),
            store,
            settings,
        })
    }
}

/// Logger setup for binaries embedding the crate.
pub fn init_tracing() {
    tracing_subscriber::fmt().with_target(false).compact().init();
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::location::UnavailableLocationProvider;
    use crate::models::customer::NewCustomer;
    use crate::store::MemoryBlobStore;

    #[test]
    fn settings_default_matches_the_shipped_tunables() {
        let settings = Settings::default();
        assert_eq!(settings.revisit_interval_days, 30);
        assert_eq!(settings.due_soon_window_days, 7);
        assert_eq!(settings.nearby_radius_km, 2.0);
        assert_eq!(settings.route_start_hour, 9);
    }

    #[tokio::test]
    async fn app_state_wires_every_service_to_one_store() {
        let state = AppState::with_settings(
            Arc::new(MemoryBlobStore::new()),
            Arc::new(UnavailableLocationProvider),
            Arc::new(Settings::default()),
        )
        .unwrap();

        state
            .store
            .write()
            .await
            .create_customer(NewCustomer {
                name: "Wired Co".to_owned(),
                ..Default::default()
            })
            .unwrap();

        // the dashboard reads through the same store handle
        assert_eq!(state.dashboard.recent_customers(10).await.len(), 1);
    }
}
