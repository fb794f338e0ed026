//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::config::environment::{EnvironmentConfig, StoreBackend};
use crate::config::DatabaseConfig;
use crate::database;
use crate::models::Vehicle;
use crate::repositories::{InMemoryDispatchStore, PgDispatchStore};
use crate::services::DispatchCoordinator;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<DispatchCoordinator>,
    pub config: EnvironmentConfig,
}

impl AppState {
    pub fn new(coordinator: DispatchCoordinator, config: EnvironmentConfig) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
            config,
        }
    }

    /// Abre el almacenamiento configurado y reconstruye el registro de flota
    pub async fn from_config(config: EnvironmentConfig) -> Result<Self> {
        let coordinator = match config.store_backend {
            StoreBackend::Postgres => {
                let db_config = DatabaseConfig::from_env()?;
                let pool = database::connect(&db_config)
                    .await
                    .context("Error conectando a la base de datos")?;
                database::run_migrations(&pool)
                    .await
                    .context("Error aplicando migraciones")?;

                let store = Arc::new(PgDispatchStore::new(pool));
                DispatchCoordinator::bootstrap(store.clone(), store).await?
            }
            StoreBackend::Memory => {
                let now = Utc::now();
                let vehicles: Vec<Vehicle> = config
                    .seed_vehicles
                    .iter()
                    .map(|seed| Vehicle::new(seed.license_plate.clone(), seed.location.clone(), now))
                    .collect();
                log::warn!(
                    "🧪 Almacenamiento en memoria con {} vehículos semilla; los datos no persisten",
                    vehicles.len()
                );

                let store = Arc::new(InMemoryDispatchStore::with_vehicles(vehicles));
                DispatchCoordinator::bootstrap(store.clone(), store).await?
            }
        };

        let summary = coordinator.fleet_summary();
        log::info!(
            "🚑 Flota cargada: {} vehículos ({} disponibles, {} despachados, {} fuera de servicio)",
            summary.total,
            summary.available,
            summary.dispatched,
            summary.out_of_service
        );

        Ok(Self::new(coordinator, config))
    }
}
