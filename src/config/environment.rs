//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.

use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

/// Backend de almacenamiento durable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow!("unknown STORE_BACKEND '{}' (expected postgres|memory)", other)),
        }
    }
}

/// Vehículo semilla para el modo en memoria: `MATRICULA@ubicacion`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedVehicle {
    pub license_plate: String,
    pub location: String,
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    pub store_backend: StoreBackend,
    pub seed_vehicles: Vec<SeedVehicle>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            cors_origins: Vec::new(),
            store_backend: StoreBackend::Postgres,
            seed_vehicles: Vec::new(),
        }
    }
}

impl EnvironmentConfig {
    /// Leer la configuración desde variables de entorno
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("PORT must be a valid number, got '{}'", raw))?,
            Err(_) => defaults.port,
        };

        let store_backend = match env::var("STORE_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.store_backend,
        };

        Ok(Self {
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            port,
            host: env::var("HOST").unwrap_or(defaults.host),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|raw| parse_list(&raw))
                .unwrap_or_default(),
            store_backend,
            seed_vehicles: env::var("SEED_VEHICLES")
                .map(|raw| parse_seed_vehicles(&raw))
                .unwrap_or_default(),
        })
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `AMB-001@Base Norte,AMB-002` → la ubicación por defecto es "Base"
pub fn parse_seed_vehicles(raw: &str) -> Vec<SeedVehicle> {
    parse_list(raw)
        .into_iter()
        .map(|entry| match entry.split_once('@') {
            Some((plate, location)) => SeedVehicle {
                license_plate: plate.trim().to_uppercase(),
                location: location.trim().to_string(),
            },
            None => SeedVehicle {
                license_plate: entry.to_uppercase(),
                location: "Base".to_string(),
            },
        })
        .filter(|seed| !seed.license_plate.is_empty())
        .collect()
}
