//! Conexión a PostgreSQL
//!
//! Crea el pool y aplica las migraciones embebidas en el binario.

use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::utils::errors::StoreResult;

/// Crear el pool y verificar la conexión
pub async fn connect(config: &DatabaseConfig) -> StoreResult<PgPool> {
    log::info!("🔌 Conectando a la base de datos: {}", config.masked_url());
    let pool = config.create_pool().await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    log::info!("✅ Conexión a la base de datos establecida");
    Ok(pool)
}

/// Ejecutar migraciones de la base de datos
pub async fn run_migrations(pool: &PgPool) -> StoreResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    log::info!("📦 Migraciones aplicadas");
    Ok(())
}
